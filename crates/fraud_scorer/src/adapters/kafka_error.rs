// Rust guideline compliant 2026-10-19

//! Mapping of `rdkafka` errors onto the domain error taxonomy.

use domain::{BrokerError, PublishError, ReceiveError};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};

/// Whether `code` means "could not reach or hear back from the broker".
#[must_use]
pub fn is_connection_code(code: RDKafkaErrorCode) -> bool {
    matches!(
        code,
        RDKafkaErrorCode::BrokerTransportFailure
            | RDKafkaErrorCode::Resolve
            | RDKafkaErrorCode::AllBrokersDown
            | RDKafkaErrorCode::OperationTimedOut
            | RDKafkaErrorCode::RequestTimedOut
            | RDKafkaErrorCode::NetworkException
            | RDKafkaErrorCode::BrokerNotAvailable
    )
}

/// Translate an admin-side error.
#[must_use]
pub fn broker_error(error: &KafkaError) -> BrokerError {
    match error.rdkafka_error_code() {
        Some(code) if is_connection_code(code) => BrokerError::Unreachable { reason: error.to_string() },
        _ => BrokerError::Rejected { reason: error.to_string() },
    }
}

/// Translate a per-topic creation failure.
#[must_use]
pub fn topic_error(topic: &str, code: RDKafkaErrorCode) -> BrokerError {
    match code {
        RDKafkaErrorCode::TopicAlreadyExists => BrokerError::TopicAlreadyExists { topic: topic.to_owned() },
        code if is_connection_code(code) => BrokerError::Unreachable { reason: format!("{topic}: {code}") },
        code => BrokerError::Rejected { reason: format!("{topic}: {code}") },
    }
}

/// Translate a consumer error. Only client-declared fatal errors stop the relay.
#[must_use]
pub fn receive_error(error: &KafkaError) -> ReceiveError {
    match error.rdkafka_error_code() {
        Some(RDKafkaErrorCode::Fatal) => ReceiveError::Fatal { reason: error.to_string() },
        _ => ReceiveError::Transient { reason: error.to_string() },
    }
}

/// Translate a producer error. Only client-declared fatal errors stop the relay.
#[must_use]
pub fn publish_error(error: &KafkaError) -> PublishError {
    match error.rdkafka_error_code() {
        Some(RDKafkaErrorCode::Fatal) => PublishError::Fatal { reason: error.to_string() },
        _ => PublishError::Rejected { reason: error.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_connection_errors() {
        let e = KafkaError::MetadataFetch(RDKafkaErrorCode::AllBrokersDown);
        assert!(broker_error(&e).is_connection());
        let e = KafkaError::MetadataFetch(RDKafkaErrorCode::OperationTimedOut);
        assert!(broker_error(&e).is_connection());
    }

    #[test]
    fn client_creation_is_not_retried() {
        let e = KafkaError::ClientCreation("invalid bootstrap.servers".to_owned());
        assert!(matches!(broker_error(&e), BrokerError::Rejected { .. }));
    }

    #[test]
    fn already_exists_is_recognized() {
        assert_eq!(
            topic_error("transactions", RDKafkaErrorCode::TopicAlreadyExists),
            BrokerError::TopicAlreadyExists { topic: "transactions".to_owned() }
        );
        assert!(matches!(
            topic_error("transactions", RDKafkaErrorCode::InvalidReplicationFactor),
            BrokerError::Rejected { .. }
        ));
    }

    #[test]
    fn consumer_errors_are_transient_unless_fatal() {
        assert!(matches!(receive_error(&KafkaError::PartitionEOF(0)), ReceiveError::Transient { .. }));
        let fatal = KafkaError::MessageConsumption(RDKafkaErrorCode::Fatal);
        assert!(matches!(receive_error(&fatal), ReceiveError::Fatal { .. }));
    }

    #[test]
    fn producer_errors_are_rejections_unless_fatal() {
        let timeout = KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut);
        assert!(matches!(publish_error(&timeout), PublishError::Rejected { .. }));
        let fatal = KafkaError::MessageProduction(RDKafkaErrorCode::Fatal);
        assert!(matches!(publish_error(&fatal), PublishError::Fatal { .. }));
    }
}
