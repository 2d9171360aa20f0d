// Rust guideline compliant 2026-10-19

//! Process configuration loaded from environment variables.
//!
//! Every variable is optional. An unset variable falls back to its default; a
//! set but unparseable one is a startup error rather than a silent default.

use domain::{PolicyError, RetryPolicy};
use lifecycle::{LifecycleConfig, LifecycleError};
use relay::{PublishFailurePolicy, RelayConfig};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Errors raised while reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used.
    #[error("{var}={value:?}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Raw value found.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The retry variables do not form a valid policy.
    #[error("retry policy: {0}")]
    Policy(#[from] PolicyError),
    /// Topics or group are inconsistent.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Where a new consumer group starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetReset {
    /// Oldest retained message.
    Earliest,
    /// Only messages produced after the group joins.
    Latest,
}

impl OffsetReset {
    /// Value for the client's `auto.offset.reset` property.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Latest => "latest",
        }
    }
}

impl FromStr for OffsetReset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            other => Err(format!("expected `earliest` or `latest`, got `{other}`")),
        }
    }
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Comma-separated broker list.
    pub bootstrap_servers: String,
    /// Admin operation and message delivery timeout.
    pub broker_timeout: Duration,
    /// Starting position for a new consumer group.
    pub auto_offset_reset: OffsetReset,
    /// Topics, group, retry and relay settings.
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Optional variables (default in parentheses):
    /// - `KAFKA_BOOTSTRAP_SERVERS` (`localhost:9092`)
    /// - `SCORER_INPUT_TOPIC` (`transactions`)
    /// - `SCORER_OUTPUT_TOPIC` (`scored-transactions`)
    /// - `SCORER_GROUP_ID` (`scorer-group`)
    /// - `SCORER_RETRY_MAX_ATTEMPTS` (`10`)
    /// - `SCORER_RETRY_DELAY_MS` (`2000`)
    /// - `SCORER_RETRY_MAX_DELAY_MS` (unset: fixed delay; set: exponential backoff capped here)
    /// - `SCORER_RETRY_JITTER` (`false`)
    /// - `SCORER_PUBLISH_FAILURE_POLICY` (`drop`; or `retry`)
    /// - `SCORER_TOPIC_PARTITIONS` (`1`)
    /// - `SCORER_TOPIC_REPLICATION` (`1`)
    /// - `SCORER_BROKER_TIMEOUT_MS` (`5000`)
    /// - `SCORER_AUTO_OFFSET_RESET` (`earliest`; or `latest`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a set variable cannot be parsed or the
    /// resulting settings are inconsistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |var: &str, default: &str| lookup(var).unwrap_or_else(|| default.to_owned());

        let bootstrap_servers = text("KAFKA_BOOTSTRAP_SERVERS", "localhost:9092");
        let input = text("SCORER_INPUT_TOPIC", "transactions");
        let output = text("SCORER_OUTPUT_TOPIC", "scored-transactions");
        let group_id = text("SCORER_GROUP_ID", "scorer-group");

        let max_attempts: u32 = parse(&lookup, "SCORER_RETRY_MAX_ATTEMPTS")?.unwrap_or(RetryPolicy::DEFAULT_MAX_ATTEMPTS);
        let delay = parse::<u64>(&lookup, "SCORER_RETRY_DELAY_MS")?
            .map_or(RetryPolicy::DEFAULT_DELAY, Duration::from_millis);
        let mut policy = RetryPolicy::builder().max_attempts(max_attempts).delay(delay);
        if let Some(max_delay) = parse::<u64>(&lookup, "SCORER_RETRY_MAX_DELAY_MS")? {
            policy = policy.exponential(Duration::from_millis(max_delay));
        }
        let policy = policy.build()?;

        let jitter = parse_with(&lookup, "SCORER_RETRY_JITTER", parse_bool)?.unwrap_or(false);
        let failure_policy =
            parse_with(&lookup, "SCORER_PUBLISH_FAILURE_POLICY", parse_failure_policy)?.unwrap_or_default();
        let partitions: i32 = parse(&lookup, "SCORER_TOPIC_PARTITIONS")?.unwrap_or(1);
        let replication: i32 = parse(&lookup, "SCORER_TOPIC_REPLICATION")?.unwrap_or(1);
        let broker_timeout_ms: u64 = parse(&lookup, "SCORER_BROKER_TIMEOUT_MS")?.unwrap_or(5_000);
        if broker_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "SCORER_BROKER_TIMEOUT_MS",
                value: "0".to_owned(),
                reason: "must be > 0".to_owned(),
            });
        }
        let auto_offset_reset: OffsetReset =
            parse(&lookup, "SCORER_AUTO_OFFSET_RESET")?.unwrap_or(OffsetReset::Earliest);

        let relay = RelayConfig::builder()
            .failure_policy(failure_policy)
            .publish_retry(policy)
            .build()
            .map_err(LifecycleError::Relay)?;
        let lifecycle = LifecycleConfig::builder(input, output, group_id)
            .readiness(policy)
            .jitter(jitter)
            .partitions(partitions)
            .replication_factor(replication)
            .relay(relay)
            .build()?;

        Ok(Self {
            bootstrap_servers,
            broker_timeout: Duration::from_millis(broker_timeout_ms),
            auto_offset_reset,
            lifecycle,
        })
    }

    /// Log the effective configuration at startup.
    pub fn log_summary(&self) {
        let lc = &self.lifecycle;
        tracing::info!(
            bootstrap_servers = %self.bootstrap_servers,
            input = %lc.input.name,
            output = %lc.output.name,
            group_id = %lc.group_id,
            max_attempts = lc.readiness.max_attempts(),
            delay_ms = u64::try_from(lc.readiness.delay().as_millis()).unwrap_or(u64::MAX),
            failure_policy = ?lc.relay.failure_policy,
            offset_reset = self.auto_offset_reset.as_str(),
            "config.loaded"
        );
    }
}

/// Parse `var` with its `FromStr` impl; `None` when unset.
fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    parse_with(lookup, var, |raw| raw.trim().parse::<T>().map_err(|e| e.to_string()))
}

fn parse_with<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    parser: impl Fn(&str) -> Result<T, String>,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    parser(&value).map(Some).map_err(|reason| ConfigError::Invalid { var, value, reason })
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got `{other}`")),
    }
}

fn parse_failure_policy(raw: &str) -> Result<PublishFailurePolicy, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "drop" => Ok(PublishFailurePolicy::Drop),
        "retry" => Ok(PublishFailurePolicy::Retry),
        other => Err(format!("expected `drop` or `retry`, got `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Backoff;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        AppConfig::from_lookup(|var| env.get(var).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        let lc = &config.lifecycle;

        assert_eq!(config.bootstrap_servers, "localhost:9092");
        assert_eq!(config.broker_timeout, Duration::from_secs(5));
        assert_eq!(config.auto_offset_reset, OffsetReset::Earliest);
        assert_eq!(lc.input.name, "transactions");
        assert_eq!(lc.output.name, "scored-transactions");
        assert_eq!(lc.group_id, "scorer-group");
        assert_eq!(lc.readiness, RetryPolicy::default());
        assert!(!lc.jitter);
        assert_eq!(lc.relay.failure_policy, PublishFailurePolicy::Drop);
        assert_eq!(lc.input.partitions, 1);
        assert_eq!(lc.output.replication_factor, 1);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("KAFKA_BOOTSTRAP_SERVERS", "kafka-1:9092,kafka-2:9092"),
            ("SCORER_INPUT_TOPIC", "raw"),
            ("SCORER_OUTPUT_TOPIC", "enriched"),
            ("SCORER_GROUP_ID", "g"),
            ("SCORER_RETRY_MAX_ATTEMPTS", "3"),
            ("SCORER_RETRY_DELAY_MS", "250"),
            ("SCORER_RETRY_MAX_DELAY_MS", "4000"),
            ("SCORER_RETRY_JITTER", "true"),
            ("SCORER_PUBLISH_FAILURE_POLICY", "Retry"),
            ("SCORER_TOPIC_PARTITIONS", "6"),
            ("SCORER_TOPIC_REPLICATION", "3"),
            ("SCORER_BROKER_TIMEOUT_MS", "1500"),
            ("SCORER_AUTO_OFFSET_RESET", "latest"),
        ])
        .unwrap();
        let lc = &config.lifecycle;

        assert_eq!(config.bootstrap_servers, "kafka-1:9092,kafka-2:9092");
        assert_eq!(config.broker_timeout, Duration::from_millis(1500));
        assert_eq!(config.auto_offset_reset, OffsetReset::Latest);
        assert_eq!((lc.input.name.as_str(), lc.output.name.as_str()), ("raw", "enriched"));
        assert_eq!(lc.readiness.max_attempts(), 3);
        assert_eq!(lc.readiness.delay(), Duration::from_millis(250));
        assert_eq!(lc.readiness.backoff(), Backoff::Exponential { max_delay: Duration::from_secs(4) });
        assert!(lc.jitter);
        assert_eq!(lc.relay.failure_policy, PublishFailurePolicy::Retry);
        assert_eq!(lc.relay.publish_retry, lc.readiness);
        assert_eq!(lc.input.partitions, 6);
        assert_eq!(lc.output.replication_factor, 3);
    }

    #[test]
    fn unparseable_number_is_an_error() {
        let err = load(&[("SCORER_RETRY_MAX_ATTEMPTS", "ten")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SCORER_RETRY_MAX_ATTEMPTS", .. }));
    }

    #[test]
    fn unknown_policy_is_an_error() {
        let err = load(&[("SCORER_PUBLISH_FAILURE_POLICY", "dead-letter")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SCORER_PUBLISH_FAILURE_POLICY", .. }));
    }

    #[test]
    fn zero_attempts_is_an_error() {
        let err = load(&[("SCORER_RETRY_MAX_ATTEMPTS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Policy(_)));
    }

    #[test]
    fn cap_below_delay_is_an_error() {
        let err = load(&[("SCORER_RETRY_DELAY_MS", "2000"), ("SCORER_RETRY_MAX_DELAY_MS", "500")]).unwrap_err();
        assert!(matches!(err, ConfigError::Policy(_)));
    }

    #[test]
    fn same_input_and_output_is_an_error() {
        let err = load(&[("SCORER_INPUT_TOPIC", "t"), ("SCORER_OUTPUT_TOPIC", "t")]).unwrap_err();
        assert!(matches!(err, ConfigError::Lifecycle(LifecycleError::InvalidConfig { .. })));
    }

    #[test]
    fn zero_timeout_is_an_error() {
        let err = load(&[("SCORER_BROKER_TIMEOUT_MS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SCORER_BROKER_TIMEOUT_MS", .. }));
    }

    #[test]
    fn offset_reset_parsing() {
        assert_eq!("EARLIEST".parse::<OffsetReset>(), Ok(OffsetReset::Earliest));
        assert!("newest".parse::<OffsetReset>().is_err());
    }
}
