// Rust guideline compliant 2026-10-19

//! Kafka adapters for the `domain` broker ports.
//!
//! Each sub-module implements one port on top of `rdkafka`. Error translation
//! into the domain taxonomy lives in [`kafka_error`].

pub mod kafka_admin;
pub mod kafka_error;
pub mod kafka_sink;
pub mod kafka_source;
pub mod kafka_transport;
