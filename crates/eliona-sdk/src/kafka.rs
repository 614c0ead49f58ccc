// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Kafka producer and consumer with JSON payloads.

use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::RDKafkaErrorCode;
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::common::getenv;
use crate::error::KafkaError;
use crate::tasks::shutdown_signal;

const DEFAULT_BROKERS: &str = "kafka:29092";
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Bootstrap servers from `BROKERS`; `|` separators become `,`.
///
/// An empty value means no bootstrap servers are configured.
pub fn brokers() -> String {
    let brokers = getenv("BROKERS", DEFAULT_BROKERS).replace('|', ",");
    if brokers.is_empty() {
        debug!("Explicitly no bootstrap servers defined");
    } else {
        debug!(brokers = %brokers, "Bootstrap servers");
    }
    brokers
}

fn client_config(id_key: &str) -> ClientConfig {
    let mut config = ClientConfig::new();
    config.set(id_key, Uuid::new_v4().to_string());
    let brokers = brokers();
    if !brokers.is_empty() {
        config.set("bootstrap.servers", brokers);
    }
    config
}

/// Producer with a random `client.id`.
pub fn new_producer() -> Result<FutureProducer, KafkaError> {
    let producer = client_config("client.id").create()?;
    debug!("New producer created");
    Ok(producer)
}

/// Send `value` as JSON to `topic` and wait for delivery.
pub async fn produce<T: Serialize + ?Sized>(
    producer: &FutureProducer,
    topic: &str,
    value: &T,
) -> Result<(), KafkaError> {
    let payload = serde_json::to_vec(value)?;
    let record = FutureRecord::<(), _>::to(topic).payload(&payload);

    match producer.send(record, Timeout::After(DELIVERY_TIMEOUT)).await {
        Ok(delivery) => {
            debug!(topic, ?delivery, "Delivered message");
            Ok(())
        }
        Err((e, _)) => {
            error!(error = %e, topic, "Failed to deliver message");
            Err(e.into())
        }
    }
}

/// Consumer in a fresh consumer group with a random `group.id`.
pub fn new_consumer() -> Result<StreamConsumer, KafkaError> {
    let consumer = client_config("group.id").create()?;
    debug!("New consumer created");
    Ok(consumer)
}

pub fn subscribe(consumer: &StreamConsumer, topic: &str) -> Result<(), KafkaError> {
    consumer.subscribe(&[topic])?;
    Ok(())
}

/// Decode every message received by `consumer` as JSON and send it to
/// `values`.
///
/// Stops on SIGINT or SIGTERM, when all brokers are down, or when the
/// receiver is dropped. Messages that do not decode are logged and skipped.
pub async fn read<T>(consumer: &StreamConsumer, values: mpsc::Sender<T>)
where
    T: DeserializeOwned + Send,
{
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let received = tokio::select! {
            _ = &mut shutdown => {
                debug!("Caught signal, terminating");
                break;
            }
            _ = values.closed() => {
                debug!("Value receiver dropped, terminating");
                break;
            }
            received = consumer.recv() => received,
        };

        // messages are borrowed from the consumer and must not be held over
        // an await point
        let value = match received {
            Ok(message) => decode::<T>(&message),
            Err(e) => {
                error!(error = %e, "Consumer error");
                if e.rdkafka_error_code() == Some(RDKafkaErrorCode::AllBrokersDown) {
                    break;
                }
                None
            }
        };

        if let Some(value) = value {
            if values.send(value).await.is_err() {
                break;
            }
        }
    }
}

fn decode<T: DeserializeOwned>(message: &BorrowedMessage<'_>) -> Option<T> {
    let payload = message.payload().unwrap_or_default();
    debug!(topic = message.topic(), partition = message.partition(), "Message received");
    match serde_json::from_slice(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(
                error = %e,
                payload = %String::from_utf8_lossy(payload),
                "Unmarshal error"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_brokers() {
        let _lock = ENV_MUTEX.lock().unwrap();

        // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
        unsafe { env::remove_var("BROKERS") };
        assert_eq!(brokers(), "kafka:29092");

        // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
        unsafe { env::set_var("BROKERS", "a:1|b:2") };
        assert_eq!(brokers(), "a:1,b:2");

        // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
        unsafe { env::set_var("BROKERS", "") };
        assert_eq!(brokers(), "");
        assert!(client_config("group.id").get("bootstrap.servers").is_none());

        // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
        unsafe { env::remove_var("BROKERS") };
    }
}
