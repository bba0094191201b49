//! NATS transport for the vbus.

use crate::bus::{BusConnector, BusError, BusPublisher, BusResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use vbus_core::Config;

/// Connects to a NATS server with `async-nats`.
#[derive(Debug, Clone)]
pub struct NatsConnector {
    client_name: String,
    connect_timeout: Duration,
}

impl NatsConnector {
    pub fn new(client_name: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            client_name: client_name.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.element.name.clone(),
            Duration::from_secs(config.bus.connect_timeout_secs),
        )
    }
}

#[async_trait]
impl BusConnector for NatsConnector {
    async fn connect(&self, url: &str) -> BusResult<Box<dyn BusPublisher>> {
        let client = async_nats::ConnectOptions::new()
            .name(&self.client_name)
            .connection_timeout(self.connect_timeout)
            .connect(url)
            .await
            .map_err(|e| BusError::Connect {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(url, client = %self.client_name, "nats connection established");
        Ok(Box::new(NatsPublisher { client }))
    }
}

/// Publishes over an open `async_nats::Client`.
pub struct NatsPublisher {
    client: async_nats::Client,
}

#[async_trait]
impl BusPublisher for NatsPublisher {
    async fn publish(&self, subject: &str, payload: Bytes) -> BusResult<()> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| BusError::Publish {
                subject: subject.to_string(),
                message: e.to_string(),
            })
    }

    async fn flush(&self) -> BusResult<()> {
        self.client
            .flush()
            .await
            .map_err(|e| BusError::Flush(e.to_string()))
    }
}
