//! Publisher seam between the output plugin and the message bus.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to connect to {url}: {message}")]
    Connect { url: String, message: String },
    #[error("failed to publish on {subject}: {message}")]
    Publish { subject: String, message: String },
    #[error("failed to flush outbound messages: {0}")]
    Flush(String),
}

pub type BusResult<T> = Result<T, BusError>;

/// An open connection that can publish messages.
#[async_trait]
pub trait BusPublisher: Send + Sync {
    async fn publish(&self, subject: &str, payload: Bytes) -> BusResult<()>;

    /// Wait until everything published so far has been written to the server.
    async fn flush(&self) -> BusResult<()>;
}

/// Opens connections to a bus endpoint.
#[async_trait]
pub trait BusConnector: Send + Sync {
    async fn connect(&self, url: &str) -> BusResult<Box<dyn BusPublisher>>;
}

/// A message captured by [`MemoryBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub payload: Bytes,
}

/// In-process bus for tests and headless runs; records every publish.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    messages: Arc<Mutex<Vec<Message>>>,
    connections: Arc<Mutex<Vec<String>>>,
    flushes: Arc<AtomicUsize>,
    unreachable: bool,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus whose every connection attempt is refused.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.messages).clone()
    }

    pub fn messages_on(&self, subject: &str) -> Vec<Message> {
        lock(&self.messages)
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    /// Number of completed `flush` calls across all connections.
    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// URLs of every connection attempt, in order.
    pub fn connection_attempts(&self) -> Vec<String> {
        lock(&self.connections).clone()
    }
}

#[async_trait]
impl BusConnector for MemoryBus {
    async fn connect(&self, url: &str) -> BusResult<Box<dyn BusPublisher>> {
        lock(&self.connections).push(url.to_string());
        if self.unreachable {
            return Err(BusError::Connect {
                url: url.to_string(),
                message: "connection refused".into(),
            });
        }
        Ok(Box::new(MemoryPublisher {
            messages: Arc::clone(&self.messages),
            flushes: Arc::clone(&self.flushes),
        }))
    }
}

struct MemoryPublisher {
    messages: Arc<Mutex<Vec<Message>>>,
    flushes: Arc<AtomicUsize>,
}

#[async_trait]
impl BusPublisher for MemoryPublisher {
    async fn publish(&self, subject: &str, payload: Bytes) -> BusResult<()> {
        lock(&self.messages).push(Message {
            subject: subject.to_string(),
            payload,
        });
        Ok(())
    }

    async fn flush(&self) -> BusResult<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// A panicking test thread must not hide what was recorded before it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
