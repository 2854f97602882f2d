// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use thiserror::Error;

/// One delivery from the broker. `payload` is the raw message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum MessageSourceError {
    #[error("Failed to connect to broker at {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("Broker read failed: {0}")]
    Read(String),
    #[error("Failed to acknowledge message {id}: {reason}")]
    Acknowledge { id: String, reason: String },
}

/// At-least-once message delivery from a topic, as a member of a consumer group.
///
/// A message read but never acknowledged is delivered again to the same
/// consumer after it reconnects. Callers acknowledge once handling is finished.
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message. `Ok(None)` means nothing arrived within the
    /// source's wait window; callers simply poll again.
    async fn next_message(&mut self) -> Result<Option<QueueMessage>, MessageSourceError>;

    async fn acknowledge(&mut self, message: &QueueMessage) -> Result<(), MessageSourceError>;
}
