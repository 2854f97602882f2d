// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Redis Streams message source
//!
//! Consumes agent creation events from a Redis stream (the topic) as a member
//! of a consumer group. The group is created on first connect.
//!
//! Delivery is at-least-once across restarts. The consumer name is stable
//! (configured, or the hostname), so a restarted worker finds the entries it
//! read but never acknowledged in its own pending entries list. Those are
//! replayed first, oldest to newest, before the source switches to reading
//! new entries with `>`.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, RedisResult};
use tracing::{debug, info};

use crate::domain::forge_config::BrokerConfig;
use crate::domain::message_source::{MessageSource, MessageSourceError, QueueMessage};

/// Stream entry field holding the JSON body
pub const PAYLOAD_FIELD: &str = "payload";

/// Start id that reads this consumer's pending entries from the beginning
const PENDING_FROM_START: &str = "0";

/// Start id that reads entries never delivered to any consumer of the group
const NEW_ENTRIES: &str = ">";

/// Group-scoped stream commands used by [`RedisStreamSource`]
#[async_trait]
pub trait StreamGroup: Send {
    /// `XREADGROUP ... COUNT 1 [BLOCK block_ms] STREAMS <topic> <start>`
    async fn read_group(
        &mut self,
        start: &str,
        block_ms: Option<u64>,
    ) -> RedisResult<Option<StreamReadReply>>;

    /// `XACK <topic> <group> <id>`
    async fn ack(&mut self, id: &str) -> RedisResult<()>;
}

/// A live connection bound to one topic, group and consumer name
pub struct GroupConnection {
    connection: MultiplexedConnection,
    topic: String,
    group: String,
    consumer: String,
}

#[async_trait]
impl StreamGroup for GroupConnection {
    async fn read_group(
        &mut self,
        start: &str,
        block_ms: Option<u64>,
    ) -> RedisResult<Option<StreamReadReply>> {
        let mut options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(1);
        if let Some(ms) = block_ms {
            options = options.block(ms as usize);
        }

        self.connection
            .xread_options(&[self.topic.as_str()], &[start], &options)
            .await
    }

    async fn ack(&mut self, id: &str) -> RedisResult<()> {
        let _: i64 = self.connection.xack(&self.topic, &self.group, &[id]).await?;
        Ok(())
    }
}

/// Where the next group read starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadCursor {
    /// Replaying this consumer's pending entries with ids after the given one
    Pending(String),
    /// Reading new entries
    New,
}

impl Default for ReadCursor {
    fn default() -> Self {
        ReadCursor::Pending(PENDING_FROM_START.to_string())
    }
}

pub struct RedisStreamSource<G = GroupConnection> {
    group: G,
    cursor: ReadCursor,
    block_ms: u64,
}

impl RedisStreamSource<GroupConnection> {
    pub async fn connect(config: &BrokerConfig) -> Result<Self, MessageSourceError> {
        let connect_error = |e: redis::RedisError| MessageSourceError::Connect {
            url: config.url.clone(),
            reason: e.to_string(),
        };

        let client = redis::Client::open(config.url.as_str()).map_err(connect_error)?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connect_error)?;

        let created: RedisResult<()> = connection
            .xgroup_create_mkstream(&config.topic, &config.group, "$")
            .await;
        match created {
            Ok(()) => info!(
                "Created consumer group '{}' on topic '{}'",
                config.group, config.topic
            ),
            Err(e) if e.code() == Some("BUSYGROUP") => {
                debug!("Consumer group '{}' already exists", config.group)
            }
            Err(e) => return Err(connect_error(e)),
        }

        let consumer = config.consumer_name();
        info!(
            topic = %config.topic,
            group = %config.group,
            consumer = %consumer,
            "Joined consumer group"
        );

        let group = GroupConnection {
            connection,
            topic: config.topic.clone(),
            group: config.group.clone(),
            consumer,
        };
        Ok(Self::new(group, config.block_ms))
    }
}

impl<G: StreamGroup> RedisStreamSource<G> {
    /// Starts by replaying pending entries
    pub fn new(group: G, block_ms: u64) -> Self {
        Self {
            group,
            cursor: ReadCursor::default(),
            block_ms,
        }
    }

    pub fn cursor(&self) -> &ReadCursor {
        &self.cursor
    }

    async fn read(
        &mut self,
        start: &str,
        block_ms: Option<u64>,
    ) -> Result<Option<QueueMessage>, MessageSourceError> {
        let reply = self
            .group
            .read_group(start, block_ms)
            .await
            .map_err(|e| MessageSourceError::Read(e.to_string()))?;
        Ok(reply.and_then(first_entry))
    }
}

/// First entry of a read reply, if any
pub fn first_entry(reply: StreamReadReply) -> Option<QueueMessage> {
    let entry = reply.keys.into_iter().flat_map(|key| key.ids).next()?;

    // An entry without a payload field is delivered as empty and rejected by the parser
    let payload = entry.get::<Vec<u8>>(PAYLOAD_FIELD).unwrap_or_default();

    Some(QueueMessage {
        id: entry.id,
        payload,
    })
}

#[async_trait]
impl<G: StreamGroup> MessageSource for RedisStreamSource<G> {
    async fn next_message(&mut self) -> Result<Option<QueueMessage>, MessageSourceError> {
        if let ReadCursor::Pending(after) = &self.cursor {
            let after = after.clone();
            match self.read(&after, None).await? {
                Some(message) => {
                    info!(id = %message.id, "Replaying unacknowledged message");
                    // Advance past the entry so a failed acknowledgement cannot replay it forever
                    self.cursor = ReadCursor::Pending(message.id.clone());
                    return Ok(Some(message));
                }
                None => {
                    debug!("Pending entries drained, reading new messages");
                    self.cursor = ReadCursor::New;
                }
            }
        }

        self.read(NEW_ENTRIES, Some(self.block_ms)).await
    }

    async fn acknowledge(&mut self, message: &QueueMessage) -> Result<(), MessageSourceError> {
        self.group
            .ack(&message.id)
            .await
            .map_err(|e| MessageSourceError::Acknowledge {
                id: message.id.clone(),
                reason: e.to_string(),
            })
    }
}
