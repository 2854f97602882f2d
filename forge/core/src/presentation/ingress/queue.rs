// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Queue ingress
//!
//! Long-running consumer: pulls one message at a time, parses it into an
//! [`AgentCreationEvent`] and dispatches it before pulling the next. Runs are
//! never overlapped within a process.
//!
//! Every message is acknowledged once handled, whatever the result. Malformed
//! payloads and failed runs are logged and dropped; nothing is retried or
//! dead-lettered.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::Ingress;
use crate::application::pipeline::{EventDispatcher, PipelineReport};
use crate::domain::creation_event::AgentCreationEvent;
use crate::domain::message_source::{MessageSource, MessageSourceError, QueueMessage};

/// Pause after a broker read error before polling again
pub const READ_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// What happened to one poll of the source
#[derive(Debug)]
pub enum MessageDisposition {
    /// Nothing arrived within the source's wait window
    Idle,
    Dispatched(PipelineReport),
    Malformed { id: String, reason: String },
    Failed { id: String, reason: String },
}

pub struct QueueIngress<S: MessageSource> {
    source: S,
    read_error_backoff: Duration,
}

impl<S: MessageSource> QueueIngress<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            read_error_backoff: READ_ERROR_BACKOFF,
        }
    }

    pub fn with_read_error_backoff(mut self, backoff: Duration) -> Self {
        self.read_error_backoff = backoff;
        self
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Pull and handle at most one message
    pub async fn poll_once(
        &mut self,
        dispatcher: &dyn EventDispatcher,
    ) -> Result<MessageDisposition, MessageSourceError> {
        let Some(message) = self.source.next_message().await? else {
            return Ok(MessageDisposition::Idle);
        };

        let disposition = match AgentCreationEvent::from_json_slice(&message.payload) {
            Err(e) => {
                warn!(
                    message_id = %message.id,
                    payload = %String::from_utf8_lossy(&message.payload),
                    "Dropping malformed agent creation message: {}",
                    e
                );
                MessageDisposition::Malformed {
                    id: message.id.clone(),
                    reason: e.to_string(),
                }
            }
            Ok(event) => {
                debug!(message_id = %message.id, agent_id = %event.agent_id, "Received agent creation message");
                match dispatcher.dispatch(event).await {
                    Ok(report) => MessageDisposition::Dispatched(report),
                    Err(e) => {
                        error!(message_id = %message.id, "Dropping message after failed run: {}", e);
                        MessageDisposition::Failed {
                            id: message.id.clone(),
                            reason: e.to_string(),
                        }
                    }
                }
            }
        };

        self.acknowledge(&message).await;
        Ok(disposition)
    }

    async fn acknowledge(&mut self, message: &QueueMessage) {
        // The run already happened; an unacknowledged message is redelivered later
        if let Err(e) = self.source.acknowledge(message).await {
            warn!("{}", e);
        }
    }
}

#[async_trait]
impl<S: MessageSource + 'static> Ingress for QueueIngress<S> {
    fn name(&self) -> &'static str {
        "queue"
    }

    async fn run(self: Box<Self>, dispatcher: Arc<dyn EventDispatcher>) -> anyhow::Result<()> {
        let mut ingress = *self;
        info!("Queue consumer started");
        loop {
            match ingress.poll_once(dispatcher.as_ref()).await {
                Ok(MessageDisposition::Idle) => {}
                Ok(disposition) => debug!(?disposition, "Message handled"),
                Err(e) => {
                    error!("{}", e);
                    tokio::time::sleep(ingress.read_error_backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline::PipelineError;
    use crate::domain::build::{BuildOutcome, BuildStage};
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemorySource {
        queue: VecDeque<Result<QueueMessage, MessageSourceError>>,
        acked: Vec<String>,
    }

    impl InMemorySource {
        fn push(&mut self, id: &str, payload: &str) {
            self.queue.push_back(Ok(QueueMessage {
                id: id.to_string(),
                payload: payload.as_bytes().to_vec(),
            }));
        }
    }

    #[async_trait]
    impl MessageSource for InMemorySource {
        async fn next_message(&mut self) -> Result<Option<QueueMessage>, MessageSourceError> {
            self.queue.pop_front().transpose()
        }

        async fn acknowledge(&mut self, message: &QueueMessage) -> Result<(), MessageSourceError> {
            self.acked.push(message.id.clone());
            Ok(())
        }
    }

    /// Fails every run whose agent id starts with "bad"
    #[derive(Default)]
    struct StubDispatcher {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventDispatcher for StubDispatcher {
        async fn dispatch(
            &self,
            event: AgentCreationEvent,
        ) -> Result<PipelineReport, PipelineError> {
            self.seen.lock().unwrap().push(event.agent_id.clone());
            if event.agent_id.starts_with("bad") {
                return Err(PipelineError::Build {
                    agent_id: event.agent_id,
                    stage: BuildStage::AgentImage,
                    reason: "exit status: 1".to_string(),
                });
            }
            Ok(PipelineReport {
                run_id: Default::default(),
                agent_id: event.agent_id.clone(),
                output_dir: PathBuf::from("builds").join(&event.agent_id),
                outcome: BuildOutcome::BuiltOnly {
                    image: event.image_name(),
                },
            })
        }
    }

    #[tokio::test]
    async fn test_malformed_message_does_not_block_next() {
        let mut source = InMemorySource::default();
        source.push("1-0", "{not json");
        source.push("2-0", r#"{"plugins":["alpha"],"character":"c.json","agentId":"a1"}"#);
        let dispatcher = StubDispatcher::default();
        let mut ingress = QueueIngress::new(source);

        let first = ingress.poll_once(&dispatcher).await.unwrap();
        assert!(matches!(first, MessageDisposition::Malformed { ref id, .. } if id == "1-0"));

        let second = ingress.poll_once(&dispatcher).await.unwrap();
        match second {
            MessageDisposition::Dispatched(report) => assert_eq!(report.agent_id, "a1"),
            other => panic!("unexpected disposition: {:?}", other),
        }

        assert_eq!(*dispatcher.seen.lock().unwrap(), vec!["a1"]);
        assert_eq!(ingress.into_source().acked, vec!["1-0", "2-0"]);
    }

    #[tokio::test]
    async fn test_failed_run_is_acknowledged_and_dropped() {
        let mut source = InMemorySource::default();
        source.push("1-0", r#"{"plugins":[],"character":"c.json","agentId":"bad-1"}"#);
        source.push("2-0", r#"{"plugins":[],"character":"c.json","agentId":"good"}"#);
        let dispatcher = StubDispatcher::default();
        let mut ingress = QueueIngress::new(source);

        let first = ingress.poll_once(&dispatcher).await.unwrap();
        assert!(matches!(first, MessageDisposition::Failed { .. }));
        let second = ingress.poll_once(&dispatcher).await.unwrap();
        assert!(matches!(second, MessageDisposition::Dispatched(_)));

        assert_eq!(ingress.into_source().acked, vec!["1-0", "2-0"]);
    }

    #[tokio::test]
    async fn test_missing_required_field_is_malformed() {
        let mut source = InMemorySource::default();
        source.push("1-0", r#"{"plugins":["alpha"],"character":"c.json"}"#);
        let dispatcher = StubDispatcher::default();
        let mut ingress = QueueIngress::new(source);

        let disposition = ingress.poll_once(&dispatcher).await.unwrap();
        assert!(matches!(disposition, MessageDisposition::Malformed { .. }));
        assert!(dispatcher.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_idle_and_read_errors() {
        let mut source = InMemorySource::default();
        source
            .queue
            .push_back(Err(MessageSourceError::Read("connection reset".to_string())));
        let dispatcher = StubDispatcher::default();
        let mut ingress = QueueIngress::new(source);

        assert!(matches!(
            ingress.poll_once(&dispatcher).await,
            Err(MessageSourceError::Read(_))
        ));
        assert!(matches!(
            ingress.poll_once(&dispatcher).await,
            Ok(MessageDisposition::Idle)
        ));
    }
}
