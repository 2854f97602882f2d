// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::Ingress;
use crate::application::pipeline::{EventDispatcher, PipelineError, PipelineReport};
use crate::domain::creation_event::AgentCreationEvent;

/// Dispatches exactly one event built from command-line flags
pub struct InteractiveIngress {
    event: AgentCreationEvent,
}

impl InteractiveIngress {
    pub fn new(event: AgentCreationEvent) -> Self {
        Self { event }
    }

    pub fn event(&self) -> &AgentCreationEvent {
        &self.event
    }

    pub async fn dispatch_once(
        self,
        dispatcher: &dyn EventDispatcher,
    ) -> Result<PipelineReport, PipelineError> {
        info!(agent_id = %self.event.agent_id, "Dispatching agent creation request");
        dispatcher.dispatch(self.event).await
    }
}

#[async_trait]
impl Ingress for InteractiveIngress {
    fn name(&self) -> &'static str {
        "interactive"
    }

    async fn run(self: Box<Self>, dispatcher: Arc<dyn EventDispatcher>) -> anyhow::Result<()> {
        self.dispatch_once(dispatcher.as_ref()).await?;
        Ok(())
    }
}
