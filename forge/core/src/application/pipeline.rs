// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent Creation Pipeline
//!
//! The single downstream entry point shared by every ingress mode:
//! generate the agent sources, then drive the container build.
//!
//! # Flow
//!
//! 1. Serialize on the agent id (one run per id at a time in this process)
//! 2. AgentGenerator → output directory
//! 3. BuildOrchestrator → BuildOutcome
//! 4. Publish PipelineEvents and map `BuildOutcome::Failed` to an error
//!
//! # Error Handling
//!
//! - `PipelineError::Generation`: filesystem/template failure, nothing was built
//! - `PipelineError::Build`: the toolchain was engaged and a step failed
//!
//! An unavailable toolchain is not an error: the report carries
//! `BuildOutcome::Unavailable` and the generated sources stay on disk.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, info_span, Instrument};

use crate::application::agent_generator::{
    AgentGenerator, GenerationRequest, GeneratorError, GeneratorSettings,
};
use crate::application::build_orchestrator::{BuildOrchestrator, BuildRequest, BuildSettings};
use crate::domain::build::{BuildOutcome, BuildStage, ContainerToolchain};
use crate::domain::creation_event::AgentCreationEvent;
use crate::domain::events::{PipelineEvent, RunId};
use crate::domain::forge_config::ForgeConfigSpec;
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Agent generation failed for '{agent_id}': {source}")]
    Generation {
        agent_id: String,
        #[source]
        source: GeneratorError,
    },

    #[error("Container {stage} failed for '{agent_id}': {reason}")]
    Build {
        agent_id: String,
        stage: BuildStage,
        reason: String,
    },
}

/// Result of one successful pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub agent_id: String,
    pub output_dir: PathBuf,
    /// Never `BuildOutcome::Failed`; failures are returned as `PipelineError::Build`
    pub outcome: BuildOutcome,
}

/// Capability shared by all ingress modes
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, event: AgentCreationEvent) -> Result<PipelineReport, PipelineError>;
}

pub struct AgentCreationPipeline {
    generator: AgentGenerator,
    orchestrator: BuildOrchestrator,
    event_bus: EventBus,
    agent_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AgentCreationPipeline {
    pub fn new(generator: AgentGenerator, orchestrator: BuildOrchestrator, event_bus: EventBus) -> Self {
        Self {
            generator,
            orchestrator,
            event_bus,
            agent_locks: DashMap::new(),
        }
    }

    pub fn from_config(
        spec: &ForgeConfigSpec,
        toolchain: Arc<dyn ContainerToolchain>,
        event_bus: EventBus,
    ) -> Self {
        Self::new(
            AgentGenerator::new(GeneratorSettings::from(spec)),
            BuildOrchestrator::new(toolchain, BuildSettings::from(spec)),
            event_bus,
        )
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    async fn run(&self, run_id: RunId, event: &AgentCreationEvent) -> Result<PipelineReport, PipelineError> {
        let agent_id = event.agent_id.clone();

        self.event_bus.publish(PipelineEvent::GenerationStarted {
            run_id,
            agent_id: agent_id.clone(),
            plugins: event.plugins.clone(),
            started_at: Utc::now(),
        });

        let generated = self
            .generator
            .generate(&GenerationRequest {
                plugins: &event.plugins,
                character: &event.character,
                output_dir: &event.agent_id,
            })
            .map_err(|source| PipelineError::Generation {
                agent_id: agent_id.clone(),
                source,
            })?;

        self.event_bus.publish(PipelineEvent::AgentGenerated {
            run_id,
            agent_id: agent_id.clone(),
            output_dir: generated.output_dir.clone(),
            character_copied: generated.character.is_some(),
            generated_at: Utc::now(),
        });

        let outcome = self
            .orchestrator
            .run(BuildRequest {
                output_dir: &generated.output_dir,
                agent_id: &event.agent_id,
                registry: event.docker_registry.as_deref(),
            })
            .await;

        match &outcome {
            BuildOutcome::Unavailable { manual_commands } => {
                self.event_bus.publish(PipelineEvent::ToolchainUnavailable {
                    run_id,
                    agent_id: agent_id.clone(),
                    manual_commands: manual_commands.clone(),
                    detected_at: Utc::now(),
                });
            }
            BuildOutcome::BuiltOnly { image } => {
                self.publish_built(run_id, &agent_id, image);
            }
            BuildOutcome::BuiltAndPushed { image, remote_image } => {
                self.publish_built(run_id, &agent_id, image);
                self.event_bus.publish(PipelineEvent::ImagePushed {
                    run_id,
                    agent_id: agent_id.clone(),
                    remote_image: remote_image.clone(),
                    pushed_at: Utc::now(),
                });
            }
            BuildOutcome::Failed { stage, reason } => {
                return Err(PipelineError::Build {
                    agent_id,
                    stage: *stage,
                    reason: reason.clone(),
                });
            }
        }

        Ok(PipelineReport {
            run_id,
            agent_id,
            output_dir: generated.output_dir,
            outcome,
        })
    }

    fn publish_built(&self, run_id: RunId, agent_id: &str, image: &str) {
        self.event_bus.publish(PipelineEvent::ImageBuilt {
            run_id,
            agent_id: agent_id.to_string(),
            image: image.to_string(),
            built_at: Utc::now(),
        });
    }
}

#[async_trait]
impl EventDispatcher for AgentCreationPipeline {
    async fn dispatch(&self, event: AgentCreationEvent) -> Result<PipelineReport, PipelineError> {
        let run_id = RunId::new();
        let span = info_span!("pipeline", %run_id, agent_id = %event.agent_id);

        async {
            let lock = self
                .agent_locks
                .entry(event.agent_id.clone())
                .or_default()
                .clone();
            let guard = lock.lock().await;

            info!(
                plugins = ?event.plugins,
                character = %event.character.display(),
                registry = ?event.docker_registry,
                "Processing agent creation event"
            );

            let result = self.run(run_id, &event).await;

            drop(guard);
            drop(lock);
            self.agent_locks
                .remove_if(&event.agent_id, |_, lock| Arc::strong_count(lock) == 1);

            match &result {
                Ok(report) => {
                    info!(outcome = ?report.outcome, "Agent creation pipeline completed");
                    self.event_bus.publish(PipelineEvent::PipelineCompleted {
                        run_id,
                        agent_id: event.agent_id.clone(),
                        completed_at: Utc::now(),
                    });
                }
                Err(e) => {
                    error!(
                        plugins = ?event.plugins,
                        character = %event.character.display(),
                        registry = ?event.docker_registry,
                        "Agent creation pipeline failed: {}",
                        e
                    );
                    let stage = match e {
                        PipelineError::Build { stage, .. } => Some(*stage),
                        PipelineError::Generation { .. } => None,
                    };
                    self.event_bus.publish(PipelineEvent::PipelineFailed {
                        run_id,
                        agent_id: event.agent_id.clone(),
                        stage,
                        reason: e.to_string(),
                        failed_at: Utc::now(),
                    });
                }
            }

            result
        }
        .instrument(span)
        .await
    }
}
