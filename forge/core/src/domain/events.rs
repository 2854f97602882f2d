// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::build::BuildStage;

/// Identifies a single pipeline run (one creation event, start to finish)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    GenerationStarted {
        run_id: RunId,
        agent_id: String,
        plugins: Vec<String>,
        started_at: DateTime<Utc>,
    },
    AgentGenerated {
        run_id: RunId,
        agent_id: String,
        output_dir: PathBuf,
        character_copied: bool,
        generated_at: DateTime<Utc>,
    },
    ToolchainUnavailable {
        run_id: RunId,
        agent_id: String,
        manual_commands: Vec<String>,
        detected_at: DateTime<Utc>,
    },
    ImageBuilt {
        run_id: RunId,
        agent_id: String,
        image: String,
        built_at: DateTime<Utc>,
    },
    ImagePushed {
        run_id: RunId,
        agent_id: String,
        remote_image: String,
        pushed_at: DateTime<Utc>,
    },
    PipelineCompleted {
        run_id: RunId,
        agent_id: String,
        completed_at: DateTime<Utc>,
    },
    PipelineFailed {
        run_id: RunId,
        agent_id: String,
        stage: Option<BuildStage>,
        reason: String,
        failed_at: DateTime<Utc>,
    },
}

impl PipelineEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            PipelineEvent::GenerationStarted { run_id, .. }
            | PipelineEvent::AgentGenerated { run_id, .. }
            | PipelineEvent::ToolchainUnavailable { run_id, .. }
            | PipelineEvent::ImageBuilt { run_id, .. }
            | PipelineEvent::ImagePushed { run_id, .. }
            | PipelineEvent::PipelineCompleted { run_id, .. }
            | PipelineEvent::PipelineFailed { run_id, .. } => *run_id,
        }
    }

    pub fn agent_id(&self) -> &str {
        match self {
            PipelineEvent::GenerationStarted { agent_id, .. }
            | PipelineEvent::AgentGenerated { agent_id, .. }
            | PipelineEvent::ToolchainUnavailable { agent_id, .. }
            | PipelineEvent::ImageBuilt { agent_id, .. }
            | PipelineEvent::ImagePushed { agent_id, .. }
            | PipelineEvent::PipelineCompleted { agent_id, .. }
            | PipelineEvent::PipelineFailed { agent_id, .. } => agent_id,
        }
    }

    /// Whether this event ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::PipelineCompleted { .. } | PipelineEvent::PipelineFailed { .. }
        )
    }
}
