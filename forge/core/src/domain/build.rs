// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Step of the container protocol that an invocation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    Probe,
    BaseImage,
    AgentImage,
    Tag,
    Push,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::Probe => "probe",
            BuildStage::BaseImage => "base image build",
            BuildStage::AgentImage => "agent image build",
            BuildStage::Tag => "tag",
            BuildStage::Push => "push",
        };
        f.write_str(name)
    }
}

/// Result of driving the container toolchain for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BuildOutcome {
    /// Toolchain not operable. Generated sources are left on disk together with
    /// the commands an operator would run by hand.
    Unavailable { manual_commands: Vec<String> },
    BuiltOnly { image: String },
    BuiltAndPushed { image: String, remote_image: String },
    Failed { stage: BuildStage, reason: String },
}

impl BuildOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, BuildOutcome::Failed { .. })
    }
}

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("Failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}")]
    NonZeroExit { command: String, status: String },
}

/// External container build toolchain. Only exit status is consulted.
#[async_trait]
pub trait ContainerToolchain: Send + Sync {
    /// Lightweight operability check (daemon reachable, binary present)
    async fn probe(&self) -> Result<(), ToolchainError>;
    async fn build(&self, context_dir: &Path, tag: &str) -> Result<(), ToolchainError>;
    async fn tag(&self, source: &str, target: &str) -> Result<(), ToolchainError>;
    async fn push(&self, image: &str) -> Result<(), ToolchainError>;

    /// Command lines equivalent to the calls above, for manual recovery instructions
    fn describe_build(&self, context_dir: &Path, tag: &str) -> String;
    fn describe_tag(&self, source: &str, target: &str) -> String;
    fn describe_push(&self, image: &str) -> String;
}
