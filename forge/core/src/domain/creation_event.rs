// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent Creation Event
//!
//! The canonical unit of work of the forge pipeline. Both ingress modes (CLI
//! flags and queue messages) normalize their input into this one shape before
//! handing it to the pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Prefix of every agent image tag (`custom-agent-<agentId>`)
pub const AGENT_IMAGE_PREFIX: &str = "custom-agent-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCreationEvent {
    /// Plugin identifiers, in the order they are wired into the generated agent
    pub plugins: Vec<String>,

    /// Character configuration file. Read and copied, never modified.
    pub character: PathBuf,

    /// Caller-supplied identifier. Names the output directory, package and image tag.
    pub agent_id: String,

    /// Registry host. When absent the image is built but not pushed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_registry: Option<String>,
}

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("Malformed creation event payload: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

impl AgentCreationEvent {
    pub fn new(
        plugins: Vec<String>,
        character: impl Into<PathBuf>,
        agent_id: impl Into<String>,
        docker_registry: Option<String>,
    ) -> Self {
        Self {
            plugins,
            character: character.into(),
            agent_id: agent_id.into(),
            docker_registry,
        }
    }

    /// Parse a queue message body
    pub fn from_json_slice(payload: &[u8]) -> Result<Self, EventParseError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Build an event from interactive command-line values.
    /// `plugins` is the raw comma-separated `--plugins` value.
    pub fn from_cli(
        plugins: &str,
        character: impl Into<PathBuf>,
        agent_id: impl Into<String>,
        registry: Option<String>,
    ) -> Self {
        let registry = registry.filter(|r| !r.trim().is_empty());
        Self::new(parse_plugin_list(plugins), character, agent_id, registry)
    }

    /// Local image name for this agent
    pub fn image_name(&self) -> String {
        agent_image_name(&self.agent_id)
    }
}

pub fn agent_image_name(agent_id: &str) -> String {
    format!("{}{}", AGENT_IMAGE_PREFIX, agent_id)
}

/// Split a comma-separated plugin list, trimming whitespace and dropping empty entries
pub fn parse_plugin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
