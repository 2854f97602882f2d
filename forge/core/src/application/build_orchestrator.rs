// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Build Orchestrator
//!
//! Drives the container toolchain through probe → base image → agent image →
//! tag → push for one generated agent.
//!
//! An inoperable toolchain is an expected condition (local development without
//! a build daemon) and yields [`BuildOutcome::Unavailable`] with the commands to
//! run by hand. Once the probe succeeds every later failure is reported as
//! [`BuildOutcome::Failed`]. Steps run sequentially and are attempted once.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::build::{BuildOutcome, BuildStage, ContainerToolchain, ToolchainError};
use crate::domain::creation_event::agent_image_name;
use crate::domain::forge_config::ForgeConfigSpec;

#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Build context of the shared base image
    pub repository_root: PathBuf,
    pub base_image: String,
}

impl From<&ForgeConfigSpec> for BuildSettings {
    fn from(spec: &ForgeConfigSpec) -> Self {
        Self {
            repository_root: spec.repository_root.clone(),
            base_image: spec.toolchain.base_image.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub output_dir: &'a Path,
    pub agent_id: &'a str,
    pub registry: Option<&'a str>,
}

impl BuildRequest<'_> {
    pub fn image_name(&self) -> String {
        agent_image_name(self.agent_id)
    }

    /// `<registry>/<image>` when a registry was requested
    pub fn remote_image_name(&self) -> Option<String> {
        self.registry
            .map(|registry| format!("{}/{}", registry.trim_end_matches('/'), self.image_name()))
    }
}

pub struct BuildOrchestrator {
    toolchain: Arc<dyn ContainerToolchain>,
    settings: BuildSettings,
}

impl BuildOrchestrator {
    pub fn new(toolchain: Arc<dyn ContainerToolchain>, settings: BuildSettings) -> Self {
        Self { toolchain, settings }
    }

    pub async fn run(&self, request: BuildRequest<'_>) -> BuildOutcome {
        // Step 1: probe
        if let Err(e) = self.toolchain.probe().await {
            let manual_commands = self.manual_commands(&request);
            warn!(
                agent_id = request.agent_id,
                "Container toolchain unavailable ({}). Sources are ready at {}; build manually with:",
                e,
                request.output_dir.display()
            );
            for command in &manual_commands {
                warn!("  {}", command);
            }
            return BuildOutcome::Unavailable { manual_commands };
        }

        // Step 2: shared base image, rebuilt every time
        info!("Building base image {}", self.settings.base_image);
        if let Err(e) = self
            .toolchain
            .build(&self.settings.repository_root, &self.settings.base_image)
            .await
        {
            return failed(BuildStage::BaseImage, e);
        }

        // Step 3: agent image
        let image = request.image_name();
        info!("Building agent image {}", image);
        if let Err(e) = self.toolchain.build(request.output_dir, &image).await {
            return failed(BuildStage::AgentImage, e);
        }

        // Step 4: tag + push
        let Some(remote_image) = request.remote_image_name() else {
            info!("Built image {} (no registry requested, skipping push)", image);
            return BuildOutcome::BuiltOnly { image };
        };

        if let Err(e) = self.toolchain.tag(&image, &remote_image).await {
            return failed(BuildStage::Tag, e);
        }

        info!("Pushing {}", remote_image);
        if let Err(e) = self.toolchain.push(&remote_image).await {
            return failed(BuildStage::Push, e);
        }

        info!("Built and pushed {}", remote_image);
        BuildOutcome::BuiltAndPushed {
            image,
            remote_image,
        }
    }

    /// Commands that reproduce the protocol by hand
    pub fn manual_commands(&self, request: &BuildRequest<'_>) -> Vec<String> {
        let image = request.image_name();
        let mut commands = vec![
            self.toolchain
                .describe_build(&self.settings.repository_root, &self.settings.base_image),
            self.toolchain.describe_build(request.output_dir, &image),
        ];

        if let Some(remote_image) = request.remote_image_name() {
            commands.push(self.toolchain.describe_tag(&image, &remote_image));
            commands.push(self.toolchain.describe_push(&remote_image));
        }

        commands
    }
}

fn failed(stage: BuildStage, error: ToolchainError) -> BuildOutcome {
    warn!("Container {} failed: {}", stage, error);
    BuildOutcome::Failed {
        stage,
        reason: error.to_string(),
    }
}
