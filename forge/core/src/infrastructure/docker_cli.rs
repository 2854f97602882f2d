// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Docker CLI toolchain
//!
//! Drives the container toolchain as an external process. Each call is one
//! command run to completion; its exit status is the only signal consulted.
//! Build output is streamed to the worker's own stdout/stderr.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::domain::build::{ContainerToolchain, ToolchainError};

pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command_line(&self, args: &[&str]) -> String {
        std::iter::once(self.binary.as_str())
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run(&self, args: &[&str], quiet: bool) -> Result<(), ToolchainError> {
        let command = self.command_line(args);
        debug!("Running: {}", command);

        let mut cmd = Command::new(&self.binary);
        cmd.args(args).stdin(Stdio::null());
        if quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = cmd
            .status()
            .await
            .map_err(|source| ToolchainError::Launch {
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ToolchainError::NonZeroExit {
                command,
                status: status.to_string(),
            });
        }

        Ok(())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl ContainerToolchain for DockerCli {
    async fn probe(&self) -> Result<(), ToolchainError> {
        self.run(&["info"], true).await
    }

    async fn build(&self, context_dir: &Path, tag: &str) -> Result<(), ToolchainError> {
        let context = context_dir.to_string_lossy();
        self.run(&["build", "-t", tag, context.as_ref()], false).await
    }

    async fn tag(&self, source: &str, target: &str) -> Result<(), ToolchainError> {
        self.run(&["tag", source, target], false).await
    }

    async fn push(&self, image: &str) -> Result<(), ToolchainError> {
        self.run(&["push", image], false).await
    }

    fn describe_build(&self, context_dir: &Path, tag: &str) -> String {
        let context = context_dir.to_string_lossy();
        self.command_line(&["build", "-t", tag, context.as_ref()])
    }

    fn describe_tag(&self, source: &str, target: &str) -> String {
        self.command_line(&["tag", source, target])
    }

    fn describe_push(&self, image: &str) -> String {
        self.command_line(&["push", image])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_descriptions() {
        let docker = DockerCli::default();

        assert_eq!(
            docker.describe_build(Path::new("/srv/builds/a1"), "custom-agent-a1"),
            "docker build -t custom-agent-a1 /srv/builds/a1"
        );
        assert_eq!(
            docker.describe_tag("custom-agent-a1", "registry.local/custom-agent-a1"),
            "docker tag custom-agent-a1 registry.local/custom-agent-a1"
        );
        assert_eq!(
            docker.describe_push("registry.local/custom-agent-a1"),
            "docker push registry.local/custom-agent-a1"
        );
    }

    #[tokio::test]
    async fn test_missing_binary_fails_probe() {
        let docker = DockerCli::new("aegis-forge-no-such-container-cli");
        let err = docker.probe().await.unwrap_err();
        assert!(matches!(err, ToolchainError::Launch { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_is_the_signal() {
        // `true`/`false` ignore their arguments, which makes them stand-ins for a toolchain
        assert!(DockerCli::new("true").probe().await.is_ok());

        let err = DockerCli::new("false").push("img").await.unwrap_err();
        assert!(matches!(err, ToolchainError::NonZeroExit { .. }));
    }
}
