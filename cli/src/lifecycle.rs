// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Process lifecycle
//!
//! Resolves the run mode, wires the pipeline to the matching ingress and races
//! it against termination signals. A signal ends the process cleanly without
//! draining the run in flight.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use aegis_forge_core::application::pipeline::{AgentCreationPipeline, EventDispatcher};
use aegis_forge_core::domain::creation_event::AgentCreationEvent;
use aegis_forge_core::domain::forge_config::ForgeConfigManifest;
use aegis_forge_core::infrastructure::docker_cli::DockerCli;
use aegis_forge_core::infrastructure::event_bus::EventBus;
use aegis_forge_core::infrastructure::redis_stream::RedisStreamSource;
use aegis_forge_core::presentation::ingress::{Ingress, InteractiveIngress, QueueIngress};

use crate::progress;

/// Run mode discriminator
pub const ENV_RUN_MODE: &str = "AEGIS_FORGE_ENV";

/// Discriminator value selecting interactive mode
pub const DEVELOPMENT: &str = "development";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One request from command-line flags, then exit
    Interactive,
    /// Consumer group worker on the broker
    Queue,
}

impl RunMode {
    /// `development` selects interactive mode; any other value (or none) selects queue mode
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case(DEVELOPMENT) => RunMode::Interactive,
            _ => RunMode::Queue,
        }
    }
}

/// Interactive-mode request flags
#[derive(Debug, Clone, Default, Args)]
pub struct RequestArgs {
    /// Comma-separated plugin identifiers
    #[arg(long, value_name = "LIST")]
    pub plugins: Option<String>,

    /// Path to the character definition file
    #[arg(long, value_name = "FILE")]
    pub character: Option<PathBuf>,

    /// Agent identifier (names the output directory and image)
    #[arg(long = "agentId", alias = "agent-id", value_name = "ID")]
    pub agent_id: Option<String>,

    /// Registry to tag and push the image to
    #[arg(long, value_name = "HOST")]
    pub registry: Option<String>,
}

impl RequestArgs {
    pub fn into_event(self) -> Result<AgentCreationEvent> {
        let plugins = self
            .plugins
            .context("--plugins is required in interactive mode")?;
        let character = self
            .character
            .context("--character is required in interactive mode")?;
        let agent_id = self
            .agent_id
            .filter(|id| !id.trim().is_empty())
            .context("--agentId is required in interactive mode")?;

        Ok(AgentCreationEvent::from_cli(
            &plugins,
            character,
            agent_id,
            self.registry,
        ))
    }
}

/// Single entry point for both modes
pub async fn run(mode: RunMode, config_path: Option<PathBuf>, request: RequestArgs) -> Result<()> {
    let config = ForgeConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    let spec = &config.spec;

    let event_bus = EventBus::with_default_capacity();
    let toolchain = Arc::new(DockerCli::new(spec.toolchain.binary.clone()));
    let pipeline: Arc<dyn EventDispatcher> = Arc::new(AgentCreationPipeline::from_config(
        spec,
        toolchain,
        event_bus.clone(),
    ));

    let (ingress, printer): (Box<dyn Ingress>, Option<JoinHandle<()>>) = match mode {
        RunMode::Interactive => {
            let event = request.into_event()?;
            let printer = tokio::spawn(progress::report(event_bus.subscribe()));
            (Box::new(InteractiveIngress::new(event)), Some(printer))
        }
        RunMode::Queue => {
            let source = RedisStreamSource::connect(&spec.broker)
                .await
                .context("Failed to join consumer group")?;
            (Box::new(QueueIngress::new(source)), None)
        }
    };

    // The pipeline holds the last publisher; the printer stops once it is dropped
    drop(event_bus);

    info!(mode = ingress.name(), worker = %config.metadata.name, "AEGIS forge started");

    let result = tokio::select! {
        result = ingress.run(pipeline) => result,
        _ = shutdown_signal() => {
            info!("Shutting down");
            Ok(())
        }
    };

    if let Some(printer) = printer {
        if let Err(e) = printer.await {
            warn!("Progress printer stopped abnormally: {}", e);
        }
    }

    result
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_mode_selection() {
        assert_eq!(RunMode::from_env_value(Some("development")), RunMode::Interactive);
        assert_eq!(RunMode::from_env_value(Some("Development ")), RunMode::Interactive);
        assert_eq!(RunMode::from_env_value(Some("production")), RunMode::Queue);
        assert_eq!(RunMode::from_env_value(Some("")), RunMode::Queue);
        assert_eq!(RunMode::from_env_value(None), RunMode::Queue);
    }

    #[test]
    fn test_request_args_into_event() {
        let event = RequestArgs {
            plugins: Some("alpha, beta".to_string()),
            character: Some(PathBuf::from("characters/scout.json")),
            agent_id: Some("scout-1".to_string()),
            registry: Some("registry.local:5000".to_string()),
        }
        .into_event()
        .unwrap();

        assert_eq!(event.plugins, vec!["alpha", "beta"]);
        assert_eq!(event.agent_id, "scout-1");
        assert_eq!(event.docker_registry.as_deref(), Some("registry.local:5000"));
    }

    #[test]
    fn test_request_args_require_agent_id() {
        let err = RequestArgs {
            plugins: Some("alpha".to_string()),
            character: Some(PathBuf::from("c.json")),
            agent_id: None,
            registry: None,
        }
        .into_event()
        .unwrap_err();

        assert!(err.to_string().contains("--agentId"));
    }

    #[tokio::test]
    async fn test_interactive_run_without_flags_fails_before_work() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("aegis-forge.yaml");
        ForgeConfigManifest::default().to_yaml_file(&config).unwrap();

        let result = run(RunMode::Interactive, Some(config), RequestArgs::default()).await;
        assert!(result.is_err());
    }
}
