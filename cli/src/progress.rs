// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Console progress for interactive runs, driven by pipeline events.

use colored::Colorize;

use aegis_forge_core::domain::events::PipelineEvent;
use aegis_forge_core::infrastructure::event_bus::{EventBusError, EventReceiver};

/// Print events until every publisher is gone
pub async fn report(mut receiver: EventReceiver) {
    loop {
        match receiver.recv().await {
            Ok(event) => println!("{}", render(&event)),
            Err(EventBusError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}

pub fn render(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::GenerationStarted {
            agent_id, plugins, ..
        } => format!(
            "{} Generating agent {} with plugins [{}]",
            "→".cyan(),
            agent_id.bold(),
            plugins.join(", ")
        ),
        PipelineEvent::AgentGenerated {
            output_dir,
            character_copied,
            ..
        } => {
            let mut line = format!("{} Sources written to {}", "✓".green(), output_dir.display());
            if !character_copied {
                line.push_str(&format!(" {}", "(no character file)".dimmed()));
            }
            line
        }
        PipelineEvent::ToolchainUnavailable {
            manual_commands, ..
        } => {
            let mut lines = vec![format!(
                "{} Container toolchain unavailable. Build manually:",
                "!".yellow()
            )];
            lines.extend(manual_commands.iter().map(|c| format!("    {}", c)));
            lines.join("\n")
        }
        PipelineEvent::ImageBuilt { image, .. } => {
            format!("{} Built image {}", "✓".green(), image.bold())
        }
        PipelineEvent::ImagePushed { remote_image, .. } => {
            format!("{} Pushed {}", "✓".green(), remote_image.bold())
        }
        PipelineEvent::PipelineCompleted { agent_id, .. } => {
            format!("{}", format!("✓ Agent {} ready", agent_id).green().bold())
        }
        PipelineEvent::PipelineFailed { reason, .. } => {
            format!("{} {}", "✗".red(), reason.red())
        }
    }
}
