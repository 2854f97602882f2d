// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use aegis_forge_core::domain::forge_config::ForgeConfigManifest;
use aegis_forge_core::infrastructure::template_engine::AgentTemplateEngine;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file with every default spelled out
    Generate {
        /// Output path (default: ./aegis-forge.yaml)
        #[arg(short, long, default_value = "./aegis-forge.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(&output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ForgeConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        for (index, location) in ForgeConfigManifest::candidate_locations().iter().enumerate() {
            let marker = if location.path.is_file() { "found" } else { "missing" };
            println!(
                "  {}. {}: {} ({})",
                index + 2,
                location.source,
                location.path.display(),
                marker.dimmed()
            );
        }
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Worker:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Generation:".bold());
    println!("  Builds root: {}", spec.builds_root.display());
    println!("  Template: {}", spec.template_path.display());
    println!("  Runtime package: {}", spec.runtime_package);
    println!("  Plugin packages: {}<name>", spec.plugin_package_prefix);
    println!("  Plugin policy: {:?}", spec.plugin_policy);
    println!();

    println!("{}", "Toolchain:".bold());
    println!("  Binary: {}", spec.toolchain.binary);
    println!("  Base image: {}", spec.toolchain.base_image);
    println!("  Base image context: {}", spec.repository_root.display());
    println!();

    println!("{}", "Broker:".bold());
    println!("  URL: {}", spec.broker.url);
    println!("  Topic: {}", spec.broker.topic);
    println!("  Group: {}", spec.broker.group);
    println!("  Consumer: {}", spec.broker.consumer_name());
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ForgeConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    let template_path = &config.spec.template_path;
    if template_path.is_file() {
        let template = std::fs::read_to_string(template_path)
            .with_context(|| format!("Failed to read template {:?}", template_path))?;
        AgentTemplateEngine::new()
            .validate_template(&template)
            .with_context(|| format!("Invalid entry-point template {:?}", template_path))?;
        println!("{}", format!("✓ Template {} compiles", template_path.display()).green());
    } else {
        println!(
            "{}",
            format!("! Template {} not found", template_path.display()).yellow()
        );
    }

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: &Path) -> Result<()> {
    ForgeConfigManifest::default()
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
