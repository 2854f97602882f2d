// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Generated Agent Artifacts
//!
//! Typed models for the files written into an agent's output directory:
//!
//! - [`EntrypointModel`] - import block and plugin initialization list, rendered
//!   through the entry-point template as named fields
//! - [`PackageManifest`] - the generated `package.json`
//!
//! Plugin identifiers are turned into [`PluginRef`]s before anything is rendered,
//! so an identifier is only ever emitted as a checked symbol or package name.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use thiserror::Error;

/// Runtime symbols imported by every generated entry point
pub const CORE_RUNTIME_SYMBOLS: &[&str] = &[
    "AgentRuntime",
    "CacheManager",
    "DbCacheAdapter",
    "elizaLogger",
    "settings",
    "stringToUuid",
    "type Character",
];

/// Version marker used for every generated dependency
pub const FLOATING_VERSION: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid plugin identifier '{identifier}': {reason}")]
pub struct InvalidPluginIdentifier {
    pub identifier: String,
    pub reason: String,
}

/// What to do with plugin identifiers that cannot form a safe import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginPolicy {
    /// Drop malformed identifiers with a warning. Unpublished plugins are
    /// left to the generated program, which filters out undefined exports.
    #[default]
    BestEffort,
    /// Fail generation on the first malformed identifier
    Strict,
}

impl FromStr for PluginPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "best-effort" | "best_effort" | "besteffort" => Ok(Self::BestEffort),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "Unknown plugin policy '{}'. Supported: best-effort, strict",
                other
            )),
        }
    }
}

/// A plugin identifier resolved to the symbol and package it is imported as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRef {
    pub identifier: String,
    pub symbol: String,
    pub package: String,
}

impl PluginRef {
    pub fn resolve(identifier: &str, package_prefix: &str) -> Result<Self, InvalidPluginIdentifier> {
        validate_identifier(identifier)?;

        Ok(Self {
            identifier: identifier.to_string(),
            symbol: plugin_symbol(identifier),
            package: format!("{}{}", package_prefix, identifier),
        })
    }
}

fn validate_identifier(identifier: &str) -> Result<(), InvalidPluginIdentifier> {
    let invalid = |reason: &str| InvalidPluginIdentifier {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = identifier.chars();
    match chars.next() {
        None => return Err(invalid("identifier is empty")),
        Some(c) if !c.is_ascii_alphabetic() => {
            return Err(invalid("must start with an ASCII letter"))
        }
        Some(_) => {}
    }

    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))) {
        return Err(invalid(&format!("illegal character '{}'", bad)));
    }

    Ok(())
}

/// `web-search` -> `webSearchPlugin`, `alpha` -> `alphaPlugin`
fn plugin_symbol(identifier: &str) -> String {
    let mut symbol = String::with_capacity(identifier.len() + 6);
    for (i, segment) in identifier
        .split(['-', '_', '.'])
        .filter(|s| !s.is_empty())
        .enumerate()
    {
        if i == 0 {
            symbol.push_str(segment);
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            symbol.extend(first.to_uppercase());
            symbol.push_str(chars.as_str());
        }
    }
    symbol.push_str("Plugin");
    symbol
}

// ============================================================================
// Entry point
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginImport {
    pub symbol: String,
    pub package: String,
}

/// Render model for the entry-point template.
///
/// `core_import` and `plugin_imports` make up the import block;
/// `plugin_symbols` is the initialization list, in the order the plugins were requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrypointModel {
    pub core_import: String,
    pub plugin_imports: Vec<PluginImport>,
    pub plugin_symbols: Vec<String>,

    /// Identifiers dropped under [`PluginPolicy::BestEffort`]
    #[serde(default)]
    pub skipped_plugins: Vec<String>,
}

impl EntrypointModel {
    pub fn build(
        plugins: &[String],
        runtime_package: &str,
        package_prefix: &str,
        policy: PluginPolicy,
    ) -> Result<Self, InvalidPluginIdentifier> {
        let mut resolved: Vec<PluginRef> = Vec::with_capacity(plugins.len());
        let mut skipped_plugins = Vec::new();
        let mut seen = HashSet::new();
        let mut symbol_owners: HashMap<String, String> = HashMap::new();

        for identifier in plugins {
            if !seen.insert(identifier.as_str()) {
                tracing::debug!("Ignoring repeated plugin '{}'", identifier);
                continue;
            }

            let plugin = PluginRef::resolve(identifier, package_prefix).and_then(|plugin| {
                match symbol_owners.get(&plugin.symbol) {
                    Some(owner) => Err(InvalidPluginIdentifier {
                        identifier: identifier.clone(),
                        reason: format!(
                            "symbol '{}' collides with plugin '{}'",
                            plugin.symbol, owner
                        ),
                    }),
                    None => Ok(plugin),
                }
            });

            match plugin {
                Ok(plugin) => {
                    symbol_owners.insert(plugin.symbol.clone(), identifier.clone());
                    resolved.push(plugin);
                }
                Err(e) => match policy {
                    PluginPolicy::Strict => return Err(e),
                    PluginPolicy::BestEffort => {
                        tracing::warn!("Skipping plugin: {}", e);
                        skipped_plugins.push(identifier.clone());
                    }
                },
            }
        }

        Ok(Self {
            core_import: format!(
                "import {{ {} }} from \"{}\";",
                CORE_RUNTIME_SYMBOLS.join(", "),
                runtime_package
            ),
            plugin_imports: resolved
                .iter()
                .map(|p| PluginImport {
                    symbol: p.symbol.clone(),
                    package: p.package.clone(),
                })
                .collect(),
            plugin_symbols: resolved.into_iter().map(|p| p.symbol).collect(),
            skipped_plugins,
        })
    }

    /// The initialization expression as it appears in the rendered entry point
    pub fn initialization_expression(&self) -> String {
        format!("[{}].filter(Boolean)", self.plugin_symbols.join(", "))
    }
}

// ============================================================================
// Package manifest
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub private: bool,
    #[serde(rename = "type")]
    pub module_type: String,
    pub main: String,
    pub scripts: BTreeMap<String, String>,
    pub dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    /// `dependency_packages` excludes the runtime package, which is always added
    pub fn new<'a>(
        name: impl Into<String>,
        runtime_package: &str,
        dependency_packages: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut dependencies = BTreeMap::new();
        dependencies.insert(runtime_package.to_string(), FLOATING_VERSION.to_string());
        for package in dependency_packages {
            dependencies.insert(package.to_string(), FLOATING_VERSION.to_string());
        }

        let scripts = BTreeMap::from([
            ("build".to_string(), "tsc".to_string()),
            ("start".to_string(), "node dist/index.js".to_string()),
        ]);

        Self {
            name: name.into(),
            version: "0.1.0".to_string(),
            private: true,
            module_type: "module".to_string(),
            main: "dist/index.js".to_string(),
            scripts,
            dependencies,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
