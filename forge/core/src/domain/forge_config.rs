// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Forge Configuration Types
//
// Defines the configuration schema for an AEGIS Forge worker, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Output locations and the entry-point template
// - Generated package conventions (runtime package, plugin package prefix)
// - Container toolchain settings
// - Message broker settings for queue mode

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::entrypoint::PluginPolicy;

pub const API_VERSION: &str = "100monkeys.ai/v1";
pub const KIND: &str = "ForgeConfig";

pub const ENV_CONFIG_PATH: &str = "AEGIS_FORGE_CONFIG_PATH";
pub const ENV_BROKER_URL: &str = "AEGIS_FORGE_BROKER_URL";
pub const ENV_BUILDS_ROOT: &str = "AEGIS_FORGE_BUILDS_ROOT";
pub const ENV_TEMPLATE_PATH: &str = "AEGIS_FORGE_TEMPLATE_PATH";
pub const ENV_PLUGIN_POLICY: &str = "AEGIS_FORGE_PLUGIN_POLICY";
pub const ENV_BROKER_CONSUMER: &str = "AEGIS_FORGE_BROKER_CONSUMER";

/// Top-level Kubernetes-style forge configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfigManifest {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ForgeConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: ForgeConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable worker name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfigSpec {
    /// Directory under which one output directory per agent is created
    #[serde(default = "default_builds_root")]
    pub builds_root: PathBuf,

    /// Entry-point template document
    #[serde(default = "default_template_path")]
    pub template_path: PathBuf,

    /// Build context of the shared base image
    #[serde(default = "default_repository_root")]
    pub repository_root: PathBuf,

    /// Package providing the agent runtime
    #[serde(default = "default_runtime_package")]
    pub runtime_package: String,

    /// Plugin `x` is installed from `<plugin_package_prefix>x`
    #[serde(default = "default_plugin_package_prefix")]
    pub plugin_package_prefix: String,

    #[serde(default)]
    pub plugin_policy: PluginPolicy,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub broker: BrokerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Container CLI executable
    #[serde(default = "default_toolchain_binary")]
    pub binary: String,

    /// Tag of the shared base image every agent image derives from
    #[serde(default = "default_base_image")]
    pub base_image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker address (Redis URL)
    #[serde(default = "default_broker_url")]
    pub url: String,

    /// Stream carrying agent creation events
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Durable consumer group
    #[serde(default = "default_group")]
    pub group: String,

    /// How long a single read blocks waiting for new messages
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,

    /// Consumer name within the group. Must stay the same across restarts of
    /// one worker so it can reclaim its own unacknowledged messages.
    /// Defaults to the hostname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer: Option<String>,
}

impl BrokerConfig {
    pub fn consumer_name(&self) -> String {
        self.consumer
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(local_hostname)
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            binary: default_toolchain_binary(),
            base_image: default_base_image(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            topic: default_topic(),
            group: default_group(),
            block_ms: default_block_ms(),
            consumer: None,
        }
    }
}

impl Default for ForgeConfigSpec {
    fn default() -> Self {
        Self {
            builds_root: default_builds_root(),
            template_path: default_template_path(),
            repository_root: default_repository_root(),
            runtime_package: default_runtime_package(),
            plugin_package_prefix: default_plugin_package_prefix(),
            plugin_policy: PluginPolicy::default(),
            toolchain: ToolchainConfig::default(),
            broker: BrokerConfig::default(),
        }
    }
}

impl Default for ForgeConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: local_hostname(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: ForgeConfigSpec::default(),
        }
    }
}

impl ForgeConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// [`config_locations`] for this process's environment and home directory
    pub fn candidate_locations() -> Vec<ConfigLocation> {
        config_locations(
            std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from),
            dirs::home_dir(),
        )
    }

    /// First existing file among [`Self::candidate_locations`]
    pub fn discover_config() -> Option<PathBuf> {
        Self::candidate_locations()
            .into_iter()
            .map(|location| location.path)
            .find(|path| path.is_file())
    }

    /// Load from `cli_path` if given, else from the first discovered file, else
    /// defaults. Environment overrides apply in every case.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = match cli_path.or_else(Self::discover_config) {
            Some(path) => {
                tracing::info!("Loading configuration from {:?}", path);
                Self::from_yaml_file(&path)
                    .with_context(|| format!("Failed to load config at {:?}", path))?
            }
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BROKER_URL) {
            tracing::info!("Environment override: {}={}", ENV_BROKER_URL, url);
            self.spec.broker.url = url;
        }

        if let Some(consumer) = lookup(ENV_BROKER_CONSUMER) {
            tracing::info!("Environment override: {}={}", ENV_BROKER_CONSUMER, consumer);
            self.spec.broker.consumer = Some(consumer);
        }

        if let Some(root) = lookup(ENV_BUILDS_ROOT) {
            tracing::info!("Environment override: {}={}", ENV_BUILDS_ROOT, root);
            self.spec.builds_root = PathBuf::from(root);
        }

        if let Some(template) = lookup(ENV_TEMPLATE_PATH) {
            tracing::info!("Environment override: {}={}", ENV_TEMPLATE_PATH, template);
            self.spec.template_path = PathBuf::from(template);
        }

        if let Some(val) = lookup(ENV_PLUGIN_POLICY) {
            match val.parse::<PluginPolicy>() {
                Ok(policy) => {
                    tracing::info!("Environment override: {}={}", ENV_PLUGIN_POLICY, val);
                    self.spec.plugin_policy = policy;
                }
                Err(e) => {
                    tracing::warn!("Invalid value for {}: {}. Ignoring.", ENV_PLUGIN_POLICY, e);
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.builds_root.as_os_str().is_empty() {
            anyhow::bail!("spec.builds_root cannot be empty");
        }

        if self.spec.template_path.as_os_str().is_empty() {
            anyhow::bail!("spec.template_path cannot be empty");
        }

        if self.spec.runtime_package.is_empty() {
            anyhow::bail!("spec.runtime_package cannot be empty");
        }

        if self.spec.plugin_package_prefix.is_empty() {
            anyhow::bail!("spec.plugin_package_prefix cannot be empty");
        }

        if self.spec.toolchain.binary.is_empty() {
            anyhow::bail!("spec.toolchain.binary cannot be empty");
        }

        if self.spec.toolchain.base_image.is_empty() {
            anyhow::bail!("spec.toolchain.base_image cannot be empty");
        }

        let broker = &self.spec.broker;
        if !broker.url.starts_with("redis://") && !broker.url.starts_with("rediss://") {
            anyhow::bail!(
                "spec.broker.url must be a redis:// or rediss:// URL, got '{}'",
                broker.url
            );
        }

        if broker.topic.is_empty() {
            anyhow::bail!("spec.broker.topic cannot be empty");
        }

        if broker.group.is_empty() {
            anyhow::bail!("spec.broker.group cannot be empty");
        }

        Ok(())
    }
}

/// A place a configuration file is looked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub source: &'static str,
    pub path: PathBuf,
}

/// Candidate configuration files, highest precedence first. The `--config`
/// flag is not listed; it bypasses discovery entirely.
pub fn config_locations(env_path: Option<PathBuf>, home: Option<PathBuf>) -> Vec<ConfigLocation> {
    let mut locations = Vec::with_capacity(4);
    if let Some(path) = env_path {
        locations.push(ConfigLocation {
            source: ENV_CONFIG_PATH,
            path,
        });
    }
    locations.push(ConfigLocation {
        source: "working directory",
        path: PathBuf::from("aegis-forge.yaml"),
    });
    if let Some(home) = home {
        locations.push(ConfigLocation {
            source: "user",
            path: home.join(".aegis").join("forge.yaml"),
        });
    }
    locations.push(ConfigLocation {
        source: "system",
        path: PathBuf::from("/etc/aegis/forge.yaml"),
    });
    locations
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "aegis-forge".to_string())
}

fn default_builds_root() -> PathBuf {
    PathBuf::from("builds")
}

fn default_template_path() -> PathBuf {
    PathBuf::from("forge/core/templates/agent-entrypoint.ts.hbs")
}

fn default_repository_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_runtime_package() -> String {
    "@elizaos/core".to_string()
}

fn default_plugin_package_prefix() -> String {
    "@elizaos/plugin-".to_string()
}

fn default_toolchain_binary() -> String {
    "docker".to_string()
}

fn default_base_image() -> String {
    "aegis-agent-base".to_string()
}

fn default_broker_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_topic() -> String {
    "agent-creation".to_string()
}

fn default_group() -> String {
    "aegis-forge".to_string()
}

fn default_block_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = ForgeConfigManifest::default();
        assert_eq!(manifest.api_version, "100monkeys.ai/v1");
        assert_eq!(manifest.kind, "ForgeConfig");
        assert!(!manifest.metadata.name.is_empty());
        assert_eq!(manifest.spec.builds_root, PathBuf::from("builds"));
        assert_eq!(manifest.spec.broker.topic, "agent-creation");
        assert_eq!(manifest.spec.plugin_policy, PluginPolicy::BestEffort);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
apiVersion: 100monkeys.ai/v1
kind: ForgeConfig
metadata:
  name: forge-worker-1
spec:
  builds_root: /var/lib/aegis/builds
  plugin_policy: strict
  broker:
    url: redis://broker:6379
"#;
        let manifest = ForgeConfigManifest::from_yaml_str(yaml).unwrap();

        assert_eq!(manifest.metadata.name, "forge-worker-1");
        assert_eq!(manifest.spec.builds_root, PathBuf::from("/var/lib/aegis/builds"));
        assert_eq!(manifest.spec.plugin_policy, PluginPolicy::Strict);
        assert_eq!(manifest.spec.broker.url, "redis://broker:6379");
        assert_eq!(manifest.spec.broker.group, "aegis-forge");
        assert_eq!(manifest.spec.toolchain.binary, "docker");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aegis-forge.yaml");

        let mut manifest = ForgeConfigManifest::default();
        manifest.metadata.name = "roundtrip".to_string();
        manifest.spec.toolchain.base_image = "registry.local/base".to_string();
        manifest.to_yaml_file(&path).unwrap();

        let loaded = ForgeConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.metadata.name, "roundtrip");
        assert_eq!(loaded.spec.toolchain.base_image, "registry.local/base");
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ForgeConfigManifest::load_or_default(Some(dir.path().join("missing.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let mut manifest = ForgeConfigManifest::default();
        let vars = HashMap::from([
            (ENV_BROKER_URL, "redis://queue.internal:6380"),
            (ENV_BUILDS_ROOT, "/tmp/agent-builds"),
            (ENV_PLUGIN_POLICY, "strict"),
            (ENV_BROKER_CONSUMER, "forge-worker-0"),
        ]);

        manifest.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(manifest.spec.broker.consumer_name(), "forge-worker-0");
        assert_eq!(manifest.spec.broker.url, "redis://queue.internal:6380");
        assert_eq!(manifest.spec.builds_root, PathBuf::from("/tmp/agent-builds"));
        assert_eq!(manifest.spec.plugin_policy, PluginPolicy::Strict);
        assert_eq!(manifest.spec.template_path, default_template_path());
    }

    #[test]
    fn test_invalid_policy_override_is_ignored() {
        let mut manifest = ForgeConfigManifest::default();
        manifest.apply_overrides(|key| (key == ENV_PLUGIN_POLICY).then(|| "sloppy".to_string()));
        assert_eq!(manifest.spec.plugin_policy, PluginPolicy::BestEffort);
    }

    #[test]
    fn test_validation() {
        let mut manifest = ForgeConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.broker.url = "kafka://broker:9092".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.broker.url = default_broker_url();

        manifest.spec.broker.topic = "".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.broker.topic = default_topic();

        manifest.spec.toolchain.base_image = "".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_generation_settings() {
        let mut manifest = ForgeConfigManifest::default();
        manifest.spec.plugin_package_prefix = String::new();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("plugin_package_prefix"));

        let mut manifest = ForgeConfigManifest::default();
        manifest.spec.template_path = PathBuf::new();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("template_path"));
    }

    #[test]
    fn test_consumer_name_defaults_to_hostname() {
        let broker = BrokerConfig::default();
        assert_eq!(broker.consumer_name(), local_hostname());

        let broker = BrokerConfig {
            consumer: Some("  ".to_string()),
            ..BrokerConfig::default()
        };
        assert_eq!(broker.consumer_name(), local_hostname());

        let broker: BrokerConfig = serde_yaml::from_str("consumer: forge-a\n").unwrap();
        assert_eq!(broker.consumer_name(), "forge-a");
    }

    #[test]
    fn test_config_locations_precedence() {
        let locations = config_locations(
            Some(PathBuf::from("/run/forge.yaml")),
            Some(PathBuf::from("/home/forge")),
        );
        let paths: Vec<PathBuf> = locations.iter().map(|l| l.path.clone()).collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/run/forge.yaml"),
                PathBuf::from("aegis-forge.yaml"),
                PathBuf::from("/home/forge/.aegis/forge.yaml"),
                PathBuf::from("/etc/aegis/forge.yaml"),
            ]
        );
        assert_eq!(locations[0].source, ENV_CONFIG_PATH);

        let without_env = config_locations(None, None);
        assert_eq!(without_env.len(), 2);
        assert_eq!(without_env[0].source, "working directory");
    }
}
