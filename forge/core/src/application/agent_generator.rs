// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent Generator
//!
//! Application service that renders a standalone agent source tree.
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Responsibility:** Produce the output directory of one agent
//! - **Collaborators:**
//!   - Domain: EntrypointModel, PackageManifest
//!   - Infrastructure: AgentTemplateEngine
//!
//! # Flow
//!
//! 1. Create `<builds_root>/<output_dir>` (idempotent, siblings untouched)
//! 2. Resolve plugin identifiers into the import block and initialization list
//! 3. Load the entry-point template and render it against the typed model
//! 4. Write `src/index.ts`
//! 5. Copy the character file to `character.json` if the source exists
//! 6. Write `package.json` and `Dockerfile`
//! 7. Return the absolute output directory
//!
//! Every file is fully rewritten on each run. Nothing is retried; the first
//! filesystem error aborts generation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::entrypoint::{
    EntrypointModel, InvalidPluginIdentifier, PackageManifest, PluginPolicy,
};
use crate::domain::forge_config::ForgeConfigSpec;
use crate::infrastructure::template_engine::AgentTemplateEngine;

pub const ENTRYPOINT_FILE: &str = "src/index.ts";
pub const CHARACTER_FILE: &str = "character.json";
pub const MANIFEST_FILE: &str = "package.json";
pub const DOCKERFILE: &str = "Dockerfile";

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Output directory name {0:?} must be a single relative path component")]
    InvalidOutputDir(String),

    #[error("Failed to create output directory {path:?}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read template {path:?}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    InvalidPlugin(#[from] InvalidPluginIdentifier),

    #[error("Failed to render {file}: {source}")]
    Render {
        file: &'static str,
        #[source]
        source: handlebars::RenderError,
    },

    #[error("Failed to serialize {file}: {source}")]
    Serialize {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to copy character file {from:?} to {to:?}: {source}")]
    CopyCharacter {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Generator inputs taken from the forge configuration
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub builds_root: PathBuf,
    pub template_path: PathBuf,
    pub runtime_package: String,
    pub plugin_package_prefix: String,
    pub plugin_policy: PluginPolicy,
    pub base_image: String,
}

impl From<&ForgeConfigSpec> for GeneratorSettings {
    fn from(spec: &ForgeConfigSpec) -> Self {
        Self {
            builds_root: spec.builds_root.clone(),
            template_path: spec.template_path.clone(),
            runtime_package: spec.runtime_package.clone(),
            plugin_package_prefix: spec.plugin_package_prefix.clone(),
            plugin_policy: spec.plugin_policy,
            base_image: spec.toolchain.base_image.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub plugins: &'a [String],
    pub character: &'a Path,
    /// Directory name under the builds root
    pub output_dir: &'a str,
}

/// Paths of everything written for one agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAgent {
    pub output_dir: PathBuf,
    pub entrypoint: PathBuf,
    pub manifest: PathBuf,
    pub dockerfile: PathBuf,
    /// `None` when the character source did not exist
    pub character: Option<PathBuf>,
    pub skipped_plugins: Vec<String>,
}

pub struct AgentGenerator {
    settings: GeneratorSettings,
    engine: AgentTemplateEngine,
}

impl AgentGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self {
            settings,
            engine: AgentTemplateEngine::new(),
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn generate(&self, request: &GenerationRequest<'_>) -> Result<GeneratedAgent, GeneratorError> {
        // Step 1: output directory
        let output_dir = self.prepare_output_dir(request.output_dir)?;

        // Step 2: import block + initialization list
        let model = EntrypointModel::build(
            request.plugins,
            &self.settings.runtime_package,
            &self.settings.plugin_package_prefix,
            self.settings.plugin_policy,
        )?;

        // Step 3: template
        let template = fs::read_to_string(&self.settings.template_path).map_err(|source| {
            GeneratorError::TemplateRead {
                path: self.settings.template_path.clone(),
                source,
            }
        })?;
        let source = self
            .engine
            .render_entrypoint(&template, &model)
            .map_err(|source| GeneratorError::Render {
                file: ENTRYPOINT_FILE,
                source,
            })?;

        // Step 4: entry point
        let entrypoint = output_dir.join(ENTRYPOINT_FILE);
        write_file(&entrypoint, &source)?;

        // Step 5: character
        let character = copy_character(request.character, &output_dir.join(CHARACTER_FILE))?;

        // Step 6: package manifest + container build descriptor
        let package_name = output_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.output_dir.to_string());
        let manifest = PackageManifest::new(
            package_name,
            &self.settings.runtime_package,
            model.plugin_imports.iter().map(|p| p.package.as_str()),
        );
        let manifest_json = manifest
            .to_json_pretty()
            .map_err(|source| GeneratorError::Serialize {
                file: MANIFEST_FILE,
                source,
            })?;
        let manifest_path = output_dir.join(MANIFEST_FILE);
        write_file(&manifest_path, &manifest_json)?;

        let dockerfile = self
            .engine
            .render_dockerfile(&self.settings.base_image)
            .map_err(|source| GeneratorError::Render {
                file: DOCKERFILE,
                source,
            })?;
        let dockerfile_path = output_dir.join(DOCKERFILE);
        write_file(&dockerfile_path, &dockerfile)?;

        info!(
            output_dir = %output_dir.display(),
            plugins = model.plugin_symbols.len(),
            character_copied = character.is_some(),
            "Generated agent sources"
        );

        Ok(GeneratedAgent {
            output_dir,
            entrypoint,
            manifest: manifest_path,
            dockerfile: dockerfile_path,
            character,
            skipped_plugins: model.skipped_plugins,
        })
    }

    fn prepare_output_dir(&self, name: &str) -> Result<PathBuf, GeneratorError> {
        let mut components = Path::new(name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(std::path::Component::Normal(_)), None)
        ) {
            return Err(GeneratorError::InvalidOutputDir(name.to_string()));
        }

        let path = self.settings.builds_root.join(name);
        let create_error = |source| GeneratorError::CreateOutputDir {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&path).map_err(create_error)?;
        std::path::absolute(&path).map_err(create_error)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), GeneratorError> {
    let write_error = |source| GeneratorError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, contents).map_err(write_error)
}

/// Copy the character file if it exists. A copy left by an earlier run is
/// removed when the source is gone, so the directory never holds a stale persona.
/// A source that exists but cannot be copied (a directory, say) is an error.
fn copy_character(from: &Path, to: &Path) -> Result<Option<PathBuf>, GeneratorError> {
    if from.exists() {
        fs::copy(from, to).map_err(|source| GeneratorError::CopyCharacter {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })?;
        return Ok(Some(to.to_path_buf()));
    }

    debug!("Character file {:?} not found, skipping copy", from);
    if to.exists() {
        fs::remove_file(to).map_err(|source| GeneratorError::Write {
            path: to.to_path_buf(),
            source,
        })?;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = include_str!("../../templates/agent-entrypoint.ts.hbs");

    struct Fixture {
        dir: TempDir,
        generator: AgentGenerator,
    }

    fn fixture(policy: PluginPolicy) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("agent-entrypoint.ts.hbs");
        fs::write(&template_path, TEMPLATE).unwrap();

        let generator = AgentGenerator::new(GeneratorSettings {
            builds_root: dir.path().join("builds"),
            template_path,
            runtime_package: "@elizaos/core".to_string(),
            plugin_package_prefix: "@elizaos/plugin-".to_string(),
            plugin_policy: policy,
            base_image: "aegis-agent-base".to_string(),
        });

        Fixture { dir, generator }
    }

    fn plugins(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_generates_all_artifacts() {
        let f = fixture(PluginPolicy::BestEffort);
        let character = f.dir.path().join("trader.json");
        fs::write(&character, r#"{"name": "Trader"}"#).unwrap();
        let plugins = plugins(&["alpha", "beta"]);

        let generated = f
            .generator
            .generate(&GenerationRequest {
                plugins: &plugins,
                character: &character,
                output_dir: "trader-01",
            })
            .unwrap();

        assert!(generated.output_dir.is_absolute());
        assert!(generated.output_dir.ends_with("builds/trader-01"));
        assert!(generated.entrypoint.is_file());
        assert!(generated.manifest.is_file());
        assert!(generated.dockerfile.is_file());
        assert_eq!(
            fs::read_to_string(generated.character.unwrap()).unwrap(),
            r#"{"name": "Trader"}"#
        );

        let source = fs::read_to_string(&generated.entrypoint).unwrap();
        assert!(source.contains("[alphaPlugin, betaPlugin].filter(Boolean)"));

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&generated.manifest).unwrap()).unwrap();
        assert_eq!(manifest["name"], "trader-01");
        assert_eq!(manifest["dependencies"]["@elizaos/plugin-beta"], "latest");
    }

    #[test]
    fn test_missing_character_is_skipped() {
        let f = fixture(PluginPolicy::BestEffort);
        let missing = f.dir.path().join("nope.json");

        let generated = f
            .generator
            .generate(&GenerationRequest {
                plugins: &[],
                character: &missing,
                output_dir: "a1",
            })
            .unwrap();

        assert!(generated.character.is_none());
        assert!(!generated.output_dir.join(CHARACTER_FILE).exists());
        assert!(generated.entrypoint.is_file());
        assert!(generated.manifest.is_file());
        assert!(generated.dockerfile.is_file());
    }

    #[test]
    fn test_character_directory_fails_copy() {
        let f = fixture(PluginPolicy::BestEffort);
        let character = f.dir.path().join("characters");
        fs::create_dir_all(&character).unwrap();

        let err = f
            .generator
            .generate(&GenerationRequest {
                plugins: &[],
                character: &character,
                output_dir: "a1",
            })
            .unwrap_err();

        assert!(matches!(err, GeneratorError::CopyCharacter { .. }));
    }

    #[test]
    fn test_output_dir_must_stay_under_builds_root() {
        let f = fixture(PluginPolicy::BestEffort);

        for name in ["../escape", "nested/dir", "", "/abs"] {
            let err = f
                .generator
                .generate(&GenerationRequest {
                    plugins: &[],
                    character: Path::new("c.json"),
                    output_dir: name,
                })
                .unwrap_err();
            assert!(matches!(err, GeneratorError::InvalidOutputDir(_)), "{name}");
        }
    }

    #[test]
    fn test_missing_template_fails() {
        let f = fixture(PluginPolicy::BestEffort);
        fs::remove_file(&f.generator.settings().template_path).unwrap();

        let err = f
            .generator
            .generate(&GenerationRequest {
                plugins: &[],
                character: Path::new("c.json"),
                output_dir: "a1",
            })
            .unwrap_err();

        assert!(matches!(err, GeneratorError::TemplateRead { .. }));
    }

    #[test]
    fn test_strict_policy_rejects_malformed_plugin() {
        let f = fixture(PluginPolicy::Strict);
        let plugins = plugins(&["alpha", "../escape"]);

        let err = f
            .generator
            .generate(&GenerationRequest {
                plugins: &plugins,
                character: Path::new("c.json"),
                output_dir: "a1",
            })
            .unwrap_err();

        assert!(matches!(err, GeneratorError::InvalidPlugin(_)));
    }

    #[test]
    fn test_rerun_rewrites_files() {
        let f = fixture(PluginPolicy::BestEffort);
        let character = f.dir.path().join("c.json");
        fs::write(&character, "{}").unwrap();

        let first = plugins(&["alpha", "beta", "gamma"]);
        f.generator
            .generate(&GenerationRequest {
                plugins: &first,
                character: &character,
                output_dir: "a1",
            })
            .unwrap();

        fs::remove_file(&character).unwrap();
        let second = plugins(&["delta"]);
        let generated = f
            .generator
            .generate(&GenerationRequest {
                plugins: &second,
                character: &character,
                output_dir: "a1",
            })
            .unwrap();

        let source = fs::read_to_string(&generated.entrypoint).unwrap();
        assert!(source.contains("[deltaPlugin].filter(Boolean)"));
        assert!(!source.contains("gammaPlugin"));

        let manifest = fs::read_to_string(&generated.manifest).unwrap();
        assert!(!manifest.contains("plugin-alpha"));
        assert!(!generated.output_dir.join(CHARACTER_FILE).exists());
    }

    #[test]
    fn test_sibling_directories_untouched() {
        let f = fixture(PluginPolicy::BestEffort);
        let sibling = f.dir.path().join("builds").join("other");
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("keep.txt"), "keep").unwrap();

        f.generator
            .generate(&GenerationRequest {
                plugins: &[],
                character: Path::new("c.json"),
                output_dir: "a1",
            })
            .unwrap();

        assert_eq!(fs::read_to_string(sibling.join("keep.txt")).unwrap(), "keep");
    }
}
