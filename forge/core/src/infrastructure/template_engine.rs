// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Template Engine
//!
//! Renders the generated agent's source files with Handlebars.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Turn typed render models into file contents
//! - **Integration:** EntrypointModel → `src/index.ts`, ToolchainConfig → `Dockerfile`
//!
//! # Entry-point placeholders
//!
//! - `{{core_import}}` - fixed import of the core runtime symbols
//! - `{{#each plugin_imports}}` - one `{ symbol, package }` per plugin, in request order
//! - `{{#each plugin_symbols}}` - symbols for the plugin initialization list
//!
//! Output is source code, not HTML, so escaping is disabled. Every value in the
//! model has already been checked by [`PluginRef::resolve`](crate::domain::entrypoint::PluginRef::resolve).

use handlebars::{Handlebars, RenderError};
use serde::Serialize;

use crate::domain::entrypoint::EntrypointModel;

/// Multi-stage container build descriptor written next to every generated agent
pub const DOCKERFILE_TEMPLATE: &str = include_str!("../../templates/Dockerfile.hbs");

#[derive(Debug, Serialize)]
struct DockerfileContext<'a> {
    base_image: &'a str,
}

pub struct AgentTemplateEngine {
    handlebars: Handlebars<'static>,
}

impl AgentTemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();

        // Missing fields mean the template and the model disagree
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);

        Self { handlebars }
    }

    pub fn render_entrypoint(
        &self,
        template: &str,
        model: &EntrypointModel,
    ) -> Result<String, RenderError> {
        self.handlebars.render_template(template, model)
    }

    pub fn render_dockerfile(&self, base_image: &str) -> Result<String, RenderError> {
        self.handlebars
            .render_template(DOCKERFILE_TEMPLATE, &DockerfileContext { base_image })
    }

    /// Validate template syntax without rendering
    pub fn validate_template(&self, template: &str) -> Result<(), handlebars::TemplateError> {
        handlebars::template::Template::compile(template).map(|_| ())
    }
}

impl Default for AgentTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}
