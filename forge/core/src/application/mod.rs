// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent_generator;
pub mod build_orchestrator;
pub mod pipeline;

pub use agent_generator::{AgentGenerator, GeneratedAgent, GenerationRequest, GeneratorError, GeneratorSettings};
pub use build_orchestrator::{BuildOrchestrator, BuildRequest, BuildSettings};
pub use pipeline::{AgentCreationPipeline, EventDispatcher, PipelineError, PipelineReport};
