// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain types for the forge pipeline
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Creation events, generated artifact models, build outcomes, configuration

pub mod creation_event;
pub mod entrypoint;
pub mod build;
pub mod events;
pub mod forge_config;
pub mod message_source;
