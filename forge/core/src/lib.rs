// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! AEGIS Forge Core
//!
//! Turns an agent creation request (plugins + character file + agent id) into a
//! generated source tree and a container image.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Request ingress, agent generation, container build orchestration

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
