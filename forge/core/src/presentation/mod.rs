// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`aegis-forge-core`)
//!
//! Surfaces that turn external requests into [`AgentCreationEvent`]s and hand
//! them to the pipeline. **No business logic lives here.**
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`ingress::interactive`] | CLI flags | One event per process |
//! | [`ingress::queue`] | Message broker | Consumer group worker, never exits voluntarily |
//!
//! [`AgentCreationEvent`]: crate::domain::creation_event::AgentCreationEvent

pub mod ingress;
