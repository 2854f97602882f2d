// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod template_engine;
pub mod docker_cli;
pub mod event_bus;
pub mod redis_stream;
