// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Request ingress strategies. Each one produces canonical events and feeds
//! them to an [`EventDispatcher`]; the pipeline never knows which mode is active.

pub mod interactive;
pub mod queue;

pub use interactive::InteractiveIngress;
pub use queue::{MessageDisposition, QueueIngress};

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::pipeline::EventDispatcher;

#[async_trait]
pub trait Ingress: Send {
    /// Mode name for logs
    fn name(&self) -> &'static str;

    /// Feed events to `dispatcher` until the mode is done. Queue ingress only
    /// returns on a fatal error.
    async fn run(self: Box<Self>, dispatcher: Arc<dyn EventDispatcher>) -> anyhow::Result<()>;
}
