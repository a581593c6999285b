#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # clinflow-core
//!
//! Coordination core for clinical work orders (imaging/lab requests) and the
//! asynchronous AI-inference pipeline that consumes their results.
//!
//! ## Architecture
//!
//! - [`state_machine`]: the order lifecycle
//!   `ORDERED → ACCEPTED → IN_PROGRESS → RESULT_READY → CONFIRMED` with
//!   role-gated transitions, append-only history and cancellation from any
//!   non-terminal state.
//! - [`resolver`]: pure requirement resolution, answering whether a model's
//!   input contract is satisfied by the confirmed orders on file for a
//!   patient.
//! - [`orchestration`]: inference job submission, worker dispatch, progress
//!   and terminal callbacks ("first terminal callback wins"), cancellation
//!   and the stalled-job watchdog.
//! - [`events`]: fire-and-forget notification fanout to role-group,
//!   requester and assignee topics.
//! - [`store`]: in-memory aggregate stores with per-aggregate exclusive
//!   locks; persistence proper is an external collaborator.
//! - [`web`]: axum boundary for the order API, job polling and the worker
//!   callback.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use clinflow_core::config::CoreConfig;
//! use clinflow_core::system::CoreSystem;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let system = CoreSystem::new(CoreConfig::from_env()?);
//! system.spawn_watchdog();
//! let app = system.router();
//! let listener = tokio::net::TcpListener::bind(&system.config.bind_address).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod resolver;
pub mod state_machine;
pub mod store;
pub mod system;
pub mod web;

pub use config::CoreConfig;
pub use error::{CoreError, Result};
pub use system::CoreSystem;
