//! Interpreter resolution for interactive shells.
//!
//! # Architecture
//!
//! ```text
//! resolve(command, args)
//!   ├─ bypass?              → system binary
//!   ├─ EnvironmentDetector  → environment's own binary
//!   ├─ OverrideState        → override interpreter (pip needs build mode)
//!   └─ InterpreterCatalog   → version-qualified commands only
//! ```
//!
//! All state lives in a [`Context`] built once per process from an explicit
//! environment snapshot. Mutations land in that snapshot; the host decides
//! whether they go to a child process or back to the parent shell.

pub use catalog::{Catalog, InterpreterCatalog, InterpreterRecord};
pub use config::EngineConfig;
pub use context::{Bypass, Context, ContextBuilder, Engine, default_session};
pub use detect::{EnvKind, EnvironmentContext, EnvironmentDetector};
pub use diagnostics::{DEBUG_VAR, Outcome, ResolutionReport, StateDump, StatusSummary};
pub use error::{BlockReason, EngineError, Result};
pub use exports::{OverrideState, PriorToggle};
pub use policy::{Action, Family, Invocation, LogicalCommand};
pub use probe::{ProcessProbe, Probe};
pub use state::{ClearOutcome, OverrideChange};

mod catalog;
mod config;
mod context;
pub mod detect;
mod diagnostics;
mod error;
pub mod exports;
mod policy;
mod probe;
mod state;
