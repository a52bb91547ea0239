//! Shim publishing for child processes.
//!
//! # Architecture
//!
//! Shims are a mechanism, not policy. The engine decides which interpreter an
//! override points at; this crate only materializes that decision as small
//! redirecting executables in a session-scoped directory and splices that
//! directory into the search path that child processes inherit.
//!
//! ```text
//! <root>/<session>/py3.12/
//!     python      -> exec <target> "$@"
//!     python3     -> exec <target> "$@"
//!     python3.12  -> symlink to <target>
//! ```

pub use error::{Error, Result};
pub use publisher::{Placement, ShimPublisher, ShimSet};
pub use script::redirector;

mod error;
mod publisher;
mod script;
