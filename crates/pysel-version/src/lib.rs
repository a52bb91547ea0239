//! Version parsing and ordering for Python interpreters.
//!
//! # Version Shapes
//!
//! - **PyVersion**: the `(major, minor)` identity key (`3.12`)
//! - **FullVersion**: a complete release including patch and pre-release (`3.12.1`, `3.13.0rc1`)
//! - **VersionHint**: what a probe actually learned, which may be only a bare major (`Python 3`)

pub use self::output::{NameHint, VersionHint, interpreter_name_hint, is_interpreter_name, parse_version_output};
pub use self::version::{FullVersion, PyVersion, VersionError};

mod output;
mod version;
