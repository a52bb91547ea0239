//! Asking an interpreter what it is.

use pysel_platform::command::Command;
use std::path::Path;

/// Embedded query used when `--version` is ambiguous.
pub const VERSION_QUERY: &str = "import sys; print('Python %d.%d.%d' % sys.version_info[:3])";

/// Runs a candidate interpreter and returns what it printed.
///
/// Implementations return `None` when the program cannot be run or exits
/// unsuccessfully. Old interpreters report `--version` on stderr, so both
/// streams are included.
pub trait Probe {
    fn run(&self, program: &Path, args: &[&str]) -> Option<String>;
}

impl std::fmt::Debug for dyn Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("Probe") }
}

/// Spawns the interpreter for real.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessProbe;

impl Probe for ProcessProbe {
    fn run(&self, program: &Path, args: &[&str]) -> Option<String> {
        match Command::new(program).args(args).capture() {
            Ok(out) if out.status.success() => {
                let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&out.stderr));
                Some(text)
            }
            Ok(out) => {
                tracing::debug!(program = %program.display(), status = ?out.status, "probe exited unsuccessfully");
                None
            }
            Err(err) => {
                tracing::debug!(program = %program.display(), error = %err, "probe could not run");
                None
            }
        }
    }
}
