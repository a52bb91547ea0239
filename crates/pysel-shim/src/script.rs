use std::path::Path;

/// File name a redirector for `command` is written under.
pub(crate) fn file_name(command: &str) -> String {
    if cfg!(windows) { format!("{command}.cmd") } else { command.to_string() }
}

/// Source of a redirector that re-executes `target` with all arguments.
#[cfg(not(windows))]
pub fn redirector(target: &Path) -> String {
    let quoted = target.to_string_lossy().replace('\'', r"'\''");
    format!("#!/bin/sh\n# generated by pysel; removed when the override is cleared\nexec '{quoted}' \"$@\"\n")
}

#[cfg(windows)]
pub fn redirector(target: &Path) -> String {
    format!("@echo off\r\n\"{}\" %*\r\n", target.display())
}
