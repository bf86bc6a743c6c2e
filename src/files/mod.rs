//! Verbatim file access for module config and log files.
//!
//! Nothing is parsed or transformed here: `.ini` text goes to and from disk
//! exactly as the operator wrote it, and `.log` text is the script's own
//! output. A missing file reads as absent, not as an error. Paths come from
//! the registry only, never from request input.

use std::fs;
use std::io;
use std::path::Path;

use crate::registry::Module;

pub fn read_config(module: &Module) -> io::Result<Option<String>> {
    read_optional(&module.config_path)
}

/// Overwrite the module's `.ini` file with the given text, creating the
/// module directory if it does not exist yet.
pub fn write_config(module: &Module, text: &str) -> io::Result<()> {
    if let Some(parent) = module.config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&module.config_path, text)
}

pub fn read_log(module: &Module) -> io::Result<Option<String>> {
    read_optional(&module.log_path)
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
