//! Tracing subscriber setup.
//!
//! The terminal belongs to the UI while the app runs, so log lines go to a
//! file instead of stderr.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter directives
pub const LOG_ENV: &str = "MUNI_MAP_LOG";

/// Filter from `MUNI_MAP_LOG`, then `RUST_LOG`, then `info`
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber writing to `path`.
pub fn init(path: &Path) -> std::io::Result<()> {
    let file = open_log(path)?;
    let fmt_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("muni-map.log");
        init(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_init_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("muni-map.log");
        assert!(init(&path).is_err());
    }
}
