// src/log.rs
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::consts::LOG_FILE;

/// Install the global subscriber: stderr for humans, `<store>/debug.log` for later.
///
/// `level` is the default filter; `RUST_LOG` wins when set.
/// Safe to call more than once (later calls are ignored).
pub fn init(level: &str, store_dir: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    // The debug file is best-effort: no file, no file layer.
    let file = fs::create_dir_all(store_dir)
        .and_then(|_| OpenOptions::new().create(true).append(true).open(store_dir.join(LOG_FILE)))
        .ok()
        .map(|f| {
            fmt::layer()
                .with_ansi(false)
                .with_timer(fmt::time::uptime())
                .with_writer(Mutex::new(f))
        });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init();
}

/// Test subscriber: debug level, captured per test.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Info-level logging
#[macro_export]
macro_rules! logf {
    ($($arg:tt)*) => {
        ::tracing::info!($($arg)*)
    };
}

/// Warn-level logging (soft failures)
#[macro_export]
macro_rules! logw {
    ($($arg:tt)*) => {
        ::tracing::warn!($($arg)*)
    };
}

/// Debug-level logging
#[macro_export]
macro_rules! logd {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

/// Error-level logging
#[macro_export]
macro_rules! loge {
    ($($arg:tt)*) => {
        ::tracing::error!($($arg)*)
    };
}
