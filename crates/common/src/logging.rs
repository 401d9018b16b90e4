// RDB - Remote Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Logging setup for RDB components
//!
//! The capture engine itself only emits `tracing` events. Hosts embedding the
//! agent call [`init_logging`] once at startup; tests call
//! [`ensure_test_logging`], which is safe to call any number of times.

use eyre::Result;
use std::{env, fs, path::PathBuf, sync::Once};
use tracing::Level;
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling,
};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Initialize logging for an RDB component
///
/// Installs a pretty console layer and, when `enable_file_logging` is set, a
/// daily-rotating file layer under `$TMP/rdb-logs/<component_name>`. The
/// level comes from `RUST_LOG` and defaults to INFO.
pub fn init_logging(component_name: &str, enable_file_logging: bool) -> Result<()> {
    let console_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_timer(LocalTime::rfc_3339())
        .pretty();

    let file = if enable_file_logging { Some(file_writer(component_name)?) } else { None };
    let log_dir = file.as_ref().map(|(_, _, dir)| dir.clone());
    let file_layer = file.map(|(writer, guard, _)| {
        // Lives as long as the process-wide subscriber
        std::mem::forget(guard);
        fmt::layer()
            .with_ansi(false)
            .with_timer(LocalTime::rfc_3339())
            .with_writer(writer)
            .with_filter(EnvFilter::from_default_env())
    });

    tracing_subscriber::registry()
        .with(default_filter(Level::INFO)?)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {e}"))?;

    match log_dir {
        Some(dir) => tracing::info!(component = component_name, log_dir = %dir.display(), "Logging to console and file"),
        None => tracing::info!(component = component_name, "Logging to console"),
    }
    Ok(())
}

/// Initialize compact console-only logging at the given default level
pub fn init_simple_logging(level: Level) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter(level)?)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize simple logging: {e}"))
}

static TEST_LOGGING_INIT: Once = Once::new();

/// Idempotent logging initialization for tests
///
/// Uses compact console output at `default_level` (INFO when `None`) unless
/// `RUST_LOG` says otherwise. A subscriber installed elsewhere is left alone.
pub fn ensure_test_logging(default_level: Option<Level>) {
    TEST_LOGGING_INIT.call_once(|| {
        let _ = init_simple_logging(default_level.unwrap_or(Level::INFO));
    });
}

/// `RUST_LOG` if set, otherwise the given level
fn default_filter(level: Level) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .map_err(|e| eyre::eyre!("Failed to create environment filter: {e}"))
}

/// Non-blocking writer to `$TMP/rdb-logs/<component_name>/<component_name>.log.<date>`.
/// Events are flushed when the guard drops.
fn file_writer(component_name: &str) -> Result<(NonBlocking, WorkerGuard, PathBuf)> {
    let log_dir = env::temp_dir().join("rdb-logs").join(component_name);
    fs::create_dir_all(&log_dir)?;
    let appender = rolling::daily(&log_dir, format!("{component_name}.log"));
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((writer, guard, log_dir))
}
