//! Tracing setup shared by the word-movement binaries.
//!
//! Logs go to stderr unless `WM_LOG_DIR` is set, in which case they are
//! written to `<WM_LOG_DIR>/<app>.log` with daily rotation. Stdout stays free
//! for the run summary.

use std::panic;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

pub const LOG_DIR_ENV: &str = "WM_LOG_DIR";
pub const LOG_BACKTRACE_ENV: &str = "WM_LOG_INCLUDE_BACKTRACE";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Filter directive for a `-v` count: 0 defers to `RUST_LOG` (default `info`).
pub fn filter_for_verbosity(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Routes panics through `tracing` so they land in the rotated log file too.
/// Installed once per process.
pub fn install_tracing_panic_hook(app_name: &'static str) {
    static INSTALLED: OnceLock<()> = OnceLock::new();

    INSTALLED.get_or_init(|| {
        let default_hook = panic::take_hook();
        let include_backtrace = std::env::var(LOG_BACKTRACE_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()));
            let message = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".into());

            tracing::error!(
                application = app_name,
                location = location.as_deref().unwrap_or("unknown"),
                panic_message = %message,
                "panic"
            );

            if include_backtrace {
                default_hook(info);
            }
        }));
    });
}

fn log_dir() -> Option<PathBuf> {
    std::env::var_os(LOG_DIR_ENV).map(PathBuf::from)
}

fn rotating_file_writer(app_name: &'static str, dir: PathBuf) -> Option<BoxMakeWriter> {
    if let Err(err) = std::fs::create_dir_all(&dir) {
        eprintln!(
            "{app_name}: cannot create {LOG_DIR_ENV} {}: {err}; logging to stderr",
            dir.display()
        );
        return None;
    }

    let appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(BoxMakeWriter::new(non_blocking))
}

/// Installs the global subscriber. Calling it again is a no-op.
pub fn init_tracing_subscriber(app_name: &'static str, verbose: u8) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_for_verbosity(verbose))
        .with_target(false);

    let writer = log_dir()
        .and_then(|dir| rotating_file_writer(app_name, dir))
        .unwrap_or_else(|| BoxMakeWriter::new(std::io::stderr));

    let _ = builder.with_writer(writer).try_init();
}
