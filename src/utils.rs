use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Daily rotated `langprogress.log` under `log` when given, stdout otherwise.
/// The level comes from `RUST_LOG`, `info` by default.
pub fn init_log(log: Option<PathBuf>) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let subscriber_builder = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true);
    let (non_blocking, guard) = if let Some(log) = log {
        if !log.is_dir() {
            bail!("log path {} is not a directory", log.display());
        }
        let file_appender = tracing_appender::rolling::daily(log, "langprogress.log");
        tracing_appender::non_blocking(file_appender)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };
    tracing::subscriber::set_global_default(
        subscriber_builder.with_writer(non_blocking).finish(),
    )
    .context("init log failed")?;
    Ok(guard)
}
