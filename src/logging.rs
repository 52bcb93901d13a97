use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;
use std::path::Path;

/// Logs go to `log_file` when given. Without one the default filter is `off`,
/// since stderr shares the screen with the UI; `RUST_LOG` still wins.
pub(crate) fn init(log_file: Option<&Path>) -> Result<()> {
    let default_filter = if log_file.is_some() { "info" } else { "off" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter));
    builder.format_timestamp_millis();
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.try_init().context("logger already initialised")?;
    log::info!("spacepresence {} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}
