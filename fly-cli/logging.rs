use std::path::Path;

use anyhow::{
  Context,
  Result,
};

/// Send `log` records (and `tracing` events, through its `log` feature) to
/// `file`. `verbosity` counts `-v` flags.
pub fn setup_logging(verbosity: u8, file: &Path) -> Result<()> {
  let level = match verbosity {
    0 => log::LevelFilter::Warn,
    1 => log::LevelFilter::Info,
    2 => log::LevelFilter::Debug,
    _ => log::LevelFilter::Trace,
  };

  let file = fern::log_file(file)
    .with_context(|| format!("failed to open log file {}", file.display()))?;

  fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .level(level)
    .chain(file)
    .apply()
    .context("failed to install logger")?;
  Ok(())
}
