//! localvold - serves the volume driver over JSON lines.
//!
//! Reads one request per stdin line (`{"Method":"Mount","Name":"app"}`) and
//! writes one response per stdout line. Logs go to stderr or `--log-dir`.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use localvol::{DriverOptions, LinkStrategy, VolumeDriver, init_logging};

#[derive(Debug, Parser)]
#[command(name = "localvold", version, about = "Local volume driver")]
struct Cli {
    /// JSON options file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root directory holding _volumes/ and _mounts/.
    #[arg(long)]
    root: Option<PathBuf>,

    #[arg(long, value_enum)]
    link_strategy: Option<LinkStrategy>,

    /// Timeout for `ln`/`rm` with --link-strategy=command.
    #[arg(long)]
    command_timeout_secs: Option<u64>,

    /// Write rolling log files here instead of stderr.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_options(self) -> anyhow::Result<DriverOptions> {
        let mut options = match &self.config {
            Some(path) => DriverOptions::from_json_file(path)?,
            None => DriverOptions::default(),
        };
        if let Some(root) = self.root {
            options.root_dir = root;
        }
        if let Some(strategy) = self.link_strategy {
            options.link_strategy = strategy;
        }
        if let Some(secs) = self.command_timeout_secs {
            options.command_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = self.log_dir {
            options.log.dir = Some(dir);
        }
        if let Some(level) = self.log_level {
            options.log.level = level;
        }
        Ok(options)
    }
}

fn main() -> anyhow::Result<()> {
    let options = Cli::parse().into_options()?;
    let _log_guard = init_logging(&options.log)?;

    let driver = VolumeDriver::from_options(&options).context("failed to start volume driver")?;
    tracing::info!(root = %driver.root().display(), "Serving requests on stdin");

    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lines() {
        let line = line.context("failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = driver.handle_line(&line);
        writeln!(stdout, "{}", response).context("failed to write response")?;
        stdout.flush()?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
