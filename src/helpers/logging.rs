use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use flexi_logger::{
    colored_default_format, detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger,
    LoggerHandle, Naming, WriteMode,
};
use log::Level;

const ROTATE_AT_BYTES: u64 = 4 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 5;

#[derive(Args, Debug)]
#[group(id = "logging")]
pub struct Params {
    #[clap(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// Use a flexi_logger configuration file
    #[arg(long = "log-spec")]
    use_log_spec: bool,

    /// Path to log spec
    #[arg(long, value_name = "TOML FILE", default_value = "logspec.toml")]
    log_spec_file: PathBuf,

    /// Additionally write rotated log files into this directory. Useful when the bot runs
    /// unattended and boot histories need to be looked at later.
    #[arg(long, value_name = "DIR", env = "LOG_DIRECTORY")]
    log_directory: Option<PathBuf>,
}

pub fn configure_from(params: &Params) -> Result<LoggerHandle> {
    // log_level() returns None iff verbosity < 0, i.e. being most quiet seems reasonable
    let cli_level = params.verbose.log_level().unwrap_or(Level::Error);

    let mut log_builder = Logger::try_with_env_or_str(cli_level.to_string())
        .context("Failed to parse logger spec from env RUST_LOG or cli level")?
        .write_mode(WriteMode::Async)
        .format_for_stdout(colored_default_format)
        .format_for_files(detailed_format);

    if let Some(dir) = &params.log_directory {
        log_builder = log_builder
            .log_to_file(FileSpec::default().directory(dir))
            .duplicate_to_stdout(Duplicate::All)
            .rotate(
                Criterion::Size(ROTATE_AT_BYTES),
                Naming::Timestamps,
                Cleanup::KeepLogFiles(KEEP_LOG_FILES),
            );
    }

    if params.use_log_spec {
        log_builder
            .start_with_specfile(&params.log_spec_file)
            .with_context(|| format!("Failed to start logger with specfile {:?}", params.log_spec_file))
    } else {
        log_builder
            .start()
            .context("Failed to start logger handle w/o specfile")
    }
}
