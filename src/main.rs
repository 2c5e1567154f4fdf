//! sunvox-host - Load the SunVox engine, run one session, unload it.
//!
//! # Usage
//!
//! ```bash
//! sunvox-host                          # load, init, open and close slot 0, unload
//! sunvox-host version                  # engine version and sample rate
//! sunvox-host info song.sunvox         # song summary (add --json for JSON)
//! sunvox-host modules song.sunvox      # module table
//! sunvox-host module song.sunvox 1     # one module with its controllers
//! sunvox-host patterns song.sunvox     # pattern table
//! sunvox-host play song.sunvox -d 10   # play for at most 10 seconds
//! ```
//!
//! The library is looked up next to the working directory unless `--lib`
//! or `SUNVOX_LIB` points elsewhere. Set `RUST_LOG=debug` to follow each
//! lifecycle step.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sunvox_host::audio::{
    InitFlags, InitParams, LibraryLoader, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, MAX_VOLUME,
};
use sunvox_host::commands::{self, PlayOptions};
use tracing_subscriber::EnvFilter;

/// Command-line options.
#[derive(Parser, Debug)]
#[command(name = "sunvox-host")]
#[command(about = "Minimal host for the SunVox modular synthesizer library")]
#[command(version)]
struct Cli {
    /// Path to the SunVox shared library
    #[arg(long, env = "SUNVOX_LIB", global = true)]
    lib: Option<PathBuf>,

    /// Requested sample rate in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE, global = true,
          value_parser = clap::value_parser!(u32).range(1..=i64::from(i32::MAX)))]
    sample_rate: u32,

    /// Requested channel count
    #[arg(long, default_value_t = DEFAULT_CHANNELS, global = true,
          value_parser = clap::value_parser!(u32).range(1..=i64::from(i32::MAX)))]
    channels: u32,

    /// Engine init flags (bitwise OR of the SV_INIT_FLAG values)
    #[arg(long, default_value_t = 0, global = true)]
    flags: u32,

    /// Engine configuration string, e.g. "buffer=1024|audiodriver=alsa"
    #[arg(long, global = true)]
    engine_config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the engine version and actual sample rate
    Version,
    /// Show song information
    Info {
        /// Path to a .sunvox file
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the modules of a song
    Modules {
        /// Path to a .sunvox file
        file: PathBuf,
    },
    /// Show one module and its controllers
    Module {
        /// Path to a .sunvox file
        file: PathBuf,
        /// Module number
        id: i32,
    },
    /// List the patterns of a song
    Patterns {
        /// Path to a .sunvox file
        file: PathBuf,
    },
    /// Play a song
    Play {
        /// Path to a .sunvox file
        file: PathBuf,
        /// Maximum playback duration in seconds
        #[arg(short, long)]
        duration: Option<f64>,
        /// Start playback from this line
        #[arg(short, long)]
        line: Option<i32>,
        /// Playback volume (0-256)
        #[arg(short, long, default_value_t = MAX_VOLUME,
              value_parser = clap::value_parser!(i32).range(0..=256))]
        volume: i32,
    },
}

impl Cli {
    fn init_params(&self) -> InitParams {
        InitParams {
            config: self.engine_config.clone(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            flags: InitFlags::from_bits(self.flags),
        }
    }
}

/// Main entry point.
///
/// Returns an error (exit status 1) when the engine library cannot be
/// loaded or a subcommand fails.
fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let loader = LibraryLoader::from_override(cli.lib.clone());
    let params = cli.init_params();
    let mut out = io::stdout().lock();

    match cli.command {
        None => commands::demo(&loader, &params),
        Some(Command::Version) => commands::version(&loader, &params, &mut out),
        Some(Command::Info { file, json }) => {
            commands::info(&loader, &params, &file, json, &mut out)
        }
        Some(Command::Modules { file }) => commands::modules(&loader, &params, &file, &mut out),
        Some(Command::Module { file, id }) => {
            commands::module_info(&loader, &params, &file, id, &mut out)
        }
        Some(Command::Patterns { file }) => commands::patterns(&loader, &params, &file, &mut out),
        Some(Command::Play {
            file,
            duration,
            line,
            volume,
        }) => {
            let options = PlayOptions {
                duration,
                line,
                volume,
            };
            let interrupted = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&interrupted);
            ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
                .context("Failed to set Ctrl+C handler")?;
            commands::play(&loader, &params, &file, &options, &interrupted, &mut out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_ints_must_fit() {
        let too_big = (i64::from(i32::MAX) + 1).to_string();
        let args = ["sunvox-host", "--sample-rate", too_big.as_str(), "version"];
        assert!(Cli::try_parse_from(args).is_err());
        assert!(Cli::try_parse_from(["sunvox-host", "--channels", "0", "version"]).is_err());

        let cli = Cli::try_parse_from(["sunvox-host", "--sample-rate", "48000", "version"]).unwrap();
        assert_eq!(cli.init_params().sample_rate, 48000);
        assert_eq!(cli.init_params().channels, DEFAULT_CHANNELS);
    }

    #[test]
    fn test_module_command_parses_id() {
        let cli = Cli::try_parse_from(["sunvox-host", "module", "song.sunvox", "3"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Module { id: 3, .. })));
    }
}
