//! CLI argument parsing for the vme-decode tool
//!
//! # Design Principles (KISS)
//! - Use clap's derive macro for declarative argument definition
//! - Common arguments shared via composition, not inheritance
//! - One subcommand per task, each with its own Args struct

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::emulator::FadcReadout;

/// Common arguments shared by subcommands that read the configuration
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    /// Path to configuration file
    #[arg(short = 'f', long = "config", default_value = "config.toml")]
    pub config_file: String,
}

/// Decode raw VME module data
#[derive(Parser, Debug)]
#[command(name = "vme-decode", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode every module listed in the configuration
    Decode(DecodeArgs),

    /// Print each word of a file with its decoded kind
    Inspect(InspectArgs),

    /// Write a synthetic word stream for one module type
    Emulate(EmulateArgs),

    /// List registered module types
    Types,
}

/// Arguments for `decode`
#[derive(Parser, Debug, Clone)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Print JSON snapshots instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `inspect`
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// File of little-endian 32-bit words
    pub file: PathBuf,

    /// Module type id used to classify the words
    #[arg(short = 't', long = "type-id")]
    pub type_id: u32,

    /// Stop after this many words
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Arguments for `emulate`
#[derive(Parser, Debug, Clone)]
pub struct EmulateArgs {
    /// Module type id to emulate
    #[arg(short = 't', long = "type-id")]
    pub type_id: u32,

    /// Number of events
    #[arg(short = 'e', long, default_value = "10")]
    pub events: u32,

    /// Random seed
    #[arg(short = 's', long, default_value = "1")]
    pub seed: u64,

    /// Slot written into headers
    #[arg(long, default_value = "3")]
    pub slot: u32,

    /// FADC250 readout flavour
    #[arg(long, value_enum, default_value_t = FadcReadout::Window)]
    pub fadc: FadcReadout,

    /// Output file
    #[arg(short = 'o', long)]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_args_default() {
        let args = CommonArgs::try_parse_from(["test"]).unwrap();
        assert_eq!(args.config_file, "config.toml");
    }

    #[test]
    fn test_common_args_custom_config() {
        let args = CommonArgs::try_parse_from(["test", "-f", "custom.toml"]).unwrap();
        assert_eq!(args.config_file, "custom.toml");
    }

    #[test]
    fn test_decode_default() {
        let cli = Cli::try_parse_from(["vme-decode", "decode"]).unwrap();
        match cli.command {
            Commands::Decode(args) => {
                assert_eq!(args.common.config_file, "config.toml");
                assert!(!args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_decode_json_with_config() {
        let cli =
            Cli::try_parse_from(["vme-decode", "decode", "--config", "run.toml", "--json"])
                .unwrap();
        match cli.command {
            Commands::Decode(args) => {
                assert_eq!(args.common.config_file, "run.toml");
                assert!(args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_inspect_args() {
        let cli = Cli::try_parse_from([
            "vme-decode",
            "inspect",
            "data.bin",
            "--type-id",
            "1190",
            "-n",
            "20",
        ])
        .unwrap();
        match cli.command {
            Commands::Inspect(args) => {
                assert_eq!(args.file, PathBuf::from("data.bin"));
                assert_eq!(args.type_id, 1190);
                assert_eq!(args.limit, Some(20));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_inspect_requires_type_id() {
        assert!(Cli::try_parse_from(["vme-decode", "inspect", "data.bin"]).is_err());
    }

    #[test]
    fn test_emulate_defaults() {
        let cli =
            Cli::try_parse_from(["vme-decode", "emulate", "-t", "250", "-o", "out.bin"]).unwrap();
        match cli.command {
            Commands::Emulate(args) => {
                assert_eq!(args.type_id, 250);
                assert_eq!(args.events, 10);
                assert_eq!(args.seed, 1);
                assert_eq!(args.slot, 3);
                assert_eq!(args.fadc, FadcReadout::Window);
                assert_eq!(args.output, PathBuf::from("out.bin"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_emulate_full() {
        let cli = Cli::try_parse_from([
            "vme-decode",
            "emulate",
            "--type-id",
            "250",
            "--events",
            "100",
            "--seed",
            "42",
            "--fadc",
            "pulse",
            "-o",
            "fadc.bin",
        ])
        .unwrap();
        match cli.command {
            Commands::Emulate(args) => {
                assert_eq!(args.events, 100);
                assert_eq!(args.seed, 42);
                assert_eq!(args.fadc, FadcReadout::Pulse);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_types() {
        let cli = Cli::try_parse_from(["vme-decode", "types"]).unwrap();
        assert!(matches!(cli.command, Commands::Types));
    }
}
