//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// JEDEC ID of the chip emulated when none is given (Winbond W25Q64)
pub const DEFAULT_JEDEC_ID: u32 = 0xEF4017;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "blackbox")]
#[command(author, version, about = "Flight data recorder and flash tools", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// The emulated flash chip a maintenance command works on
#[derive(Args, Debug, Clone)]
pub struct ChipArgs {
    /// Flash image file (created erased if missing)
    #[arg(short, long)]
    pub image: PathBuf,

    /// JEDEC ID the emulated chip answers with (hex or decimal)
    #[arg(short, long, value_parser = parse_hex_u32, default_value_t = DEFAULT_JEDEC_ID)]
    pub jedec_id: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record serial input into log files, forever
    Run {
        /// Directory holding the configuration and the log files
        #[arg(short, long)]
        dir: PathBuf,

        /// Serial input to record ("-" or omitted for stdin)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Detect the flash chip and show its geometry and partitions
    Probe {
        #[command(flatten)]
        chip: ChipArgs,
    },

    /// List supported flash chips
    ListChips {
        /// Only show chips from this vendor
        #[arg(long)]
        vendor: Option<String>,
    },

    /// Erase one sector or the whole chip
    Erase {
        #[command(flatten)]
        chip: ChipArgs,

        /// Sector to erase
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        sector: Option<u16>,

        /// Erase the whole chip
        #[arg(long)]
        all: bool,
    },

    /// Read flash contents to a file
    Read {
        #[command(flatten)]
        chip: ChipArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (defaults to the log storage partition)
        #[arg(long, value_parser = parse_hex_u32)]
        start: Option<u32>,

        /// Number of bytes (defaults to the rest of the log storage partition)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Write a file into flash, erasing the sectors it touches
    Write {
        #[command(flatten)]
        chip: ChipArgs,

        /// Input file path
        #[arg(long)]
        input: PathBuf,

        /// Start address (defaults to the log storage partition)
        #[arg(long, value_parser = parse_hex_u32)]
        start: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0xEF4017"), Ok(0xEF4017));
        assert_eq!(parse_hex_u32("0X10"), Ok(16));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("ten").is_err());
    }

    #[test]
    fn test_erase_needs_a_target() {
        assert!(Cli::try_parse_from(["blackbox", "erase", "--image", "x.bin"]).is_err());
        assert!(
            Cli::try_parse_from(["blackbox", "erase", "--image", "x.bin", "--sector", "1", "--all"])
                .is_err()
        );

        let cli = Cli::try_parse_from(["blackbox", "erase", "--image", "x.bin", "--sector", "3"]).unwrap();
        match cli.command {
            Commands::Erase { chip, sector, all } => {
                assert_eq!(chip.jedec_id, DEFAULT_JEDEC_ID);
                assert_eq!(sector, Some(3));
                assert!(!all);
            }
            _ => panic!("expected erase"),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["blackbox", "list-chips", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
