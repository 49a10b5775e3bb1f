//! Configuration for the ecat-sii application.
//!
//! Handles parsing command-line arguments and resolving them into a plain
//! [`Config`].
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments: without an input image it
//! generates a sample one from a seed. The seed is printed with
//! `--print-config` so runs are reproducible.

use clap::Parser;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "ecat-sii")]
#[command(about = "Inspect and edit EtherCAT SII EEPROM images")]
#[command(version)]
pub struct Args {
    /// SII image to load (default: generate a sample image)
    pub input: Option<PathBuf>,

    /// Write the (possibly edited) image to this path
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Set the device name string
    #[arg(long, value_name = "TEXT")]
    pub set_name: Option<String>,

    /// Set the device group string
    #[arg(long, value_name = "TEXT")]
    pub set_group: Option<String>,

    /// Set the order number string
    #[arg(long, value_name = "TEXT")]
    pub set_order: Option<String>,

    /// Compact the string table before writing
    #[arg(long)]
    pub compact: bool,

    /// Seed for sample image generation (default: time based)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print resolved configuration
    #[arg(long)]
    pub print_config: bool,

    /// Don't print the decoded document
    #[arg(short, long)]
    pub quiet: bool,

    /// Log category-level decode/encode activity
    #[arg(short, long)]
    pub verbose: bool,
}

/// Complete configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // === Files ===
    /// Input image path (None = generate sample)
    pub input_file: Option<PathBuf>,

    /// Output image path (None = don't write)
    pub output_file: Option<PathBuf>,

    /// Seed used when generating a sample image
    pub seed: u64,

    // === Edits ===
    pub set_name: Option<String>,
    pub set_group: Option<String>,
    pub set_order: Option<String>,

    /// Whether to compact the string table
    pub compact: bool,

    // === Behavior ===
    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to suppress the document dump
    pub quiet: bool,

    /// Whether to raise the default log level to debug
    pub verbose: bool,
}

impl Config {
    /// Resolve parsed arguments into a configuration.
    ///
    /// If --seed is not given, a time-based seed is chosen.
    pub fn from_args(args: Args) -> Self {
        let seed = args.seed.unwrap_or_else(time_seed);

        Config {
            input_file: args.input,
            output_file: args.out,
            seed,
            set_name: args.set_name,
            set_group: args.set_group,
            set_order: args.set_order,
            compact: args.compact,
            print_config: args.print_config,
            quiet: args.quiet,
            verbose: args.verbose,
        }
    }

    /// True when the run changes the document.
    pub fn has_edits(&self) -> bool {
        self.set_name.is_some() || self.set_group.is_some() || self.set_order.is_some() || self.compact
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.input_file {
            Some(path) => println!("Input file:  {}", path.display()),
            None => println!("Input file:  (generate sample, seed {})", self.seed),
        }
        match &self.output_file {
            Some(path) => println!("Output file: {}", path.display()),
            None => println!("Output file: (none)"),
        }
        println!();
        println!("=== Edits ===");
        println!("Name:    {}", self.set_name.as_deref().unwrap_or("(unchanged)"));
        println!("Group:   {}", self.set_group.as_deref().unwrap_or("(unchanged)"));
        println!("Order:   {}", self.set_order.as_deref().unwrap_or("(unchanged)"));
        println!("Compact: {}", self.compact);
        println!();
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
