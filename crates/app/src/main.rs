//! ecat-sii: inspect and edit EtherCAT SII EEPROM images.
//!
//! Usage:
//!   ecat-sii device.bin
//!   ecat-sii device.bin --set-name EL1008 --compact --out edited.bin
//!   ecat-sii --seed 42 --out sample.bin

mod config;
mod input_gen;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Args, Config};
use ecat_sii_core::Sii;
use log::{info, warn};
use std::io::{self, Write};

fn main() -> Result<()> {
    let config = Config::from_args(Args::parse());

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter())).init();

    if config.print_config {
        config.print();
    }

    let stdout = io::stdout();
    run(&config, &mut stdout.lock())?;
    Ok(())
}

/// Load, edit, render and optionally persist one image.
fn run<W: Write>(config: &Config, out: &mut W) -> Result<Sii> {
    let mut sii = load(config)?;

    if config.has_edits() && config.output_file.is_none() {
        warn!("edits are only shown, pass --out to save them");
    }

    if let Some(name) = &config.set_name {
        sii.set_general_name(name).context("failed to set device name")?;
    }
    if let Some(group) = &config.set_group {
        sii.set_general_group(group).context("failed to set device group")?;
    }
    if let Some(order) = &config.set_order {
        sii.set_general_order(order).context("failed to set order number")?;
    }
    if config.compact {
        sii.compact_strings().context("failed to compact string table")?;
    }

    if !config.quiet {
        if let Some(path) = &config.input_file {
            writeln!(out, "{}", path.display())?;
        }
        writeln!(out, "{sii}")?;
        if !sii.checksum_valid()? {
            writeln!(out, "warning: info header checksum does not match")?;
        }
    }

    if let Some(path) = &config.output_file {
        sii.to_file(path)
            .with_context(|| format!("failed to write SII image {}", path.display()))?;
        info!("wrote {}", path.display());
    }

    Ok(sii)
}

fn load(config: &Config) -> Result<Sii> {
    match &config.input_file {
        Some(path) => {
            Sii::from_file(path).with_context(|| format!("failed to read SII image {}", path.display()))
        }
        None => {
            info!("no input given, generating sample image with seed {}", config.seed);
            let bytes = input_gen::generate_sample_image(config.seed).context("failed to generate sample image")?;
            Sii::from_bytes(&bytes).context("generated sample image does not decode")
        }
    }
}
