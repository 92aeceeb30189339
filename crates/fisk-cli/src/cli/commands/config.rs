//! `fisk config` – show the effective configuration.

use anyhow::Result;
use fisk_core::config::{self, FiskConfig};

pub fn run_config(cfg: &FiskConfig) -> Result<()> {
    let path = config::config_path()?;
    println!("config file: {}", path.display());
    println!();
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
