use anyhow::{bail, Context, Result};

use peer_beacon::config::NodeConfig;

use super::{config_path, load_config};

/// `config show`: print the effective config (file values over defaults).
pub fn run_show(explicit: Option<&str>) -> Result<()> {
    let config = load_config(explicit)?;
    let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
    println!("{}", json);
    Ok(())
}

/// `config init`: write the default config. Refuses to clobber without `--force`.
pub fn run_init(explicit: Option<&str>, force: bool) -> Result<()> {
    let path = config_path(explicit);
    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    NodeConfig::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

/// `config path`
pub fn run_path() -> Result<()> {
    println!("{}", config_path(None).display());
    Ok(())
}
