use anyhow::Result;

use appmover::{MoveManager, MoverConfig};

fn main() -> Result<()> {
    appmover::logging::init_logging()?;

    tracing::info!("appmover starting...");

    let config_path = appmover::utils::exe_dir().join("appmover.toml");
    let config = MoverConfig::load_or_default(&config_path)?;

    if !config.app.enabled {
        tracing::info!("Relocation offer disabled in config");
        return Ok(());
    }

    let mut manager = MoveManager::with_defaults("appmover", &config)?;
    let outcome = manager.check_application_folder();

    tracing::info!("Relocation check finished: {:?}", outcome);
    Ok(())
}
