use std::path::Path;

use anyhow::{Context, Result};

/// Installs the global logger.
///
/// `config/log4rs.yaml` under `workspace_root` takes precedence, which lets a
/// deployment send logs to a file instead of the terminal the chat runs in.
/// Without it, `env_logger` writes to stderr filtered by `RUST_LOG`
/// (default `warn`).
pub fn init(workspace_root: &Path) -> Result<()> {
    let config_path = workspace_root.join("config/log4rs.yaml");
    if config_path.exists() {
        log4rs::init_file(&config_path, Default::default())
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        return Ok(());
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init()
        .context("failed to initialise logger")
}
