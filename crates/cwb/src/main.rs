use std::sync::Arc;

use tracing::info;

use cwb_core::{config::Config, store::JsonFileStore};
use cwb_vision::VisionClient;

#[tokio::main]
async fn main() -> Result<(), cwb_core::Error> {
    let cfg = Arc::new(Config::load()?);
    let _log_guard = cwb_core::logging::init("cwb", cfg.log_dir.as_deref())?;

    // Without its sessions the bot cannot serve anyone: fail startup.
    let store = Arc::new(JsonFileStore::open(&cfg.session_store_path).await?);
    info!(
        path = %store.path().display(),
        "session store opened"
    );

    let source = Arc::new(VisionClient::new(
        cfg.status_endpoint.clone(),
        cfg.fetch_timeout,
    )?);

    cwb_telegram::router::run_polling(cfg, store, source)
        .await
        .map_err(|e| cwb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
