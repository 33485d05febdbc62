use std::sync::Arc;
use std::thread;

use serialbridge::config::AppConfig;
use serialbridge::errors::BridgeResult;
use serialbridge::listener;

const DEFAULT_CONFIG_PATH: &str = "serialbridge.json";

fn main() -> BridgeResult<()> {
    env_logger::init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load_from_file(&config_path)?;
    log::info!("serialbridge starting, {} bridge(s) configured", config.bridges.len());

    let mut handles = Vec::new();
    for entry in config.bridges {
        let entry = Arc::new(entry);
        handles.push(thread::spawn(move || {
            if let Err(e) = listener::run(entry.clone()) {
                log::error!("bridge '{}' stopped: {}", entry.name, e);
            }
        }));
    }

    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}
