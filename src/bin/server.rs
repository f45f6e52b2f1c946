use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use rusty_chat_hub::config::ServerConfig;
use rusty_chat_hub::constants::WS_PATH;
use rusty_chat_hub::core::ServerState;
use rusty_chat_hub::handlers::routes;

#[tokio::main]
async fn main() {
    // Initialize env
    let dotenv_result = dotenvy::dotenv();

    // Initialize logging
    env_logger::init();

    match dotenv_result {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Load config from env
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, origin={}, rate limit={} per {:?}",
        config.host,
        config.port,
        config.allowed_origin,
        config.rate_limit_permits,
        config.rate_limit_window
    );

    // Build the server address
    let addr: SocketAddr = match config.bind_address().parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(ServerState::new(config));
    state.start_cleanup_tasks();

    info!("Starting chat hub on {} (socket at /{})", addr, WS_PATH);

    warp::serve(routes(state)).run(addr).await;
}
