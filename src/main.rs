use std::sync::Arc;

use recipe_cache_server::logger::init_logger;
use recipe_cache_server::prelude::*;
use recipe_cache_server::Config;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    init_logger();
    info!("Starting recipe cache server");

    if let Err(e) = run().await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
    info!("Shutdown complete");
}

async fn run() -> recipe_cache_server::Result<()> {
    // 启动时一次性校验配置，缺少 cookie secret 直接退出
    let config = Config::load()?;
    config.validate()?;

    let store = match &config.data.seed_path {
        Some(path) => InMemoryRecipeStore::from_seed_file(path).await?,
        None => {
            info!("No seed data configured, starting with an empty store");
            InMemoryRecipeStore::new()
        }
    };

    let identity = SessionCookieResolver::new(config.cookie_secret()?);
    let state = Arc::new(AppState::new(
        Arc::new(store),
        Arc::new(identity),
        DirectiveProfiles::from(&config.cache),
    ));

    RecipeServer::new(config.bind_addr()?, state).run().await
}
