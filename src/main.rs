use std::sync::Arc;

use patchboard::config::GlobalConfig;
use patchboard::dispatch::CommandDispatcher;
use patchboard::ipc::ApiServer;
use patchboard::monitor::store::{KeyValueStore, MemoryStore, RedisStore};
use patchboard::monitor::MonitorAggregator;
use patchboard::registry::ModuleRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("patchboard daemon starting");

    let cfg = GlobalConfig::load()?;

    let module_root = cfg.module_root();
    let names = cfg.modules();
    if names.is_empty() {
        tracing::warn!("No modules configured; every lifecycle request will be rejected");
    }
    let registry = Arc::new(ModuleRegistry::new(&module_root, &names));
    tracing::info!("Registered {} modules under {}", registry.len(), module_root);
    for module in registry.list() {
        tracing::info!("  - {}", module.name);
    }

    let dispatcher = Arc::new(CommandDispatcher::with_timeout(
        registry.clone(),
        cfg.command_timeout(),
    ));

    let redis_url = cfg.redis_url();
    let store: Arc<dyn KeyValueStore> = if redis_url == "memory" {
        tracing::warn!("Using in-process key-value store; monitoring state is not shared");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(RedisStore::open(&redis_url)?)
    };
    let aggregator = Arc::new(MonitorAggregator::new(store));

    let server = ApiServer::new(registry, dispatcher, aggregator, &cfg.listen_addr());
    if let Err(e) = server.start().await {
        tracing::error!("Control surface error: {}", e);
    }

    tracing::info!("patchboard daemon shutting down");
    Ok(())
}
