//! HTTP control surface. Thin by intent: routes split the path into a
//! (module, verb) pair or a file operation and hand off to the dispatcher,
//! the file collaborator, or the monitoring aggregator.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::dispatch::CommandDispatcher;
use crate::files;
use crate::monitor::MonitorAggregator;
use crate::registry::{Module, ModuleRegistry};

/// Shared state for the control surface.
#[derive(Clone)]
pub struct ApiServer {
    pub registry: Arc<ModuleRegistry>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub aggregator: Arc<MonitorAggregator>,
    pub listen_addr: String,
}

#[derive(Debug, Serialize)]
struct ModuleInfo {
    name: String,
    script_path: String,
    config_path: String,
    log_path: String,
}

impl ApiServer {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        dispatcher: Arc<CommandDispatcher>,
        aggregator: Arc<MonitorAggregator>,
        listen_addr: &str,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            aggregator,
            listen_addr: listen_addr.to_string(),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/modules", get(list_modules))
            .route("/api/module/:name/log", get(get_module_log))
            .route(
                "/api/module/:name/config",
                get(get_module_config).put(put_module_config),
            )
            .route(
                "/api/module/:name/:verb",
                get(dispatch_command).post(dispatch_command),
            )
            .route("/api/monitor", get(get_monitor_snapshot))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    pub async fn start(self) -> Result<()> {
        tracing::info!("Control surface starting on {}", self.listen_addr);

        let router = self.router();
        let listener = tokio::net::TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("Listening on http://{}", self.listen_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("Shutdown signal received");
}

/// GET /api/modules - registry listing
async fn list_modules(State(state): State<ApiServer>) -> impl IntoResponse {
    let modules: Vec<ModuleInfo> = state
        .registry
        .list()
        .map(|m| ModuleInfo {
            name: m.name.clone(),
            script_path: m.script_path.display().to_string(),
            config_path: m.config_path.display().to_string(),
            log_path: m.log_path.display().to_string(),
        })
        .collect();
    Json(json!({ "modules": modules }))
}

/// GET|POST /api/module/:name/:verb - lifecycle dispatch
///
/// Always 200: failure travels in the result body, the way the panel has
/// always reported it.
async fn dispatch_command(
    Path((name, verb)): Path<(String, String)>,
    State(state): State<ApiServer>,
) -> impl IntoResponse {
    let result = state.dispatcher.execute(&name, &verb).await;
    Json(result)
}

/// GET /api/module/:name/log - module log file, empty when absent
async fn get_module_log(
    Path(name): Path<String>,
    State(state): State<ApiServer>,
) -> impl IntoResponse {
    let module = match state.registry.resolve(&name) {
        Some(module) => module,
        None => return module_not_found(&name),
    };
    match files::read_log(module) {
        Ok(content) => file_body(module, &module.log_path, content),
        Err(e) => internal_error(format!("Failed to read log: {}", e)),
    }
}

/// GET /api/module/:name/config - module .ini file, empty when absent
async fn get_module_config(
    Path(name): Path<String>,
    State(state): State<ApiServer>,
) -> impl IntoResponse {
    let module = match state.registry.resolve(&name) {
        Some(module) => module,
        None => return module_not_found(&name),
    };
    match files::read_config(module) {
        Ok(content) => file_body(module, &module.config_path, content),
        Err(e) => internal_error(format!("Failed to read config: {}", e)),
    }
}

/// PUT /api/module/:name/config - overwrite the module .ini file verbatim
async fn put_module_config(
    Path(name): Path<String>,
    State(state): State<ApiServer>,
    body: String,
) -> impl IntoResponse {
    let module = match state.registry.resolve(&name) {
        Some(module) => module,
        None => return module_not_found(&name),
    };
    match files::write_config(module, &body) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": format!("Saved {} settings to file", module.name),
            })),
        )
            .into_response(),
        Err(e) => internal_error(format!("Failed to write config: {}", e)),
    }
}

/// GET /api/monitor - sorted key/value snapshot from the shared store
async fn get_monitor_snapshot(State(state): State<ApiServer>) -> impl IntoResponse {
    match state.aggregator.snapshot().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => internal_error(format!("Monitoring snapshot failed: {}", e)),
    }
}

fn file_body(
    module: &Module,
    path: &std::path::Path,
    content: Option<String>,
) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({
            "name": module.name,
            "filename": path.display().to_string(),
            "content": content.unwrap_or_default(),
        })),
    )
        .into_response()
}

fn module_not_found(name: &str) -> axum::response::Response {
    let error = json!({ "error": format!("Module '{}' not found", name) });
    (StatusCode::NOT_FOUND, Json(error)).into_response()
}

fn internal_error(message: String) -> axum::response::Response {
    tracing::error!("{}", message);
    let error = json!({ "error": message });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
}
