use crate::domain::ports::ContractReader;
use crate::gateway::routes::{RouteTable, Scope};
use crate::utils::error::{RegistryError, Result};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// 閘道共享狀態：啟動時驗證過的路由表與查詢後端
pub struct GatewayState {
    routes: RouteTable,
    reader: Arc<dyn ContractReader>,
}

impl GatewayState {
    pub fn new(routes: RouteTable, reader: Arc<dyn ContractReader>) -> Result<Self> {
        let unsupported: Vec<&str> = routes
            .functions()
            .map(|f| f.name.as_str())
            .filter(|name| !reader.supports(name))
            .collect();

        if !unsupported.is_empty() {
            return Err(RegistryError::InterfaceError {
                message: format!(
                    "read backend cannot answer: {}",
                    unsupported.join(", ")
                ),
            });
        }

        Ok(Self { routes, reader })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match err {
            RegistryError::ContractRevert { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        ApiError::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.status.as_u16(),
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult = std::result::Result<Json<Value>, ApiError>;

pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/db", get(db))
        .route("/contract", get(contract))
        .route("/contract/functions", get(list_functions))
        .route("/contract/functions/:name", get(call_function))
        .route("/duties", get(duties))
        .route("/vehicles/:vin/:resource", get(vehicle_resource))
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let resources: Vec<String> = state
        .routes
        .resources()
        .iter()
        .map(|r| match r.scope {
            Scope::Contract => format!("/{}", r.name),
            Scope::Vehicle => format!("/vehicles/:vin/{}", r.name),
        })
        .collect();
    let functions: Vec<String> = state
        .routes
        .functions()
        .map(|f| format!("/contract/functions/{}", f.name))
        .collect();

    Json(json!({
        "address": state.routes.address(),
        "resources": resources,
        "functions": functions,
    }))
}

async fn db(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(json!({
        "contract": {
            "address": state.routes.address(),
            "abi": state.routes.abi(),
        }
    }))
}

async fn contract(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(json!({
        "address": state.routes.address(),
        "abi": state.routes.abi(),
    }))
}

async fn list_functions(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let functions: Vec<Value> = state
        .routes
        .functions()
        .map(|f| {
            json!({
                "name": f.name,
                "signature": f.signature(),
                "inputs": f.inputs,
                "outputs": f.outputs,
            })
        })
        .collect();
    Json(Value::Array(functions))
}

async fn call_function(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult {
    let function = state.routes.function(&name).ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            format!("no read function named '{}'", name),
        )
    })?;

    let mut args = Vec::with_capacity(function.inputs.len());
    for (index, param) in function.inputs.iter().enumerate() {
        // 未命名參數以 arg0, arg1... 傳入
        let key = if param.name.is_empty() {
            format!("arg{}", index)
        } else {
            param.name.clone()
        };
        let raw = query.get(&key).ok_or_else(|| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("missing query parameter '{}' ({})", key, param.kind),
            )
        })?;
        let value = param
            .coerce(raw)
            .map_err(|message| ApiError::new(StatusCode::BAD_REQUEST, message))?;
        args.push(value);
    }

    tracing::debug!("🔎 {} with {} args", function.signature(), args.len());
    let result = state
        .reader
        .read(state.routes.address(), &function.name, &args)
        .await?;

    Ok(Json(json!({ "function": function.name, "result": result })))
}

async fn duties(State(state): State<Arc<GatewayState>>) -> ApiResult {
    let resource_route = state
        .routes
        .resource("duties", Scope::Contract)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "no duties resource"))?;

    let raw = state
        .reader
        .read(state.routes.address(), resource_route.method, &[])
        .await?;
    Ok(Json((resource_route.decode)("", raw)?))
}

async fn vehicle_resource(
    State(state): State<Arc<GatewayState>>,
    Path((vin, resource)): Path<(String, String)>,
) -> ApiResult {
    let resource_route = state
        .routes
        .resource(&resource, Scope::Vehicle)
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                format!("unknown vehicle resource '{}'", resource),
            )
        })?;

    let raw = state
        .reader
        .read(state.routes.address(), resource_route.method, &[Value::String(vin.clone())])
        .await?;
    Ok(Json((resource_route.decode)(&vin, raw)?))
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "resource not found")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("⚠️ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutting down gateway");
}

/// 綁定位址並處理請求直到收到 Ctrl-C
pub async fn serve(state: Arc<GatewayState>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RegistryError::GatewayError {
            message: format!("failed to bind {}: {}", addr, e),
        })?;

    tracing::info!(
        addr = %addr,
        contract = %state.routes.address(),
        "🌐 Read gateway listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RegistryError::GatewayError {
            message: format!("gateway server error: {}", e),
        })
}
