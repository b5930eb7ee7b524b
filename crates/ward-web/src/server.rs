//! Web服务器

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use ward_core::Result;
use ward_workflow::WardWorkflow;

use crate::handlers::*;

/// 处理器共享状态
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<WardWorkflow>,
}

impl AppState {
    pub fn new(workflow: WardWorkflow) -> Self {
        Self {
            workflow: Arc::new(workflow),
        }
    }
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            app: create_app(state),
        }
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app).await?;

        Ok(())
    }
}

/// 构建完整路由
pub fn create_app(state: AppState) -> Router {
    Router::new()
        // 根路径
        .route("/", get(api_root))
        // 健康检查
        .route("/health", get(health))
        // API路由
        .nest("/api/v1", api_routes())
        .with_state(state)
        // 全局中间件
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// API v1 路由
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api_root))
        .route("/wards", get(list_wards))
        .route("/wards/:ward_number/beds", get(free_beds))
        .route("/wards/:ward_number/staff", get(ward_staff))
        .route("/wards/:ward_number/selection", get(ward_selection))
        .route(
            "/waiting-list",
            get(pending_waiting_list).post(add_to_waiting_list),
        )
        .route("/waiting-list/:list_id/assign", post(assign_bed))
        .route("/waiting-list/:list_id/withdraw", post(withdraw))
        .route("/waiting-list/:list_id/actions", get(waiting_list_actions))
        .route("/inpatients", get(list_inpatients))
        .route("/inpatients/stats", get(roster_stats))
        .route("/inpatients/:patient_number/discharge", post(discharge))
        .route(
            "/requisitions",
            get(list_requisitions).post(create_requisition),
        )
}
