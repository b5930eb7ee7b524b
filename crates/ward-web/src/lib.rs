//! # 病房Web模块
//!
//! 基于axum的HTTP/JSON接口：病房查询、候床队列、床位分配、出院和物资申领。

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{create_app, AppState, WebServer};
