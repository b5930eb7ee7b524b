//! HTTP处理器

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use tracing::info;
use ward_core::{NewRequisition, NewWaitingListEntry};
use ward_workflow::{AssignBedRequest, RosterFilter};

use crate::error::ApiResult;
use crate::server::AppState;

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "Ward Placement API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "api": "/api/v1"
        }
    }))
}

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ========== 病房 ==========

/// 病房及床位
pub async fn list_wards(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let wards = state.workflow.wards_with_beds().await?;
    Ok(Json(json!({
        "total": wards.len(),
        "wards": wards
    })))
}

/// 病房空闲床位
pub async fn free_beds(
    State(state): State<AppState>,
    ward_number: Result<Path<i32>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(ward_number) = ward_number?;
    let beds = state.workflow.free_beds(ward_number).await?;
    Ok(Json(json!({
        "ward_number": ward_number,
        "total": beds.len(),
        "beds": beds
    })))
}

/// 病房工作人员
pub async fn ward_staff(
    State(state): State<AppState>,
    ward_number: Result<Path<i32>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(ward_number) = ward_number?;
    let staff = state.workflow.ward_staff(ward_number).await?;
    Ok(Json(json!({
        "ward_number": ward_number,
        "total": staff.len(),
        "staff": staff
    })))
}

/// 空闲床位与工作人员
pub async fn ward_selection(
    State(state): State<AppState>,
    ward_number: Result<Path<i32>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(ward_number) = ward_number?;
    Ok(Json(state.workflow.ward_selection(ward_number).await?))
}

// ========== 候床队列 ==========

pub async fn pending_waiting_list(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let entries = state.workflow.pending_waiting_list().await?;
    Ok(Json(json!({
        "total": entries.len(),
        "entries": entries
    })))
}

pub async fn add_to_waiting_list(
    State(state): State<AppState>,
    entry: Result<Json<NewWaitingListEntry>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(entry) = entry?;
    let created = state.workflow.add_to_waiting_list(entry).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// 床位分配
pub async fn assign_bed(
    State(state): State<AppState>,
    list_id: Result<Path<i64>, PathRejection>,
    request: Result<Json<AssignBedRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(list_id) = list_id?;
    let Json(request) = request?;
    info!("Assigning bed {} for waiting list entry {}", request.bed_number, list_id);
    let inpatient = state.workflow.assign_bed(list_id, request).await?;
    Ok((StatusCode::CREATED, Json(inpatient)))
}

pub async fn withdraw(
    State(state): State<AppState>,
    list_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(list_id) = list_id?;
    Ok(Json(state.workflow.withdraw(list_id).await?))
}

/// 候床条目当前可执行的操作
pub async fn waiting_list_actions(
    State(state): State<AppState>,
    list_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(list_id) = list_id?;
    let actions = state.workflow.waiting_list_actions(list_id).await?;
    Ok(Json(json!({
        "list_id": list_id,
        "actions": actions
    })))
}

// ========== 在院与出院 ==========

/// 在院名单查询
pub async fn list_inpatients(
    State(state): State<AppState>,
    filter: Result<Query<RosterFilter>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(filter) = filter?;
    Ok(Json(state.workflow.active_roster(&filter).await?))
}

pub async fn roster_stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.workflow.roster_stats().await?))
}

pub async fn discharge(
    State(state): State<AppState>,
    Path(patient_number): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.workflow.discharge(&patient_number).await?))
}

// ========== 物资申领 ==========

pub async fn list_requisitions(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let requisitions = state.workflow.list_requisitions().await?;
    Ok(Json(json!({
        "total": requisitions.len(),
        "requisitions": requisitions
    })))
}

pub async fn create_requisition(
    State(state): State<AppState>,
    requisition: Result<Json<NewRequisition>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(requisition) = requisition?;
    let created = state.workflow.submit_requisition(requisition).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
