//! Route handlers

use super::error::{ApiError, ApiResult};
use crate::features::{BasicFeatures, NetworkFeatures, TemporalFeatures};
use crate::metrics::MetricsSnapshot;
use crate::scoring::{FeatureMap, ObserveSummary, ScoringService};
use crate::types::{AnomalyReport, Exposure, PortfolioAssessment, RiskScore, Transaction};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub type AppState = Arc<ScoringService>;

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub address: Option<String>,
    #[serde(default)]
    pub features: Option<FeatureMap>,
}

#[derive(Debug, Deserialize)]
pub struct UserRiskRequest {
    pub user_address: Option<String>,
    #[serde(default)]
    pub exposures: Vec<Exposure>,
}

/// A batch of raw transaction records
#[derive(Debug, Deserialize)]
pub struct TransactionBatch {
    pub transactions: Vec<Value>,
}

impl TransactionBatch {
    fn parse(&self) -> ApiResult<Vec<Transaction>> {
        Ok(Transaction::from_records(&self.transactions)?)
    }
}

fn required(value: Option<String>, message: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

pub async fn home(State(service): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "DeFi risk sentinel is running",
        "version": env!("CARGO_PKG_VERSION"),
        "models_loaded": {
            "anomaly_detector": service.model_loaded()
        },
        "mock_mode": service.mock_mode()
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().timestamp()
    }))
}

pub async fn risk_score(State(service): State<AppState>, Path(address): Path<String>) -> Json<RiskScore> {
    Json(service.risk_score(&address))
}

pub async fn detect_anomaly(
    State(service): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> ApiResult<Json<AnomalyReport>> {
    let Json(request) = payload?;
    let address = required(request.address, "Protocol address is required")?;
    let features = request.features.unwrap_or_default();

    Ok(Json(service.detect_anomaly(&address, &features)))
}

pub async fn user_risk(
    State(service): State<AppState>,
    payload: Result<Json<UserRiskRequest>, JsonRejection>,
) -> ApiResult<Json<PortfolioAssessment>> {
    let Json(request) = payload?;
    let user_address = required(request.user_address, "User address is required")?;

    Ok(Json(service.assess_portfolio(&user_address, &request.exposures)))
}

pub async fn observe_transactions(
    State(service): State<AppState>,
    payload: Result<Json<TransactionBatch>, JsonRejection>,
) -> ApiResult<Json<ObserveSummary>> {
    let Json(batch) = payload?;
    let transactions = batch.parse()?;

    Ok(Json(service.observe_transactions(&transactions)))
}

pub async fn basic_features(
    State(service): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<BasicFeatures>> {
    let Json(record) = payload?;
    Ok(Json(service.basic_features(&record)?))
}

pub async fn temporal_features(
    State(service): State<AppState>,
    payload: Result<Json<TransactionBatch>, JsonRejection>,
) -> ApiResult<Json<Vec<TemporalFeatures>>> {
    let Json(batch) = payload?;
    Ok(Json(service.temporal_features(&batch.parse()?)))
}

pub async fn network_features(
    State(service): State<AppState>,
    payload: Result<Json<TransactionBatch>, JsonRejection>,
) -> ApiResult<Json<Vec<NetworkFeatures>>> {
    let Json(batch) = payload?;
    Ok(Json(service.network_features(&batch.parse()?)))
}

pub async fn metrics(State(service): State<AppState>) -> Json<MetricsSnapshot> {
    Json(service.metrics().snapshot())
}
