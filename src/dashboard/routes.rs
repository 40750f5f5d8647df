//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::storage::{DealStore, StoredDeal};
use crate::strategy::STRATEGY_ORDER;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub store: Arc<dyn DealStore>,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(store: Arc<dyn DealStore>) -> Self {
        Self {
            store,
            started_at: Utc::now(),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StrategyGroup {
    pub strategy: String,
    pub count: usize,
    /// Highest profit first.
    pub deals: Vec<StoredDeal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DealsResponse {
    pub total_deals: usize,
    pub groups: Vec<StrategyGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub removed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: i64,
}

/// Group deals by strategy: known strategies first in evaluation order
/// (present even when empty), then any other labels found in the store.
pub fn group_deals(deals: Vec<StoredDeal>) -> DealsResponse {
    let total_deals = deals.len();
    let mut groups: Vec<StrategyGroup> = STRATEGY_ORDER
        .iter()
        .map(|name| StrategyGroup {
            strategy: name.to_string(),
            count: 0,
            deals: Vec::new(),
        })
        .collect();

    for deal in deals {
        match groups.iter_mut().find(|g| g.strategy == deal.deal.strategy) {
            Some(group) => group.deals.push(deal),
            None => groups.push(StrategyGroup {
                strategy: deal.deal.strategy.clone(),
                count: 0,
                deals: vec![deal],
            }),
        }
    }

    for group in &mut groups {
        group.deals.sort_by(|a, b| b.deal.profit.cmp(&a.deal.profit));
        group.count = group.deals.len();
    }

    DealsResponse { total_deals, groups }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/deals
pub async fn get_deals(State(state): State<AppState>) -> Result<Json<DealsResponse>, StatusCode> {
    let deals = state.store.list_deals().await.map_err(|e| {
        error!(error = %e, "Failed to load deals");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(group_deals(deals)))
}

/// POST /api/clear
pub async fn clear_deals(State(state): State<AppState>) -> Result<Json<ClearResponse>, StatusCode> {
    let removed = state.store.clear().await.map_err(|e| {
        error!(error = %e, "Failed to clear deals");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    info!(removed, "Deals cleared from dashboard");
    Ok(Json(ClearResponse { removed }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}
