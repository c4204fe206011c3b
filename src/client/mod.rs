mod aurora;

pub use aurora::AuroraClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{
    AutoTickConfig, OrderPreview, OrderReceipt, PanelData, PanelKind, RiskConfig, Side, TickReport,
};

/// Every way a panel fetch or control request can fail, normalized to one
/// error whose Display string is what ends up in the panel region.
/// Non-2xx statuses render as `"<status> <statusText>"`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{status} {reason}")]
    Status { status: u16, reason: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fetch side of the dashboard: one endpoint, one typed result, no
/// presentation. The poller only needs this.
#[async_trait]
pub trait PanelSource: Send + Sync {
    async fn fetch_panel(&self, kind: PanelKind) -> Result<PanelData, ApiError>;
}

/// Full backend surface, panels plus the one-shot control requests.
#[async_trait]
pub trait AuroraApi: PanelSource {
    async fn tick_once(&self) -> Result<TickReport, ApiError>;
    async fn set_auto_tick(
        &self,
        enabled: bool,
        interval: Option<f64>,
    ) -> Result<AutoTickConfig, ApiError>;
    async fn set_eps(&self, eps: f64) -> Result<(), ApiError>;
    async fn set_stake(&self, stake: f64) -> Result<(), ApiError>;
    async fn set_risk(&self, stake_cap_pct: f64) -> Result<RiskConfig, ApiError>;
    async fn preview_order(&self, side: Side, fraction: f64) -> Result<OrderPreview, ApiError>;
    async fn submit_order(
        &self,
        side: Side,
        fraction: f64,
        plugin: &str,
    ) -> Result<OrderReceipt, ApiError>;
}
