use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Order side as accepted by the backend's order endpoints.
/// `Exit` closes the whole position regardless of fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
    Exit,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
            Side::Exit => "exit",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            "exit" => Ok(Side::Exit),
            other => Err(format!("unknown side '{}' (expected buy, sell or exit)", other)),
        }
    }
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub ok: bool,
    pub ts: String,
}

/// One entry in the positions map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEntry {
    pub qty: Decimal,
    pub avg_price: Decimal,
}

/// GET /positions
///
/// Symbols are kept in a BTreeMap so table rendering is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionsSnapshot {
    pub balance: Decimal,
    #[serde(default)]
    pub positions: BTreeMap<String, PositionEntry>,
    #[serde(default)]
    pub realized_pnl: Option<Decimal>,
    #[serde(default)]
    pub unrealized_pnl: Option<Decimal>,
}

/// Last action summary nested in the AI status payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiLast {
    pub reward: f64,
    pub conf: f64,
    pub action: String,
}

/// GET /ai/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiStatus {
    pub alpha: f64,
    pub gamma: f64,
    pub eps: f64,
    pub stake: f64,
    #[serde(default)]
    pub last: AiLast,
    #[serde(default)]
    pub weights_shape: Vec<u64>,
}

/// GET /ai/readiness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub awaiting: bool,
    pub action: String,
    pub readiness: f64,
}

/// GET/POST /tick/auto
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoTickConfig {
    pub enabled: bool,
    pub interval: f64,
}

/// GET/POST /risk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub max_drawdown_pct: f64,
    pub stake_cap_pct: f64,
    pub min_cash_reserve_pct: f64,
    pub sl_pct: f64,
    pub tp_pct: f64,
    pub tp_partial_pct: f64,
}

/// One row of GET /logs/trades. The backend serves these from a CSV log,
/// so numeric fields may arrive as strings; Decimal deserializes both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub ts: String,
    pub symbol: String,
    pub plugin: String,
    pub side: String,
    pub price: Decimal,
    pub qty: Decimal,
    pub cash_delta: Decimal,
    pub balance_after: Decimal,
    pub pos_qty_after: Decimal,
    pub avg_price_after: Decimal,
}

/// GET /logs/trades envelope. `trades` is absent on an empty log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeLog {
    #[serde(default)]
    pub trades: Vec<TradeRecord>,
}

/// GET /orders/preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPreview {
    pub side: String,
    pub fraction: f64,
    pub price: Decimal,
    pub balance: Decimal,
    pub pos_qty: Decimal,
    pub pos_avg: Decimal,
    pub risk_ok: bool,
    pub risk_reason: String,
    #[serde(default)]
    pub est_qty: Option<Decimal>,
    #[serde(default)]
    pub est_proceeds: Option<Decimal>,
}

/// POST /orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub ok: bool,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub qty: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// GET /tick. The plugin results are backend-defined, so they stay untyped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub tick_time: String,
    #[serde(default)]
    pub ctx: Value,
    #[serde(default)]
    pub results: Value,
}
