use chrono::{DateTime, Local};

use crate::controls::OrderOutcome;
use crate::types::{
    AiStatus, AutoTickConfig, Health, PositionsSnapshot, Readiness, RiskConfig, TradeRecord,
};

/// Column order of the trade log table, matching the backend's CSV header.
pub const TRADE_COLUMNS: [&str; 10] = [
    "ts",
    "symbol",
    "plugin",
    "side",
    "price",
    "qty",
    "cash_delta",
    "balance_after",
    "pos_qty_after",
    "avg_price_after",
];

pub const NO_POSITIONS: &str = "No open positions";
pub const NO_TRADES: &str = "No trades yet";

/// Most rows fetched per poll is 200, but only this many are displayed.
pub const TRADE_DISPLAY_CAP: usize = 50;

/// Renders a backend timestamp in local time, falling back to the raw
/// string when it does not parse.
pub fn local_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

pub fn health_lines(health: &Health) -> Vec<String> {
    vec![
        format!("ok: {}", health.ok),
        format!("ts: {}", local_timestamp(&health.ts)),
    ]
}

pub fn positions_summary(snapshot: &PositionsSnapshot) -> String {
    let mut line = format!("balance: {}", snapshot.balance.round_dp(2));
    if let Some(realized) = snapshot.realized_pnl {
        line.push_str(&format!("  realized: {}", realized.round_dp(2)));
    }
    if let Some(unrealized) = snapshot.unrealized_pnl {
        line.push_str(&format!("  unrealized: {}", unrealized.round_dp(2)));
    }
    line
}

/// `symbol | qty | avg_price` rows, sorted by symbol.
pub fn position_rows(snapshot: &PositionsSnapshot) -> Vec<[String; 3]> {
    snapshot
        .positions
        .iter()
        .map(|(symbol, entry)| {
            [
                symbol.clone(),
                entry.qty.to_string(),
                entry.avg_price.to_string(),
            ]
        })
        .collect()
}

pub fn ai_lines(status: &AiStatus) -> Vec<String> {
    vec![
        format!("alpha: {}  gamma: {}", status.alpha, status.gamma),
        format!("eps: {}  stake: {}", status.eps, status.stake),
        format!(
            "last: {} (conf {:.3}, reward {:.3})",
            status.last.action, status.last.conf, status.last.reward
        ),
    ]
}

pub fn tick_cfg_lines(cfg: &AutoTickConfig) -> Vec<String> {
    vec![
        format!("enabled: {}", cfg.enabled),
        format!("interval: {}s", cfg.interval),
    ]
}

pub fn risk_lines(cfg: &RiskConfig) -> Vec<String> {
    vec![
        format!("stake_cap: {}%", cfg.stake_cap_pct),
        format!("max_drawdown: {}%", cfg.max_drawdown_pct),
        format!("cash_reserve: {}%", cfg.min_cash_reserve_pct),
        format!(
            "sl: {}%  tp: {}% ({}% partial)",
            cfg.sl_pct, cfg.tp_pct, cfg.tp_partial_pct
        ),
    ]
}

pub fn readiness_line(readiness: &Readiness) -> String {
    let phase = if readiness.awaiting {
        "Awaiting entry"
    } else {
        "Signal active"
    };
    format!(
        "{} | action={} | readiness={}%",
        phase, readiness.action, readiness.readiness
    )
}

/// Ratio for the readiness gauge, clamped into [0, 1].
pub fn readiness_ratio(readiness: &Readiness) -> f64 {
    (readiness.readiness / 100.0).clamp(0.0, 1.0)
}

/// Trade rows in server order (newest first), capped for display.
pub fn trade_rows(trades: &[TradeRecord], cap: usize) -> Vec<[String; 10]> {
    trades
        .iter()
        .take(cap)
        .map(|t| {
            [
                local_timestamp(&t.ts),
                t.symbol.clone(),
                t.plugin.clone(),
                t.side.clone(),
                t.price.to_string(),
                t.qty.to_string(),
                t.cash_delta.to_string(),
                t.balance_after.to_string(),
                t.pos_qty_after.to_string(),
                t.avg_price_after.to_string(),
            ]
        })
        .collect()
}

pub fn order_lines(outcome: &OrderOutcome) -> Vec<String> {
    match outcome {
        OrderOutcome::Preview(p) => {
            let mut lines = vec![
                format!("preview {} fraction={}", p.side, p.fraction),
                format!("price: {}  balance: {}", p.price, p.balance.round_dp(2)),
                format!("position: {} @ {}", p.pos_qty, p.pos_avg),
                format!("risk: {} ({})", if p.risk_ok { "ok" } else { "blocked" }, p.risk_reason),
            ];
            if let Some(qty) = p.est_qty {
                lines.push(format!("est qty: {}", qty));
            }
            if let Some(proceeds) = p.est_proceeds {
                lines.push(format!("est proceeds: {}", proceeds.round_dp(2)));
            }
            lines
        }
        OrderOutcome::Receipt(r) => {
            if r.ok {
                vec![format!(
                    "filled: {} qty {}",
                    r.side.as_deref().unwrap_or("?"),
                    r.qty.map(|q| q.to_string()).unwrap_or_else(|| "?".to_string())
                )]
            } else {
                vec![format!(
                    "rejected: {}",
                    r.reason.as_deref().unwrap_or("unknown")
                )]
            }
        }
    }
}
