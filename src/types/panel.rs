use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::api::{
    AiStatus, AutoTickConfig, Health, PositionsSnapshot, Readiness, RiskConfig, TradeRecord,
};

/// The fixed set of polled panels. Declaration order is the stagger order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelKind {
    Health,
    Positions,
    Ai,
    TickCfg,
    Risk,
    Trades,
    Readiness,
}

impl PanelKind {
    pub const ALL: [PanelKind; 7] = [
        PanelKind::Health,
        PanelKind::Positions,
        PanelKind::Ai,
        PanelKind::TickCfg,
        PanelKind::Risk,
        PanelKind::Trades,
        PanelKind::Readiness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PanelKind::Health => "health",
            PanelKind::Positions => "positions",
            PanelKind::Ai => "ai",
            PanelKind::TickCfg => "tickcfg",
            PanelKind::Risk => "risk",
            PanelKind::Trades => "trades",
            PanelKind::Readiness => "readiness",
        }
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed payload for one panel, the fetch side of the fetch/render split.
#[derive(Debug, Clone)]
pub enum PanelData {
    Health(Health),
    Positions(PositionsSnapshot),
    Ai(AiStatus),
    TickCfg(AutoTickConfig),
    Risk(RiskConfig),
    Trades(Vec<TradeRecord>),
    Readiness(Readiness),
}

impl PanelData {
    pub fn kind(&self) -> PanelKind {
        match self {
            PanelData::Health(_) => PanelKind::Health,
            PanelData::Positions(_) => PanelKind::Positions,
            PanelData::Ai(_) => PanelKind::Ai,
            PanelData::TickCfg(_) => PanelKind::TickCfg,
            PanelData::Risk(_) => PanelKind::Risk,
            PanelData::Trades(_) => PanelKind::Trades,
            PanelData::Readiness(_) => PanelKind::Readiness,
        }
    }
}

/// One delivery from the poller (or a control-handler refresh) to the view.
/// Errors carry the display string only; the view never sees the taxonomy.
#[derive(Debug, Clone)]
pub struct PanelUpdate {
    pub kind: PanelKind,
    pub result: Result<PanelData, String>,
    pub at: DateTime<Utc>,
}

impl PanelUpdate {
    pub fn ok(data: PanelData) -> Self {
        Self {
            kind: data.kind(),
            result: Ok(data),
            at: Utc::now(),
        }
    }

    pub fn err(kind: PanelKind, message: String) -> Self {
        Self {
            kind,
            result: Err(message),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_data_reports_its_kind() {
        let data = PanelData::Health(Health {
            ok: true,
            ts: "2025-08-10T00:00:00Z".to_string(),
        });
        assert_eq!(data.kind(), PanelKind::Health);
        assert_eq!(PanelUpdate::ok(data).kind, PanelKind::Health);
    }

    #[test]
    fn all_kinds_have_unique_names() {
        let mut names: Vec<&str> = PanelKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PanelKind::ALL.len());
    }
}
