use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::client::{ApiError, AuroraApi};
use crate::types::{
    OrderPreview, OrderReceipt, PanelKind, PanelUpdate, RiskConfig, Side, TickReport,
};

/// Plugin name attached to orders submitted from the dashboard.
pub const ORDER_PLUGIN: &str = "dashboard";

/// Result of an order action, shown in the order output region rather than
/// a polled panel.
#[derive(Debug, Clone)]
pub enum OrderOutcome {
    Preview(OrderPreview),
    Receipt(OrderReceipt),
}

/// One-shot control actions. Each maps one user action to exactly one
/// outbound request, then refreshes the panels that action may have changed.
/// Not part of the poller: refreshes bypass the single-flight guards, and
/// nothing stops two rapid invocations from running concurrently.
pub struct Controls {
    api: Arc<dyn AuroraApi>,
    updates: mpsc::UnboundedSender<PanelUpdate>,
}

impl Controls {
    pub fn new(api: Arc<dyn AuroraApi>, updates: mpsc::UnboundedSender<PanelUpdate>) -> Self {
        Self { api, updates }
    }

    pub async fn start_loop(&self, interval: f64) -> Result<(), ApiError> {
        self.api.set_auto_tick(true, Some(interval)).await?;
        info!(interval, "auto-tick loop started");
        self.refresh(&[PanelKind::TickCfg]).await;
        Ok(())
    }

    pub async fn stop_loop(&self) -> Result<(), ApiError> {
        self.api.set_auto_tick(false, None).await?;
        info!("auto-tick loop stopped");
        self.refresh(&[PanelKind::TickCfg]).await;
        Ok(())
    }

    pub async fn tick_once(&self) -> Result<TickReport, ApiError> {
        let report = self.api.tick_once().await?;
        self.refresh(&[PanelKind::Health, PanelKind::Positions]).await;
        Ok(report)
    }

    pub async fn set_eps(&self, eps: f64) -> Result<(), ApiError> {
        self.api.set_eps(eps).await?;
        info!(eps, "exploration rate updated");
        self.refresh(&[PanelKind::Ai]).await;
        Ok(())
    }

    pub async fn set_stake(&self, stake: f64) -> Result<(), ApiError> {
        self.api.set_stake(stake).await?;
        info!(stake, "stake fraction updated");
        self.refresh(&[PanelKind::Ai]).await;
        Ok(())
    }

    pub async fn preview_order(&self, side: Side, fraction: f64) -> Result<OrderOutcome, ApiError> {
        let preview = self.api.preview_order(side, fraction).await?;
        Ok(OrderOutcome::Preview(preview))
    }

    pub async fn submit_order(&self, side: Side, fraction: f64) -> Result<OrderOutcome, ApiError> {
        let receipt = self.api.submit_order(side, fraction, ORDER_PLUGIN).await?;
        info!(%side, fraction, ok = receipt.ok, "order submitted");
        self.refresh(&[PanelKind::Health, PanelKind::Positions, PanelKind::Trades])
            .await;
        Ok(OrderOutcome::Receipt(receipt))
    }

    /// The POST response is the fresh config, so the risk panel is written
    /// directly from it with no follow-up GET.
    pub async fn apply_risk(&self, stake_cap_pct: f64) -> Result<RiskConfig, ApiError> {
        let cfg = self.api.set_risk(stake_cap_pct).await?;
        info!(stake_cap_pct, "risk cap updated");
        let _ = self
            .updates
            .send(PanelUpdate::ok(crate::types::PanelData::Risk(cfg.clone())));
        Ok(cfg)
    }

    async fn refresh(&self, kinds: &[PanelKind]) {
        for &kind in kinds {
            let update = match self.api.fetch_panel(kind).await {
                Ok(data) => PanelUpdate::ok(data),
                Err(e) => PanelUpdate::err(kind, e.to_string()),
            };
            let _ = self.updates.send(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio_test::assert_ok;
    use std::sync::Mutex;

    use crate::client::PanelSource;
    use crate::types::{AutoTickConfig, Health, PanelData};

    #[derive(Default)]
    struct RecordingApi {
        requests: Mutex<Vec<String>>,
    }

    impl RecordingApi {
        fn record(&self, req: impl Into<String>) {
            self.requests.lock().unwrap().push(req.into());
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PanelSource for RecordingApi {
        async fn fetch_panel(&self, kind: PanelKind) -> Result<PanelData, ApiError> {
            self.record(format!("GET {}", kind));
            let data = match kind {
                PanelKind::Positions => PanelData::Positions(crate::types::PositionsSnapshot {
                    balance: rust_decimal::Decimal::ONE_HUNDRED,
                    positions: Default::default(),
                    realized_pnl: None,
                    unrealized_pnl: None,
                }),
                PanelKind::Trades => PanelData::Trades(Vec::new()),
                PanelKind::TickCfg => PanelData::TickCfg(AutoTickConfig {
                    enabled: false,
                    interval: 1.0,
                }),
                _ => PanelData::Health(Health {
                    ok: true,
                    ts: "2025-08-10T00:00:00Z".to_string(),
                }),
            };
            Ok(data)
        }
    }

    #[async_trait]
    impl AuroraApi for RecordingApi {
        async fn tick_once(&self) -> Result<TickReport, ApiError> {
            self.record("GET /tick");
            Ok(TickReport {
                tick_time: "2025-08-10T00:00:00Z".to_string(),
                ctx: serde_json::Value::Null,
                results: serde_json::Value::Null,
            })
        }

        async fn set_auto_tick(
            &self,
            enabled: bool,
            interval: Option<f64>,
        ) -> Result<AutoTickConfig, ApiError> {
            self.record(format!("POST /tick/auto enabled={}", enabled));
            Ok(AutoTickConfig {
                enabled,
                interval: interval.unwrap_or(1.0),
            })
        }

        async fn set_eps(&self, _eps: f64) -> Result<(), ApiError> {
            self.record("POST /ai/eps");
            Ok(())
        }

        async fn set_stake(&self, _stake: f64) -> Result<(), ApiError> {
            self.record("POST /ai/stake");
            Ok(())
        }

        async fn set_risk(&self, stake_cap_pct: f64) -> Result<RiskConfig, ApiError> {
            self.record("POST /risk");
            Ok(RiskConfig {
                max_drawdown_pct: 15.0,
                stake_cap_pct,
                min_cash_reserve_pct: 50.0,
                sl_pct: 20.0,
                tp_pct: 30.0,
                tp_partial_pct: 25.0,
            })
        }

        async fn preview_order(
            &self,
            _side: Side,
            fraction: f64,
        ) -> Result<OrderPreview, ApiError> {
            self.record("GET /orders/preview");
            Ok(OrderPreview {
                side: "BUY".to_string(),
                fraction,
                price: rust_decimal::Decimal::ONE,
                balance: rust_decimal::Decimal::ONE_HUNDRED,
                pos_qty: rust_decimal::Decimal::ZERO,
                pos_avg: rust_decimal::Decimal::ZERO,
                risk_ok: true,
                risk_reason: "ok".to_string(),
                est_qty: None,
                est_proceeds: None,
            })
        }

        async fn submit_order(
            &self,
            _side: Side,
            _fraction: f64,
            plugin: &str,
        ) -> Result<OrderReceipt, ApiError> {
            self.record(format!("POST /orders plugin={}", plugin));
            Ok(OrderReceipt {
                ok: true,
                side: Some("BUY".to_string()),
                qty: None,
                reason: None,
            })
        }
    }

    fn harness() -> (
        Arc<RecordingApi>,
        Controls,
        mpsc::UnboundedReceiver<PanelUpdate>,
    ) {
        let api = Arc::new(RecordingApi::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let controls = Controls::new(api.clone(), tx);
        (api, controls, rx)
    }

    #[tokio::test]
    async fn submit_order_refreshes_exactly_three_panels() {
        let (api, controls, mut rx) = harness();

        let outcome = controls.submit_order(Side::Buy, 0.1).await.unwrap();
        assert!(matches!(outcome, OrderOutcome::Receipt(r) if r.ok));

        assert_eq!(
            api.requests(),
            vec![
                "POST /orders plugin=dashboard",
                "GET health",
                "GET positions",
                "GET trades",
            ]
        );

        let mut refreshed = Vec::new();
        while let Ok(update) = rx.try_recv() {
            refreshed.push(update.kind);
        }
        assert_eq!(
            refreshed,
            vec![PanelKind::Health, PanelKind::Positions, PanelKind::Trades]
        );
    }

    #[tokio::test]
    async fn preview_does_not_touch_any_panel() {
        let (api, controls, mut rx) = harness();

        controls.preview_order(Side::Sell, 0.25).await.unwrap();

        assert_eq!(api.requests(), vec!["GET /orders/preview"]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn apply_risk_writes_the_post_response_into_the_panel() {
        let (api, controls, mut rx) = harness();

        let cfg = controls.apply_risk(12.5).await.unwrap();
        assert_eq!(cfg.stake_cap_pct, 12.5);

        // One POST, no follow-up GET.
        assert_eq!(api.requests(), vec!["POST /risk"]);

        let update = rx.try_recv().unwrap();
        assert_eq!(update.kind, PanelKind::Risk);
        match update.result.unwrap() {
            PanelData::Risk(risk) => assert_eq!(risk.stake_cap_pct, 12.5),
            other => panic!("unexpected panel data: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn loop_controls_refresh_the_tick_config_panel() {
        let (api, controls, mut rx) = harness();

        controls.start_loop(0.5).await.unwrap();
        controls.stop_loop().await.unwrap();

        assert_eq!(
            api.requests(),
            vec![
                "POST /tick/auto enabled=true",
                "GET tickcfg",
                "POST /tick/auto enabled=false",
                "GET tickcfg",
            ]
        );
        assert_eq!(rx.try_recv().unwrap().kind, PanelKind::TickCfg);
        assert_eq!(rx.try_recv().unwrap().kind, PanelKind::TickCfg);
    }

    #[tokio::test]
    async fn tick_once_refreshes_health_and_positions() {
        let (api, controls, _rx) = harness();

        assert_ok!(controls.tick_once().await);
        assert_eq!(
            api.requests(),
            vec!["GET /tick", "GET health", "GET positions"]
        );
    }
}
