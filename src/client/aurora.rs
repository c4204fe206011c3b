use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{ApiError, AuroraApi, PanelSource};
use crate::types::{
    AiStatus, AutoTickConfig, Health, OrderPreview, OrderReceipt, PanelData, PanelKind,
    PositionsSnapshot, Readiness, RiskConfig, Side, TickReport, TradeLog, TradeRecord,
};

/// HTTP client for the Aurora trading backend. Session auth rides on the
/// cookie store, so every request is credentialed without explicit headers.
#[derive(Debug, Clone)]
pub struct AuroraClient {
    client: Client,
    base_url: String,
    trades_limit: u32,
}

impl AuroraClient {
    pub fn new(base_url: &str, timeout: Duration, trades_limit: u32) -> Result<Self, ApiError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            trades_limit,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let resp = self.client.get(&url).send().await?;
        Self::decode(resp).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let resp = self.client.post(&url).send().await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn health(&self) -> Result<Health, ApiError> {
        self.get_json("/health").await
    }

    pub async fn positions(&self) -> Result<PositionsSnapshot, ApiError> {
        self.get_json("/positions").await
    }

    pub async fn ai_status(&self) -> Result<AiStatus, ApiError> {
        self.get_json("/ai/status").await
    }

    pub async fn readiness(&self) -> Result<Readiness, ApiError> {
        self.get_json("/ai/readiness").await
    }

    pub async fn auto_tick(&self) -> Result<AutoTickConfig, ApiError> {
        self.get_json("/tick/auto").await
    }

    pub async fn risk(&self) -> Result<RiskConfig, ApiError> {
        self.get_json("/risk").await
    }

    pub async fn trades(&self, n: u32) -> Result<Vec<TradeRecord>, ApiError> {
        let log: TradeLog = self.get_json(&format!("/logs/trades?n={}", n)).await?;
        Ok(log.trades)
    }
}

#[async_trait]
impl PanelSource for AuroraClient {
    async fn fetch_panel(&self, kind: PanelKind) -> Result<PanelData, ApiError> {
        match kind {
            PanelKind::Health => self.health().await.map(PanelData::Health),
            PanelKind::Positions => self.positions().await.map(PanelData::Positions),
            PanelKind::Ai => self.ai_status().await.map(PanelData::Ai),
            PanelKind::TickCfg => self.auto_tick().await.map(PanelData::TickCfg),
            PanelKind::Risk => self.risk().await.map(PanelData::Risk),
            PanelKind::Trades => self.trades(self.trades_limit).await.map(PanelData::Trades),
            PanelKind::Readiness => self.readiness().await.map(PanelData::Readiness),
        }
    }
}

#[async_trait]
impl AuroraApi for AuroraClient {
    async fn tick_once(&self) -> Result<TickReport, ApiError> {
        self.get_json("/tick").await
    }

    async fn set_auto_tick(
        &self,
        enabled: bool,
        interval: Option<f64>,
    ) -> Result<AutoTickConfig, ApiError> {
        let path = match interval {
            Some(interval) => format!("/tick/auto?enabled={}&interval={}", enabled, interval),
            None => format!("/tick/auto?enabled={}", enabled),
        };
        self.post_json(&path).await
    }

    async fn set_eps(&self, eps: f64) -> Result<(), ApiError> {
        let _: Value = self.post_json(&format!("/ai/eps?eps={}", eps)).await?;
        Ok(())
    }

    async fn set_stake(&self, stake: f64) -> Result<(), ApiError> {
        let _: Value = self.post_json(&format!("/ai/stake?stake={}", stake)).await?;
        Ok(())
    }

    async fn set_risk(&self, stake_cap_pct: f64) -> Result<RiskConfig, ApiError> {
        self.post_json(&format!("/risk?stake_cap_pct={}", stake_cap_pct))
            .await
    }

    async fn preview_order(&self, side: Side, fraction: f64) -> Result<OrderPreview, ApiError> {
        self.get_json(&format!(
            "/orders/preview?side={}&fraction={}",
            side.as_str(),
            fraction
        ))
        .await
    }

    async fn submit_order(
        &self,
        side: Side,
        fraction: f64,
        plugin: &str,
    ) -> Result<OrderReceipt, ApiError> {
        self.post_json(&format!(
            "/orders?side={}&fraction={}&plugin={}",
            side.as_str(),
            fraction,
            plugin
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let client =
            AuroraClient::new("http://127.0.0.1:8000/", Duration::from_secs(5), 200).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
    }
}
