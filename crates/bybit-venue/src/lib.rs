//! Linear-perpetual venue adapter. Requests are signed with HMAC-SHA256
//! across `timestamp | api_key | recv_window | body` and authenticated via
//! the `X-BAPI-*` header set; a placement succeeded when the response body's
//! `retCode` is zero.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use venue_trait::{OrderPlacement, OrderSide, VenueClient, VenueOrderRequest};

type HmacSha256 = Hmac<Sha256>;

const RECV_WINDOW: &str = "5000";

pub struct BybitVenue {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct OrderCreateResponse {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    #[serde(default)]
    result: OrderCreateResult,
}

#[derive(Debug, Default, Deserialize)]
struct OrderCreateResult {
    #[serde(rename = "orderId", default)]
    order_id: String,
}

impl BybitVenue {
    pub fn new(api_key: String, api_secret: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_secret,
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("BYBIT_API_KEY").unwrap_or_default(),
            std::env::var("BYBIT_API_SECRET").unwrap_or_default(),
            std::env::var("BYBIT_BASE_URL")
                .unwrap_or_else(|_| "https://api.bybit.com".to_string()),
        )
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// HMAC-SHA256 over `timestamp | api_key | recv_window | body`
    fn sign(&self, timestamp: &str, body: &str) -> String {
        let payload = format!("{}{}{}{}", timestamp, self.api_key, RECV_WINDOW, body);
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// v5 spells sides title-case; the uppercase form is rejected with
    /// retCode 10001
    fn side(order: &VenueOrderRequest) -> &'static str {
        match order.side {
            OrderSide::Buy => "Buy",
            OrderSide::Sell => "Sell",
        }
    }

    fn order_body(order: &VenueOrderRequest) -> String {
        // Field order is fixed so the signed body is deterministic
        serde_json::json!({
            "category": "linear",
            "symbol": order.symbol,
            "side": Self::side(order),
            "orderType": "Market",
            "qty": order.qty.to_string(),
            "timeInForce": "IOC",
        })
        .to_string()
    }
}

#[async_trait]
impl VenueClient for BybitVenue {
    async fn place_market_order(&self, order: &VenueOrderRequest) -> OrderPlacement {
        if !self.is_configured() {
            return OrderPlacement::failed("bybit credentials not configured");
        }

        let body = Self::order_body(order);
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&timestamp, &body);

        let url = format!("{}/v5/order/create", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-SIGN", &signature)
            .header("X-BAPI-TIMESTAMP", &timestamp)
            .header("X-BAPI-RECV-WINDOW", RECV_WINDOW)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return OrderPlacement::failed(format!("bybit transport error: {e}")),
        };

        let status = response.status();
        let parsed: Result<OrderCreateResponse, _> = response.json().await;
        match parsed {
            Ok(body) if body.ret_code == 0 => {
                tracing::info!(
                    "Bybit order placed: {} {} -> {}",
                    Self::side(order),
                    order.symbol,
                    body.result.order_id
                );
                OrderPlacement::filled(body.result.order_id)
            }
            Ok(body) => OrderPlacement::failed(format!(
                "bybit retCode {}: {}",
                body.ret_code, body.ret_msg
            )),
            Err(e) => OrderPlacement::failed(format!("bybit HTTP {status}: {e}")),
        }
    }

    fn venue_name(&self) -> &str {
        "bybit"
    }
}
