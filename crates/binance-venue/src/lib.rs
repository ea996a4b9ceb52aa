//! Futures venue adapter. Orders travel as a URL-encoded query string with
//! an appended HMAC-SHA256 `signature`; the API key rides in the
//! `X-MBX-APIKEY` header. Any 2xx response is a fill; the transaction id is
//! `orderId`, falling back to `clientOrderId`.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use venue_trait::{OrderPlacement, VenueClient, VenueOrderRequest};

type HmacSha256 = Hmac<Sha256>;

pub struct BinanceVenue {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct FuturesOrderResponse {
    #[serde(rename = "orderId")]
    order_id: Option<i64>,
    #[serde(rename = "clientOrderId")]
    client_order_id: Option<String>,
}

impl BinanceVenue {
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
            std::env::var("BINANCE_API_KEY").unwrap_or_default(),
            std::env::var("BINANCE_API_SECRET").unwrap_or_default(),
            std::env::var("BINANCE_BASE_URL")
                .unwrap_or_else(|_| "https://fapi.binance.com".to_string()),
        )
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    fn sign(&self, query_string: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(query_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn order_query(order: &VenueOrderRequest, timestamp_ms: i64) -> String {
        let params = [
            ("symbol", order.symbol.clone()),
            ("side", order.side.as_str().to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", order.qty.to_string()),
            ("timestamp", timestamp_ms.to_string()),
        ];
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[async_trait]
impl VenueClient for BinanceVenue {
    async fn place_market_order(&self, order: &VenueOrderRequest) -> OrderPlacement {
        if !self.is_configured() {
            return OrderPlacement::failed("binance credentials not configured");
        }

        let query = Self::order_query(order, chrono::Utc::now().timestamp_millis());
        let signature = self.sign(&query);
        let url = format!("{}/fapi/v1/order?{}&signature={}", self.base_url, query, signature);

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return OrderPlacement::failed(format!("binance transport error: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return OrderPlacement::failed(format!("binance HTTP {status}: {body}"));
        }

        match response.json::<FuturesOrderResponse>().await {
            Ok(body) => {
                let tx_id = body
                    .order_id
                    .map(|id| id.to_string())
                    .or(body.client_order_id)
                    .unwrap_or_default();
                tracing::info!(
                    "Binance order placed: {} {} -> {}",
                    order.side.as_str(),
                    order.symbol,
                    tx_id
                );
                OrderPlacement::filled(tx_id)
            }
            Err(e) => OrderPlacement::failed(format!("binance bad response body: {e}")),
        }
    }

    fn venue_name(&self) -> &str {
        "binance"
    }
}
