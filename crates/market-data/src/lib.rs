use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use engine_core::{Candle, EngineError, Timeframe};
use reqwest::Client;

const CACHE_TTL_SECS: i64 = 60;
const MAX_ATTEMPTS: u32 = 3;

/// Cached candle sequence with fetch timestamp
struct CacheEntry {
    candles: Vec<Candle>,
    cached_at: DateTime<Utc>,
}

/// Client for the public market-data endpoint. Stateless apart from a short
/// TTL cache; one instance is shared across the whole process.
pub struct MarketDataClient {
    client: Client,
    base_url: String,
    cache: DashMap<String, CacheEntry>,
}

impl MarketDataClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: DashMap::new(),
        }
    }

    /// Fetch up to `limit` candles for (symbol, interval), oldest first.
    /// Bounded retry on transport errors and 429/5xx; the caller decides how
    /// to degrade on exhaustion.
    pub async fn get_candles(
        &self,
        symbol: &str,
        interval: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, EngineError> {
        let cache_key = format!("{}:{}:{}", symbol, interval.label(), limit);
        if let Some(entry) = self.cache.get(&cache_key) {
            let age = (Utc::now() - entry.cached_at).num_seconds();
            if age < CACHE_TTL_SECS {
                return Ok(entry.candles.clone());
            }
        }

        let url = format!("{}/klines", self.base_url);
        let limit_param = limit.to_string();
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("symbol", symbol),
                    ("interval", interval.label()),
                    ("limit", limit_param.as_str()),
                ])
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let rows: serde_json::Value = resp
                        .json()
                        .await
                        .map_err(|e| EngineError::MarketData(e.to_string()))?;
                    let candles = parse_candles(&rows)?;
                    self.cache.insert(
                        cache_key,
                        CacheEntry {
                            candles: candles.clone(),
                            cached_at: Utc::now(),
                        },
                    );
                    return Ok(candles);
                }
                Ok(resp) => {
                    let status = resp.status();
                    last_error = format!("HTTP {}", status);
                    // Client errors other than 429 will not heal on retry
                    if status.is_client_error() && status.as_u16() != 429 {
                        return Err(EngineError::MarketData(last_error));
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < MAX_ATTEMPTS {
                let wait = Duration::from_millis(250 * u64::from(attempt));
                tracing::warn!(
                    "Candle fetch {}/{} failed for {} {} ({}), retrying in {:?}",
                    attempt,
                    MAX_ATTEMPTS,
                    symbol,
                    interval.label(),
                    last_error,
                    wait
                );
                tokio::time::sleep(wait).await;
            }
        }

        Err(EngineError::MarketData(format!(
            "candle fetch exhausted {} attempts: {}",
            MAX_ATTEMPTS, last_error
        )))
    }
}

/// Parse the wire format: an array of `[openTimeMs, open, high, low, close,
/// volume, ...]` rows where prices may arrive as strings or numbers. Every
/// numeric field must parse as finite; rows are returned oldest first.
fn parse_candles(rows: &serde_json::Value) -> Result<Vec<Candle>, EngineError> {
    let rows = rows
        .as_array()
        .ok_or_else(|| EngineError::MarketData("expected a JSON array of candles".to_string()))?;

    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        let fields = row
            .as_array()
            .ok_or_else(|| EngineError::MarketData("candle row is not an array".to_string()))?;
        if fields.len() < 6 {
            return Err(EngineError::MarketData(format!(
                "candle row has {} fields, expected at least 6",
                fields.len()
            )));
        }

        let open_time_ms = fields[0]
            .as_i64()
            .ok_or_else(|| EngineError::MarketData("open time is not an integer".to_string()))?;
        let open_time = DateTime::from_timestamp_millis(open_time_ms)
            .ok_or_else(|| EngineError::MarketData("open time out of range".to_string()))?;

        let candle = Candle {
            open_time,
            open: numeric_field(&fields[1], "open")?,
            high: numeric_field(&fields[2], "high")?,
            low: numeric_field(&fields[3], "low")?,
            close: numeric_field(&fields[4], "close")?,
            volume: numeric_field(&fields[5], "volume")?,
        };
        if !candle.is_finite() {
            return Err(EngineError::MarketData(
                "candle contains a non-finite field".to_string(),
            ));
        }
        candles.push(candle);
    }

    candles.sort_by_key(|c| c.open_time);
    candles.dedup_by_key(|c| c.open_time);
    Ok(candles)
}

fn numeric_field(value: &serde_json::Value, name: &str) -> Result<f64, EngineError> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| EngineError::MarketData(format!("{} does not parse as finite", name)))
}
