use std::time::Duration;

use async_trait::async_trait;
use engine_core::{Agent, AgentKind, AgentResult, EngineError, PipelineContext};
use serde::Deserialize;

/// News sentiment via an optional external provider. Provider output is
/// parsed into an explicit outcome rather than trusted: anything that does
/// not deserialize cleanly becomes a low-confidence neutral result with the
/// raw body preserved in the payload. Unconfigured deployments get the same
/// neutral result.
pub struct NewsSentimentAgent {
    provider_url: Option<String>,
    client: reqwest::Client,
}

const FALLBACK_CONFIDENCE: f64 = 30.0;

#[derive(Debug, Deserialize)]
struct ProviderSentiment {
    score: f64,
    confidence: f64,
}

/// Outcome of parsing a provider response body
enum SentimentParse {
    Parsed(ProviderSentiment),
    Unparsed { raw: String },
}

impl NewsSentimentAgent {
    pub fn new(provider_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            provider_url,
            client,
        }
    }

    /// Reads `SENTIMENT_PROVIDER_URL`; absent means neutral results
    pub fn from_env() -> Self {
        Self::new(std::env::var("SENTIMENT_PROVIDER_URL").ok())
    }

    fn parse_body(body: &str) -> SentimentParse {
        match serde_json::from_str::<ProviderSentiment>(body) {
            Ok(s) if s.score.is_finite() && s.confidence.is_finite() => {
                SentimentParse::Parsed(s)
            }
            _ => SentimentParse::Unparsed {
                raw: body.chars().take(512).collect(),
            },
        }
    }
}

#[async_trait]
impl Agent for NewsSentimentAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::NewsSentiment
    }

    async fn evaluate(&self, ctx: &PipelineContext) -> Result<AgentResult, EngineError> {
        let Some(base) = &self.provider_url else {
            return Ok(AgentResult::clamped(
                0.0,
                FALLBACK_CONFIDENCE,
                serde_json::json!({ "status": "no-provider" }),
            ));
        };

        let url = format!("{}/sentiment", base.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", ctx.symbol.as_str())])
            .send()
            .await;

        let body = match response {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            Ok(resp) => {
                return Ok(AgentResult::clamped(
                    0.0,
                    FALLBACK_CONFIDENCE,
                    serde_json::json!({ "status": "provider-error", "http": resp.status().as_u16() }),
                ));
            }
            Err(e) => {
                return Ok(AgentResult::clamped(
                    0.0,
                    FALLBACK_CONFIDENCE,
                    serde_json::json!({ "status": "provider-unreachable", "reason": e.to_string() }),
                ));
            }
        };

        match Self::parse_body(&body) {
            SentimentParse::Parsed(s) => Ok(AgentResult::clamped(
                s.score,
                s.confidence,
                serde_json::json!({ "status": "ok", "provider": base }),
            )),
            SentimentParse::Unparsed { raw } => {
                tracing::debug!("Sentiment provider returned an unparseable body");
                Ok(AgentResult::clamped(
                    0.0,
                    FALLBACK_CONFIDENCE,
                    serde_json::json!({ "status": "parse-failure", "raw": raw }),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{AccountSnapshot, Timeframe};
    use std::collections::HashMap;

    fn ctx() -> PipelineContext {
        PipelineContext::new(
            "BTCUSDT",
            Timeframe::Hour1,
            AccountSnapshot {
                id: "acct".into(),
                starting_balance: 10_000.0,
                current_balance: 10_000.0,
                max_leverage: 3.0,
                max_risk_per_trade: 2.0,
            },
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn unconfigured_provider_is_neutral() {
        let agent = NewsSentimentAgent::new(None);
        let result = agent.evaluate(&ctx()).await.unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
    }

    #[tokio::test]
    async fn unreachable_provider_degrades_without_raising() {
        let agent = NewsSentimentAgent::new(Some("http://127.0.0.1:9".to_string()));
        let result = agent.evaluate(&ctx()).await.unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(result.payload["status"], "provider-unreachable");
    }

    #[test]
    fn garbage_body_is_an_explicit_parse_failure() {
        match NewsSentimentAgent::parse_body("not json at all") {
            SentimentParse::Unparsed { raw } => assert_eq!(raw, "not json at all"),
            SentimentParse::Parsed(_) => panic!("should not parse"),
        }
    }

    #[test]
    fn clean_body_parses() {
        match NewsSentimentAgent::parse_body(r#"{"score": 0.4, "confidence": 62.0}"#) {
            SentimentParse::Parsed(s) => {
                assert_eq!(s.score, 0.4);
                assert_eq!(s.confidence, 62.0);
            }
            SentimentParse::Unparsed { .. } => panic!("should parse"),
        }
    }
}
