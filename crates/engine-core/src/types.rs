use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// All numeric fields finite — candles violating this are dropped at the gateway
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}

/// Candle intervals the engine works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// 15-minute candles
    #[serde(rename = "15m")]
    Min15,
    /// 1-hour candles
    #[serde(rename = "1h")]
    Hour1,
    /// 4-hour candles
    #[serde(rename = "4h")]
    Hour4,
    /// Daily candles
    #[serde(rename = "1d")]
    Day1,
}

impl Timeframe {
    /// Interval label as used on the market-data wire and in context keys
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Min15 => "15m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Day1 => "1d",
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::Min15 => 15,
            Timeframe::Hour1 => 60,
            Timeframe::Hour4 => 240,
            Timeframe::Day1 => 1440,
        }
    }

    /// The intervals fetched for every pipeline run
    pub fn all() -> [Timeframe; 4] {
        [
            Timeframe::Min15,
            Timeframe::Hour1,
            Timeframe::Hour4,
            Timeframe::Day1,
        ]
    }

    pub fn parse(s: &str) -> Option<Timeframe> {
        match s {
            "15m" => Some(Timeframe::Min15),
            "1h" => Some(Timeframe::Hour1),
            "4h" => Some(Timeframe::Hour4),
            "1d" => Some(Timeframe::Day1),
            _ => None,
        }
    }
}

/// The nine agents of the decision chain, in their fixed evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    MarketStructure,
    OrderFlow,
    Momentum,
    VolatilityRegime,
    NewsSentiment,
    MultiTimeframe,
    PatternRecognition,
    StatisticalEdge,
    RiskManager,
}

impl AgentKind {
    /// The fixed evaluation order. Downstream agents read predecessors'
    /// results, so this sequence is load-bearing.
    pub const CHAIN: [AgentKind; 9] = [
        AgentKind::MarketStructure,
        AgentKind::OrderFlow,
        AgentKind::Momentum,
        AgentKind::VolatilityRegime,
        AgentKind::NewsSentiment,
        AgentKind::MultiTimeframe,
        AgentKind::PatternRecognition,
        AgentKind::StatisticalEdge,
        AgentKind::RiskManager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::MarketStructure => "market-structure",
            AgentKind::OrderFlow => "order-flow",
            AgentKind::Momentum => "momentum",
            AgentKind::VolatilityRegime => "volatility-regime",
            AgentKind::NewsSentiment => "news-sentiment",
            AgentKind::MultiTimeframe => "multi-timeframe",
            AgentKind::PatternRecognition => "pattern-recognition",
            AgentKind::StatisticalEdge => "statistical-edge",
            AgentKind::RiskManager => "risk-manager",
        }
    }

    pub fn parse(s: &str) -> Option<AgentKind> {
        Self::CHAIN.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single agent thinks of the market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    /// -1 (max bearish) .. +1 (max bullish)
    pub score: f64,
    /// 0 .. 100
    pub confidence: f64,
    /// Opaque per-agent detail record
    pub payload: serde_json::Value,
}

impl AgentResult {
    /// The only constructor used at the orchestrator boundary: clamps score
    /// to [-1, 1] and confidence to [0, 100], maps NaN/infinity to zero.
    pub fn clamped(score: f64, confidence: f64, payload: serde_json::Value) -> Self {
        let score = if score.is_finite() {
            score.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            score,
            confidence,
            payload,
        }
    }

    /// Zero-valued result recorded when an agent raises. The error string
    /// lands in `payload.error` so the step row carries the cause.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            confidence: 0.0,
            payload: serde_json::json!({ "error": error.into() }),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.payload.get("error").and_then(|v| v.as_str())
    }
}

/// Trade direction of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
    Hold,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Buy => "buy",
            TradeDirection::Sell => "sell",
            TradeDirection::Hold => "hold",
        }
    }

    pub fn parse(s: &str) -> Option<TradeDirection> {
        match s {
            "buy" => Some(TradeDirection::Buy),
            "sell" => Some(TradeDirection::Sell),
            "hold" => Some(TradeDirection::Hold),
            _ => None,
        }
    }
}

/// Read-only account snapshot taken at run start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub id: String,
    pub starting_balance: f64,
    pub current_balance: f64,
    pub max_leverage: f64,
    /// Max risk per trade, percent of current balance
    pub max_risk_per_trade: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_bounds_score_and_confidence() {
        let r = AgentResult::clamped(3.5, 250.0, serde_json::json!({}));
        assert_eq!(r.score, 1.0);
        assert_eq!(r.confidence, 100.0);

        let r = AgentResult::clamped(-9.0, -5.0, serde_json::json!({}));
        assert_eq!(r.score, -1.0);
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn clamped_rejects_non_finite() {
        let r = AgentResult::clamped(f64::NAN, f64::INFINITY, serde_json::json!({}));
        assert_eq!(r.score, 0.0);
        assert_eq!(r.confidence, 0.0);

        let r = AgentResult::clamped(f64::NEG_INFINITY, f64::NAN, serde_json::json!({}));
        assert_eq!(r.score, 0.0);
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn failure_carries_error_payload() {
        let r = AgentResult::failure("remote timeout");
        assert_eq!(r.score, 0.0);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.error(), Some("remote timeout"));
    }

    #[test]
    fn chain_order_is_fixed() {
        let names: Vec<&str> = AgentKind::CHAIN.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "market-structure",
                "order-flow",
                "momentum",
                "volatility-regime",
                "news-sentiment",
                "multi-timeframe",
                "pattern-recognition",
                "statistical-edge",
                "risk-manager",
            ]
        );
    }

    #[test]
    fn agent_kind_round_trips_through_names() {
        for kind in AgentKind::CHAIN {
            assert_eq!(AgentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AgentKind::parse("unknown-agent"), None);
    }
}
