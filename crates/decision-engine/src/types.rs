//! The reasoning artifact. One typed record per stage; the engine's output
//! is a record of those records, serialized verbatim into
//! `trade_signals.ai_reasoning` and `brain_decisions.professional_reasoning`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

/// One interval's read: trend, dominant signal, anchored-agent strength
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeView {
    pub interval: String,
    pub trend: Trend,
    pub signal: Signal,
    /// Average confidence of the agents anchored to this interval, 0..100
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiTimeframeAnalysis {
    pub higher: TimeframeView,
    pub current: TimeframeView,
    pub lower: TimeframeView,
    /// 0..100: 40 for higher=current, 30 for current=lower, 30 for higher=lower
    pub alignment: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketContext {
    pub price: f64,
    pub volume: f64,
    pub trend: Trend,
    pub volatility: Volatility,
    /// 20-candle percentage deviation from SMA, clamped to [-100, 100]
    pub momentum: f64,
    pub support: f64,
    pub resistance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SetupType {
    Breakout,
    Reversal,
    Continuation,
    MeanReversion,
    Momentum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryTiming {
    Optimal,
    Early,
    Late,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSetup {
    pub setup_type: SetupType,
    pub direction: Signal,
    /// Independent conditions supporting the setup; fewer than three means
    /// no setup at all
    pub confluence: Vec<String>,
    pub quality: f64,
    pub timing: EntryTiming,
    /// Price at which the setup premise is wrong; becomes the stop
    pub invalidation_price: f64,
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitTarget {
    pub price: f64,
    pub exit_percent: f64,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReward {
    pub entry: f64,
    pub stop: f64,
    pub targets: Vec<ProfitTarget>,
    pub risk_amount: f64,
    pub reward_amount: f64,
    /// Reward over risk, rounded to two decimals
    pub ratio: f64,
    /// 30..85
    pub win_probability: f64,
    pub expected_value: f64,
    pub worth_taking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SentimentBucket {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl SentimentBucket {
    pub fn is_extreme(&self) -> bool {
        matches!(self, SentimentBucket::ExtremeFear | SentimentBucket::ExtremeGreed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketRegime {
    Accumulation,
    Markup,
    Distribution,
    Markdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartMoney {
    pub direction: Signal,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Psychology {
    /// 0..100, 50 is balanced
    pub fear_greed_index: f64,
    pub sentiment: SentimentBucket,
    /// Fires when the crowd is stretched more than 30 points off balance,
    /// pointing the other way
    pub contrarian_signal: Option<Signal>,
    pub regime: MarketRegime,
    pub smart_money: SmartMoney,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStyle {
    Limit,
    Scaled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryLevel {
    pub price: f64,
    pub size_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStrategy {
    pub style: EntryStyle,
    pub levels: Vec<EntryLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitPlan {
    pub stop_loss: f64,
    pub targets: Vec<ProfitTarget>,
    pub trailing_stop: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSizing {
    pub usd_value: f64,
    pub percent_of_account: f64,
    pub leverage: f64,
    pub risk_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeScenario {
    pub name: String,
    pub probability: f64,
    pub outcome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePlan {
    pub entry: EntryStrategy,
    pub exit: ExitPlan,
    pub sizing: PositionSizing,
    pub expected_duration: String,
    pub scenarios: Vec<TradeScenario>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub name: String,
    pub weight: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionAction {
    EnterLong,
    EnterShort,
    Wait,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::EnterLong => "enter-long",
            DecisionAction::EnterShort => "enter-short",
            DecisionAction::Wait => "wait",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub action: DecisionAction,
    pub checklist: Vec<ChecklistItem>,
    /// Weighted share of passed checklist items, 0..100, rounded
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPriority {
    Immediate,
    Patient,
    Conditional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMethod {
    Limit,
    Twap,
    Iceberg,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInstructions {
    pub priority: ExecutionPriority,
    pub method: ExecutionMethod,
    pub urgency: f64,
}

/// The full artifact, one per decision cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalReasoning {
    pub mtf_analysis: MultiTimeframeAnalysis,
    pub market_context: MarketContext,
    pub trade_setup: Option<TradeSetup>,
    pub risk_reward: Option<RiskReward>,
    pub psychology: Psychology,
    pub trade_plan: Option<TradePlan>,
    pub decision: Decision,
    pub execution: ExecutionInstructions,
}
