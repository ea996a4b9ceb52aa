pub mod market_structure;
pub mod math;
pub mod momentum;
pub mod multi_timeframe;
pub mod news_sentiment;
pub mod order_flow;
pub mod pattern_recognition;
pub mod remote;
pub mod risk_manager;
pub mod statistical_edge;
pub mod volatility_regime;

use std::sync::Arc;

use engine_core::{Agent, AgentKind};

pub use market_structure::MarketStructureAgent;
pub use momentum::MomentumAgent;
pub use multi_timeframe::MultiTimeframeAgent;
pub use news_sentiment::NewsSentimentAgent;
pub use order_flow::OrderFlowAgent;
pub use pattern_recognition::PatternRecognitionAgent;
pub use remote::{RemoteAgent, RemoteAgentResponse, DEFAULT_DEADLINE};
pub use risk_manager::RiskManagerAgent;
pub use statistical_edge::StatisticalEdgeAgent;
pub use volatility_regime::VolatilityRegimeAgent;

/// Build the in-process implementation of one agent
pub fn local_agent(kind: AgentKind) -> Arc<dyn Agent> {
    match kind {
        AgentKind::MarketStructure => Arc::new(MarketStructureAgent),
        AgentKind::OrderFlow => Arc::new(OrderFlowAgent),
        AgentKind::Momentum => Arc::new(MomentumAgent),
        AgentKind::VolatilityRegime => Arc::new(VolatilityRegimeAgent),
        AgentKind::NewsSentiment => Arc::new(NewsSentimentAgent::from_env()),
        AgentKind::MultiTimeframe => Arc::new(MultiTimeframeAgent),
        AgentKind::PatternRecognition => Arc::new(PatternRecognitionAgent),
        AgentKind::StatisticalEdge => Arc::new(StatisticalEdgeAgent),
        AgentKind::RiskManager => Arc::new(RiskManagerAgent),
    }
}

/// The full in-process chain in its fixed evaluation order
pub fn local_agents() -> Vec<Arc<dyn Agent>> {
    AgentKind::CHAIN.into_iter().map(local_agent).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_chain_covers_every_agent_in_order() {
        let agents = local_agents();
        assert_eq!(agents.len(), AgentKind::CHAIN.len());
        for (agent, kind) in agents.iter().zip(AgentKind::CHAIN) {
            assert_eq!(agent.kind(), kind);
        }
    }
}
