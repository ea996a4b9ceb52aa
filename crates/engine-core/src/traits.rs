use async_trait::async_trait;

use crate::{AgentKind, AgentResult, EngineError, PipelineContext};

/// The one operation every agent satisfies, whether it runs in-process or
/// behind an HTTP endpoint. Agents receive a borrow of the run's context and
/// may read any predecessor result already committed to it.
#[async_trait]
pub trait Agent: Send + Sync {
    fn kind(&self) -> AgentKind;

    async fn evaluate(&self, ctx: &PipelineContext) -> Result<AgentResult, EngineError>;
}
