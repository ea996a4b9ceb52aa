use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Venue error: {0}")]
    Venue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
