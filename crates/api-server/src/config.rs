use anyhow::{anyhow, Result};
use engine_core::Timeframe;

/// Engine configuration, read once at startup and validated before anything
/// connects anywhere.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    /// Absent means the in-memory queue: single-process dev mode
    pub redis_url: Option<String>,
    pub market_data_base_url: String,
    pub default_account_id: String,
    pub default_symbol: String,
    pub default_timeframe: Timeframe,
    /// 0 disables the scheduler
    pub pipeline_interval_ms: u64,
    pub live_execution: bool,
    pub use_http_agents: bool,
    pub remote_agent_base_url: String,
    pub remote_agent_first_port: u16,
    pub remote_agent_ports: String,
    pub venue: String,
    pub execution_workers: usize,
    pub risk_fraction: f64,
    pub reference_price: f64,
    pub http_bind: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1" || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| anyhow!("DATABASE_URL not set"))?;

        let default_timeframe_raw = env_or("DEFAULT_TIMEFRAME", "1h");
        let default_timeframe = Timeframe::parse(&default_timeframe_raw)
            .ok_or_else(|| anyhow!("DEFAULT_TIMEFRAME invalid: {default_timeframe_raw}"))?;

        let pipeline_interval_ms: u64 = env_or("PIPELINE_INTERVAL_MS", "300000")
            .parse()
            .map_err(|_| anyhow!("PIPELINE_INTERVAL_MS must be an integer"))?;
        if pipeline_interval_ms != 0 && pipeline_interval_ms < 1_000 {
            return Err(anyhow!(
                "PIPELINE_INTERVAL_MS below 1000ms would hammer the gateway"
            ));
        }

        let venue = env_or("VENUE", "bybit").to_lowercase();
        if venue != "bybit" && venue != "binance" {
            return Err(anyhow!("VENUE must be bybit or binance, got {venue}"));
        }

        let execution_workers: usize = env_or("EXECUTION_WORKERS", "1")
            .parse()
            .map_err(|_| anyhow!("EXECUTION_WORKERS must be an integer"))?;

        let risk_fraction: f64 = env_or("EXECUTION_RISK_FRACTION", "0.02")
            .parse()
            .map_err(|_| anyhow!("EXECUTION_RISK_FRACTION must be a number"))?;
        if !(0.0..=1.0).contains(&risk_fraction) {
            return Err(anyhow!("EXECUTION_RISK_FRACTION must be within 0..1"));
        }

        let reference_price: f64 = env_or("REFERENCE_PRICE", "50000")
            .parse()
            .map_err(|_| anyhow!("REFERENCE_PRICE must be a number"))?;
        if reference_price <= 0.0 {
            return Err(anyhow!("REFERENCE_PRICE must be positive"));
        }

        let remote_agent_first_port: u16 = env_or("REMOTE_AGENT_FIRST_PORT", "9101")
            .parse()
            .map_err(|_| anyhow!("REMOTE_AGENT_FIRST_PORT must be a port"))?;

        Ok(Self {
            database_url,
            redis_url: std::env::var("REDIS_URL").ok(),
            market_data_base_url: env_or("MARKET_DATA_BASE_URL", "https://api.binance.com/api/v3"),
            default_account_id: env_or("DEFAULT_ACCOUNT_ID", "default"),
            default_symbol: env_or("DEFAULT_SYMBOL", "BTCUSDT"),
            default_timeframe,
            pipeline_interval_ms,
            live_execution: env_bool("LIVE_EXECUTION"),
            use_http_agents: env_bool("USE_HTTP_AGENTS"),
            remote_agent_base_url: env_or("REMOTE_AGENT_BASE_URL", "http://127.0.0.1"),
            remote_agent_first_port,
            remote_agent_ports: env_or("REMOTE_AGENT_PORTS", ""),
            venue,
            execution_workers,
            risk_fraction,
            reference_price,
            http_bind: env_or("HTTP_BIND", "0.0.0.0:8080"),
        })
    }
}
