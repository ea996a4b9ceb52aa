use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Unified venue types (venue-agnostic)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Uppercase spelling used by the futures venue's query string. Venues
    /// with a different convention map the side themselves.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

/// A market order as the execution worker hands it to an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueOrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub qty: Decimal,
}

impl VenueOrderRequest {
    pub fn buy(symbol: impl Into<String>, qty: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side: OrderSide::Buy,
            qty,
        }
    }

    pub fn sell(symbol: impl Into<String>, qty: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side: OrderSide::Sell,
            qty,
        }
    }
}

/// Outcome of a placement attempt. Adapters fold every failure mode —
/// missing credentials, transport errors, venue-level rejections — into
/// `success = false` with a reason; nothing escapes as a panic or error type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacement {
    pub success: bool,
    pub tx_id: Option<String>,
    pub error: Option<String>,
}

impl OrderPlacement {
    pub fn filled(tx_id: impl Into<String>) -> Self {
        Self {
            success: true,
            tx_id: Some(tx_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tx_id: None,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Venue trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Place a market order. Never fails at the type level; inspect
    /// `OrderPlacement.success`.
    async fn place_market_order(&self, order: &VenueOrderRequest) -> OrderPlacement;

    /// Venue name for logging
    fn venue_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::*;

    #[test]
    fn order_constructors_set_side() {
        let buy = VenueOrderRequest::buy("BTCUSDT", Decimal::from_f64(0.01).unwrap());
        assert_eq!(buy.side, OrderSide::Buy);
        assert_eq!(buy.side.as_str(), "BUY");

        let sell = VenueOrderRequest::sell("ETHUSDT", Decimal::ONE);
        assert_eq!(sell.side.as_str(), "SELL");
    }

    #[test]
    fn placement_outcomes_carry_their_evidence() {
        let ok = OrderPlacement::filled("order-1");
        assert!(ok.success);
        assert_eq!(ok.tx_id.as_deref(), Some("order-1"));

        let bad = OrderPlacement::failed("no credentials");
        assert!(!bad.success);
        assert_eq!(bad.error.as_deref(), Some("no credentials"));
    }
}
