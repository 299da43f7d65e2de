use super::provider::{Decision, DecisionKind, DecisionProvider, DecisionRequest, DecisionValue};
use crate::error::Result;

/// Rule-based local provider.
///
/// Reads the context keys the auction and the turn states send.
#[derive(Debug, Clone)]
pub struct HeuristicProvider {
    /// Cash kept back from any spending decision
    pub reserve: u32,
    /// Highest bid as a fraction of the list price
    pub bid_fraction: f64,
    /// Cash above which bail is paid instead of rolling
    pub comfortable_cash: u32,
}

impl Default for HeuristicProvider {
    fn default() -> Self {
        Self {
            reserve: 100,
            bid_fraction: 0.8,
            comfortable_cash: 500,
        }
    }
}

impl HeuristicProvider {
    fn bid_ceiling(&self, list_price: u32) -> u32 {
        (list_price as f64 * self.bid_fraction) as u32
    }

    fn affordable(&self, cash: u32, cost: u32) -> bool {
        cash >= cost.saturating_add(self.reserve)
    }
}

impl DecisionProvider for HeuristicProvider {
    fn decide(&self, request: &DecisionRequest) -> Result<Decision> {
        let get = |key: &str| request.context_u32(key).unwrap_or(0);

        let decision = match request.kind {
            DecisionKind::AuctionSealedBid => {
                let bid = self.bid_ceiling(get("base_price")).min(get("max_bid"));
                Decision::new(DecisionValue::Amount(bid), "opening at a discount to list price")
            }
            DecisionKind::AuctionCounterBid => {
                let next = get("current_high").saturating_add(get("min_raise"));
                if next <= self.bid_ceiling(get("property_value"))
                    && self.affordable(get("my_cash"), next)
                {
                    Decision::new(DecisionValue::Amount(next), "still below my ceiling")
                } else {
                    Decision::new(DecisionValue::Amount(0), "too expensive")
                }
            }
            DecisionKind::BuyProperty => {
                let buy = self.affordable(get("cash"), get("price"));
                Decision::new(DecisionValue::Bool(buy), "buy while the reserve holds")
            }
            DecisionKind::JailRelease => {
                let choice = if request.context_bool("has_card").unwrap_or(false) {
                    "use_card"
                } else if get("cash") >= self.comfortable_cash {
                    "pay_bail"
                } else {
                    "roll"
                };
                Decision::new(DecisionValue::Choice(choice.to_string()), "")
            }
            DecisionKind::Build => {
                let build = self.affordable(get("cash"), get("house_cost").saturating_add(self.reserve));
                Decision::new(DecisionValue::Bool(build), "")
            }
            DecisionKind::Mortgage => Decision::new(DecisionValue::Bool(true), "raise cash"),
            DecisionKind::TradeOffer | DecisionKind::TradeResponse => {
                Decision::new(DecisionValue::Bool(false), "no trades")
            }
        };
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ask(kind: DecisionKind, context: serde_json::Value) -> DecisionValue {
        HeuristicProvider::default()
            .decide(&DecisionRequest::new(kind, 0, context))
            .unwrap()
            .value
    }

    #[test]
    fn test_sealed_bid_capped() {
        let value = ask(
            DecisionKind::AuctionSealedBid,
            json!({ "base_price": 200, "max_bid": 120 }),
        );
        assert_eq!(value, DecisionValue::Amount(120));
    }

    #[test]
    fn test_counter_bid() {
        let context = json!({ "current_high": 40, "min_raise": 10, "property_value": 60, "my_cash": 1500 });
        assert_eq!(ask(DecisionKind::AuctionCounterBid, context), DecisionValue::Amount(0));

        let context = json!({ "current_high": 100, "min_raise": 10, "property_value": 200, "my_cash": 1500 });
        assert_eq!(ask(DecisionKind::AuctionCounterBid, context), DecisionValue::Amount(110));
    }

    #[test]
    fn test_jail_release() {
        assert_eq!(
            ask(DecisionKind::JailRelease, json!({ "has_card": true, "cash": 10 })),
            DecisionValue::Choice("use_card".into())
        );
        assert_eq!(
            ask(DecisionKind::JailRelease, json!({ "cash": 40 })),
            DecisionValue::Choice("roll".into())
        );
    }

    #[test]
    fn test_buy_respects_reserve() {
        assert_eq!(
            ask(DecisionKind::BuyProperty, json!({ "cash": 150, "price": 60 })),
            DecisionValue::Bool(false)
        );
        assert_eq!(
            ask(DecisionKind::BuyProperty, json!({ "cash": 1500, "price": 60 })),
            DecisionValue::Bool(true)
        );
    }
}
