use std::mem::discriminant;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::warn;

use crate::error::{Error, Result};
use crate::game::PlayerId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DecisionKind {
    AuctionSealedBid,
    AuctionCounterBid,
    BuyProperty,
    JailRelease,
    Build,
    Mortgage,
    TradeOffer,
    TradeResponse,
}

/// What a provider answers with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecisionValue {
    Bool(bool),
    Amount(u32),
    Choice(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub kind: DecisionKind,
    pub player: PlayerId,
    pub context: serde_json::Value,
}

impl DecisionRequest {
    pub fn new(kind: DecisionKind, player: PlayerId, context: serde_json::Value) -> Self {
        Self {
            kind,
            player,
            context,
        }
    }

    pub fn context_u32(&self, key: &str) -> Option<u32> {
        self.context
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .map(|v| v.min(u32::MAX as u64) as u32)
    }

    pub fn context_bool(&self, key: &str) -> Option<bool> {
        self.context.get(key).and_then(serde_json::Value::as_bool)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "decision")]
    pub value: DecisionValue,
    #[serde(default)]
    pub rationale: String,
}

impl Decision {
    pub fn new(value: DecisionValue, rationale: impl Into<String>) -> Self {
        Self {
            value,
            rationale: rationale.into(),
        }
    }
}

/// Anything that can answer a decision request.
///
/// Closures taking a request work as providers, which keeps test doubles
/// small.
pub trait DecisionProvider: Send + Sync {
    fn decide(&self, request: &DecisionRequest) -> Result<Decision>;
}

impl<F> DecisionProvider for F
where
    F: Fn(&DecisionRequest) -> Result<Decision> + Send + Sync,
{
    fn decide(&self, request: &DecisionRequest) -> Result<Decision> {
        self(request)
    }
}

/// Ask `provider`, falling back to `default` on failure or on an answer of
/// the wrong shape.
pub fn decide_or_default(
    provider: &dyn DecisionProvider,
    request: &DecisionRequest,
    default: DecisionValue,
) -> DecisionValue {
    let failure = match provider.decide(request) {
        Ok(decision) if discriminant(&decision.value) == discriminant(&default) => {
            return decision.value;
        }
        Ok(decision) => Error::DecisionProvider(format!(
            "expected {:?}-shaped answer, got {:?}",
            default, decision.value
        )),
        Err(e) => e,
    };
    warn!(
        "{} decision for player {} failed, using {:?}: {}",
        request.kind, request.player, default, failure
    );
    default
}

pub fn decide_amount(provider: &dyn DecisionProvider, request: &DecisionRequest, default: u32) -> u32 {
    match decide_or_default(provider, request, DecisionValue::Amount(default)) {
        DecisionValue::Amount(amount) => amount,
        _ => default,
    }
}

pub fn decide_bool(provider: &dyn DecisionProvider, request: &DecisionRequest, default: bool) -> bool {
    match decide_or_default(provider, request, DecisionValue::Bool(default)) {
        DecisionValue::Bool(value) => value,
        _ => default,
    }
}

pub fn decide_choice(provider: &dyn DecisionProvider, request: &DecisionRequest, default: &str) -> String {
    match decide_or_default(provider, request, DecisionValue::Choice(default.to_string())) {
        DecisionValue::Choice(choice) => choice,
        _ => default.to_string(),
    }
}
