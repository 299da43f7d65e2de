use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Name used for events not attributable to a player
pub const SYSTEM_PLAYER: &str = "System";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    JoinGame,
    LeaveGame,
    ChangeName,
    RollDice,
    Move,
    Goto,
    ReceiveMoney,
    PayMoney,
    BuyProperty,
    SellProperty,
    MortgageProperty,
    UnmortgageProperty,
    BuildHouse,
    BuildHotel,
    PayRent,
    JailEnter,
    JailExit,
    AuctionStarted,
    Bid,
    AuctionEnded,
    PropertyOffer,
    JailOptions,
    ChanceCard,
    CommunityChest,
    Message,
    MoveAndBuy,
    MoveAndPay,
}

impl ActionKind {
    /// Kinds after which play passes to the next player
    pub fn ends_turn(self) -> bool {
        matches!(
            self,
            Self::MoveAndBuy
                | Self::MoveAndPay
                | Self::PayRent
                | Self::BuyProperty
                | Self::AuctionEnded
                | Self::JailEnter
        )
    }

    pub fn is_move(self) -> bool {
        matches!(self, Self::Move | Self::MoveAndBuy | Self::MoveAndPay)
    }
}

/// One reconciled event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub turn: u32,
    pub player: String,
    #[serde(rename = "action")]
    pub kind: ActionKind,
    pub detail: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A raw `record` request before reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub player: String,
    pub kind: ActionKind,
    pub detail: String,
}

impl Record {
    pub fn new(player: impl Into<String>, kind: ActionKind, detail: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            kind,
            detail: detail.into(),
        }
    }

    pub fn system(kind: ActionKind, detail: impl Into<String>) -> Self {
        Self::new(SYSTEM_PLAYER, kind, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_kind_names() {
        assert_eq!(ActionKind::MoveAndBuy.to_string(), "move_and_buy");
        assert_eq!(ActionKind::from_str("pay_rent").unwrap(), ActionKind::PayRent);
        assert_eq!(
            serde_json::to_string(&ActionKind::JailEnter).unwrap(),
            "\"jail_enter\""
        );
    }

    #[test]
    fn test_turn_ending_kinds() {
        assert!(ActionKind::MoveAndPay.ends_turn());
        assert!(ActionKind::JailEnter.ends_turn());
        assert!(!ActionKind::Move.ends_turn());
        assert!(!ActionKind::RollDice.ends_turn());
        assert!(!ActionKind::Bid.ends_turn());
    }
}
