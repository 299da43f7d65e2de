use crate::error::Result;
use crate::game::{DicePair, PlayerId, SquareView};

/// Game surface the turn states act through.
///
/// Payments return the payer's balance afterwards, negative when the payer
/// could not cover the amount.
pub trait TurnActions: Send + Sync {
    fn cash(&self, player: PlayerId) -> Result<u32>;

    fn properties(&self, player: PlayerId) -> Result<Vec<u8>>;

    fn is_in_jail(&self, player: PlayerId) -> Result<bool>;

    fn has_jail_card(&self, player: PlayerId) -> Result<bool>;

    fn use_jail_card(&self, player: PlayerId) -> Result<()>;

    fn pay_bail(&self, player: PlayerId) -> Result<()>;

    fn roll_dice(&self, player: PlayerId) -> Result<DicePair>;

    /// Advance by `steps` squares and return the new position
    fn move_token(&self, player: PlayerId, steps: u8) -> Result<u8>;

    fn current_square(&self, player: PlayerId) -> Result<SquareView>;

    fn buy_property(&self, player: PlayerId) -> Result<()>;

    fn start_auction(&self, player: PlayerId, square: u8) -> Result<()>;

    fn pay_rent(&self, player: PlayerId) -> Result<i64>;

    fn pay_tax(&self, player: PlayerId) -> Result<i64>;

    /// Chance, Community Chest, Go To Jail and the other non-property squares
    fn resolve_special(&self, player: PlayerId) -> Result<()>;

    /// Mortgage until `deficit` is covered; returns the amount raised
    fn mortgage_until_solvent(&self, player: PlayerId, deficit: u32) -> Result<u32>;

    fn settle_debt(&self, player: PlayerId) -> Result<()>;

    fn has_monopoly(&self, player: PlayerId) -> Result<bool>;

    /// Returns whether anything was built
    fn build(&self, player: PlayerId) -> Result<bool>;

    fn find_trade_partner(&self, player: PlayerId) -> Result<Option<PlayerId>>;

    fn propose_trade(&self, player: PlayerId, partner: PlayerId) -> Result<()>;

    /// `None` while the partner has not answered
    fn trade_response(&self, player: PlayerId) -> Result<Option<bool>>;

    fn finalize_trade(&self, player: PlayerId) -> Result<()>;

    fn send_to_jail(&self, player: PlayerId) -> Result<()>;

    fn end_turn(&self, player: PlayerId) -> Result<()>;
}
