use serde::{Deserialize, Serialize};

use super::board::{Board, Square, SquareState};
use crate::error::{Error, Result};

pub type PlayerId = u8;

/// Two dice as shown on screen. `(0, 0)` is the reset value before a roll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DicePair(pub u8, pub u8);

impl DicePair {
    pub fn is_reset(&self) -> bool {
        self.0 == 0 && self.1 == 0
    }

    pub fn total(&self) -> u8 {
        self.0.saturating_add(self.1)
    }

    pub fn is_double(&self) -> bool {
        !self.is_reset() && self.0 == self.1
    }
}

/// One player as currently shown by the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub cash: u32,
    pub position: u8,
    /// Square the token is travelling to
    pub goto: u8,
    pub dice: DicePair,
    pub in_jail: bool,
    pub bankrupt: bool,
}

/// The game's auction record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionRecord {
    pub active: bool,
    pub current_bidder: u32,
    pub current_price: u32,
    pub next_price: u32,
}

impl AuctionRecord {
    pub fn bid(&self) -> Bid {
        Bid {
            bidder: self.current_bidder,
            price: self.current_price,
            next_price: self.next_price,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub bidder: u32,
    pub price: u32,
    pub next_price: u32,
}

/// A square together with its live state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquareView {
    pub square: Square,
    pub state: SquareState,
    pub rent: u32,
}

/// The only path into the simulated game.
///
/// Readers are used by the observer and the reconciler; mutators by the
/// auction and decision layers.
pub trait GameFacade: Send + Sync {
    /// Players currently seated, in roster order
    fn players(&self) -> Result<Vec<PlayerView>>;

    fn board(&self) -> &Board;

    fn square_states(&self) -> Result<Vec<SquareState>>;

    fn auction(&self) -> Result<AuctionRecord>;

    fn set_cash(&self, player: PlayerId, cash: u32) -> Result<()>;

    fn set_position(&self, player: PlayerId, position: u8) -> Result<()>;

    fn set_in_jail(&self, player: PlayerId, in_jail: bool) -> Result<()>;

    fn set_owner(&self, square: u8, owner: Option<PlayerId>) -> Result<()>;

    fn set_mortgaged(&self, square: u8, mortgaged: bool) -> Result<()>;

    fn set_houses(&self, square: u8, houses: u8) -> Result<()>;

    fn player(&self, id: PlayerId) -> Result<Option<PlayerView>> {
        Ok(self.players()?.into_iter().find(|p| p.id == id))
    }

    fn require_player(&self, id: PlayerId) -> Result<PlayerView> {
        self.player(id)?
            .ok_or(Error::UnknownPlayer(id))
    }

    fn square_state(&self, index: u8) -> Result<SquareState> {
        Ok(self
            .square_states()?
            .get(index as usize)
            .copied()
            .unwrap_or_default())
    }

    fn squares(&self) -> Result<Vec<SquareView>> {
        let states = self.square_states()?;
        let board = self.board();
        Ok(board
            .squares()
            .iter()
            .map(|square| SquareView {
                square: square.clone(),
                state: states.get(square.index as usize).copied().unwrap_or_default(),
                rent: board.current_rent(square.index, &states),
            })
            .collect())
    }

    fn owned_by(&self, player: PlayerId) -> Result<Vec<u8>> {
        Ok(self
            .square_states()?
            .iter()
            .enumerate()
            .filter(|(_, state)| state.owner == Some(player))
            .map(|(index, _)| index as u8)
            .collect())
    }

    /// Add `delta` to a player's cash, flooring at zero. Returns the new cash.
    fn adjust_cash(&self, player: PlayerId, delta: i64) -> Result<u32> {
        let current = self.require_player(player)?.cash as i64;
        let updated = (current + delta).clamp(0, u32::MAX as i64) as u32;
        self.set_cash(player, updated)?;
        Ok(updated)
    }

    /// Hand `square` to `buyer` for `price`, clearing any mortgage.
    fn transfer_property(&self, square: u8, buyer: PlayerId, price: u32) -> Result<()> {
        self.adjust_cash(buyer, -(price as i64))?;
        self.set_owner(square, Some(buyer))?;
        if self.square_state(square)?.mortgaged {
            self.set_mortgaged(square, false)?;
        }
        Ok(())
    }
}
