use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::board::{BOARD_SIZE, Board, SquareState};
use super::facade::{AuctionRecord, DicePair, GameFacade, PlayerId, PlayerView};
use super::layout::{GameLayout, PlayerSlots, SquareSlots};
use crate::error::Result;
use crate::memory::layout::{auction, strings};
use crate::memory::{ProcessMemory, SlotMemory};

/// Owner byte meaning "unowned"
pub const NO_OWNER: u8 = 0xFF;

/// [`GameFacade`] reading and writing the emulator's memory.
///
/// Square state without configured slots, and jail state without a jail
/// slot, are kept in an in-process shadow that the mutators update.
pub struct MemoryGame {
    slots: SlotMemory,
    players: Vec<PlayerSlots>,
    squares: HashMap<u8, SquareSlots>,
    auction_base: u64,
    board: Board,
    shadow_squares: RwLock<Vec<SquareState>>,
    shadow_jail: RwLock<HashSet<PlayerId>>,
}

impl MemoryGame {
    pub fn new(memory: Arc<dyn ProcessMemory>, layout: &GameLayout) -> Result<Self> {
        layout.validate()?;
        let players = layout
            .players
            .iter()
            .map(|p| p.slots())
            .collect::<Result<Vec<_>>>()?;
        let squares = layout
            .squares
            .iter()
            .map(|s| (s.index, s.slots()))
            .collect();

        Ok(Self {
            slots: SlotMemory::new(memory),
            players,
            squares,
            auction_base: layout.auction_base,
            board: Board::standard(),
            shadow_squares: RwLock::new(vec![SquareState::default(); BOARD_SIZE]),
            shadow_jail: RwLock::new(HashSet::new()),
        })
    }

    fn slots_for(&self, player: PlayerId) -> Result<&PlayerSlots> {
        self.players
            .iter()
            .find(|p| p.id == player)
            .ok_or(crate::Error::UnknownPlayer(player))
    }

    fn read_player(&self, slots: &PlayerSlots) -> Result<Option<PlayerView>> {
        let name = self
            .slots
            .read_wide_string(&slots.name, strings::NAME_MAX_UNITS)?;
        if name.trim().is_empty() {
            return Ok(None);
        }

        let in_jail = match &slots.jailed {
            Some(slot) => self.slots.read_u8(slot)? != 0,
            None => self
                .shadow_jail
                .read()
                .unwrap_or_else(|p| p.into_inner())
                .contains(&slots.id),
        };
        let bankrupt = match &slots.bankrupt {
            Some(slot) => self.slots.read_u8(slot)? != 0,
            None => false,
        };

        Ok(Some(PlayerView {
            id: slots.id,
            name,
            cash: self.slots.read_u32(&slots.money)?,
            position: self.slots.read_u8(&slots.position)?,
            goto: self.slots.read_u8(&slots.goto)?,
            dice: DicePair(
                self.slots.read_u8(&slots.dice[0])?,
                self.slots.read_u8(&slots.dice[1])?,
            ),
            in_jail,
            bankrupt,
        }))
    }

    fn update_shadow(&self, square: u8, update: impl FnOnce(&mut SquareState)) {
        let mut shadow = self.shadow_squares.write().unwrap_or_else(|p| p.into_inner());
        if let Some(state) = shadow.get_mut(square as usize) {
            update(state);
        }
    }
}

/// `1500` -> `"1,500"`, as the game renders money
pub fn format_money(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl GameFacade for MemoryGame {
    fn players(&self) -> Result<Vec<PlayerView>> {
        let mut players = Vec::with_capacity(self.players.len());
        for slots in &self.players {
            if let Some(player) = self.read_player(slots)? {
                players.push(player);
            }
        }
        Ok(players)
    }

    fn board(&self) -> &Board {
        &self.board
    }

    fn square_states(&self) -> Result<Vec<SquareState>> {
        let mut states = self
            .shadow_squares
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone();

        for (index, slots) in &self.squares {
            let Some(state) = states.get_mut(*index as usize) else {
                continue;
            };
            if let Some(slot) = &slots.owner {
                let owner = self.slots.read_u8(slot)?;
                state.owner = (owner != NO_OWNER).then_some(owner);
            }
            if let Some(slot) = &slots.houses {
                state.houses = self.slots.read_u8(slot)?;
            }
            if let Some(slot) = &slots.mortgaged {
                state.mortgaged = self.slots.read_u8(slot)? != 0;
            }
        }
        Ok(states)
    }

    fn auction(&self) -> Result<AuctionRecord> {
        let base = self.auction_base;
        Ok(AuctionRecord {
            active: self.slots.read_u32_at(base + auction::STATUS)? == auction::STATUS_ACTIVE,
            current_bidder: self.slots.read_u32_at(base + auction::CURRENT_BIDDER)?,
            current_price: self.slots.read_u32_at(base + auction::CURRENT_PRICE)?,
            next_price: self.slots.read_u32_at(base + auction::NEXT_PRICE)?,
        })
    }

    fn set_cash(&self, player: PlayerId, cash: u32) -> Result<()> {
        let slots = self.slots_for(player)?;
        self.slots.write_u32(&slots.money, cash)?;
        if let Some(label) = &slots.money_label {
            self.slots.write_wide_string(label, &format_money(cash))?;
        }
        debug!("player {} cash set to {}", player, cash);
        Ok(())
    }

    fn set_position(&self, player: PlayerId, position: u8) -> Result<()> {
        let slots = self.slots_for(player)?;
        self.slots.write_u8(&slots.goto, position)?;
        self.slots.write_u8(&slots.position, position)
    }

    fn set_in_jail(&self, player: PlayerId, in_jail: bool) -> Result<()> {
        let slots = self.slots_for(player)?;
        if let Some(slot) = &slots.jailed {
            return self.slots.write_u8(slot, in_jail as u8);
        }
        let mut jail = self.shadow_jail.write().unwrap_or_else(|p| p.into_inner());
        if in_jail {
            jail.insert(player);
        } else {
            jail.remove(&player);
        }
        Ok(())
    }

    fn set_owner(&self, square: u8, owner: Option<PlayerId>) -> Result<()> {
        if let Some(slot) = self.squares.get(&square).and_then(|s| s.owner.as_ref()) {
            self.slots.write_u8(slot, owner.unwrap_or(NO_OWNER))?;
        }
        self.update_shadow(square, |state| state.owner = owner);
        Ok(())
    }

    fn set_mortgaged(&self, square: u8, mortgaged: bool) -> Result<()> {
        if let Some(slot) = self.squares.get(&square).and_then(|s| s.mortgaged.as_ref()) {
            self.slots.write_u8(slot, mortgaged as u8)?;
        }
        self.update_shadow(square, |state| state.mortgaged = mortgaged);
        Ok(())
    }

    fn set_houses(&self, square: u8, houses: u8) -> Result<()> {
        if let Some(slot) = self.squares.get(&square).and_then(|s| s.houses.as_ref()) {
            self.slots.write_u8(slot, houses)?;
        }
        self.update_shadow(square, |state| state.houses = houses);
        Ok(())
    }
}
