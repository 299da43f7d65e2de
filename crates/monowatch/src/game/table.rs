//! In-memory [`GameFacade`] for unit tests.

use std::sync::RwLock;

use super::board::{BOARD_SIZE, Board, SquareState};
use super::facade::{AuctionRecord, DicePair, GameFacade, PlayerId, PlayerView};
use crate::error::{Error, Result};

pub struct TableGame {
    board: Board,
    players: RwLock<Vec<PlayerView>>,
    squares: RwLock<Vec<SquareState>>,
    auction: RwLock<AuctionRecord>,
    unavailable: RwLock<bool>,
}

impl TableGame {
    pub fn new(names: &[&str]) -> Self {
        let players = names
            .iter()
            .enumerate()
            .map(|(id, name)| PlayerView {
                id: id as PlayerId,
                name: name.to_string(),
                cash: 1500,
                position: 0,
                goto: 0,
                dice: DicePair::default(),
                in_jail: false,
                bankrupt: false,
            })
            .collect();
        Self {
            board: Board::standard(),
            players: RwLock::new(players),
            squares: RwLock::new(vec![SquareState::default(); BOARD_SIZE]),
            auction: RwLock::new(AuctionRecord::default()),
            unavailable: RwLock::new(false),
        }
    }

    pub fn update_player(&self, id: PlayerId, update: impl FnOnce(&mut PlayerView)) {
        let mut players = self.players.write().unwrap();
        if let Some(player) = players.iter_mut().find(|p| p.id == id) {
            update(player);
        }
    }

    pub fn add_player(&self, id: PlayerId, name: &str) {
        self.players.write().unwrap().push(PlayerView {
            id,
            name: name.to_string(),
            cash: 1500,
            position: 0,
            goto: 0,
            dice: DicePair::default(),
            in_jail: false,
            bankrupt: false,
        });
    }

    pub fn remove_player(&self, id: PlayerId) {
        self.players.write().unwrap().retain(|p| p.id != id);
    }

    pub fn set_auction(&self, record: AuctionRecord) {
        *self.auction.write().unwrap() = record;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().unwrap() = unavailable;
    }

    fn check(&self) -> Result<()> {
        if *self.unavailable.read().unwrap() {
            return Err(Error::MemoryUnavailable("table detached".to_string()));
        }
        Ok(())
    }
}

impl GameFacade for TableGame {
    fn players(&self) -> Result<Vec<PlayerView>> {
        self.check()?;
        Ok(self.players.read().unwrap().clone())
    }

    fn board(&self) -> &Board {
        &self.board
    }

    fn square_states(&self) -> Result<Vec<SquareState>> {
        self.check()?;
        Ok(self.squares.read().unwrap().clone())
    }

    fn auction(&self) -> Result<AuctionRecord> {
        self.check()?;
        Ok(*self.auction.read().unwrap())
    }

    fn set_cash(&self, player: PlayerId, cash: u32) -> Result<()> {
        self.check()?;
        self.update_player(player, |p| p.cash = cash);
        Ok(())
    }

    fn set_position(&self, player: PlayerId, position: u8) -> Result<()> {
        self.check()?;
        self.update_player(player, |p| {
            p.position = position;
            p.goto = position;
        });
        Ok(())
    }

    fn set_in_jail(&self, player: PlayerId, in_jail: bool) -> Result<()> {
        self.check()?;
        self.update_player(player, |p| p.in_jail = in_jail);
        Ok(())
    }

    fn set_owner(&self, square: u8, owner: Option<PlayerId>) -> Result<()> {
        self.check()?;
        self.squares.write().unwrap()[square as usize].owner = owner;
        Ok(())
    }

    fn set_mortgaged(&self, square: u8, mortgaged: bool) -> Result<()> {
        self.check()?;
        self.squares.write().unwrap()[square as usize].mortgaged = mortgaged;
        Ok(())
    }

    fn set_houses(&self, square: u8, houses: u8) -> Result<()> {
        self.check()?;
        self.squares.write().unwrap()[square as usize].houses = houses;
        Ok(())
    }
}
