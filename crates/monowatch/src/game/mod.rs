//! The board game as seen through memory.

mod board;
mod facade;
mod layout;
mod memory_game;

#[cfg(test)]
pub mod table;

pub use board::{
    BOARD_SIZE, Board, ColorGroup, GO_SALARY, GO_SQUARE, GO_TO_JAIL_SQUARE, HOTEL, JAIL_SQUARE, Square,
    SquareKind, SquareState,
};
pub use facade::{AuctionRecord, Bid, DicePair, GameFacade, PlayerId, PlayerView, SquareView};
pub use layout::{
    GameLayout, MessageLayout, PatternLayout, PlayerLayout, PlayerSlots, SquareLayout,
    SquareSlots, load_layout, save_layout,
};
pub use memory_game::{MemoryGame, NO_OWNER, format_money};

#[cfg(test)]
pub use table::TableGame;
