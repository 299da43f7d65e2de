use serde::{Deserialize, Serialize};

use super::event::GameEvent;
use crate::error::Result;
use crate::game::{ColorGroup, DicePair, GameFacade, PlayerId, SquareKind};

/// The persisted reconciled context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub global: GlobalState,
    pub players: Vec<PlayerState>,
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    pub turn: u32,
    pub current_player: Option<String>,
    pub player_names: Vec<String>,
    pub board: Vec<BoardSquare>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSquare {
    pub index: u8,
    pub name: String,
    pub kind: SquareKind,
    pub group: Option<ColorGroup>,
    pub price: u32,
    pub rents: [u32; 6],
    pub house_cost: u32,
    pub owner: Option<String>,
    pub houses: u8,
    pub mortgaged: bool,
    pub current_rent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub cash: u32,
    pub position: u8,
    pub square: String,
    pub in_jail: bool,
    pub bankrupt: bool,
    pub dice: DicePair,
    pub properties: Vec<String>,
    pub current: bool,
}

impl GameSnapshot {
    /// Read the whole game through `game` and pair it with the event feed.
    ///
    /// `current` is an index into the roster.
    pub fn capture(
        game: &dyn GameFacade,
        turn: u32,
        current: usize,
        events: Vec<GameEvent>,
    ) -> Result<Self> {
        let roster = game.players()?;
        let squares = game.squares()?;
        let board = game.board();
        let name_of = |id: PlayerId| roster.iter().find(|p| p.id == id).map(|p| p.name.clone());

        let board_squares = squares
            .iter()
            .map(|view| BoardSquare {
                index: view.square.index,
                name: view.square.name.clone(),
                kind: view.square.kind,
                group: view.square.group,
                price: view.square.price,
                rents: view.square.rents,
                house_cost: view.square.house_cost,
                owner: view.state.owner.and_then(name_of),
                houses: view.state.houses,
                mortgaged: view.state.mortgaged,
                current_rent: view.rent,
            })
            .collect();

        let players = roster
            .iter()
            .enumerate()
            .map(|(index, player)| PlayerState {
                id: player.id,
                name: player.name.clone(),
                cash: player.cash,
                position: player.position,
                square: board.name_of(player.position),
                in_jail: player.in_jail,
                bankrupt: player.bankrupt,
                dice: player.dice,
                properties: squares
                    .iter()
                    .filter(|s| s.state.owner == Some(player.id))
                    .map(|s| s.square.name.clone())
                    .collect(),
                current: index == current,
            })
            .collect();

        Ok(Self {
            global: GlobalState {
                turn,
                current_player: roster.get(current).map(|p| p.name.clone()),
                player_names: roster.iter().map(|p| p.name.clone()).collect(),
                board: board_squares,
            },
            players,
            events,
        })
    }

    pub fn player(&self, name: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn total_cash(&self) -> u64 {
        self.players.iter().map(|p| p.cash as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::TableGame;

    #[test]
    fn test_capture() {
        let game = TableGame::new(&["BLUE", "RED"]);
        game.set_owner(3, Some(1)).unwrap();
        game.update_player(1, |p| p.position = 3);

        let snapshot = GameSnapshot::capture(&game, 2, 1, Vec::new()).unwrap();
        assert_eq!(snapshot.global.turn, 2);
        assert_eq!(snapshot.global.current_player.as_deref(), Some("RED"));
        assert_eq!(snapshot.global.board.len(), 40);
        assert_eq!(snapshot.global.board[3].owner.as_deref(), Some("RED"));
        assert_eq!(snapshot.global.board[3].current_rent, 4);

        let red = snapshot.player("RED").unwrap();
        assert_eq!(red.square, "Baltic Avenue");
        assert_eq!(red.properties, ["Baltic Avenue"]);
        assert!(red.current);
        assert!(!snapshot.player("BLUE").unwrap().current);
        assert_eq!(snapshot.total_cash(), 3000);
    }

    #[test]
    fn test_capture_fails_when_detached() {
        let game = TableGame::new(&["BLUE"]);
        game.set_unavailable(true);
        assert!(GameSnapshot::capture(&game, 1, 0, Vec::new()).is_err());
    }
}
