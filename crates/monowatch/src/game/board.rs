//! Static board definition (standard US edition).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

pub const BOARD_SIZE: usize = 40;
pub const GO_SQUARE: u8 = 0;
pub const JAIL_SQUARE: u8 = 10;
pub const GO_TO_JAIL_SQUARE: u8 = 30;
/// Paid for passing or landing on GO
pub const GO_SALARY: u32 = 200;

/// Houses value that means a hotel
pub const HOTEL: u8 = 5;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SquareKind {
    Go,
    Street,
    Railroad,
    Utility,
    Tax,
    Chance,
    CommunityChest,
    Jail,
    FreeParking,
    GoToJail,
}

impl SquareKind {
    pub fn is_ownable(self) -> bool {
        matches!(self, Self::Street | Self::Railroad | Self::Utility)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColorGroup {
    Brown,
    LightBlue,
    Pink,
    Orange,
    Red,
    Yellow,
    Green,
    DarkBlue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Square {
    pub index: u8,
    pub name: String,
    pub kind: SquareKind,
    pub group: Option<ColorGroup>,
    pub price: u32,
    /// Rent with 0..=4 houses, then hotel
    pub rents: [u32; 6],
    pub house_cost: u32,
    /// Amount due when landing on a tax square
    pub tax: u32,
}

impl Square {
    pub fn is_ownable(&self) -> bool {
        self.kind.is_ownable()
    }

    pub fn mortgage_value(&self) -> u32 {
        self.price / 2
    }

    /// Mortgage value plus 10% interest
    pub fn unmortgage_cost(&self) -> u32 {
        self.mortgage_value() * 11 / 10
    }
}

type Row = (&'static str, SquareKind, Option<ColorGroup>, u32, [u32; 6], u32, u32);

const NO_RENT: [u32; 6] = [0; 6];
const RAILROAD_RENT: [u32; 6] = [25, 50, 100, 200, 0, 0];

#[rustfmt::skip]
const STANDARD: [Row; BOARD_SIZE] = {
    use ColorGroup::*;
    use SquareKind::*;
    [
        ("GO", Go, None, 0, NO_RENT, 0, 0),
        ("Mediterranean Avenue", Street, Some(Brown), 60, [2, 10, 30, 90, 160, 250], 50, 0),
        ("Community Chest", CommunityChest, None, 0, NO_RENT, 0, 0),
        ("Baltic Avenue", Street, Some(Brown), 60, [4, 20, 60, 180, 320, 450], 50, 0),
        ("Income Tax", Tax, None, 0, NO_RENT, 0, 200),
        ("Reading Railroad", Railroad, None, 200, RAILROAD_RENT, 0, 0),
        ("Oriental Avenue", Street, Some(LightBlue), 100, [6, 30, 90, 270, 400, 550], 50, 0),
        ("Chance", Chance, None, 0, NO_RENT, 0, 0),
        ("Vermont Avenue", Street, Some(LightBlue), 100, [6, 30, 90, 270, 400, 550], 50, 0),
        ("Connecticut Avenue", Street, Some(LightBlue), 120, [8, 40, 100, 300, 450, 600], 50, 0),
        ("Jail", Jail, None, 0, NO_RENT, 0, 0),
        ("St. Charles Place", Street, Some(Pink), 140, [10, 50, 150, 450, 625, 750], 100, 0),
        ("Electric Company", Utility, None, 150, NO_RENT, 0, 0),
        ("States Avenue", Street, Some(Pink), 140, [10, 50, 150, 450, 625, 750], 100, 0),
        ("Virginia Avenue", Street, Some(Pink), 160, [12, 60, 180, 500, 700, 900], 100, 0),
        ("Pennsylvania Railroad", Railroad, None, 200, RAILROAD_RENT, 0, 0),
        ("St. James Place", Street, Some(Orange), 180, [14, 70, 200, 550, 750, 950], 100, 0),
        ("Community Chest", CommunityChest, None, 0, NO_RENT, 0, 0),
        ("Tennessee Avenue", Street, Some(Orange), 180, [14, 70, 200, 550, 750, 950], 100, 0),
        ("New York Avenue", Street, Some(Orange), 200, [16, 80, 220, 600, 800, 1000], 100, 0),
        ("Free Parking", FreeParking, None, 0, NO_RENT, 0, 0),
        ("Kentucky Avenue", Street, Some(Red), 220, [18, 90, 250, 700, 875, 1050], 150, 0),
        ("Chance", Chance, None, 0, NO_RENT, 0, 0),
        ("Indiana Avenue", Street, Some(Red), 220, [18, 90, 250, 700, 875, 1050], 150, 0),
        ("Illinois Avenue", Street, Some(Red), 240, [20, 100, 300, 750, 925, 1100], 150, 0),
        ("B&O Railroad", Railroad, None, 200, RAILROAD_RENT, 0, 0),
        ("Atlantic Avenue", Street, Some(Yellow), 260, [22, 110, 330, 800, 975, 1150], 150, 0),
        ("Ventnor Avenue", Street, Some(Yellow), 260, [22, 110, 330, 800, 975, 1150], 150, 0),
        ("Water Works", Utility, None, 150, NO_RENT, 0, 0),
        ("Marvin Gardens", Street, Some(Yellow), 280, [24, 120, 360, 850, 1025, 1200], 150, 0),
        ("Go To Jail", GoToJail, None, 0, NO_RENT, 0, 0),
        ("Pacific Avenue", Street, Some(Green), 300, [26, 130, 390, 900, 1100, 1275], 200, 0),
        ("North Carolina Avenue", Street, Some(Green), 300, [26, 130, 390, 900, 1100, 1275], 200, 0),
        ("Community Chest", CommunityChest, None, 0, NO_RENT, 0, 0),
        ("Pennsylvania Avenue", Street, Some(Green), 320, [28, 150, 450, 1000, 1200, 1400], 200, 0),
        ("Short Line", Railroad, None, 200, RAILROAD_RENT, 0, 0),
        ("Chance", Chance, None, 0, NO_RENT, 0, 0),
        ("Park Place", Street, Some(DarkBlue), 350, [35, 175, 500, 1100, 1300, 1500], 200, 0),
        ("Luxury Tax", Tax, None, 0, NO_RENT, 0, 100),
        ("Boardwalk", Street, Some(DarkBlue), 400, [50, 200, 600, 1400, 1700, 2000], 200, 0),
    ]
};

/// Mutable per-square state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareState {
    pub owner: Option<u8>,
    pub houses: u8,
    pub mortgaged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    squares: Vec<Square>,
}

impl Board {
    pub fn standard() -> Self {
        let squares = STANDARD
            .iter()
            .enumerate()
            .map(|(index, (name, kind, group, price, rents, house_cost, tax))| Square {
                index: index as u8,
                name: name.to_string(),
                kind: *kind,
                group: *group,
                price: *price,
                rents: *rents,
                house_cost: *house_cost,
                tax: *tax,
            })
            .collect();
        Self { squares }
    }

    pub fn len(&self) -> usize {
        self.squares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }

    pub fn squares(&self) -> &[Square] {
        &self.squares
    }

    pub fn get(&self, index: u8) -> Option<&Square> {
        self.squares.get(index as usize)
    }

    pub fn name_of(&self, index: u8) -> String {
        self.get(index)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("square {}", index))
    }

    pub fn group_members(&self, group: ColorGroup) -> impl Iterator<Item = &Square> {
        self.squares.iter().filter(move |s| s.group == Some(group))
    }

    /// Rent owed on `index` given every square's state.
    ///
    /// Utilities depend on the dice and report 0 here.
    pub fn current_rent(&self, index: u8, states: &[SquareState]) -> u32 {
        let (Some(square), Some(state)) = (self.get(index), states.get(index as usize)) else {
            return 0;
        };
        let Some(owner) = state.owner else {
            return 0;
        };
        if state.mortgaged {
            return 0;
        }

        match square.kind {
            SquareKind::Street => square.rents[state.houses.min(HOTEL) as usize],
            SquareKind::Railroad => {
                let owned = self
                    .squares
                    .iter()
                    .zip(states)
                    .filter(|(s, st)| s.kind == SquareKind::Railroad && st.owner == Some(owner))
                    .count();
                square.rents[owned.clamp(1, 4) - 1]
            }
            _ => 0,
        }
    }

    /// Whether `player` owns every street of `group`
    pub fn owns_group(&self, player: u8, group: ColorGroup, states: &[SquareState]) -> bool {
        self.group_members(group)
            .all(|s| states.get(s.index as usize).is_some_and(|st| st.owner == Some(player)))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_board_layout() {
        let board = Board::standard();
        assert_eq!(board.len(), BOARD_SIZE);
        assert_eq!(board.get(JAIL_SQUARE).unwrap().kind, SquareKind::Jail);
        assert_eq!(board.get(GO_TO_JAIL_SQUARE).unwrap().kind, SquareKind::GoToJail);
        assert_eq!(board.get(39).unwrap().name, "Boardwalk");
        assert_eq!(board.group_members(ColorGroup::DarkBlue).count(), 2);
        assert_eq!(board.group_members(ColorGroup::Orange).count(), 3);
    }

    #[test]
    fn test_mortgage_values() {
        let board = Board::standard();
        let boardwalk = board.get(39).unwrap();
        assert_eq!(boardwalk.mortgage_value(), 200);
        assert_eq!(boardwalk.unmortgage_cost(), 220);
    }

    #[test]
    fn test_current_rent_by_improvement_level() {
        let board = Board::standard();
        let mut states = vec![SquareState::default(); BOARD_SIZE];
        assert_eq!(board.current_rent(39, &states), 0);

        states[39].owner = Some(1);
        assert_eq!(board.current_rent(39, &states), 50);
        states[39].houses = 3;
        assert_eq!(board.current_rent(39, &states), 1400);
        states[39].houses = HOTEL;
        assert_eq!(board.current_rent(39, &states), 2000);
        states[39].mortgaged = true;
        assert_eq!(board.current_rent(39, &states), 0);
    }

    #[test]
    fn test_railroad_rent_scales_with_count() {
        let board = Board::standard();
        let mut states = vec![SquareState::default(); BOARD_SIZE];
        states[5].owner = Some(0);
        assert_eq!(board.current_rent(5, &states), 25);
        states[15].owner = Some(0);
        states[25].owner = Some(0);
        assert_eq!(board.current_rent(5, &states), 100);
    }

    #[test]
    fn test_owns_group() {
        let board = Board::standard();
        let mut states = vec![SquareState::default(); BOARD_SIZE];
        states[37].owner = Some(2);
        assert!(!board.owns_group(2, ColorGroup::DarkBlue, &states));
        states[39].owner = Some(2);
        assert!(board.owns_group(2, ColorGroup::DarkBlue, &states));
    }
}
