//! Where the game keeps its state, as loaded from a layout JSON file.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::board::BOARD_SIZE;
use super::facade::PlayerId;
use crate::error::{Error, Result};
use crate::memory::layout::scan::{
    DEFAULT_CHUNK_SIZE, DEFAULT_LOOKAHEAD_UNITS, MESSAGE_RANGE_END, MESSAGE_RANGE_START,
};
use crate::memory::{ByteOrder, MemorySlot, RegionMap};
use crate::scan::{Pattern, PatternKind, PatternRegistration, ScanCallback, ScanRange};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLayout {
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default)]
    pub regions: Vec<RegionMap>,
    pub players: Vec<PlayerLayout>,
    #[serde(with = "crate::hex")]
    pub auction_base: u64,
    #[serde(default)]
    pub squares: Vec<SquareLayout>,
    #[serde(default)]
    pub messages: MessageLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLayout {
    pub id: PlayerId,
    #[serde(with = "crate::hex::list")]
    pub name: Vec<u64>,
    #[serde(with = "crate::hex::list")]
    pub money: Vec<u64>,
    /// Formatted money text shown next to the avatar
    #[serde(default, with = "crate::hex::list")]
    pub money_label: Vec<u64>,
    #[serde(with = "crate::hex::list")]
    pub position: Vec<u64>,
    #[serde(with = "crate::hex::list")]
    pub goto: Vec<u64>,
    #[serde(with = "crate::hex::list")]
    pub dice_1: Vec<u64>,
    #[serde(with = "crate::hex::list")]
    pub dice_2: Vec<u64>,
    #[serde(default, with = "crate::hex::list")]
    pub jailed: Vec<u64>,
    #[serde(default, with = "crate::hex::list")]
    pub bankrupt: Vec<u64>,
}

/// Slots for one player, resolved from its layout
#[derive(Debug, Clone)]
pub struct PlayerSlots {
    pub id: PlayerId,
    pub name: MemorySlot,
    pub money: MemorySlot,
    pub money_label: Option<MemorySlot>,
    pub position: MemorySlot,
    pub goto: MemorySlot,
    pub dice: [MemorySlot; 2],
    pub jailed: Option<MemorySlot>,
    pub bankrupt: Option<MemorySlot>,
}

fn optional(name: String, addresses: &[u64]) -> Option<MemorySlot> {
    (!addresses.is_empty()).then(|| MemorySlot {
        name,
        addresses: addresses.to_vec(),
    })
}

impl PlayerLayout {
    pub fn slots(&self) -> Result<PlayerSlots> {
        let field = |field: &str, addresses: &[u64]| {
            MemorySlot::new(format!("player{}.{}", self.id, field), addresses.to_vec())
        };
        Ok(PlayerSlots {
            id: self.id,
            name: field("name", &self.name)?,
            money: field("money", &self.money)?,
            money_label: optional(format!("player{}.money_label", self.id), &self.money_label),
            position: field("position", &self.position)?,
            goto: field("goto", &self.goto)?,
            dice: [field("dice_1", &self.dice_1)?, field("dice_2", &self.dice_2)?],
            jailed: optional(format!("player{}.jailed", self.id), &self.jailed),
            bankrupt: optional(format!("player{}.bankrupt", self.id), &self.bankrupt),
        })
    }
}

/// Ownership slots for one square; any may be left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareLayout {
    pub index: u8,
    #[serde(default, with = "crate::hex::list")]
    pub owner: Vec<u64>,
    #[serde(default, with = "crate::hex::list")]
    pub houses: Vec<u64>,
    #[serde(default, with = "crate::hex::list")]
    pub mortgaged: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct SquareSlots {
    pub owner: Option<MemorySlot>,
    pub houses: Option<MemorySlot>,
    pub mortgaged: Option<MemorySlot>,
}

impl SquareLayout {
    pub fn slots(&self) -> SquareSlots {
        SquareSlots {
            owner: optional(format!("square{}.owner", self.index), &self.owner),
            houses: optional(format!("square{}.houses", self.index), &self.houses),
            mortgaged: optional(format!("square{}.mortgaged", self.index), &self.mortgaged),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLayout {
    pub range: ScanRange,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_lookahead")]
    pub lookahead_units: usize,
    pub patterns: Vec<PatternLayout>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_lookahead() -> usize {
    DEFAULT_LOOKAHEAD_UNITS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternLayout {
    pub id: String,
    pub pattern: String,
    #[serde(default = "default_kind")]
    pub kind: PatternKind,
    #[serde(default)]
    pub dynamic_key: Option<String>,
}

fn default_kind() -> PatternKind {
    PatternKind::Text
}

impl Default for MessageLayout {
    fn default() -> Self {
        let text = |id: &str, pattern: &str| PatternLayout {
            id: id.to_string(),
            pattern: pattern.to_string(),
            kind: PatternKind::Text,
            dynamic_key: None,
        };
        let mut do_you = text("do_you", "Do you");
        do_you.dynamic_key = Some("dialog_buy_property".to_string());

        Self {
            range: ScanRange::new(MESSAGE_RANGE_START, MESSAGE_RANGE_END),
            chunk_size: DEFAULT_CHUNK_SIZE,
            lookahead_units: DEFAULT_LOOKAHEAD_UNITS,
            patterns: vec![
                do_you,
                text("buy", "buy"),
                text("purchase", "purchase"),
                text("would_you", "Would you"),
                text("for_price", "for $"),
            ],
        }
    }
}

impl MessageLayout {
    /// One scanner registration per configured pattern, all feeding `callback`
    pub fn registrations(
        &self,
        byte_order: ByteOrder,
        callback: &ScanCallback,
    ) -> Result<Vec<PatternRegistration>> {
        self.patterns
            .iter()
            .map(|p| {
                let pattern = Pattern::parse(&p.pattern, p.kind, byte_order)?;
                let registration =
                    PatternRegistration::new(&p.id, pattern, self.range, callback.clone())
                        .with_chunk_size(self.chunk_size)
                        .with_lookahead(self.lookahead_units);
                Ok(match &p.dynamic_key {
                    Some(key) => registration.with_dynamic_key(key),
                    None => registration,
                })
            })
            .collect()
    }
}

impl GameLayout {
    /// Check for structural mistakes before anything is attached.
    pub fn validate(&self) -> Result<()> {
        if self.players.is_empty() {
            return Err(Error::config("layout declares no players"));
        }

        let mut ids = HashSet::new();
        for player in &self.players {
            if !ids.insert(player.id) {
                return Err(Error::config(format!("duplicate player id {}", player.id)));
            }
            player.slots()?;
        }

        let mut indices = HashSet::new();
        for square in &self.squares {
            if square.index as usize >= BOARD_SIZE {
                return Err(Error::config(format!("square index {} out of range", square.index)));
            }
            if !indices.insert(square.index) {
                return Err(Error::config(format!("duplicate square {}", square.index)));
            }
        }

        if self.messages.range.is_empty() {
            return Err(Error::config("message scan range is empty"));
        }
        let mut pattern_ids = HashSet::new();
        for pattern in &self.messages.patterns {
            if !pattern_ids.insert(pattern.id.as_str()) {
                return Err(Error::config(format!("duplicate pattern id '{}'", pattern.id)));
            }
        }

        Ok(())
    }

    /// Two-player layout for the Wii release; host addresses must be filled in.
    pub fn template() -> Self {
        let player = |id, name: &[u64], money: &[u64], label: &[u64], position: &[u64], goto: &[u64], dice: [u64; 2]| {
            PlayerLayout {
                id,
                name: name.to_vec(),
                money: money.to_vec(),
                money_label: label.to_vec(),
                position: position.to_vec(),
                goto: goto.to_vec(),
                dice_1: vec![dice[0]],
                dice_2: vec![dice[1]],
                jailed: Vec::new(),
                bankrupt: Vec::new(),
            }
        };

        Self {
            byte_order: ByteOrder::Big,
            regions: vec![
                RegionMap {
                    guest_start: 0x8000_0000,
                    host_start: 0,
                    len: 0x0180_0000,
                },
                RegionMap {
                    guest_start: 0x9000_0000,
                    host_start: 0,
                    len: 0x0400_0000,
                },
            ],
            players: vec![
                player(
                    0,
                    &[0x804D_FDA1, 0x8051_C0E5, 0x9303_DB75, 0x9002_3179],
                    &[0x9003_C0BA, 0x9303_DB6E],
                    &[0x9002_26D3],
                    &[0x804E_D3AF, 0x804F_63AF],
                    &[0x804E_D3AB, 0x804F_63AB],
                    [0x9303_DA6B, 0x9303_DA6F],
                ),
                player(
                    1,
                    &[0x804D_FDCB, 0x8051_C1E5, 0x9303_DD65, 0x9002_5439],
                    &[0x9003_C0C6, 0x9303_DD5E],
                    &[0x9002_4B5B],
                    &[0x804E_D8EF],
                    &[0x804E_D8EB],
                    [0x9303_DC5B, 0x9303_DC5F],
                ),
            ],
            auction_base: 0,
            squares: Vec::new(),
            messages: MessageLayout::default(),
        }
    }
}

pub fn load_layout<P: AsRef<Path>>(path: P) -> Result<GameLayout> {
    let content = fs::read_to_string(path)?;
    let layout: GameLayout = serde_json::from_str(&content)?;
    layout.validate()?;
    Ok(layout)
}

pub fn save_layout<P: AsRef<Path>>(path: P, layout: &GameLayout) -> Result<()> {
    let json = serde_json::to_string_pretty(layout)?;
    fs::write(path, json)?;
    Ok(())
}
