use crate::game::DicePair;

/// A dice reading worth reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceRoll {
    pub dice: DicePair,
    /// Came right after the `(0, 0)` reset the game writes before a roll
    pub post_reset: bool,
}

/// Tracks one player's dice between polls.
///
/// The game zeroes the dice just before rolling. The zero reading is not
/// reported; it arms a one-shot flag that tags the next real reading.
#[derive(Debug, Clone, Default)]
pub struct DiceWatch {
    last: Option<DicePair>,
    armed: bool,
}

impl DiceWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known reading without reporting it
    pub fn seeded(dice: DicePair) -> Self {
        Self {
            last: Some(dice),
            armed: dice.is_reset(),
        }
    }

    pub fn observe(&mut self, dice: DicePair) -> Option<DiceRoll> {
        if self.last == Some(dice) {
            return None;
        }
        self.last = Some(dice);

        if dice.is_reset() {
            self.armed = true;
            return None;
        }

        let post_reset = std::mem::take(&mut self.armed);
        Some(DiceRoll { dice, post_reset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(watch: &mut DiceWatch, readings: &[(u8, u8)]) -> Vec<DiceRoll> {
        readings
            .iter()
            .filter_map(|(a, b)| watch.observe(DicePair(*a, *b)))
            .collect()
    }

    #[test]
    fn test_reset_then_roll_yields_one_tagged_event() {
        let mut watch = DiceWatch::new();
        let rolls = run(&mut watch, &[(0, 0), (0, 0), (3, 4), (3, 4)]);
        assert_eq!(
            rolls,
            vec![DiceRoll {
                dice: DicePair(3, 4),
                post_reset: true
            }]
        );
    }

    #[test]
    fn test_change_without_reset_is_untagged() {
        let mut watch = DiceWatch::seeded(DicePair(1, 2));
        let rolls = run(&mut watch, &[(1, 2), (5, 5)]);
        assert_eq!(rolls.len(), 1);
        assert!(!rolls[0].post_reset);
    }

    #[test]
    fn test_flag_is_one_shot() {
        let mut watch = DiceWatch::new();
        let rolls = run(&mut watch, &[(0, 0), (2, 2), (6, 1)]);
        assert_eq!(rolls.len(), 2);
        assert!(rolls[0].post_reset);
        assert!(!rolls[1].post_reset);
    }

    #[test]
    fn test_seeded_with_reset_arms_flag() {
        let mut watch = DiceWatch::seeded(DicePair(0, 0));
        let rolls = run(&mut watch, &[(0, 0), (4, 1)]);
        assert_eq!(rolls.len(), 1);
        assert!(rolls[0].post_reset);
    }

    #[test]
    fn test_every_turn_has_one_roll() {
        let mut watch = DiceWatch::new();
        let rolls = run(&mut watch, &[(3, 4), (0, 0), (3, 4), (0, 0), (0, 0), (6, 6)]);
        // Same value as before the reset still counts as a new roll
        assert_eq!(rolls.len(), 3);
        assert!(!rolls[0].post_reset);
        assert!(rolls[1].post_reset && rolls[2].post_reset);
    }
}
