use std::collections::HashSet;

use super::event::{ActionKind, Record};
use crate::error::Result;
use crate::game::{
    BOARD_SIZE, GO_SALARY, GO_TO_JAIL_SQUARE, GameFacade, HOTEL, JAIL_SQUARE, PlayerId, PlayerView,
    SquareKind, SquareState,
};
use crate::observe::Observation;
use crate::scan::{MessageCategory, MessageChange};

const JAIL_BAIL: u32 = 50;
/// Card and tax amounts that show up as plain payments
const FIXED_CHARGES: [u32; 5] = [50, 75, 100, 150, 200];
/// Marks a dice reading that was not preceded by the game's reset
const UNCONFIRMED_ROLL: &str = " (no reset seen)";

/// Turns observations into `record` requests.
///
/// Keeps the little cross-observation memory needed to name auctioned
/// squares and to notice jail exits.
#[derive(Debug, Default)]
pub struct Translator {
    last_landing: Option<u8>,
    auction_square: Option<u8>,
    auction_winner: Option<PlayerId>,
    jailed: HashSet<PlayerId>,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(
        &mut self,
        game: &dyn GameFacade,
        observation: &Observation,
    ) -> Result<Vec<Record>> {
        let board = game.board();
        let records = match observation {
            Observation::Joined(player) => {
                vec![Record::new(&player.name, ActionKind::JoinGame, "")]
            }
            Observation::Left(player) => {
                self.jailed.remove(&player.id);
                vec![Record::new(&player.name, ActionKind::LeaveGame, "")]
            }
            Observation::NameChanged { player, old } => {
                vec![Record::new(old, ActionKind::ChangeName, &player.name)]
            }
            Observation::DiceRolled { player, post_reset } => {
                let dice = player.dice;
                let mut detail = format!("{}+{}={}", dice.0, dice.1, dice.total());
                if !post_reset {
                    detail.push_str(UNCONFIRMED_ROLL);
                }
                let mut out = vec![Record::new(&player.name, ActionKind::RollDice, detail)];
                if dice.is_double() && self.jailed.remove(&player.id) {
                    out.push(Record::new(&player.name, ActionKind::JailExit, "rolled doubles"));
                }
                out
            }
            Observation::PositionChanged { player, old } => {
                let mut out = Vec::new();
                if *old == JAIL_SQUARE && self.jailed.remove(&player.id) {
                    out.push(Record::new(&player.name, ActionKind::JailExit, ""));
                }
                self.last_landing = Some(player.position);
                out.push(Record::new(
                    &player.name,
                    ActionKind::Move,
                    board.name_of(player.position),
                ));
                out
            }
            Observation::GotoChanged { player, .. } => self.goto(player, board.name_of(player.goto)),
            Observation::MoneyChanged { player, old } => {
                let states = game.square_states()?;
                vec![self.money(game, player, *old, &states)?]
            }
            Observation::OwnerChanged { square, old, new } => {
                self.owner_change(game, *square, *old, *new)?
            }
            Observation::HousesChanged { square, old, new } => {
                let owner = self.owner_name(game, *square)?;
                let name = board.name_of(*square);
                if new > old {
                    let kind = if *new >= HOTEL {
                        ActionKind::BuildHotel
                    } else {
                        ActionKind::BuildHouse
                    };
                    vec![Record::new(owner, kind, name)]
                } else {
                    vec![Record::new(
                        owner,
                        ActionKind::Message,
                        format!("sold buildings on {}", name),
                    )]
                }
            }
            Observation::MortgageChanged { square, mortgaged } => {
                let owner = self.owner_name(game, *square)?;
                let kind = if *mortgaged {
                    ActionKind::MortgageProperty
                } else {
                    ActionKind::UnmortgageProperty
                };
                vec![Record::new(owner, kind, board.name_of(*square))]
            }
            Observation::AuctionStarted(_) => {
                let states = game.square_states()?;
                self.auction_square = self.last_landing.filter(|index| {
                    board.get(*index).is_some_and(|s| s.is_ownable())
                        && states.get(*index as usize).is_some_and(|s| s.owner.is_none())
                });
                self.auction_winner = None;
                vec![Record::system(ActionKind::AuctionStarted, self.auction_label(game))]
            }
            // Opening state or a reset, not an offer
            Observation::AuctionBid(bid) if bid.price == 0 => Vec::new(),
            Observation::AuctionBid(bid) => {
                let roster = game.players()?;
                let bidder = seat_name(&roster, bid.bidder);
                vec![Record::new(
                    bidder,
                    ActionKind::Bid,
                    format!("{} for {}", bid.price, self.auction_label(game)),
                )]
            }
            Observation::AuctionEnded { last_bid } => {
                let roster = game.players()?;
                let label = self.auction_label(game);
                let winner = last_bid.and_then(|bid| {
                    roster
                        .get(bid.bidder as usize)
                        .map(|p| (p.id, p.name.clone(), bid.price))
                });
                self.auction_square = None;
                let detail = match winner {
                    Some((id, name, price)) => {
                        self.auction_winner = Some(id);
                        format!("{} wins {} for ${}", name, label, price)
                    }
                    None => "No bids were made.".to_string(),
                };
                vec![Record::system(ActionKind::AuctionEnded, detail)]
            }
        };
        Ok(records)
    }

    /// Newly appeared prompts become system events; vanished ones are dropped.
    pub fn translate_message(&self, change: &MessageChange) -> Option<Record> {
        let MessageChange::Added(message) = change else {
            return None;
        };
        let kind = match message.category {
            MessageCategory::PropertyOffer => ActionKind::PropertyOffer,
            MessageCategory::JailOptions => ActionKind::JailOptions,
            MessageCategory::ChanceCard => ActionKind::ChanceCard,
            MessageCategory::CommunityChest => ActionKind::CommunityChest,
            _ => ActionKind::Message,
        };
        Some(Record::system(kind, &message.text))
    }

    fn goto(&mut self, player: &PlayerView, square_name: String) -> Vec<Record> {
        if player.goto == JAIL_SQUARE
            && (player.position == GO_TO_JAIL_SQUARE || player.in_jail)
        {
            self.jailed.insert(player.id);
            return vec![Record::new(&player.name, ActionKind::JailEnter, "")];
        }

        let rolled = (player.position as usize + player.dice.total() as usize) % BOARD_SIZE;
        if player.goto == player.position || player.goto as usize == rolled {
            // Ordinary travel; the position change reports it
            return Vec::new();
        }
        vec![Record::new(&player.name, ActionKind::Goto, square_name)]
    }

    fn money(
        &self,
        game: &dyn GameFacade,
        player: &PlayerView,
        old: u32,
        states: &[SquareState],
    ) -> Result<Record> {
        let new = player.cash;
        if new > old {
            let amount = new - old;
            let reason = if amount == GO_SALARY {
                "passing GO"
            } else {
                "income"
            };
            return Ok(Record::new(
                &player.name,
                ActionKind::ReceiveMoney,
                format!("{} ({})", amount, reason),
            ));
        }

        let amount = old - new;
        let board = game.board();
        let state = states.get(player.position as usize).copied().unwrap_or_default();

        if let Some(square) = board.get(player.position) {
            if let Some(owner) = state.owner
                && owner != player.id
                && square.is_ownable()
            {
                let roster = game.players()?;
                let owner_name = roster
                    .iter()
                    .find(|p| p.id == owner)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| format!("player {}", owner));
                return Ok(Record::new(
                    &player.name,
                    ActionKind::PayRent,
                    format!("{} to {} for {}", amount, owner_name, square.name),
                ));
            }

            if square.is_ownable()
                && state.owner.is_none_or(|owner| owner == player.id)
                && amount == square.price
            {
                return Ok(Record::new(
                    &player.name,
                    ActionKind::BuyProperty,
                    format!("{} for {}", square.name, amount),
                ));
            }

            if square.kind == SquareKind::Tax && amount == square.tax {
                return Ok(Record::new(
                    &player.name,
                    ActionKind::PayMoney,
                    format!("{} ({})", amount, square.name),
                ));
            }
        }

        let reason = if amount == JAIL_BAIL && (player.in_jail || self.jailed.contains(&player.id)) {
            "bail"
        } else if FIXED_CHARGES.contains(&amount) {
            "tax or card"
        } else {
            "payment"
        };
        Ok(Record::new(
            &player.name,
            ActionKind::PayMoney,
            format!("{} ({})", amount, reason),
        ))
    }

    fn owner_change(
        &mut self,
        game: &dyn GameFacade,
        square: u8,
        old: Option<PlayerId>,
        new: Option<PlayerId>,
    ) -> Result<Vec<Record>> {
        let roster = game.players()?;
        let board = game.board();
        let name = |id: PlayerId| {
            roster
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("player {}", id))
        };
        let Some(info) = board.get(square) else {
            return Ok(Vec::new());
        };

        Ok(match (old, new) {
            (None, Some(buyer)) => {
                if self.auction_winner == Some(buyer) {
                    // Already reported by the auction end
                    self.auction_winner = None;
                    Vec::new()
                } else {
                    vec![Record::new(
                        name(buyer),
                        ActionKind::BuyProperty,
                        format!("{} for {}", info.name, info.price),
                    )]
                }
            }
            (Some(seller), None) => vec![Record::new(
                name(seller),
                ActionKind::SellProperty,
                format!("{} for {}", info.name, info.mortgage_value()),
            )],
            (Some(from), Some(to)) => vec![Record::new(
                name(to),
                ActionKind::Message,
                format!("{} takes {} from {}", name(to), info.name, name(from)),
            )],
            (None, None) => Vec::new(),
        })
    }

    fn owner_name(&self, game: &dyn GameFacade, square: u8) -> Result<String> {
        let owner = game.square_state(square)?.owner;
        let roster = game.players()?;
        Ok(owner
            .and_then(|id| roster.iter().find(|p| p.id == id))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| super::event::SYSTEM_PLAYER.to_string()))
    }

    fn auction_label(&self, game: &dyn GameFacade) -> String {
        self.auction_square
            .map(|index| game.board().name_of(index))
            .unwrap_or_else(|| "a property".to_string())
    }
}

fn seat_name(roster: &[PlayerView], seat: u32) -> String {
    roster
        .get(seat as usize)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| format!("seat {}", seat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{AuctionRecord, Bid, DicePair, TableGame};
    use crate::scan::TrackedMessage;

    fn view(game: &TableGame, id: PlayerId) -> PlayerView {
        game.player(id).unwrap().unwrap()
    }

    fn single(t: &mut Translator, game: &TableGame, observation: Observation) -> Record {
        let mut records = t.translate(game, &observation).unwrap();
        assert_eq!(records.len(), 1, "{:?}", records);
        records.remove(0)
    }

    #[test]
    fn test_rent_on_owned_square() {
        let game = TableGame::new(&["BLUE", "RED"]);
        game.set_owner(3, Some(1)).unwrap();
        game.update_player(0, |p| {
            p.position = 3;
            p.cash = 1496;
        });
        let mut t = Translator::new();
        let record = single(
            &mut t,
            &game,
            Observation::MoneyChanged {
                player: view(&game, 0),
                old: 1500,
            },
        );
        assert_eq!(record, Record::new("BLUE", ActionKind::PayRent, "4 to RED for Baltic Avenue"));
    }

    #[test]
    fn test_purchase_from_price() {
        let game = TableGame::new(&["BLUE"]);
        game.update_player(0, |p| {
            p.position = 1;
            p.cash = 1440;
        });
        let mut t = Translator::new();
        let record = single(
            &mut t,
            &game,
            Observation::MoneyChanged {
                player: view(&game, 0),
                old: 1500,
            },
        );
        assert_eq!(record.kind, ActionKind::BuyProperty);
        assert_eq!(record.detail, "Mediterranean Avenue for 60");
    }

    #[test]
    fn test_money_reasons() {
        let game = TableGame::new(&["BLUE"]);
        let mut t = Translator::new();

        game.update_player(0, |p| p.cash = 1700);
        let record = single(&mut t, &game, Observation::MoneyChanged { player: view(&game, 0), old: 1500 });
        assert_eq!(record.detail, "200 (passing GO)");

        game.update_player(0, |p| {
            p.position = 4;
            p.cash = 1500;
        });
        let record = single(&mut t, &game, Observation::MoneyChanged { player: view(&game, 0), old: 1700 });
        assert_eq!(record, Record::new("BLUE", ActionKind::PayMoney, "200 (Income Tax)"));

        game.update_player(0, |p| {
            p.position = 7;
            p.cash = 1350;
        });
        let record = single(&mut t, &game, Observation::MoneyChanged { player: view(&game, 0), old: 1500 });
        assert_eq!(record.detail, "150 (tax or card)");
    }

    #[test]
    fn test_dice_and_move() {
        let game = TableGame::new(&["BLUE"]);
        game.update_player(0, |p| {
            p.dice = DicePair(3, 4);
            p.position = 7;
        });
        let mut t = Translator::new();
        let record = single(
            &mut t,
            &game,
            Observation::DiceRolled {
                player: view(&game, 0),
                post_reset: true,
            },
        );
        assert_eq!(record.detail, "3+4=7");

        // A change without the reset in between stays tagged
        game.update_player(0, |p| p.dice = DicePair(5, 6));
        let record = single(
            &mut t,
            &game,
            Observation::DiceRolled {
                player: view(&game, 0),
                post_reset: false,
            },
        );
        assert_eq!(record.detail, "5+6=11 (no reset seen)");

        let record = single(&mut t, &game, Observation::PositionChanged { player: view(&game, 0), old: 0 });
        assert_eq!(record, Record::new("BLUE", ActionKind::Move, "Chance"));
    }

    #[test]
    fn test_jail_cycle() {
        let game = TableGame::new(&["BLUE"]);
        game.update_player(0, |p| {
            p.position = GO_TO_JAIL_SQUARE;
            p.goto = JAIL_SQUARE;
        });
        let mut t = Translator::new();
        let record = single(&mut t, &game, Observation::GotoChanged { player: view(&game, 0), old: 30 });
        assert_eq!(record.kind, ActionKind::JailEnter);

        game.update_player(0, |p| {
            p.position = JAIL_SQUARE;
            p.dice = DicePair(2, 2);
        });
        let records = t
            .translate(&game, &Observation::DiceRolled { player: view(&game, 0), post_reset: true })
            .unwrap();
        assert_eq!(records[1], Record::new("BLUE", ActionKind::JailExit, "rolled doubles"));
    }

    #[test]
    fn test_ordinary_travel_has_no_goto() {
        let game = TableGame::new(&["BLUE"]);
        game.update_player(0, |p| {
            p.dice = DicePair(1, 2);
            p.goto = 3;
        });
        let mut t = Translator::new();
        assert!(t
            .translate(&game, &Observation::GotoChanged { player: view(&game, 0), old: 0 })
            .unwrap()
            .is_empty());

        game.update_player(0, |p| p.goto = 24);
        let record = single(&mut t, &game, Observation::GotoChanged { player: view(&game, 0), old: 3 });
        assert_eq!(record, Record::new("BLUE", ActionKind::Goto, "Illinois Avenue"));
    }

    #[test]
    fn test_auction_round() {
        let game = TableGame::new(&["BLUE", "RED"]);
        game.update_player(0, |p| p.position = 1);
        let mut t = Translator::new();
        t.translate(&game, &Observation::PositionChanged { player: view(&game, 0), old: 0 })
            .unwrap();

        let record = single(&mut t, &game, Observation::AuctionStarted(AuctionRecord::default()));
        assert_eq!(record, Record::system(ActionKind::AuctionStarted, "Mediterranean Avenue"));

        let opening = Bid { bidder: 0, price: 0, next_price: 10 };
        assert!(t.translate(&game, &Observation::AuctionBid(opening)).unwrap().is_empty());

        let bid = Bid { bidder: 1, price: 40, next_price: 50 };
        let record = single(&mut t, &game, Observation::AuctionBid(bid));
        assert_eq!(record, Record::new("RED", ActionKind::Bid, "40 for Mediterranean Avenue"));

        let record = single(&mut t, &game, Observation::AuctionEnded { last_bid: Some(bid) });
        assert_eq!(record.detail, "RED wins Mediterranean Avenue for $40");

        // The resulting ownership change is not reported again
        let records = t
            .translate(&game, &Observation::OwnerChanged { square: 1, old: None, new: Some(1) })
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_improvements() {
        let game = TableGame::new(&["BLUE"]);
        game.set_owner(39, Some(0)).unwrap();
        let mut t = Translator::new();
        let record = single(&mut t, &game, Observation::HousesChanged { square: 39, old: 4, new: 5 });
        assert_eq!(record, Record::new("BLUE", ActionKind::BuildHotel, "Boardwalk"));
        let record = single(&mut t, &game, Observation::MortgageChanged { square: 39, mortgaged: true });
        assert_eq!(record.kind, ActionKind::MortgageProperty);
    }

    #[test]
    fn test_messages() {
        let t = Translator::new();
        let message = TrackedMessage {
            id: "buy".to_string(),
            address: 0x9000_0000,
            text: "Do you want to buy Boardwalk for $400?".to_string(),
            category: MessageCategory::PropertyOffer,
        };
        let record = t.translate_message(&MessageChange::Added(message.clone())).unwrap();
        assert_eq!(record.kind, ActionKind::PropertyOffer);
        assert!(t.translate_message(&MessageChange::Removed(message)).is_none());
    }
}
