//! Turn actions carried out through the game facade.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::json;
use tracing::{debug, info, warn};

use super::actions::TurnActions;
use super::state::DecisionContext;
use super::states::BAIL;
use crate::auction::{AuctionHouse, Participant};
use crate::decide::{DecisionKind, DecisionProvider, DecisionRequest, decide_bool};
use crate::error::{Error, Result};
use crate::game::{
    BOARD_SIZE, ColorGroup, DicePair, GO_SALARY, GameFacade, HOTEL, JAIL_SQUARE, PlayerId,
    PlayerView, SquareKind, SquareView,
};

/// Where turn rolls come from.
pub trait DiceSource: Send + Sync {
    fn roll(&self, game: &dyn GameFacade, player: PlayerId) -> Result<DicePair>;
}

impl<F> DiceSource for F
where
    F: Fn(PlayerId) -> Result<DicePair> + Send + Sync,
{
    fn roll(&self, _game: &dyn GameFacade, player: PlayerId) -> Result<DicePair> {
        self(player)
    }
}

/// The pair the game shows for the player.
///
/// The `(0, 0)` reset means the game has not rolled yet; the error is
/// transient so the driver retries the state on its next tick.
pub struct ShownDice;

impl DiceSource for ShownDice {
    fn roll(&self, game: &dyn GameFacade, player: PlayerId) -> Result<DicePair> {
        let dice = game.require_player(player)?.dice;
        if dice.is_reset() {
            return Err(Error::NotReady(format!("dice for player {} not rolled yet", player)));
        }
        Ok(dice)
    }
}

/// Unpaid remainder of a charge
#[derive(Debug, Clone, Copy)]
struct Debt {
    /// `None` is the bank
    creditor: Option<PlayerId>,
    amount: u32,
}

#[derive(Debug, Clone, Copy)]
struct Offer {
    partner: PlayerId,
    square: u8,
    price: u32,
}

#[derive(Default)]
struct Pending {
    rolls: HashMap<PlayerId, DicePair>,
    debts: HashMap<PlayerId, Debt>,
    offers: HashMap<PlayerId, Offer>,
}

/// [`TurnActions`] over a live [`GameFacade`].
///
/// Auctions run through the [`AuctionHouse`] with every seated player
/// bidding through `provider`. Trade partners answer through the same
/// provider.
pub struct FacadeTurn {
    game: Arc<dyn GameFacade>,
    auction: AuctionHouse,
    provider: Arc<dyn DecisionProvider>,
    dice: Box<dyn DiceSource>,
    pending: Mutex<Pending>,
}

impl FacadeTurn {
    pub fn new(
        game: Arc<dyn GameFacade>,
        auction: AuctionHouse,
        provider: Arc<dyn DecisionProvider>,
    ) -> Self {
        Self {
            game,
            auction,
            provider,
            dice: Box::new(ShownDice),
            pending: Mutex::new(Pending::default()),
        }
    }

    pub fn with_dice(mut self, dice: impl DiceSource + 'static) -> Self {
        self.dice = Box::new(dice);
        self
    }

    /// One decision context per seated player, all acting through `turn`
    pub fn contexts(turn: &Arc<Self>) -> Result<Vec<DecisionContext>> {
        Ok(turn
            .game
            .players()?
            .into_iter()
            .filter(|p| !p.bankrupt)
            .map(|p| {
                let actions: Arc<dyn TurnActions> = turn.clone();
                DecisionContext::new(p.id, actions, Arc::clone(&turn.provider))
            })
            .collect())
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn player(&self, player: PlayerId) -> Result<PlayerView> {
        self.game.require_player(player)
    }

    /// Take `amount` from `payer` for `creditor`.
    ///
    /// Whatever the payer cannot cover becomes a debt settled later.
    /// Returns the payer's balance, negative when short.
    fn charge(&self, payer: PlayerId, amount: u32, creditor: Option<PlayerId>) -> Result<i64> {
        let cash = self.player(payer)?.cash;
        let paid = cash.min(amount);
        self.game.set_cash(payer, cash - paid)?;
        if let Some(creditor) = creditor {
            self.game.adjust_cash(creditor, i64::from(paid))?;
        }

        let short = amount - paid;
        if short > 0 {
            debug!("player {} short by {}", payer, short);
            self.pending().debts.insert(payer, Debt { creditor, amount: short });
        }
        Ok(i64::from(cash) - i64::from(amount))
    }

    /// Rent for the square under `player`, with utilities priced off the
    /// player's last roll
    fn rent_due(&self, player: PlayerId, view: &SquareView) -> Result<u32> {
        if view.square.kind != SquareKind::Utility {
            return Ok(view.rent);
        }
        let Some(owner) = view.state.owner.filter(|_| !view.state.mortgaged) else {
            return Ok(0);
        };
        let board = self.game.board();
        let owned = self
            .game
            .owned_by(owner)?
            .into_iter()
            .filter(|index| board.get(*index).is_some_and(|s| s.kind == SquareKind::Utility))
            .count();
        let multiplier = if owned >= 2 { 10 } else { 4 };
        let roll = self.pending().rolls.get(&player).copied().unwrap_or_default();
        Ok(u32::from(roll.total()) * multiplier)
    }

    fn monopolies(&self, player: PlayerId) -> Result<Vec<ColorGroup>> {
        let states = self.game.square_states()?;
        let board = self.game.board();
        let mut groups = Vec::new();
        for group in board.squares().iter().filter_map(|s| s.group) {
            if !groups.contains(&group) && board.owns_group(player, group, &states) {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    /// A square held by another solvent player that would fill out a group
    /// `player` already has a foot in
    fn wanted(&self, player: PlayerId, partner: Option<PlayerId>) -> Result<Option<(u8, PlayerId)>> {
        let states = self.game.square_states()?;
        let solvent: Vec<PlayerId> = self
            .game
            .players()?
            .iter()
            .filter(|p| !p.bankrupt && p.id != player)
            .map(|p| p.id)
            .collect();
        let board = self.game.board();

        for square in board.squares() {
            let (Some(group), Some(state)) = (square.group, states.get(square.index as usize)) else {
                continue;
            };
            let Some(owner) = state.owner else {
                continue;
            };
            if state.mortgaged
                || state.houses > 0
                || !solvent.contains(&owner)
                || partner.is_some_and(|p| p != owner)
            {
                continue;
            }
            let foothold = board
                .group_members(group)
                .any(|s| states.get(s.index as usize).is_some_and(|st| st.owner == Some(player)));
            if foothold {
                return Ok(Some((square.index, owner)));
            }
        }
        Ok(None)
    }
}

impl TurnActions for FacadeTurn {
    fn cash(&self, player: PlayerId) -> Result<u32> {
        Ok(self.player(player)?.cash)
    }

    fn properties(&self, player: PlayerId) -> Result<Vec<u8>> {
        self.game.owned_by(player)
    }

    fn is_in_jail(&self, player: PlayerId) -> Result<bool> {
        Ok(self.player(player)?.in_jail)
    }

    // The facade exposes no card inventory
    fn has_jail_card(&self, _player: PlayerId) -> Result<bool> {
        Ok(false)
    }

    fn use_jail_card(&self, player: PlayerId) -> Result<()> {
        Err(Error::config(format!(
            "player {} cannot use a jail card: cards are not visible through the game",
            player
        )))
    }

    fn pay_bail(&self, player: PlayerId) -> Result<()> {
        self.charge(player, BAIL, None)?;
        self.game.set_in_jail(player, false)
    }

    fn roll_dice(&self, player: PlayerId) -> Result<DicePair> {
        let roll = self.dice.roll(self.game.as_ref(), player)?;
        self.pending().rolls.insert(player, roll);
        Ok(roll)
    }

    fn move_token(&self, player: PlayerId, steps: u8) -> Result<u8> {
        let view = self.player(player)?;
        let target = (view.position as usize + steps as usize) % BOARD_SIZE;
        let target = target as u8;
        if target < view.position {
            self.game.adjust_cash(player, i64::from(GO_SALARY))?;
        }
        self.game.set_position(player, target)?;
        if view.in_jail {
            self.game.set_in_jail(player, false)?;
        }
        Ok(target)
    }

    fn current_square(&self, player: PlayerId) -> Result<SquareView> {
        let position = self.player(player)?.position;
        self.game
            .squares()?
            .into_iter()
            .nth(position as usize)
            .ok_or_else(|| Error::config(format!("player {} stands on unknown square {}", player, position)))
    }

    fn buy_property(&self, player: PlayerId) -> Result<()> {
        let view = self.current_square(player)?;
        self.game.transfer_property(view.square.index, player, view.square.price)?;
        info!("player {} bought {} for {}", player, view.square.name, view.square.price);
        Ok(())
    }

    fn start_auction(&self, _player: PlayerId, square: u8) -> Result<()> {
        let participants: Vec<Participant> = self
            .game
            .players()?
            .into_iter()
            .filter(|p| !p.bankrupt)
            .map(|p| Participant::new(p.id, Arc::clone(&self.provider)))
            .collect();
        let outcome = self.auction.run(self.game.as_ref(), square, &participants)?;
        debug!("auction for square {} settled: {:?}", square, outcome.winner);
        Ok(())
    }

    fn pay_rent(&self, player: PlayerId) -> Result<i64> {
        let view = self.current_square(player)?;
        let owner = view.state.owner.filter(|owner| *owner != player);
        let rent = if owner.is_some() { self.rent_due(player, &view)? } else { 0 };
        self.charge(player, rent, owner)
    }

    fn pay_tax(&self, player: PlayerId) -> Result<i64> {
        let view = self.current_square(player)?;
        self.charge(player, view.square.tax, None)
    }

    fn resolve_special(&self, player: PlayerId) -> Result<()> {
        let view = self.current_square(player)?;
        match view.square.kind {
            SquareKind::GoToJail => self.send_to_jail(player),
            kind => {
                debug!("{} on {} is resolved by the game", kind, view.square.name);
                Ok(())
            }
        }
    }

    fn mortgage_until_solvent(&self, player: PlayerId, deficit: u32) -> Result<u32> {
        let board = self.game.board();
        let mut raised = 0u32;
        for index in self.game.owned_by(player)? {
            if raised >= deficit {
                break;
            }
            let state = self.game.square_state(index)?;
            let Some(square) = board.get(index).filter(|_| !state.mortgaged && state.houses == 0) else {
                continue;
            };
            self.game.set_mortgaged(index, true)?;
            self.game.adjust_cash(player, i64::from(square.mortgage_value()))?;
            raised += square.mortgage_value();
            info!("player {} mortgaged {} for {}", player, square.name, square.mortgage_value());
        }
        Ok(raised)
    }

    fn settle_debt(&self, player: PlayerId) -> Result<()> {
        let Some(debt) = self.pending().debts.remove(&player) else {
            return Ok(());
        };
        let cash = self.player(player)?.cash;
        let paid = cash.min(debt.amount);
        self.game.set_cash(player, cash - paid)?;
        if let Some(creditor) = debt.creditor {
            self.game.adjust_cash(creditor, i64::from(paid))?;
        }
        if paid < debt.amount {
            warn!("player {} cannot cover {} of a debt", player, debt.amount - paid);
        }
        Ok(())
    }

    fn has_monopoly(&self, player: PlayerId) -> Result<bool> {
        Ok(!self.monopolies(player)?.is_empty())
    }

    fn build(&self, player: PlayerId) -> Result<bool> {
        let states = self.game.square_states()?;
        let cash = self.player(player)?.cash;
        let board = self.game.board();

        for group in self.monopolies(player)? {
            let members: Vec<_> = board.group_members(group).collect();
            let mortgaged = members
                .iter()
                .any(|s| states.get(s.index as usize).is_some_and(|st| st.mortgaged));
            if mortgaged {
                continue;
            }
            // Build evenly: the emptiest street in the group goes first
            let Some((square, houses)) = members
                .iter()
                .map(|s| (*s, states.get(s.index as usize).map_or(0, |st| st.houses)))
                .filter(|(_, houses)| *houses < HOTEL)
                .min_by_key(|(_, houses)| *houses)
            else {
                continue;
            };
            if cash < square.house_cost {
                continue;
            }

            self.game.adjust_cash(player, -i64::from(square.house_cost))?;
            self.game.set_houses(square.index, houses + 1)?;
            info!("player {} built on {} ({} houses)", player, square.name, houses + 1);
            return Ok(true);
        }
        Ok(false)
    }

    fn find_trade_partner(&self, player: PlayerId) -> Result<Option<PlayerId>> {
        Ok(self.wanted(player, None)?.map(|(_, owner)| owner))
    }

    fn propose_trade(&self, player: PlayerId, partner: PlayerId) -> Result<()> {
        let (square, _) = self.wanted(player, Some(partner))?.ok_or_else(|| {
            Error::config(format!("player {} holds nothing player {} wants", partner, player))
        })?;
        let price = self.game.board().get(square).map_or(0, |s| s.price);
        info!("player {} offers {} to player {} for square {}", player, price, partner, square);
        self.pending().offers.insert(player, Offer { partner, square, price });
        Ok(())
    }

    fn trade_response(&self, player: PlayerId) -> Result<Option<bool>> {
        let Some(offer) = self.pending().offers.get(&player).copied() else {
            return Ok(Some(false));
        };
        let partner = self.player(offer.partner)?;
        let request = DecisionRequest::new(
            DecisionKind::TradeResponse,
            offer.partner,
            json!({
                "from": player,
                "square": offer.square,
                "name": self.game.board().name_of(offer.square),
                "price": offer.price,
                "cash": partner.cash,
            }),
        );
        Ok(Some(decide_bool(self.provider.as_ref(), &request, false)))
    }

    fn finalize_trade(&self, player: PlayerId) -> Result<()> {
        let offer = self
            .pending()
            .offers
            .remove(&player)
            .ok_or_else(|| Error::config(format!("player {} has no open offer", player)))?;
        self.game.transfer_property(offer.square, player, offer.price)?;
        self.game.adjust_cash(offer.partner, i64::from(offer.price))?;
        Ok(())
    }

    fn send_to_jail(&self, player: PlayerId) -> Result<()> {
        self.game.set_position(player, JAIL_SQUARE)?;
        self.game.set_in_jail(player, true)
    }

    fn end_turn(&self, player: PlayerId) -> Result<()> {
        let mut pending = self.pending();
        pending.offers.remove(&player);
        pending.rolls.remove(&player);
        if let Some(debt) = pending.debts.remove(&player) {
            warn!("player {} ends the turn owing {}", player, debt.amount);
        }
        debug!("player {} turn over", player);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decide::{Decision, DecisionValue, HeuristicProvider};
    use crate::game::TableGame;
    use crate::machine::{DecisionEngine, StateId, StateRegistry, StepOutcome};
    use std::collections::VecDeque;

    fn queued(rolls: &[(u8, u8)]) -> impl DiceSource + 'static {
        let rolls = Mutex::new(rolls.iter().map(|(a, b)| DicePair(*a, *b)).collect::<VecDeque<_>>());
        move |_: PlayerId| -> Result<DicePair> {
            rolls
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::NotReady("no roll queued".into()))
        }
    }

    fn yes() -> Arc<dyn DecisionProvider> {
        Arc::new(|request: &DecisionRequest| -> Result<Decision> {
            let value = match request.kind {
                DecisionKind::JailRelease => DecisionValue::Choice("roll".into()),
                DecisionKind::AuctionSealedBid | DecisionKind::AuctionCounterBid => DecisionValue::Amount(0),
                _ => DecisionValue::Bool(true),
            };
            Ok(Decision::new(value, ""))
        })
    }

    /// Play player 0's turn to the end
    fn play(
        game: &Arc<TableGame>,
        provider: Arc<dyn DecisionProvider>,
        rolls: &[(u8, u8)],
    ) -> StepOutcome {
        let turn = Arc::new(
            FacadeTurn::new(game.clone(), AuctionHouse::default(), Arc::clone(&provider))
                .with_dice(queued(rolls)),
        );
        let engine = DecisionEngine::new(Arc::new(StateRegistry::standard().unwrap()));
        let mut ctx = DecisionContext::new(0, turn, provider);
        engine.step(&mut ctx).unwrap()
    }

    fn heuristic() -> Arc<dyn DecisionProvider> {
        Arc::new(HeuristicProvider::default())
    }

    fn three_players() -> Arc<TableGame> {
        Arc::new(TableGame::new(&["BLUE", "RED", "GREEN"]))
    }

    #[test]
    fn test_buys_unowned_street() {
        let game = three_players();
        let outcome = play(&game, heuristic(), &[(1, 2)]);

        assert_eq!(outcome, StepOutcome::Finished(StateId::TurnEnd));
        let blue = game.require_player(0).unwrap();
        assert_eq!((blue.position, blue.cash), (3, 1440));
        assert_eq!(game.square_state(3).unwrap().owner, Some(0));
    }

    #[test]
    fn test_poor_player_sends_square_to_auction() {
        let game = three_players();
        game.update_player(0, |p| p.cash = 50);
        play(&game, heuristic(), &[(1, 2)]);

        // RED and GREEN both open at 48; RED is seated first and leads at 58
        assert_eq!(game.square_state(3).unwrap().owner, Some(1));
        assert_eq!(game.require_player(1).unwrap().cash, 1442);
        assert_eq!(game.require_player(2).unwrap().cash, 1500);
        assert_eq!(game.require_player(0).unwrap().cash, 50);
    }

    #[test]
    fn test_rent_shortfall_mortgages_and_settles() {
        let game = three_players();
        game.set_owner(3, Some(1)).unwrap();
        game.set_houses(3, 3).unwrap();
        game.set_owner(1, Some(0)).unwrap();
        game.set_owner(5, Some(0)).unwrap();
        game.update_player(0, |p| p.cash = 50);

        let outcome = play(&game, heuristic(), &[(1, 2)]);

        assert_eq!(outcome, StepOutcome::Finished(StateId::TurnEnd));
        // 180 rent: 50 in cash, 30 + 100 from mortgages
        assert_eq!(game.require_player(0).unwrap().cash, 0);
        assert_eq!(game.require_player(1).unwrap().cash, 1680);
        assert!(game.square_state(1).unwrap().mortgaged);
        assert!(game.square_state(5).unwrap().mortgaged);
    }

    #[test]
    fn test_go_salary_and_go_to_jail() {
        let game = three_players();
        game.update_player(0, |p| p.position = 38);
        play(&game, heuristic(), &[(1, 2)]);
        let blue = game.require_player(0).unwrap();
        // Passed GO, then bought Mediterranean Avenue
        assert_eq!((blue.position, blue.cash), (1, 1640));

        game.update_player(0, |p| p.position = 25);
        play(&game, heuristic(), &[(2, 3)]);
        let blue = game.require_player(0).unwrap();
        assert_eq!(blue.position, JAIL_SQUARE);
        assert!(blue.in_jail);
    }

    #[test]
    fn test_bail_paid_when_cash_is_comfortable() {
        let game = three_players();
        game.update_player(0, |p| {
            p.cash = 600;
            p.position = JAIL_SQUARE;
            p.in_jail = true;
        });
        play(&game, heuristic(), &[(1, 2)]);

        let blue = game.require_player(0).unwrap();
        assert!(!blue.in_jail);
        // 50 bail, then States Avenue for 140
        assert_eq!((blue.position, blue.cash), (13, 410));
    }

    #[test]
    fn test_trade_completes_group_then_builds() {
        let game = three_players();
        game.set_owner(1, Some(0)).unwrap();
        game.set_owner(3, Some(1)).unwrap();

        play(&game, yes(), &[(2, 3)]);

        assert_eq!(game.square_state(5).unwrap().owner, Some(0));
        assert_eq!(game.square_state(3).unwrap().owner, Some(0));
        assert_eq!(game.square_state(1).unwrap().houses, 1);
        assert_eq!(game.square_state(3).unwrap().houses, 1);
        // 200 railroad, 60 trade, two houses at 50
        assert_eq!(game.require_player(0).unwrap().cash, 1140);
        assert_eq!(game.require_player(1).unwrap().cash, 1560);
    }

    #[test]
    fn test_unrolled_dice_defer_the_step() {
        let game = three_players();
        let provider = heuristic();
        let turn = Arc::new(FacadeTurn::new(game.clone(), AuctionHouse::default(), Arc::clone(&provider)));
        let engine = DecisionEngine::new(Arc::new(StateRegistry::standard().unwrap()));
        let mut ctx = DecisionContext::new(0, turn, provider);

        let err = engine.step(&mut ctx).unwrap_err();
        assert!(err.is_transient());
        assert_eq!(ctx.current(), Some(StateId::DiceRoll));

        game.update_player(0, |p| p.dice = DicePair(1, 2));
        assert_eq!(engine.step(&mut ctx).unwrap(), StepOutcome::Finished(StateId::TurnEnd));
        assert_eq!(game.require_player(0).unwrap().position, 3);
    }

    #[test]
    fn test_utility_rent_from_roll() {
        let game = three_players();
        game.set_owner(12, Some(1)).unwrap();
        game.set_owner(28, Some(1)).unwrap();
        game.update_player(0, |p| p.position = 7);
        play(&game, heuristic(), &[(2, 3)]);
        // Both utilities owned: ten times the roll
        assert_eq!(game.require_player(0).unwrap().cash, 1450);
        assert_eq!(game.require_player(1).unwrap().cash, 1550);
    }

    #[test]
    fn test_contexts_skip_bankrupt() {
        let game = three_players();
        game.update_player(1, |p| p.bankrupt = true);
        let turn = Arc::new(FacadeTurn::new(game, AuctionHouse::default(), heuristic()));
        let players: Vec<_> = FacadeTurn::contexts(&turn).unwrap().iter().map(|c| c.player).collect();
        assert_eq!(players, [0, 2]);
    }

    #[test]
    fn test_mortgaged_square_is_not_wanted() {
        let game = three_players();
        game.set_owner(1, Some(0)).unwrap();
        game.set_owner(3, Some(1)).unwrap();
        game.set_mortgaged(3, true).unwrap();
        let turn = FacadeTurn::new(game, AuctionHouse::default(), heuristic());
        assert_eq!(turn.find_trade_partner(0).unwrap(), None);
    }
}
