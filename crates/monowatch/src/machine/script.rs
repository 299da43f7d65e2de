//! Scripted turn surface for exercising the graph without a game.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::actions::TurnActions;
use crate::error::{Error, Result};
use crate::game::{BOARD_SIZE, Board, DicePair, JAIL_SQUARE, PlayerId, SquareKind, SquareState, SquareView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Roll(DicePair),
    Move(u8),
    Buy(u8),
    Auction(u8),
    Rent(u32),
    Tax(u32),
    Mortgage(u32),
    SettleDebt,
    Special(u8),
    UseCard,
    PayBail,
    Build,
    Propose(PlayerId),
    FinalizeTrade,
    SendToJail,
    EndTurn,
}

#[derive(Default)]
struct Script {
    cash: u32,
    position: u8,
    in_jail: bool,
    has_card: bool,
    monopoly: bool,
    partner: Option<PlayerId>,
    rolls: VecDeque<DicePair>,
    answers: VecDeque<Option<bool>>,
    squares: HashMap<u8, SquareState>,
    calls: Vec<Call>,
}

pub struct ScriptedTurn {
    board: Board,
    script: Mutex<Script>,
}

impl ScriptedTurn {
    pub fn new() -> Self {
        Self {
            board: Board::standard(),
            script: Mutex::new(Script::default()),
        }
    }

    fn with(self, f: impl FnOnce(&mut Script)) -> Self {
        f(&mut self.script.lock().unwrap());
        self
    }

    pub fn with_cash(self, cash: u32) -> Self {
        self.with(|s| s.cash = cash)
    }

    pub fn with_rolls(self, rolls: impl IntoIterator<Item = DicePair>) -> Self {
        self.with(|s| s.rolls.extend(rolls))
    }

    pub fn with_square(self, index: u8, state: SquareState) -> Self {
        self.with(|s| {
            s.squares.insert(index, state);
        })
    }

    pub fn with_partner(self, partner: PlayerId) -> Self {
        self.with(|s| s.partner = Some(partner))
    }

    pub fn with_answers(self, answers: impl IntoIterator<Item = Option<bool>>) -> Self {
        self.with(|s| s.answers.extend(answers))
    }

    pub fn with_monopoly(self) -> Self {
        self.with(|s| s.monopoly = true)
    }

    pub fn jailed(self) -> Self {
        self.with(|s| {
            s.in_jail = true;
            s.position = JAIL_SQUARE;
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    fn view(&self, script: &Script) -> Result<SquareView> {
        let square = self
            .board
            .get(script.position)
            .cloned()
            .ok_or_else(|| Error::Configuration(format!("no square {}", script.position)))?;
        let state = script.squares.get(&script.position).copied().unwrap_or_default();
        let rent = if state.mortgaged { 0 } else { square.rents[state.houses as usize] };
        Ok(SquareView { square, state, rent })
    }

    fn pay(script: &mut Script, amount: u32) -> i64 {
        let balance = i64::from(script.cash) - i64::from(amount);
        script.cash = script.cash.saturating_sub(amount);
        balance
    }
}

impl TurnActions for ScriptedTurn {
    fn cash(&self, _player: PlayerId) -> Result<u32> {
        Ok(self.script.lock().unwrap().cash)
    }

    fn properties(&self, player: PlayerId) -> Result<Vec<u8>> {
        let script = self.script.lock().unwrap();
        let mut owned: Vec<u8> = script
            .squares
            .iter()
            .filter(|(_, state)| state.owner == Some(player))
            .map(|(index, _)| *index)
            .collect();
        owned.sort_unstable();
        Ok(owned)
    }

    fn is_in_jail(&self, _player: PlayerId) -> Result<bool> {
        Ok(self.script.lock().unwrap().in_jail)
    }

    fn has_jail_card(&self, _player: PlayerId) -> Result<bool> {
        Ok(self.script.lock().unwrap().has_card)
    }

    fn use_jail_card(&self, _player: PlayerId) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        script.has_card = false;
        script.in_jail = false;
        script.calls.push(Call::UseCard);
        Ok(())
    }

    fn pay_bail(&self, _player: PlayerId) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        Self::pay(&mut script, 50);
        script.in_jail = false;
        script.calls.push(Call::PayBail);
        Ok(())
    }

    fn roll_dice(&self, _player: PlayerId) -> Result<DicePair> {
        let mut script = self.script.lock().unwrap();
        let roll = script
            .rolls
            .pop_front()
            .ok_or_else(|| Error::Configuration("script ran out of rolls".into()))?;
        script.calls.push(Call::Roll(roll));
        Ok(roll)
    }

    fn move_token(&self, _player: PlayerId, steps: u8) -> Result<u8> {
        let mut script = self.script.lock().unwrap();
        script.position = ((script.position as usize + steps as usize) % BOARD_SIZE) as u8;
        script.in_jail = false;
        script.calls.push(Call::Move(steps));
        Ok(script.position)
    }

    fn current_square(&self, _player: PlayerId) -> Result<SquareView> {
        let script = self.script.lock().unwrap();
        self.view(&script)
    }

    fn buy_property(&self, player: PlayerId) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        let view = self.view(&script)?;
        Self::pay(&mut script, view.square.price);
        let position = script.position;
        script.squares.entry(position).or_default().owner = Some(player);
        script.calls.push(Call::Buy(position));
        Ok(())
    }

    fn start_auction(&self, _player: PlayerId, square: u8) -> Result<()> {
        self.script.lock().unwrap().calls.push(Call::Auction(square));
        Ok(())
    }

    fn pay_rent(&self, _player: PlayerId) -> Result<i64> {
        let mut script = self.script.lock().unwrap();
        let rent = self.view(&script)?.rent;
        script.calls.push(Call::Rent(rent));
        Ok(Self::pay(&mut script, rent))
    }

    fn pay_tax(&self, _player: PlayerId) -> Result<i64> {
        let mut script = self.script.lock().unwrap();
        let tax = self.view(&script)?.square.tax;
        script.calls.push(Call::Tax(tax));
        Ok(Self::pay(&mut script, tax))
    }

    fn resolve_special(&self, _player: PlayerId) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        let position = script.position;
        if self.view(&script)?.square.kind == SquareKind::GoToJail {
            script.position = JAIL_SQUARE;
            script.in_jail = true;
        }
        script.calls.push(Call::Special(position));
        Ok(())
    }

    fn mortgage_until_solvent(&self, _player: PlayerId, deficit: u32) -> Result<u32> {
        self.script.lock().unwrap().calls.push(Call::Mortgage(deficit));
        Ok(deficit)
    }

    fn settle_debt(&self, _player: PlayerId) -> Result<()> {
        self.script.lock().unwrap().calls.push(Call::SettleDebt);
        Ok(())
    }

    fn has_monopoly(&self, _player: PlayerId) -> Result<bool> {
        Ok(self.script.lock().unwrap().monopoly)
    }

    fn build(&self, _player: PlayerId) -> Result<bool> {
        self.script.lock().unwrap().calls.push(Call::Build);
        Ok(true)
    }

    fn find_trade_partner(&self, _player: PlayerId) -> Result<Option<PlayerId>> {
        Ok(self.script.lock().unwrap().partner)
    }

    fn propose_trade(&self, _player: PlayerId, partner: PlayerId) -> Result<()> {
        self.script.lock().unwrap().calls.push(Call::Propose(partner));
        Ok(())
    }

    fn trade_response(&self, _player: PlayerId) -> Result<Option<bool>> {
        Ok(self.script.lock().unwrap().answers.pop_front().flatten())
    }

    fn finalize_trade(&self, _player: PlayerId) -> Result<()> {
        self.script.lock().unwrap().calls.push(Call::FinalizeTrade);
        Ok(())
    }

    fn send_to_jail(&self, _player: PlayerId) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        script.position = JAIL_SQUARE;
        script.in_jail = true;
        script.calls.push(Call::SendToJail);
        Ok(())
    }

    fn end_turn(&self, _player: PlayerId) -> Result<()> {
        self.script.lock().unwrap().calls.push(Call::EndTurn);
        Ok(())
    }
}
