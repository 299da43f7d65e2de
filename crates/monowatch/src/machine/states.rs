use serde_json::json;
use tracing::{debug, warn};

use super::registry::{RegistryBuilder, StateRegistry};
use super::state::{DecisionContext, FnState, StateId};
use crate::decide::{DecisionKind, DecisionRequest, decide_bool, decide_choice};
use crate::error::{Error, Result};
use crate::game::SquareKind;

/// Improvement and trade evaluations per turn
pub const MAX_IMPROVEMENT_PASSES: u32 = 3;
/// Failed release rolls before bail is forced
pub const MAX_JAIL_ROLLS: u32 = 3;
/// Consecutive doubles that send the player to jail
pub const DOUBLES_LIMIT: u32 = 3;
pub const BAIL: u32 = 50;

fn refresh(ctx: &mut DecisionContext) -> Result<()> {
    ctx.cash = ctx.actions.cash(ctx.player)?;
    ctx.properties = ctx.actions.properties(ctx.player)?;
    Ok(())
}

fn ask(ctx: &DecisionContext, kind: DecisionKind, context: serde_json::Value) -> DecisionRequest {
    DecisionRequest::new(kind, ctx.player, context)
}

fn sense(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    refresh(ctx)?;
    debug!(
        "player {} has {} and {} properties",
        ctx.player,
        ctx.cash,
        ctx.properties.len()
    );
    Ok(Some(StateId::JailCheck))
}

fn jail_check(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    if ctx.actions.is_in_jail(ctx.player)? {
        Ok(Some(StateId::JailDecision))
    } else {
        ctx.jail_turns = 0;
        Ok(Some(StateId::DiceRoll))
    }
}

fn release_options(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    if ctx.jail_turns >= MAX_JAIL_ROLLS {
        return Ok(Some(StateId::JdPayBail));
    }

    let has_card = ctx.actions.has_jail_card(ctx.player)?;
    let request = ask(
        ctx,
        DecisionKind::JailRelease,
        json!({ "has_card": has_card, "cash": ctx.cash, "jail_turns": ctx.jail_turns }),
    );
    let next = match decide_choice(ctx.provider.as_ref(), &request, "roll").as_str() {
        "use_card" if has_card => StateId::JdUseCard,
        "pay_bail" if ctx.cash >= BAIL => StateId::JdPayBail,
        _ => StateId::JdRoll,
    };
    Ok(Some(next))
}

fn jail_roll(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    let roll = ctx.actions.roll_dice(ctx.player)?;
    ctx.last_roll = Some(roll);
    if roll.is_double() {
        ctx.release_roll = Some(roll);
        Ok(Some(StateId::JdReleased))
    } else {
        ctx.jail_turns += 1;
        Ok(Some(StateId::JdEndTurn))
    }
}

fn dice_roll(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    let roll = match ctx.release_roll {
        Some(roll) => roll,
        None => ctx.actions.roll_dice(ctx.player)?,
    };
    ctx.last_roll = Some(roll);
    Ok(Some(StateId::MoveToken))
}

fn move_token(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    let roll = ctx
        .last_roll
        .ok_or_else(|| Error::Configuration("MoveToken reached without a roll".into()))?;
    let position = ctx.actions.move_token(ctx.player, roll.total())?;
    debug!("player {} moved {} to {}", ctx.player, roll.total(), position);
    Ok(Some(StateId::LandingDecision))
}

fn landing(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    let view = ctx.actions.current_square(ctx.player)?;
    let next = match view.square.kind {
        kind if kind.is_ownable() => StateId::LdPropertyCheck,
        SquareKind::Tax => StateId::LdTaxBranch,
        _ => StateId::LdSpecial,
    };
    Ok(Some(next))
}

fn property_check(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    let view = ctx.actions.current_square(ctx.player)?;
    let next = match view.state.owner {
        None => StateId::LdBuyBranch,
        Some(owner) if owner == ctx.player => StateId::LdOwned,
        Some(_) => StateId::LdRentBranch,
    };
    Ok(Some(next))
}

fn eval_liquidity(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    ctx.cash = ctx.actions.cash(ctx.player)?;
    let view = ctx.actions.current_square(ctx.player)?;
    if ctx.cash < view.square.price {
        return Ok(Some(StateId::LdAuction));
    }

    let request = ask(
        ctx,
        DecisionKind::BuyProperty,
        json!({
            "square": view.square.index,
            "name": view.square.name,
            "price": view.square.price,
            "cash": ctx.cash,
            "properties": ctx.properties.len(),
        }),
    );
    if decide_bool(ctx.provider.as_ref(), &request, false) {
        Ok(Some(StateId::LdPurchase))
    } else {
        Ok(Some(StateId::LdAuction))
    }
}

fn purchase(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    ctx.actions.buy_property(ctx.player)?;
    Ok(Some(StateId::LdDone))
}

fn auction(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    let view = ctx.actions.current_square(ctx.player)?;
    ctx.actions.start_auction(ctx.player, view.square.index)?;
    Ok(Some(StateId::LdDone))
}

fn pay_rent(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    ctx.balance = ctx.actions.pay_rent(ctx.player)?;
    Ok(Some(StateId::LdCheckCash))
}

fn check_cash(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    if ctx.balance < 0 {
        Ok(Some(StateId::LdMortgage))
    } else {
        Ok(Some(StateId::LdDone))
    }
}

fn mortgage(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    let deficit = u32::try_from(-ctx.balance).unwrap_or(u32::MAX);
    let raised = ctx.actions.mortgage_until_solvent(ctx.player, deficit)?;
    ctx.balance += i64::from(raised);
    Ok(Some(StateId::LdPayAfterMort))
}

fn pay_after_mortgage(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    if ctx.balance < 0 {
        warn!("player {} still short by {} after mortgaging", ctx.player, -ctx.balance);
    }
    ctx.actions.settle_debt(ctx.player)?;
    Ok(Some(StateId::LdDone))
}

fn pay_tax(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    ctx.balance = ctx.actions.pay_tax(ctx.player)?;
    Ok(Some(StateId::LdDone))
}

fn special(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    ctx.actions.resolve_special(ctx.player)?;
    Ok(Some(StateId::LdDone))
}

fn landing_done(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    refresh(ctx)?;
    Ok(Some(StateId::LdExit))
}

fn improvement_check(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    if ctx.improvement_passes >= MAX_IMPROVEMENT_PASSES {
        return Ok(Some(StateId::PtmEnd));
    }
    ctx.improvement_passes += 1;

    if !ctx.build_declined && ctx.actions.has_monopoly(ctx.player)? {
        Ok(Some(StateId::PtmBuildBranch))
    } else if !ctx.trade_done {
        Ok(Some(StateId::PtmTradeBranch))
    } else {
        Ok(Some(StateId::PtmEnd))
    }
}

fn eval_roi(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    let request = ask(
        ctx,
        DecisionKind::Build,
        json!({ "cash": ctx.cash, "properties": ctx.properties }),
    );
    if decide_bool(ctx.provider.as_ref(), &request, false) {
        Ok(Some(StateId::PtmBuild))
    } else {
        Ok(Some(StateId::PtmSkip))
    }
}

fn build(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    if !ctx.actions.build(ctx.player)? {
        ctx.build_declined = true;
    }
    Ok(Some(StateId::PtmBuildEnd))
}

fn find_partner(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    let Some(partner) = ctx.actions.find_trade_partner(ctx.player)? else {
        return Ok(Some(StateId::PtmNoTrade));
    };
    let request = ask(
        ctx,
        DecisionKind::TradeOffer,
        json!({ "partner": partner, "cash": ctx.cash, "properties": ctx.properties }),
    );
    if decide_bool(ctx.provider.as_ref(), &request, false) {
        ctx.trade_partner = Some(partner);
        Ok(Some(StateId::PtmMakeOffer))
    } else {
        Ok(Some(StateId::PtmNoTrade))
    }
}

fn make_offer(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    let partner = ctx
        .trade_partner
        .ok_or_else(|| Error::Configuration("PTM_MakeOffer reached without a partner".into()))?;
    ctx.actions.propose_trade(ctx.player, partner)?;
    Ok(Some(StateId::PtmWait))
}

fn wait_for_answer(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    Ok(match ctx.actions.trade_response(ctx.player)? {
        None => None,
        Some(true) => Some(StateId::PtmAccepted),
        Some(false) => Some(StateId::PtmRejected),
    })
}

fn accepted(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    ctx.actions.finalize_trade(ctx.player)?;
    Ok(Some(StateId::PtmUpdateHold))
}

fn update_holdings(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    refresh(ctx)?;
    Ok(Some(StateId::PtmTradeEnd))
}

fn trade_end(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    ctx.trade_done = true;
    ctx.trade_partner = None;
    Ok(Some(StateId::PtmImprovementCheck))
}

fn double_check(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    let rolled_double = ctx.last_roll.is_some_and(|roll| roll.is_double());
    // Doubles that released the player do not earn another roll
    if !rolled_double || ctx.release_roll.is_some() || ctx.actions.is_in_jail(ctx.player)? {
        return Ok(Some(StateId::TurnEnd));
    }

    ctx.doubles += 1;
    if ctx.doubles >= DOUBLES_LIMIT {
        return Ok(Some(StateId::DcPrison));
    }
    ctx.last_roll = None;
    // Each extra roll gets its own improvement budget check
    Ok(Some(StateId::DiceRoll))
}

fn prison(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    warn!("player {} rolled {} doubles, going to jail", ctx.player, ctx.doubles);
    ctx.actions.send_to_jail(ctx.player)?;
    ctx.jail_turns = 0;
    ctx.actions.end_turn(ctx.player)?;
    Ok(None)
}

fn end_turn(ctx: &mut DecisionContext) -> Result<Option<StateId>> {
    ctx.actions.end_turn(ctx.player)?;
    Ok(None)
}

impl StateRegistry {
    /// The full turn graph
    pub fn standard() -> Result<Self> {
        use StateId::*;

        let builder = StateRegistry::builder();
        let builder = [
            (AiTurn, SenseState),
            (JailDecision, EvaluateReleaseOptions),
            (LdBuyBranch, LdEvalLiquidity),
            (LdRentBranch, LdPayRent),
            (LdOwned, LdDone),
            (LdExit, PostTurnManagement),
            (PostTurnManagement, PtmImprovementCheck),
            (PtmBuildBranch, PtmEvalRoi),
            (PtmTradeBranch, PtmFindPartner),
            (PtmRejected, PtmTradeEnd),
            (PtmNoTrade, PtmTradeEnd),
            (PtmEnd, PtmExit),
            (PtmExit, DoubleCheck),
        ]
        .into_iter()
        .try_fold(builder, |b, (id, next)| b.register(FnState::pass(id, next)))?;

        let builder = register_all(
            builder,
            [
                FnState::new(SenseState, sense),
                FnState::new(JailCheck, jail_check),
                FnState::new(EvaluateReleaseOptions, release_options),
                FnState::new(JdUseCard, |ctx| {
                    ctx.actions.use_jail_card(ctx.player)?;
                    Ok(Some(JdReleased))
                }),
                FnState::new(JdPayBail, |ctx| {
                    ctx.actions.pay_bail(ctx.player)?;
                    ctx.cash = ctx.actions.cash(ctx.player)?;
                    Ok(Some(JdReleased))
                }),
                FnState::new(JdRoll, jail_roll),
                FnState::new(JdReleased, |ctx| {
                    ctx.jail_turns = 0;
                    Ok(Some(DiceRoll))
                }),
                FnState::new(JdEndTurn, end_turn).terminal(),
                FnState::new(DiceRoll, dice_roll),
                FnState::new(MoveToken, move_token),
                FnState::new(LandingDecision, landing),
                FnState::new(LdPropertyCheck, property_check),
                FnState::new(LdEvalLiquidity, eval_liquidity),
                FnState::new(LdPurchase, purchase),
                FnState::new(LdAuction, auction),
                FnState::new(LdPayRent, pay_rent),
                FnState::new(LdCheckCash, check_cash),
                FnState::new(LdMortgage, mortgage),
                FnState::new(LdPayAfterMort, pay_after_mortgage),
                FnState::new(LdTaxBranch, pay_tax),
                FnState::new(LdSpecial, special),
                FnState::new(LdDone, landing_done),
                FnState::new(PtmImprovementCheck, improvement_check),
                FnState::new(PtmEvalRoi, eval_roi),
                FnState::new(PtmBuild, build),
                FnState::new(PtmSkip, |ctx| {
                    ctx.build_declined = true;
                    Ok(Some(PtmBuildEnd))
                }),
                FnState::new(PtmBuildEnd, |ctx| {
                    ctx.cash = ctx.actions.cash(ctx.player)?;
                    Ok(Some(PtmImprovementCheck))
                }),
                FnState::new(PtmFindPartner, find_partner),
                FnState::new(PtmMakeOffer, make_offer),
                FnState::new(PtmWait, wait_for_answer).on_enter(|ctx| {
                    debug!("player {} waiting on {:?}", ctx.player, ctx.trade_partner);
                    Ok(())
                }),
                FnState::new(PtmAccepted, accepted),
                FnState::new(PtmUpdateHold, update_holdings),
                FnState::new(PtmTradeEnd, trade_end),
                FnState::new(DoubleCheck, double_check),
                FnState::new(DcPrison, prison).terminal(),
                FnState::new(TurnEnd, end_turn).terminal(),
            ],
        )?;

        Ok(builder.build())
    }
}

fn register_all<const N: usize>(builder: RegistryBuilder, states: [FnState; N]) -> Result<RegistryBuilder> {
    states.into_iter().try_fold(builder, |b, state| b.register(state))
}
