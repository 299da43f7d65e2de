use std::sync::Arc;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use super::actions::TurnActions;
use crate::decide::DecisionProvider;
use crate::error::Result;
use crate::game::{DicePair, PlayerId};

/// Every node of the turn graph.
///
/// Names at the registry boundary (logs, configuration) use the historical
/// spelling, e.g. `AI_Turn` or `JD_UseCard`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, IntoStaticStr,
)]
pub enum StateId {
    #[strum(serialize = "AI_Turn")]
    AiTurn,
    SenseState,
    JailCheck,
    JailDecision,
    EvaluateReleaseOptions,
    #[strum(serialize = "JD_UseCard")]
    JdUseCard,
    #[strum(serialize = "JD_PayBail")]
    JdPayBail,
    #[strum(serialize = "JD_Roll")]
    JdRoll,
    #[strum(serialize = "JD_Released")]
    JdReleased,
    #[strum(serialize = "JD_EndTurn")]
    JdEndTurn,
    DiceRoll,
    MoveToken,
    LandingDecision,
    #[strum(serialize = "LD_PropertyCheck")]
    LdPropertyCheck,
    #[strum(serialize = "LD_BuyBranch")]
    LdBuyBranch,
    #[strum(serialize = "LD_EvalLiquidity")]
    LdEvalLiquidity,
    #[strum(serialize = "LD_Purchase")]
    LdPurchase,
    #[strum(serialize = "LD_Auction")]
    LdAuction,
    #[strum(serialize = "LD_RentBranch")]
    LdRentBranch,
    #[strum(serialize = "LD_PayRent")]
    LdPayRent,
    #[strum(serialize = "LD_CheckCash")]
    LdCheckCash,
    #[strum(serialize = "LD_Mortgage")]
    LdMortgage,
    #[strum(serialize = "LD_PayAfterMort")]
    LdPayAfterMort,
    #[strum(serialize = "LD_TaxBranch")]
    LdTaxBranch,
    #[strum(serialize = "LD_Special")]
    LdSpecial,
    #[strum(serialize = "LD_Owned")]
    LdOwned,
    #[strum(serialize = "LD_Done")]
    LdDone,
    #[strum(serialize = "LD_Exit")]
    LdExit,
    PostTurnManagement,
    #[strum(serialize = "PTM_ImprovementCheck")]
    PtmImprovementCheck,
    #[strum(serialize = "PTM_BuildBranch")]
    PtmBuildBranch,
    #[strum(serialize = "PTM_EvalROI")]
    PtmEvalRoi,
    #[strum(serialize = "PTM_Build")]
    PtmBuild,
    #[strum(serialize = "PTM_Skip")]
    PtmSkip,
    #[strum(serialize = "PTM_BuildEnd")]
    PtmBuildEnd,
    #[strum(serialize = "PTM_TradeBranch")]
    PtmTradeBranch,
    #[strum(serialize = "PTM_FindPartner")]
    PtmFindPartner,
    #[strum(serialize = "PTM_MakeOffer")]
    PtmMakeOffer,
    #[strum(serialize = "PTM_Wait")]
    PtmWait,
    #[strum(serialize = "PTM_Accepted")]
    PtmAccepted,
    #[strum(serialize = "PTM_Rejected")]
    PtmRejected,
    #[strum(serialize = "PTM_UpdateHold")]
    PtmUpdateHold,
    #[strum(serialize = "PTM_NoTrade")]
    PtmNoTrade,
    #[strum(serialize = "PTM_TradeEnd")]
    PtmTradeEnd,
    #[strum(serialize = "PTM_End")]
    PtmEnd,
    #[strum(serialize = "PTM_Exit")]
    PtmExit,
    DoubleCheck,
    #[strum(serialize = "DC_Prison")]
    DcPrison,
    TurnEnd,
}

/// Scratch state of one player's traversal
pub struct DecisionContext {
    pub player: PlayerId,
    pub actions: Arc<dyn TurnActions>,
    pub provider: Arc<dyn DecisionProvider>,
    pub cash: u32,
    pub properties: Vec<u8>,
    /// Failed release rolls since entering jail
    pub jail_turns: u32,
    /// Consecutive doubles this turn
    pub doubles: u32,
    pub trade_partner: Option<PlayerId>,
    pub last_roll: Option<DicePair>,
    /// Doubles that released the player; used as the move roll
    pub release_roll: Option<DicePair>,
    /// Cash after the last payment, negative when short
    pub balance: i64,
    pub improvement_passes: u32,
    pub build_declined: bool,
    pub trade_done: bool,
    pub(crate) current: Option<StateId>,
    pub(crate) entered: bool,
}

impl DecisionContext {
    pub fn new(
        player: PlayerId,
        actions: Arc<dyn TurnActions>,
        provider: Arc<dyn DecisionProvider>,
    ) -> Self {
        Self {
            player,
            actions,
            provider,
            cash: 0,
            properties: Vec::new(),
            jail_turns: 0,
            doubles: 0,
            trade_partner: None,
            last_roll: None,
            release_roll: None,
            balance: 0,
            improvement_passes: 0,
            build_declined: false,
            trade_done: false,
            current: None,
            entered: false,
        }
    }

    /// State the next step resumes from, if a traversal is in progress
    pub fn current(&self) -> Option<StateId> {
        self.current
    }

    /// Clear per-turn scratch. Jail attempts carry over between turns.
    pub fn reset_turn(&mut self) {
        self.current = None;
        self.entered = false;
        self.doubles = 0;
        self.trade_partner = None;
        self.last_roll = None;
        self.release_roll = None;
        self.balance = 0;
        self.improvement_passes = 0;
        self.build_declined = false;
        self.trade_done = false;
    }
}

/// One node of the turn graph.
///
/// `run` returns the next node to chain into within the same step, or `None`
/// to hand control back to the driver.
pub trait DecisionState: Send + Sync {
    fn id(&self) -> StateId;

    fn on_enter(&self, _ctx: &mut DecisionContext) -> Result<()> {
        Ok(())
    }

    fn run(&self, ctx: &mut DecisionContext) -> Result<Option<StateId>>;

    fn on_exit(&self, _ctx: &mut DecisionContext) -> Result<()> {
        Ok(())
    }

    /// Returning `None` from a terminal node ends the traversal
    fn is_terminal(&self) -> bool {
        false
    }
}

type Hook = Box<dyn Fn(&mut DecisionContext) -> Result<()> + Send + Sync>;
type RunFn = Box<dyn Fn(&mut DecisionContext) -> Result<Option<StateId>> + Send + Sync>;

/// A state assembled from closures
pub struct FnState {
    id: StateId,
    run: RunFn,
    enter: Option<Hook>,
    exit: Option<Hook>,
    terminal: bool,
}

impl FnState {
    pub fn new<F>(id: StateId, run: F) -> Self
    where
        F: Fn(&mut DecisionContext) -> Result<Option<StateId>> + Send + Sync + 'static,
    {
        Self {
            id,
            run: Box::new(run),
            enter: None,
            exit: None,
            terminal: false,
        }
    }

    /// A node that only forwards to `next`
    pub fn pass(id: StateId, next: StateId) -> Self {
        Self::new(id, move |_| Ok(Some(next)))
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    pub fn on_enter<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut DecisionContext) -> Result<()> + Send + Sync + 'static,
    {
        self.enter = Some(Box::new(hook));
        self
    }

    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut DecisionContext) -> Result<()> + Send + Sync + 'static,
    {
        self.exit = Some(Box::new(hook));
        self
    }
}

impl DecisionState for FnState {
    fn id(&self) -> StateId {
        self.id
    }

    fn on_enter(&self, ctx: &mut DecisionContext) -> Result<()> {
        self.enter.as_ref().map_or(Ok(()), |hook| hook(ctx))
    }

    fn run(&self, ctx: &mut DecisionContext) -> Result<Option<StateId>> {
        (self.run)(ctx)
    }

    fn on_exit(&self, ctx: &mut DecisionContext) -> Result<()> {
        self.exit.as_ref().map_or(Ok(()), |hook| hook(ctx))
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }
}
