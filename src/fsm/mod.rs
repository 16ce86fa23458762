//! Arm/capture state machine.
//!
//! ```text
//!   StateId ──index──▶ [StateRow; 8] ──▶ enter(ctx)        (once, on arrival)
//!                                    └─▶ update(ctx) ─▶ Option<StateId>  (every tick)
//! ```
//!
//! Rows hold plain `fn` pointers built by [`states::build_state_table`].
//! `ArmMachine::tick` runs the current row's `update`; a returned id is
//! entered immediately, so at most one transition happens per tick.
//! Handlers only see `&mut ArmContext` and never touch the link.

pub mod context;
pub mod states;

use context::ArmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Arm/capture lifecycle states.  Discriminants index the state table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Waking = 1,
    WaitingForBoot = 2,
    WaitingForReady = 3,
    Settling = 4,
    Ready = 5,
    Capturing = 6,
    Disarming = 7,
}

impl StateId {
    pub const COUNT: usize = 8;

    /// Every state in table order.
    pub const ALL: [StateId; Self::COUNT] = [
        Self::Idle,
        Self::Waking,
        Self::WaitingForBoot,
        Self::WaitingForReady,
        Self::Settling,
        Self::Ready,
        Self::Capturing,
        Self::Disarming,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// States in which `arm()` is a no-op.
    pub fn is_session_active(self) -> bool {
        self != Self::Idle
    }

    /// Still bringing the module up; captures are queued, not written.
    pub fn is_arming(self) -> bool {
        matches!(
            self,
            Self::Waking | Self::WaitingForBoot | Self::WaitingForReady | Self::Settling
        )
    }
}

/// Runs once when a state is entered.
pub type EnterFn = fn(&mut ArmContext);

/// Runs every tick while the state is current; `Some` moves on.
pub type UpdateFn = fn(&mut ArmContext) -> Option<StateId>;

/// One row of the state table.
pub struct StateRow {
    pub id: StateId,
    pub name: &'static str,
    pub enter: Option<EnterFn>,
    pub update: UpdateFn,
}

/// A state change, as reported to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StateId,
    pub to: StateId,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct ArmMachine {
    table: [StateRow; StateId::COUNT],
    current: StateId,
    /// Transitions taken since start, for diagnostics.
    transitions: u32,
}

impl ArmMachine {
    pub fn new(table: [StateRow; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().zip(StateId::ALL).all(|(row, id)| row.id == id),
            "state table out of order"
        );
        Self {
            table,
            current: initial,
            transitions: 0,
        }
    }

    /// Enter the initial state.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut ArmContext) {
        info!("ARM: machine starting in {}", self.state_name());
        self.enter(ctx);
    }

    /// Run the current state's update; follow the transition it asks for.
    pub fn tick(&mut self, ctx: &mut ArmContext) -> Option<Transition> {
        let next = (self.row().update)(ctx)?;
        self.move_to(next, ctx)
    }

    /// Transition from outside the table (arm, capture, operator sleep).
    /// Returns `None` when already in `next`.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut ArmContext) -> Option<Transition> {
        self.move_to(next, ctx)
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    pub fn state_name(&self) -> &'static str {
        self.row().name
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    fn row(&self) -> &StateRow {
        &self.table[self.current.index()]
    }

    fn enter(&self, ctx: &mut ArmContext) {
        ctx.state_entered_ms = ctx.now_ms;
        if let Some(enter) = self.row().enter {
            enter(ctx);
        }
    }

    fn move_to(&mut self, next: StateId, ctx: &mut ArmContext) -> Option<Transition> {
        if next == self.current {
            return None;
        }
        let from = self.current;
        info!(
            "ARM: {} -> {}",
            self.state_name(),
            self.table[next.index()].name
        );
        self.current = next;
        self.transitions = self.transitions.wrapping_add(1);
        self.enter(ctx);
        Some(Transition { from, to: next })
    }
}
