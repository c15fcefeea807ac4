//! Game phase state machine.
//!
//! ```text
//!            non-winning goal            winning goal
//!  GoalOne/GoalTwo <──── InPlay ────> WinOne/WinTwo
//!        │                 ▲                │
//!        └─ hold elapsed ──┴── hold elapsed ┘
//! ```
//!
//! `Setup` and `Error` are only ever entered through an explicit
//! [`PhaseCoordinator::set`] from outside the gameplay loops.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::world::{Player, Score};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    Setup,
    InPlay,
    GoalOne,
    GoalTwo,
    WinOne,
    WinTwo,
    Error,
}

impl GamePhase {
    /// Phase entered after `scorer` scores.
    pub fn after_goal(scorer: Player, winning: bool) -> Self {
        match (scorer, winning) {
            (Player::One, false) => GamePhase::GoalOne,
            (Player::Two, false) => GamePhase::GoalTwo,
            (Player::One, true) => GamePhase::WinOne,
            (Player::Two, true) => GamePhase::WinTwo,
        }
    }

    pub fn is_goal(self) -> bool {
        matches!(self, GamePhase::GoalOne | GamePhase::GoalTwo)
    }

    pub fn is_win(self) -> bool {
        matches!(self, GamePhase::WinOne | GamePhase::WinTwo)
    }

    /// Goal and win phases, which show a screen and then return to play.
    pub fn is_celebration(self) -> bool {
        self.is_goal() || self.is_win()
    }

    /// The player being celebrated, if any.
    pub fn player(self) -> Option<Player> {
        match self {
            GamePhase::GoalOne | GamePhase::WinOne => Some(Player::One),
            GamePhase::GoalTwo | GamePhase::WinTwo => Some(Player::Two),
            _ => None,
        }
    }

    /// How long the render layer holds this phase's screen before asking
    /// for play to resume. `None` for phases that are not timed.
    pub fn hold_duration(self, config: &EngineConfig) -> Option<Duration> {
        if self.is_goal() {
            Some(config.goal_celebration())
        } else if self.is_win() {
            Some(config.win_celebration())
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct PhaseState {
    phase: GamePhase,
    generation: u64,
}

/// The single authoritative game phase, read and written under a lock.
///
/// Transitions are never rejected; the coordinator records whatever the
/// loops ask for. Every write bumps a generation counter so readers can
/// tell a phase that was re-entered from one that never changed.
#[derive(Debug)]
pub struct PhaseCoordinator {
    state: Mutex<PhaseState>,
}

impl Default for PhaseCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseCoordinator {
    /// Starts in `InPlay`.
    pub fn new() -> Self {
        Self::with_phase(GamePhase::InPlay)
    }

    pub fn with_phase(phase: GamePhase) -> Self {
        Self {
            state: Mutex::new(PhaseState {
                phase,
                generation: 0,
            }),
        }
    }

    // A panic while holding this lock cannot leave a half-written enum
    // behind, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, PhaseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> GamePhase {
        self.lock().phase
    }

    /// Phase together with its generation, read atomically.
    pub fn snapshot(&self) -> (GamePhase, u64) {
        let state = self.lock();
        (state.phase, state.generation)
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn set(&self, phase: GamePhase) {
        let mut state = self.lock();
        let from = state.phase;
        state.phase = phase;
        state.generation += 1;
        tracing::debug!(from = ?from, to = ?phase, generation = state.generation, "Phase transition");
    }

    /// Credit `scorer` with a goal and enter the matching goal or win phase.
    ///
    /// Returns the new phase and the scorer's total including this goal.
    /// Scores are left for the caller to clear on a win.
    pub fn record_goal(
        &self,
        score: &mut Score,
        scorer: Player,
        winning_score: u32,
    ) -> (GamePhase, u32) {
        let total = score.increment(scorer);
        let phase = GamePhase::after_goal(scorer, total >= winning_score);
        self.set(phase);
        (phase, total)
    }

    /// Return to `InPlay` only if the phase is still `expected`.
    ///
    /// Used by delayed celebration timers so a timer that fires late cannot
    /// cut a newer phase short.
    pub fn revert_if(&self, expected: GamePhase) -> bool {
        let mut state = self.lock();
        if state.phase != expected {
            return false;
        }
        state.phase = GamePhase::InPlay;
        state.generation += 1;
        tracing::debug!(from = ?expected, generation = state.generation, "Phase reverted to play");
        true
    }

    /// Like [`Self::revert_if`], but also requires that nothing has written
    /// the phase since `generation` was observed.
    pub fn revert_if_unchanged(&self, expected: GamePhase, generation: u64) -> bool {
        let mut state = self.lock();
        if state.phase != expected || state.generation != generation {
            return false;
        }
        state.phase = GamePhase::InPlay;
        state.generation += 1;
        tracing::debug!(from = ?expected, generation = state.generation, "Phase reverted to play");
        true
    }
}
