use crate::collision::{Contacts, detect_goal, resolve_collisions};
use crate::config::EngineConfig;
use crate::phase::{GamePhase, PhaseCoordinator};
use crate::table::Vec2;
use crate::world::{Player, Puck, WorldState};

/// A goal scored during a tick and what it led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalEvent {
    pub scorer: Player,
    /// The scorer's total including this goal (before any win reset).
    pub scorer_total: u32,
    pub phase: GamePhase,
}

/// Corrections applied to keep the puck state physical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    NonFiniteVelocity,
    NonFinitePosition,
    Overspeed,
}

/// Result of one physics tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickOutcome {
    /// False when the phase held the simulation (celebrations, setup).
    pub simulated: bool,
    pub contacts: Contacts,
    pub anomaly: Option<Anomaly>,
    pub goal: Option<GoalEvent>,
}

/// Friction as a constant deceleration against the direction of travel.
///
/// The speed drops by `friction * dt` and never below zero, and any axis
/// smaller than one step of friction is snapped to zero so the puck cannot
/// judder back and forth on that axis at low speed.
pub fn apply_friction(velocity: Vec2, friction: f64, dt: f64) -> Vec2 {
    let decel = friction * dt;
    let magnitude = (velocity.length() - decel).max(0.0);
    let mut v = Vec2::from_angle(velocity.angle()) * magnitude;
    if v.x.abs() < decel {
        v.x = 0.0;
    }
    if v.y.abs() < decel {
        v.y = 0.0;
    }
    v
}

/// Move the puck by `velocity * dt`, then slow it by friction.
pub fn advance(puck: &mut Puck, dt: f64, friction: f64) {
    puck.position += puck.velocity * dt;
    puck.velocity = apply_friction(puck.velocity, friction, dt);
}

/// Clamp or reset a puck state that has left the physical envelope.
pub fn sanitize(world: &mut WorldState, config: &EngineConfig) -> Option<Anomaly> {
    let puck = &mut world.puck;
    if !puck.position.is_finite() {
        tracing::warn!(
            x = puck.position.x,
            y = puck.position.y,
            "Non-finite puck position, resetting to center"
        );
        puck.reset(world.table.center());
        return Some(Anomaly::NonFinitePosition);
    }
    if !puck.velocity.is_finite() {
        tracing::warn!(
            vx = puck.velocity.x,
            vy = puck.velocity.y,
            "Non-finite puck velocity, stopping puck"
        );
        puck.velocity = Vec2::ZERO;
        return Some(Anomaly::NonFiniteVelocity);
    }
    let speed = puck.speed();
    if speed > config.puck_max_velocity {
        tracing::warn!(
            speed,
            limit = config.puck_max_velocity,
            "Unrealistic puck speed, clamping"
        );
        puck.velocity = puck.velocity * (config.puck_max_velocity / speed);
        return Some(Anomaly::Overspeed);
    }
    None
}

/// Apply a goal: bump the score, move the phase on, and re-serve the puck.
///
/// A winning goal clears both scores and serves from the center; any other
/// goal serves from the half of the player who was scored on.
pub fn score_goal(
    world: &mut WorldState,
    phases: &PhaseCoordinator,
    scorer: Player,
    config: &EngineConfig,
) -> GoalEvent {
    let (phase, scorer_total) =
        phases.record_goal(&mut world.score, scorer, config.winning_score);

    if phase.is_win() {
        world.score.reset();
        world.puck.reset(world.table.center());
    } else {
        let serve = match scorer {
            Player::One => world.table.center_right(),
            Player::Two => world.table.center_left(),
        };
        world.puck.reset(serve);
    }

    tracing::info!(
        %scorer,
        scorer_total,
        phase = ?phase,
        "Goal scored"
    );

    GoalEvent {
        scorer,
        scorer_total,
        phase,
    }
}

/// One physics tick of `dt` seconds.
///
/// Runs only while the game is in play; during celebrations the puck sits
/// where the goal left it until the phase returns to `InPlay`.
pub fn step(
    world: &mut WorldState,
    phases: &PhaseCoordinator,
    dt: f64,
    config: &EngineConfig,
) -> TickOutcome {
    if phases.current() != GamePhase::InPlay || !(dt.is_finite() && dt >= 0.0) {
        return TickOutcome::default();
    }

    advance(&mut world.puck, dt, config.puck_friction);
    let contacts = resolve_collisions(world, config);
    let anomaly = sanitize(world, config);
    let goal = detect_goal(&world.puck, &world.table, config)
        .map(|scorer| score_goal(world, phases, scorer, config));

    TickOutcome {
        simulated: true,
        contacts,
        anomaly,
        goal,
    }
}
