use crate::config::EngineConfig;
use crate::table::{Table, Vec2};
use crate::world::{Paddle, Player, Puck, WorldState};

/// What the resolver touched during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contacts {
    pub wall: bool,
    pub paddle: Option<Player>,
}

/// Bounce the puck off any wall it has reached.
///
/// While the puck is level with the goal mouths the short walls are open.
/// The long walls are out of reach there on any table that passes
/// [`EngineConfig::check_table`]. Returns whether a wall was hit.
pub fn resolve_walls(puck: &mut Puck, table: &Table, config: &EngineConfig) -> bool {
    if table.in_goal_band(puck.position.y, config.goal_width) {
        return false;
    }

    let reach = config.puck_radius + config.wall_padding;
    let mut hit = false;

    // Short walls (left and right)
    if puck.position.x <= reach || puck.position.x >= table.width() - reach {
        puck.velocity.x *= -config.wall_elasticity;
        // One unit further in than the trigger line so the next tick does
        // not register the same contact again.
        puck.position.x = if puck.position.x <= reach {
            reach + 1.0
        } else {
            table.width() - reach - 1.0
        };
        hit = true;
    }

    // Long walls (top and bottom)
    if puck.position.y <= reach || puck.position.y >= table.height() - reach {
        puck.velocity.y *= -config.wall_elasticity;
        puck.position.y = if puck.position.y <= reach {
            reach + 1.0
        } else {
            table.height() - reach - 1.0
        };
        hit = true;
    }

    hit
}

/// Whether puck and paddle discs touch or overlap.
pub fn overlaps(puck: &Puck, paddle: &Paddle, config: &EngineConfig) -> bool {
    puck.position.distance(paddle.position) <= config.puck_radius + config.paddle_radius
}

/// Bounce the puck off a paddle if they touch. Returns whether they did.
///
/// The relative velocity between paddle and puck is mirrored about the
/// contact normal and the paddle's own velocity is added back, so a moving
/// paddle drives the puck instead of acting like a post.
pub fn resolve_paddle(puck: &mut Puck, paddle: &Paddle, config: &EngineConfig) -> bool {
    if !overlaps(puck, paddle, config) {
        return false;
    }

    let normal = (puck.position - paddle.position).angle();
    let relative = paddle.velocity - puck.velocity;
    let heading = relative.angle();
    let magnitude = relative.length();
    let bounce = normal + (normal - heading);
    puck.velocity = Vec2::from_angle(bounce) * magnitude + paddle.velocity;

    separate(puck, paddle, normal, config);
    true
}

/// Push the puck out along the contact normal in unit steps until it clears
/// the paddle. The step count is capped so a degenerate contact cannot spin.
fn separate(puck: &mut Puck, paddle: &Paddle, normal: f64, config: &EngineConfig) {
    let step = Vec2::from_angle(normal);
    let max_steps = (config.puck_radius + config.paddle_radius).ceil() as usize + 2;
    let mut steps = 0;
    while overlaps(puck, paddle, config) && steps < max_steps {
        puck.position += step;
        steps += 1;
    }
    if steps == max_steps && overlaps(puck, paddle, config) {
        tracing::warn!(steps, "Puck still overlaps paddle after separation cap");
    }
}

/// Which player, if any, just put the puck into the opposing goal.
///
/// Reaching the left goal line scores for player two, the right one for
/// player one. Only possible inside the goal band.
pub fn detect_goal(puck: &Puck, table: &Table, config: &EngineConfig) -> Option<Player> {
    if !table.in_goal_band(puck.position.y, config.goal_width) {
        return None;
    }
    let reach = config.puck_radius + config.wall_padding;
    if puck.position.x <= reach {
        Some(Player::Two)
    } else if puck.position.x >= table.width() - reach {
        Some(Player::One)
    } else {
        None
    }
}

/// Walls first, then at most one paddle. Paddle one is checked first and
/// wins the tick if both are touching.
pub fn resolve_collisions(world: &mut WorldState, config: &EngineConfig) -> Contacts {
    let wall = resolve_walls(&mut world.puck, &world.table, config);
    let paddle = Player::ALL
        .into_iter()
        .find(|&player| resolve_paddle(&mut world.puck, &world.paddles[player.index()], config));
    Contacts { wall, paddle }
}
