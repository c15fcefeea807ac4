use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::table::Table;

/// (width of projected image) / (distance from projector).
pub const PROJECTOR_SPREAD_HORIZ: f64 = 1.0;
/// (height of projected image) / (distance from projector).
pub const PROJECTOR_SPREAD_VERT: f64 = 2.0 / 3.0;
/// Puck radius in table units.
pub const PUCK_RADIUS: f64 = 25.0;
/// Paddle radius in table units.
pub const PADDLE_RADIUS: f64 = 35.0;
/// Accounts for the padding drawn along the edges of the table background.
pub const WALL_PADDING_THICKNESS: f64 = 18.0;
/// Vertical width of each goal mouth in table units.
pub const GOAL_WIDTH: f64 = 150.0;
/// Puck speeds above this are treated as a simulation fault.
pub const PUCK_MAX_VELOCITY: f64 = 10_000.0;
/// Fraction of speed kept on a wall bounce.
pub const WALL_ELASTICITY: f64 = 0.8;
/// Deceleration in table units per second squared.
pub const PUCK_FRICTION: f64 = 50.0;
pub const WINNING_SCORE: u32 = 10;
pub const GOAL_CELEBRATION_MS: u64 = 3000;
pub const WIN_CELEBRATION_MS: u64 = 5000;

/// Tunable gameplay parameters shared by physics, tracking and phases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub projector_spread_horizontal: f64,
    pub projector_spread_vertical: f64,
    pub puck_radius: f64,
    pub paddle_radius: f64,
    pub wall_padding: f64,
    pub goal_width: f64,
    pub puck_max_velocity: f64,
    pub wall_elasticity: f64,
    pub puck_friction: f64,
    pub winning_score: u32,
    pub goal_celebration_ms: u64,
    pub win_celebration_ms: u64,
    /// Exponential smoothing applied to tracked paddle velocity.
    /// 0.0 keeps the raw finite difference.
    pub velocity_smoothing: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            projector_spread_horizontal: PROJECTOR_SPREAD_HORIZ,
            projector_spread_vertical: PROJECTOR_SPREAD_VERT,
            puck_radius: PUCK_RADIUS,
            paddle_radius: PADDLE_RADIUS,
            wall_padding: WALL_PADDING_THICKNESS,
            goal_width: GOAL_WIDTH,
            puck_max_velocity: PUCK_MAX_VELOCITY,
            wall_elasticity: WALL_ELASTICITY,
            puck_friction: PUCK_FRICTION,
            winning_score: WINNING_SCORE,
            goal_celebration_ms: GOAL_CELEBRATION_MS,
            win_celebration_ms: WIN_CELEBRATION_MS,
            velocity_smoothing: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.reason)
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    pub fn goal_celebration(&self) -> Duration {
        Duration::from_millis(self.goal_celebration_ms)
    }

    pub fn win_celebration(&self) -> Duration {
        Duration::from_millis(self.win_celebration_ms)
    }

    /// Check every field against the range the engine can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("projector_spread_horizontal", self.projector_spread_horizontal),
            ("projector_spread_vertical", self.projector_spread_vertical),
            ("puck_radius", self.puck_radius),
            ("paddle_radius", self.paddle_radius),
            ("goal_width", self.goal_width),
            ("puck_max_velocity", self.puck_max_velocity),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError {
                    field,
                    reason: "must be > 0",
                });
            }
        }
        if !(self.wall_padding.is_finite() && self.wall_padding >= 0.0) {
            return Err(ConfigError {
                field: "wall_padding",
                reason: "must be >= 0",
            });
        }
        if !(self.puck_friction.is_finite() && self.puck_friction >= 0.0) {
            return Err(ConfigError {
                field: "puck_friction",
                reason: "must be >= 0",
            });
        }
        if !(self.wall_elasticity > 0.0 && self.wall_elasticity < 1.0) {
            return Err(ConfigError {
                field: "wall_elasticity",
                reason: "must be in (0, 1)",
            });
        }
        if !(self.velocity_smoothing >= 0.0 && self.velocity_smoothing < 1.0) {
            return Err(ConfigError {
                field: "velocity_smoothing",
                reason: "must be in [0, 1)",
            });
        }
        if self.winning_score == 0 {
            return Err(ConfigError {
                field: "winning_score",
                reason: "must be > 0",
            });
        }
        Ok(())
    }

    /// Check the goal mouths fit the calibrated table: a puck level with
    /// the mouths must not be able to reach a long wall.
    pub fn check_table(&self, table: &Table) -> Result<(), ConfigError> {
        let reach = self.puck_radius + self.wall_padding;
        if self.goal_width + 2.0 * reach >= table.height() {
            return Err(ConfigError {
                field: "goal_width",
                reason: "leaves no long wall beside the goal mouths on this table",
            });
        }
        Ok(())
    }
}
