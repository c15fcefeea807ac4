pub mod calibration;
pub mod collision;
pub mod config;
pub mod phase;
pub mod physics;
pub mod table;
pub mod tracker;
pub mod world;

pub use calibration::{
    CalibrationError, FixedRangeFinder, RangeFinder, SensorCalibration, calibrate_table,
};
pub use config::{ConfigError, EngineConfig};
pub use phase::{GamePhase, PhaseCoordinator};
pub use physics::{GoalEvent, TickOutcome};
pub use table::{Table, Vec2};
pub use tracker::{PaddleTracker, TrackingReport};
pub use world::{Paddle, Player, Puck, Score, WorldState};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::config::EngineConfig;
    use crate::table::{Table, Vec2};
    use crate::world::{Puck, WorldState};

    /// A 1000x600 table. Goal band is y in [225, 375].
    pub fn standard_table() -> Table {
        Table::new(1000.0, 600.0).expect("1000x600 is a valid table")
    }

    /// World on [`standard_table`] with the puck placed and moving as given.
    /// Paddles sit at their default spots, (250, 300) and (750, 300).
    pub fn world_with_puck(position: Vec2, velocity: Vec2) -> WorldState {
        let mut world = WorldState::new(standard_table());
        world.puck = Puck { position, velocity };
        world
    }

    /// Default config with friction turned off, for exact kinematics.
    pub fn frictionless_config() -> EngineConfig {
        EngineConfig {
            puck_friction: 0.0,
            ..EngineConfig::default()
        }
    }
}
