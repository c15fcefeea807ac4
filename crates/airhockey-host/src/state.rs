use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use airhockey_core::config::EngineConfig;
use airhockey_core::phase::PhaseCoordinator;
use airhockey_core::world::WorldState;

pub type SharedWorldState = Arc<RwLock<WorldState>>;

/// Handle to everything the loops share. Cheap to clone.
///
/// The puck and score are written only by the physics loop, the paddles
/// only by the sensing loop; the render loop only reads.
#[derive(Clone)]
pub struct SharedWorld {
    pub world: SharedWorldState,
    pub phases: Arc<PhaseCoordinator>,
    pub engine: Arc<EngineConfig>,
    /// Cancelled when the game should stop.
    pub running: CancellationToken,
}

impl SharedWorld {
    pub fn new(world: WorldState, engine: EngineConfig) -> Self {
        Self {
            world: Arc::new(RwLock::new(world)),
            phases: Arc::new(PhaseCoordinator::new()),
            engine: Arc::new(engine),
            running: CancellationToken::new(),
        }
    }

    pub fn stop(&self) {
        self.running.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.running.is_cancelled()
    }
}
