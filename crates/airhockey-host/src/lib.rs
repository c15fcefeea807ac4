pub mod assets;
pub mod config;
pub mod error;
pub mod render;
pub mod scheduler;
pub mod sensor;
pub mod state;

use airhockey_core::calibration::{
    FixedRangeFinder, RangeFinder, SensorCalibration, calibrate_table,
};
use airhockey_core::tracker::PaddleTracker;
use airhockey_core::world::WorldState;

use assets::AssetSet;
use config::HostConfig;
use error::StartupError;
use render::{Renderer, TraceRenderer};
use scheduler::GameLoops;
use sensor::{Detector, SimulatedDetector};
use state::SharedWorld;

/// A calibrated game, ready for its loops to be started.
pub struct Game {
    shared: SharedWorld,
    tracker: PaddleTracker,
    detector: Box<dyn Detector>,
    config: HostConfig,
}

impl Game {
    /// Validate config, size the table and calibrate the sensor.
    pub fn new(
        config: HostConfig,
        range_finder: &mut dyn RangeFinder,
        detector: Box<dyn Detector>,
    ) -> Result<Self, StartupError> {
        config.validate()?;
        let table = calibrate_table(
            range_finder,
            config.engine.projector_spread_horizontal,
            config.engine.projector_spread_vertical,
        )?;
        config.engine.check_table(&table)?;
        let (frame_width, frame_height) = detector.frame_size();
        let sensor = SensorCalibration::new(
            &table,
            frame_width,
            frame_height,
            detector.downsample_ratio(),
        )?;
        tracing::info!(
            frame_width,
            frame_height,
            downsample = sensor.downsample_ratio,
            "Sensor calibrated"
        );

        let tracker = PaddleTracker::new(sensor, config.engine.velocity_smoothing);
        let shared = SharedWorld::new(WorldState::new(table), config.engine.clone());
        Ok(Self {
            shared,
            tracker,
            detector,
            config,
        })
    }

    pub fn shared(&self) -> SharedWorld {
        self.shared.clone()
    }

    /// Show the startup splash for its configured time. Returns early if
    /// the game is stopped meanwhile.
    pub async fn show_splash(&self, renderer: &mut dyn Renderer) {
        renderer.draw_startup_splash();
        renderer.present();
        tokio::select! {
            _ = self.shared.running.cancelled() => {},
            _ = tokio::time::sleep(self.config.loops.startup_splash()) => {},
        }
    }

    /// Start the physics, sensing and render loops.
    pub fn start(self, renderer: Box<dyn Renderer>) -> GameLoops {
        scheduler::spawn_loops(
            self.shared,
            self.tracker,
            self.detector,
            renderer,
            self.config.loops,
            self.config.output,
        )
    }
}

/// Run the game with the simulated detector and tracing display until
/// Ctrl-C.
pub async fn run(config: HostConfig) -> Result<(), StartupError> {
    let detector = Box::new(SimulatedDetector::new(
        &config.detector,
        config.loops.sensor_framerate,
    ));
    let mut range_finder = FixedRangeFinder::new(config.calibration.projector_distance);
    let assets_dir = config.assets.dir.clone();
    let skip_asset_check = config.assets.skip_check;

    let game = Game::new(config, &mut range_finder, detector)?;
    let assets = if skip_asset_check {
        tracing::warn!("Asset check skipped");
        AssetSet::unchecked(&assets_dir)
    } else {
        AssetSet::load(&assets_dir)?
    };

    let shared = game.shared();
    let mut renderer: Box<dyn Renderer> = Box::new(TraceRenderer::new(assets));
    game.show_splash(&mut *renderer).await;
    let loops = game.start(renderer);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C, stopping");
            } else {
                tracing::info!("Ctrl-C received, stopping");
            }
            shared.stop();
        },
        _ = shared.running.cancelled() => {},
    }
    loops.join().await;
    Ok(())
}
