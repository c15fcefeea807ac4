use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use airhockey_core::calibration::{CalibrationError, FixedRangeFinder};
use airhockey_core::config::ConfigError;
use airhockey_core::phase::GamePhase;
use airhockey_core::table::Vec2;
use airhockey_core::world::{Player, Puck};
use airhockey_host::Game;
use airhockey_host::config::HostConfig;
use airhockey_host::error::StartupError;
use airhockey_host::render::{RecordingRenderer, Screen};
use airhockey_host::scheduler::GameLoops;
use airhockey_host::sensor::{Detector, ScriptedDetector};

/// 640x480 camera, markers parked left and right of center.
fn parked_markers() -> Box<dyn Detector> {
    Box::new(ScriptedDetector::new(
        (640.0, 480.0),
        vec![vec![Vec2::new(100.0, 240.0), Vec2::new(540.0, 240.0)]],
    ))
}

fn fast_config() -> HostConfig {
    let mut config = HostConfig::default();
    config.engine.goal_celebration_ms = 100;
    config.engine.win_celebration_ms = 150;
    config.loops.graphics_framerate = 100.0;
    config.loops.physics_frame_ratio = 10;
    config.loops.sensor_framerate = 100.0;
    config.loops.startup_splash_ms = 10;
    config
}

type Presented = Arc<Mutex<Vec<Screen>>>;

fn start(config: HostConfig, detector: Box<dyn Detector>) -> (GameLoops, Presented) {
    let mut range_finder = FixedRangeFinder::new(Some(1000.0));
    let game = Game::new(config, &mut range_finder, detector).unwrap();
    let renderer = RecordingRenderer::new();
    let presented = renderer.presented();
    (game.start(Box::new(renderer)), presented)
}

async fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn loops_track_render_and_stop() {
    let (loops, presented) = start(fast_config(), parked_markers());
    let shared = loops.shared().clone();

    tokio::time::sleep(Duration::from_millis(200)).await;
    loops.shutdown().await;
    assert!(!shared.is_running());

    let world = shared.world.read().await;
    // 1000 x 666.7 table over a 640 x 480 frame.
    let one = world.paddles[0].position;
    let two = world.paddles[1].position;
    assert!((one.x - 156.25).abs() < 1e-6, "paddle one at {one:?}");
    assert!((two.x - 843.75).abs() < 1e-6, "paddle two at {two:?}");
    assert!((one.y - world.table.height() / 2.0).abs() < 1e-6);

    let screens = presented.lock().unwrap();
    assert!(!screens.is_empty());
    assert!(
        screens.iter().all(|s| matches!(s, Screen::Gameplay(_))),
        "only gameplay expected while in play"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn celebration_reverts_after_hold() {
    let (loops, presented) = start(fast_config(), parked_markers());
    let shared = loops.shared().clone();

    shared.phases.set(GamePhase::GoalOne);
    let started = Instant::now();
    assert!(
        wait_for(Duration::from_secs(2), || shared.phases.current() == GamePhase::InPlay).await,
        "goal screen never cleared"
    );
    assert!(started.elapsed() >= Duration::from_millis(90));

    loops.shutdown().await;
    let screens = presented.lock().unwrap();
    assert!(screens.contains(&Screen::Goal(Player::One)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn error_phase_is_not_reverted() {
    let (loops, presented) = start(fast_config(), parked_markers());
    let shared = loops.shared().clone();

    shared.phases.set(GamePhase::Error);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(shared.phases.current(), GamePhase::Error);

    loops.shutdown().await;
    assert!(presented.lock().unwrap().contains(&Screen::Error));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn goal_scores_pauses_and_resumes() {
    let (loops, presented) = start(fast_config(), parked_markers());
    let shared = loops.shared().clone();
    let (center_right, y) = {
        let mut world = shared.world.write().await;
        let y = world.table.height() / 2.0;
        world.puck = Puck {
            position: Vec2::new(950.0, y),
            velocity: Vec2::new(2000.0, 0.0),
        };
        (world.table.center_right(), y)
    };

    let scored = {
        let shared = shared.clone();
        wait_for(Duration::from_secs(2), move || {
            shared.world.try_read().is_ok_and(|w| w.score.player_one == 1)
        })
        .await
    };
    assert!(scored, "puck never reached the goal");

    assert!(
        wait_for(Duration::from_secs(2), || shared.phases.current() == GamePhase::InPlay).await
    );
    loops.shutdown().await;

    let world = shared.world.read().await;
    assert_eq!(world.score.player_one, 1);
    assert_eq!(world.puck.position, center_right);
    assert_eq!(world.puck.position.y, y);
    assert!(presented.lock().unwrap().contains(&Screen::Goal(Player::One)));
}

/// Detector whose camera read stalls.
struct StalledCamera;

impl Detector for StalledCamera {
    fn frame_size(&self) -> (f64, f64) {
        (640.0, 480.0)
    }

    fn detect(&mut self) -> Vec<Vec2> {
        std::thread::sleep(Duration::from_secs(30));
        Vec::new()
    }
}

#[test]
fn stalled_camera_does_not_stall_physics_or_shutdown() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let stopping = runtime.block_on(async {
        let mut config = fast_config();
        config.engine.puck_friction = 0.0;
        let (loops, _presented) = start(config, Box::new(StalledCamera));
        let shared = loops.shared().clone();
        let start_x = {
            let mut world = shared.world.write().await;
            world.puck.velocity = Vec2::new(100.0, 0.0);
            world.puck.position.x
        };

        tokio::time::sleep(Duration::from_millis(200)).await;
        let moved = shared.world.read().await.puck.position.x - start_x;
        assert!(moved > 5.0, "physics stalled, puck moved {moved}");

        let stopping = Instant::now();
        loops.shutdown().await;
        assert!(stopping.elapsed() < Duration::from_secs(1));
        stopping
    });
    // The camera read is still blocked; tearing the runtime down must not
    // wait for it.
    drop(runtime);
    assert!(stopping.elapsed() < Duration::from_secs(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn downsampled_camera_maps_to_table() {
    // Half-size frames: (50, 120) is (100, 240) full-frame.
    let detector = ScriptedDetector::new(
        (640.0, 480.0),
        vec![vec![Vec2::new(50.0, 120.0), Vec2::new(270.0, 120.0)]],
    )
    .with_downsample(2.0);
    let (loops, _presented) = start(fast_config(), Box::new(detector));
    let shared = loops.shared().clone();

    tokio::time::sleep(Duration::from_millis(200)).await;
    loops.shutdown().await;

    let world = shared.world.read().await;
    let one = world.paddles[0].position;
    let two = world.paddles[1].position;
    assert!((one.x - 156.25).abs() < 1e-6, "paddle one at {one:?}");
    assert!((two.x - 843.75).abs() < 1e-6, "paddle two at {two:?}");
    assert!((one.y - world.table.height() / 2.0).abs() < 1e-6);
}

#[test]
fn missing_range_reading_aborts_startup() {
    let mut range_finder = FixedRangeFinder::new(None);
    let err = Game::new(HostConfig::default(), &mut range_finder, parked_markers())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        StartupError::Calibration(CalibrationError::RangeFinderUnavailable(_))
    ));
}

#[test]
fn empty_camera_frame_aborts_startup() {
    let mut range_finder = FixedRangeFinder::new(Some(1000.0));
    let detector = Box::new(ScriptedDetector::new((0.0, 480.0), vec![]));
    let err = Game::new(HostConfig::default(), &mut range_finder, detector)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        StartupError::Calibration(CalibrationError::InvalidSensorFrame { .. })
    ));
}

#[test]
fn goal_wider_than_short_table_aborts_startup() {
    // 200 units away the table is 200 x 133, too short for a 150 goal.
    let mut range_finder = FixedRangeFinder::new(Some(200.0));
    let err = Game::new(HostConfig::default(), &mut range_finder, parked_markers())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        StartupError::Config(ConfigError { field: "goal_width", .. })
    ));
}

#[test]
fn invalid_config_aborts_startup() {
    let mut config = HostConfig::default();
    config.loops.physics_frame_ratio = 0;
    let mut range_finder = FixedRangeFinder::new(Some(1000.0));
    let err = Game::new(config, &mut range_finder, parked_markers())
        .err()
        .unwrap();
    assert!(matches!(err, StartupError::Config(_)));
}

#[tokio::test]
async fn splash_is_shown_first() {
    let mut range_finder = FixedRangeFinder::new(Some(1000.0));
    let game = Game::new(fast_config(), &mut range_finder, parked_markers()).unwrap();
    let mut renderer = RecordingRenderer::new();
    let presented = renderer.presented();
    game.show_splash(&mut renderer).await;
    assert_eq!(*presented.lock().unwrap(), vec![Screen::StartupSplash]);
}
