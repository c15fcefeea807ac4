//! The physics, sensing and render loops.
//!
//! Each loop runs as its own tokio task on its own interval and stops when
//! the shared cancellation token fires. None waits on another: they only
//! meet at the world lock, which each takes once per iteration and never
//! holds across an await.

use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use airhockey_core::phase::GamePhase;
use airhockey_core::physics;
use airhockey_core::tracker::PaddleTracker;

use crate::config::{LoopConfig, OutputConfig};
use crate::render::{Renderer, Screen};
use crate::sensor::{Camera, Detector};
use crate::state::SharedWorld;

/// Counts iterations and reports the average rate every `every`.
#[derive(Debug)]
pub struct FrameCounter {
    name: &'static str,
    every: Duration,
    frames: u64,
    since: Instant,
}

impl FrameCounter {
    pub fn new(name: &'static str, every: Duration, now: Instant) -> Self {
        Self {
            name,
            every,
            frames: 0,
            since: now,
        }
    }

    /// Count one frame. Returns the average rate once per reporting period.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.duration_since(self.since);
        if elapsed < self.every {
            return None;
        }
        let rate = self.frames as f64 / elapsed.as_secs_f64();
        tracing::info!(loop_name = self.name, fps = rate.round(), "Framerate");
        self.frames = 0;
        self.since = now;
        Some(rate)
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Handles to the running loops.
pub struct GameLoops {
    shared: SharedWorld,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl GameLoops {
    pub fn shared(&self) -> &SharedWorld {
        &self.shared
    }

    /// Cancel every loop and wait for all of them to finish.
    pub async fn shutdown(self) {
        self.shared.stop();
        self.join().await;
    }

    /// Wait for every loop to exit. Loops only exit on cancellation or on a
    /// fatal detector failure.
    pub async fn join(self) {
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(loop_name = name, error = %e, "Loop task failed");
            }
        }
        tracing::info!("All loops stopped");
    }
}

/// Spawn the three loops on the current runtime.
pub fn spawn_loops(
    shared: SharedWorld,
    tracker: PaddleTracker,
    detector: Box<dyn Detector>,
    renderer: Box<dyn Renderer>,
    loops: LoopConfig,
    output: OutputConfig,
) -> GameLoops {
    tracing::info!(
        physics_hz = loops.graphics_framerate * f64::from(loops.physics_frame_ratio),
        render_hz = loops.graphics_framerate,
        sensor_hz = loops.sensor_framerate,
        "Starting game loops"
    );
    let handles = vec![
        (
            "physics",
            tokio::spawn(physics_loop(shared.clone(), loops.clone())),
        ),
        (
            "sensing",
            tokio::spawn(sensing_loop(
                shared.clone(),
                tracker,
                detector,
                loops.clone(),
            )),
        ),
        (
            "render",
            tokio::spawn(render_loop(shared.clone(), renderer, loops, output)),
        ),
    ];
    GameLoops { shared, handles }
}

async fn physics_loop(shared: SharedWorld, loops: LoopConfig) {
    let mut interval = ticker(loops.physics_period());
    let mut last = Instant::now();
    let mut counter = FrameCounter::new("physics", loops.report_interval(), last);

    loop {
        tokio::select! {
            _ = shared.running.cancelled() => break,
            _ = interval.tick() => {},
        }
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;
        counter.tick(now);

        let outcome = {
            let mut world = shared.world.write().await;
            physics::step(&mut world, &shared.phases, dt, &shared.engine)
        };
        if let Some(goal) = outcome.goal {
            tracing::debug!(scorer = %goal.scorer, phase = ?goal.phase, "Physics paused for celebration");
        }
    }
    tracing::debug!("Physics loop stopped");
}

async fn sensing_loop(
    shared: SharedWorld,
    tracker: PaddleTracker,
    detector: Box<dyn Detector>,
    loops: LoopConfig,
) {
    let camera = match Camera::spawn(detector) {
        Ok(camera) => camera,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start camera thread, sensing disabled");
            return;
        },
    };
    let mut interval = ticker(loops.sensor_period());
    let mut last = Instant::now();
    let mut counter = FrameCounter::new("sensor", loops.report_interval(), last);

    loop {
        tokio::select! {
            _ = shared.running.cancelled() => break,
            _ = interval.tick() => {},
        }

        let points = tokio::select! {
            _ = shared.running.cancelled() => break,
            frame = camera.capture() => match frame {
                Some(points) => points,
                None => {
                    tracing::error!("Detector failed, stopping sensing loop");
                    break;
                },
            },
        };

        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;
        counter.tick(now);

        let report = {
            let mut world = shared.world.write().await;
            tracker.update(&mut world.paddles, &points, dt)
        };
        tracing::trace!(points = points.len(), matched = ?report.matched, "Sensor frame");
    }
    tracing::debug!("Sensing loop stopped");
}

async fn render_loop(
    shared: SharedWorld,
    mut renderer: Box<dyn Renderer>,
    loops: LoopConfig,
    output: OutputConfig,
) {
    let mut interval = ticker(loops.render_period());
    let mut counter = FrameCounter::new("graphics", loops.report_interval(), Instant::now());
    let mut reverts = JoinSet::new();
    // Celebration (phase, generation) that already has a revert pending.
    let mut scheduled: Option<(GamePhase, u64)> = None;

    loop {
        tokio::select! {
            _ = shared.running.cancelled() => break,
            _ = interval.tick() => {},
        }
        counter.tick(Instant::now());

        let (screen, phase, generation) = {
            let world = shared.world.read().await;
            let (phase, generation) = shared.phases.snapshot();
            let screen = Screen::for_phase(phase, &world, &shared.engine, &output);
            (screen, phase, generation)
        };
        renderer.draw(&screen);
        renderer.present();

        if let Some(hold) = phase.hold_duration(&shared.engine)
            && scheduled != Some((phase, generation))
        {
            scheduled = Some((phase, generation));
            reverts.spawn(revert_after(shared.clone(), phase, generation, hold));
        }
        // Reap finished timers.
        while reverts.try_join_next().is_some() {}
    }

    reverts.shutdown().await;
    tracing::debug!("Render loop stopped");
}

/// Return to play after a celebration screen has been up for `hold`,
/// unless the phase has moved on in the meantime.
async fn revert_after(shared: SharedWorld, phase: GamePhase, generation: u64, hold: Duration) {
    tokio::select! {
        _ = shared.running.cancelled() => {},
        _ = tokio::time::sleep(hold) => {
            if shared.phases.revert_if_unchanged(phase, generation) {
                tracing::info!(from = ?phase, "Celebration over, back in play");
            } else {
                tracing::debug!(expected = ?phase, "Phase moved on before celebration ended");
            }
        },
    }
}
