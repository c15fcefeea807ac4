//! Marker detectors that feed the paddle tracker.

use std::collections::VecDeque;
use std::sync::mpsc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::oneshot;

use airhockey_core::table::Vec2;
use airhockey_core::world::Player;

use crate::config::DetectorConfig;

/// A camera plus blob detector.
///
/// `detect` may block on the camera, so it only ever runs on the
/// detector's own [`Camera`] thread.
pub trait Detector: Send + 'static {
    /// Full-resolution frame size in pixels.
    fn frame_size(&self) -> (f64, f64);

    /// Factor the frame is shrunk by before detection.
    fn downsample_ratio(&self) -> f64 {
        1.0
    }

    /// Grab one frame and return marker centers in downsampled pixels.
    fn detect(&mut self) -> Vec<Vec2>;
}

/// A detector running on its own detached thread.
///
/// Each [`capture`](Camera::capture) asks the thread for one frame. The
/// thread is never joined, so a read that never returns holds up neither
/// the sensing loop's shutdown nor runtime teardown. It exits once the
/// `Camera` is dropped and its current read finishes.
pub struct Camera {
    requests: mpsc::Sender<oneshot::Sender<Vec<Vec2>>>,
}

impl Camera {
    pub fn spawn(mut detector: Box<dyn Detector>) -> std::io::Result<Self> {
        let (requests, incoming) = mpsc::channel::<oneshot::Sender<Vec<Vec2>>>();
        std::thread::Builder::new()
            .name("camera".into())
            .spawn(move || {
                while let Ok(reply) = incoming.recv() {
                    // Receiver gone means the sensing loop stopped waiting.
                    let _ = reply.send(detector.detect());
                }
                tracing::debug!("Camera thread stopped");
            })?;
        Ok(Self { requests })
    }

    /// One frame of marker centers, or `None` if the camera thread is gone
    /// (the detector panicked).
    pub async fn capture(&self) -> Option<Vec<Vec2>> {
        let (reply, frame) = oneshot::channel();
        self.requests.send(reply).ok()?;
        frame.await.ok()
    }
}

/// Stand-in for a camera: two markers sweeping figure-of-eight paths, one
/// in each half of the frame, with position noise and the occasional
/// missed detection.
pub struct SimulatedDetector {
    frame_width: f64,
    frame_height: f64,
    downsample: f64,
    jitter: f64,
    dropout: f64,
    rng: StdRng,
    elapsed: f64,
    frame_time: f64,
}

impl SimulatedDetector {
    pub fn new(config: &DetectorConfig, frame_rate: f64) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            frame_width: config.frame_width,
            frame_height: config.frame_height,
            downsample: config.downsample_ratio.max(1.0),
            jitter: config.jitter.max(0.0),
            dropout: config.dropout.clamp(0.0, 1.0),
            rng,
            elapsed: 0.0,
            frame_time: 1.0 / frame_rate,
        }
    }

    /// Noise-free full-frame position of `player`'s marker at `t` seconds.
    pub fn marker_path(&self, player: Player, t: f64) -> Vec2 {
        let (cx, phase) = match player {
            Player::One => (self.frame_width / 4.0, 0.0),
            Player::Two => (self.frame_width * 3.0 / 4.0, std::f64::consts::PI),
        };
        Vec2::new(
            cx + self.frame_width / 6.0 * (0.9 * t + phase).sin(),
            self.frame_height / 2.0 + self.frame_height / 3.0 * (1.7 * t + phase).sin(),
        )
    }
}

impl Detector for SimulatedDetector {
    fn frame_size(&self) -> (f64, f64) {
        (self.frame_width, self.frame_height)
    }

    fn downsample_ratio(&self) -> f64 {
        self.downsample
    }

    fn detect(&mut self) -> Vec<Vec2> {
        self.elapsed += self.frame_time;
        let mut points = Vec::with_capacity(2);
        for player in Player::ALL {
            if self.rng.random_bool(self.dropout) {
                continue;
            }
            let mut p = self.marker_path(player, self.elapsed) / self.downsample;
            if self.jitter > 0.0 {
                p.x += self.rng.random_range(-self.jitter..=self.jitter);
                p.y += self.rng.random_range(-self.jitter..=self.jitter);
            }
            points.push(p);
        }
        points
    }
}

/// Replays a fixed list of frames, then keeps returning the last one.
#[derive(Debug, Clone)]
pub struct ScriptedDetector {
    frame_size: (f64, f64),
    downsample: f64,
    frames: VecDeque<Vec<Vec2>>,
    last: Vec<Vec2>,
}

impl ScriptedDetector {
    pub fn new(frame_size: (f64, f64), frames: Vec<Vec<Vec2>>) -> Self {
        Self {
            frame_size,
            downsample: 1.0,
            frames: frames.into(),
            last: Vec::new(),
        }
    }

    pub fn with_downsample(mut self, ratio: f64) -> Self {
        self.downsample = ratio;
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl Detector for ScriptedDetector {
    fn frame_size(&self) -> (f64, f64) {
        self.frame_size
    }

    fn downsample_ratio(&self) -> f64 {
        self.downsample
    }

    fn detect(&mut self) -> Vec<Vec2> {
        if let Some(frame) = self.frames.pop_front() {
            self.last = frame;
        }
        self.last.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> DetectorConfig {
        DetectorConfig {
            jitter: 0.0,
            dropout: 0.0,
            seed: Some(7),
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn simulated_markers_stay_on_their_half() {
        let cfg = DetectorConfig {
            seed: Some(1),
            ..DetectorConfig::default()
        };
        let mut det = SimulatedDetector::new(&cfg, 60.0);
        let mid = cfg.frame_width / 2.0 / det.downsample_ratio();
        for _ in 0..600 {
            for p in det.detect() {
                assert!((p.x - mid).abs() > 20.0, "marker near the center line");
                assert!(p.y >= -cfg.jitter && p.y <= cfg.frame_height / 2.0 + cfg.jitter);
            }
        }
    }

    #[test]
    fn simulated_output_is_downsampled() {
        let cfg = quiet_config();
        let mut det = SimulatedDetector::new(&cfg, 60.0);
        let points = det.detect();
        assert_eq!(points.len(), 2);
        let expected = det.marker_path(Player::One, 1.0 / 60.0) / 2.0;
        assert!((points[0].x - expected.x).abs() < 1e-9);
        assert!((points[0].y - expected.y).abs() < 1e-9);
        assert!(points[0].x < cfg.frame_width / 4.0);
        assert!(points[1].x > cfg.frame_width / 4.0);
    }

    #[test]
    fn seeded_detectors_agree() {
        let cfg = DetectorConfig {
            seed: Some(99),
            ..DetectorConfig::default()
        };
        let mut a = SimulatedDetector::new(&cfg, 30.0);
        let mut b = SimulatedDetector::new(&cfg, 30.0);
        for _ in 0..20 {
            assert_eq!(a.detect(), b.detect());
        }
    }

    #[test]
    fn full_dropout_sees_nothing() {
        let cfg = DetectorConfig {
            dropout: 1.0,
            ..quiet_config()
        };
        let mut det = SimulatedDetector::new(&cfg, 60.0);
        assert!(det.detect().is_empty());
    }

    #[test]
    fn scripted_replays_then_holds_last() {
        let mut det = ScriptedDetector::new(
            (640.0, 480.0),
            vec![vec![Vec2::new(1.0, 2.0)], vec![Vec2::new(3.0, 4.0)]],
        );
        assert_eq!(det.detect(), vec![Vec2::new(1.0, 2.0)]);
        assert_eq!(det.remaining(), 1);
        assert_eq!(det.detect(), vec![Vec2::new(3.0, 4.0)]);
        assert_eq!(det.detect(), vec![Vec2::new(3.0, 4.0)]);
    }

    #[tokio::test]
    async fn camera_captures_on_its_own_thread() {
        let det = ScriptedDetector::new(
            (640.0, 480.0),
            vec![vec![Vec2::new(1.0, 2.0)], vec![Vec2::new(3.0, 4.0)]],
        );
        let camera = Camera::spawn(Box::new(det)).unwrap();
        assert_eq!(camera.capture().await, Some(vec![Vec2::new(1.0, 2.0)]));
        assert_eq!(camera.capture().await, Some(vec![Vec2::new(3.0, 4.0)]));
    }

    struct BrokenCamera;

    impl Detector for BrokenCamera {
        fn frame_size(&self) -> (f64, f64) {
            (640.0, 480.0)
        }

        fn detect(&mut self) -> Vec<Vec2> {
            panic!("camera unplugged");
        }
    }

    #[tokio::test]
    async fn panicking_detector_ends_capture() {
        let camera = Camera::spawn(Box::new(BrokenCamera)).unwrap();
        assert_eq!(camera.capture().await, None);
        assert_eq!(camera.capture().await, None);
    }
}
