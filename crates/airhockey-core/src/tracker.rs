//! Assigns detected marker points to the two paddles.
//!
//! Each paddle only considers points on its own half of the camera frame and
//! follows the one closest to where it was last seen, so a single stray
//! detection cannot pull a paddle across the table.

use crate::calibration::SensorCalibration;
use crate::table::Vec2;
use crate::world::{Paddle, Player};

/// A detector point picked for a paddle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    /// Index into the candidate slice passed to the tracker.
    pub index: usize,
    /// The point in table space.
    pub position: Vec2,
}

/// Which paddles were matched to a detection this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingReport {
    pub matched: [bool; 2],
}

impl TrackingReport {
    pub fn matched(&self, player: Player) -> bool {
        self.matched[player.index()]
    }
}

#[derive(Debug, Clone)]
pub struct PaddleTracker {
    calibration: SensorCalibration,
    smoothing: f64,
}

impl PaddleTracker {
    /// `smoothing` blends the previous velocity into the new one; 0.0 uses
    /// the raw finite difference. Values outside `[0, 1)` are clamped.
    pub fn new(calibration: SensorCalibration, smoothing: f64) -> Self {
        let smoothing = if smoothing.is_finite() {
            smoothing.clamp(0.0, 0.99)
        } else {
            0.0
        };
        Self {
            calibration,
            smoothing,
        }
    }

    /// Full-frame sensor pixels for a point reported on the downsampled frame.
    pub fn to_sensor(&self, detected: Vec2) -> Vec2 {
        detected * self.calibration.downsample_ratio
    }

    /// Table coordinates for a full-frame sensor point.
    pub fn to_table(&self, sensor: Vec2) -> Vec2 {
        Vec2::new(
            sensor.x * self.calibration.width_ratio,
            sensor.y * self.calibration.height_ratio,
        )
    }

    /// Whether a full-frame sensor point lies on `player`'s half.
    /// The center line itself belongs to neither half.
    pub fn on_side(&self, player: Player, sensor: Vec2) -> bool {
        let mid = self.calibration.frame_width / 2.0;
        match player {
            Player::One => sensor.x < mid,
            Player::Two => sensor.x > mid,
        }
    }

    /// Nearest eligible candidate to `previous` (table space). Ties keep the
    /// earliest candidate.
    pub fn select_candidate(
        &self,
        player: Player,
        previous: Vec2,
        candidates: &[Vec2],
    ) -> Option<Selection> {
        let mut best: Option<(Selection, f64)> = None;
        for (index, &detected) in candidates.iter().enumerate() {
            let sensor = self.to_sensor(detected);
            if !sensor.is_finite() || !self.on_side(player, sensor) {
                continue;
            }
            let position = self.to_table(sensor);
            let distance = position.distance(previous);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((Selection { index, position }, distance));
            }
        }
        best.map(|(selection, _)| selection)
    }

    /// Move both paddles to this frame's detections and derive their
    /// velocities over `dt` seconds.
    ///
    /// A paddle with no eligible detection keeps its position and stops;
    /// smoothing never carries momentum into a frame without a detection.
    pub fn update(
        &self,
        paddles: &mut [Paddle; 2],
        candidates: &[Vec2],
        dt: f64,
    ) -> TrackingReport {
        let mut report = TrackingReport::default();
        for player in Player::ALL {
            let paddle = &mut paddles[player.index()];
            let previous = paddle.position;
            let selection = self.select_candidate(player, previous, candidates);
            report.matched[player.index()] = selection.is_some();
            let position = selection.map_or(previous, |s| s.position);

            let velocity = if selection.is_some() && dt.is_finite() && dt > 0.0 {
                let raw = (position - previous) / dt;
                raw * (1.0 - self.smoothing) + paddle.velocity * self.smoothing
            } else {
                Vec2::ZERO
            };

            paddle.position = position;
            paddle.velocity = velocity;
        }
        if candidates.is_empty() {
            tracing::trace!("No paddle markers detected");
        }
        report
    }
}
