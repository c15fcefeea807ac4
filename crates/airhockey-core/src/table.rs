use std::ops::{Add, AddAssign, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationError;

/// A 2D point or vector in table space (or sensor space, for raw detections).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Unit vector pointing at `angle` radians.
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Heading in radians, `atan2(y, x)`.
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vec2 {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

/// Playing surface dimensions in table units, fixed after calibration.
///
/// The left goal mouth belongs to player one and the right one to player
/// two; both are centered vertically on the short walls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Table {
    width: f64,
    height: f64,
}

impl Table {
    pub fn new(width: f64, height: f64) -> Result<Self, CalibrationError> {
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(CalibrationError::InvalidTableSize { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Center of player one's (left) half.
    pub fn center_left(&self) -> Vec2 {
        Vec2::new(self.width / 4.0, self.height / 2.0)
    }

    /// Center of player two's (right) half.
    pub fn center_right(&self) -> Vec2 {
        Vec2::new(self.width * 3.0 / 4.0, self.height / 2.0)
    }

    /// Vertical extent `(low, high)` of both goal mouths.
    pub fn goal_band(&self, goal_width: f64) -> (f64, f64) {
        (
            (self.height - goal_width) / 2.0,
            (self.height + goal_width) / 2.0,
        )
    }

    /// Whether a vertical coordinate lies in front of the goal mouths.
    pub fn in_goal_band(&self, y: f64, goal_width: f64) -> bool {
        let (low, high) = self.goal_band(goal_width);
        y >= low && y <= high
    }
}
