//! One-shot startup calibration: table size from the projector distance,
//! and sensor-to-table conversion ratios from the camera frame size.

use crate::table::Table;

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// The range finder could not produce a reading.
    RangeFinderUnavailable(String),
    /// The measured projector distance is zero, negative or not finite.
    InvalidDistance(f64),
    /// Spread ratios or measured distance produced an unusable table.
    InvalidTableSize { width: f64, height: f64 },
    /// The detector reported an empty or degenerate camera frame.
    InvalidSensorFrame { width: f64, height: f64 },
}

impl std::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RangeFinderUnavailable(reason) => {
                write!(f, "projector range finder unavailable: {reason}")
            },
            Self::InvalidDistance(d) => write!(f, "invalid projector distance: {d}"),
            Self::InvalidTableSize { width, height } => {
                write!(f, "invalid table size: {width} x {height}")
            },
            Self::InvalidSensorFrame { width, height } => {
                write!(f, "invalid sensor frame: {width} x {height} px")
            },
        }
    }
}

impl std::error::Error for CalibrationError {}

/// Source of the projector-to-table distance used to size the table.
pub trait RangeFinder: Send {
    fn projector_distance(&mut self) -> Result<f64, CalibrationError>;
}

/// Range finder backed by a distance configured up front.
///
/// `None` models a missing reading and fails calibration instead of
/// silently picking a size.
#[derive(Debug, Clone, Copy)]
pub struct FixedRangeFinder {
    distance: Option<f64>,
}

impl FixedRangeFinder {
    pub fn new(distance: Option<f64>) -> Self {
        Self { distance }
    }
}

impl RangeFinder for FixedRangeFinder {
    fn projector_distance(&mut self) -> Result<f64, CalibrationError> {
        self.distance.ok_or_else(|| {
            CalibrationError::RangeFinderUnavailable("no projector distance configured".into())
        })
    }
}

/// Size the table from the projector's throw: each dimension is the
/// projector distance times the projector's spread ratio on that axis.
pub fn calibrate_table(
    range_finder: &mut dyn RangeFinder,
    spread_horizontal: f64,
    spread_vertical: f64,
) -> Result<Table, CalibrationError> {
    let distance = range_finder.projector_distance()?;
    if !distance.is_finite() || distance <= 0.0 {
        return Err(CalibrationError::InvalidDistance(distance));
    }
    let table = Table::new(distance * spread_horizontal, distance * spread_vertical)?;
    tracing::info!(
        distance,
        width = table.width(),
        height = table.height(),
        "Table calibrated"
    );
    Ok(table)
}

/// Linear mapping from sensor pixels to table units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorCalibration {
    pub frame_width: f64,
    pub frame_height: f64,
    /// Factor the detector shrank the frame by before detecting; detected
    /// points are multiplied by it to get back to full-frame pixels.
    pub downsample_ratio: f64,
    pub width_ratio: f64,
    pub height_ratio: f64,
}

impl SensorCalibration {
    pub fn new(
        table: &Table,
        frame_width: f64,
        frame_height: f64,
        downsample_ratio: f64,
    ) -> Result<Self, CalibrationError> {
        if !(frame_width.is_finite()
            && frame_width > 0.0
            && frame_height.is_finite()
            && frame_height > 0.0)
        {
            return Err(CalibrationError::InvalidSensorFrame {
                width: frame_width,
                height: frame_height,
            });
        }
        Ok(Self {
            frame_width,
            frame_height,
            downsample_ratio: if downsample_ratio >= 1.0 {
                downsample_ratio
            } else {
                1.0
            },
            width_ratio: table.width() / frame_width,
            height_ratio: table.height() / frame_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_from_distance_and_spread() {
        let mut rf = FixedRangeFinder::new(Some(1000.0));
        let table = calibrate_table(&mut rf, 1.0, 2.0 / 3.0).unwrap();
        assert_eq!(table.width(), 1000.0);
        assert!((table.height() - 666.666_666).abs() < 1e-3);
    }

    #[test]
    fn missing_distance_fails_fast() {
        let mut rf = FixedRangeFinder::new(None);
        let err = calibrate_table(&mut rf, 1.0, 2.0 / 3.0).unwrap_err();
        assert!(matches!(err, CalibrationError::RangeFinderUnavailable(_)));
    }

    #[test]
    fn non_positive_distance_rejected() {
        for d in [0.0, -5.0, f64::NAN] {
            let mut rf = FixedRangeFinder::new(Some(d));
            assert!(
                matches!(
                    calibrate_table(&mut rf, 1.0, 1.0),
                    Err(CalibrationError::InvalidDistance(_))
                ),
                "distance {d} should be rejected"
            );
        }
    }

    #[test]
    fn zero_spread_rejected() {
        let mut rf = FixedRangeFinder::new(Some(1000.0));
        assert!(matches!(
            calibrate_table(&mut rf, 0.0, 1.0),
            Err(CalibrationError::InvalidTableSize { .. })
        ));
    }

    #[test]
    fn sensor_ratios() {
        let table = Table::new(1000.0, 500.0).unwrap();
        let cal = SensorCalibration::new(&table, 640.0, 480.0, 1.0).unwrap();
        assert!((cal.width_ratio - 1000.0 / 640.0).abs() < 1e-12);
        assert!((cal.height_ratio - 500.0 / 480.0).abs() < 1e-12);
    }

    #[test]
    fn empty_sensor_frame_rejected() {
        let table = Table::new(1000.0, 500.0).unwrap();
        assert!(SensorCalibration::new(&table, 0.0, 480.0, 1.0).is_err());
    }

    #[test]
    fn downsample_ratio_floors_at_one() {
        let table = Table::new(1000.0, 500.0).unwrap();
        let cal = SensorCalibration::new(&table, 640.0, 480.0, 0.0).unwrap();
        assert_eq!(cal.downsample_ratio, 1.0);
    }
}
