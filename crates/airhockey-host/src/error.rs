use airhockey_core::calibration::CalibrationError;
use airhockey_core::config::ConfigError;

/// Anything that stops the game before the loops are started.
#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    Calibration(CalibrationError),
    /// Display assets that could not be found, by file name.
    MissingAssets(Vec<String>),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Calibration(e) => write!(f, "calibration failed: {e}"),
            Self::MissingAssets(names) => {
                write!(f, "asset(s) missing, check directory: {}", names.join(", "))
            },
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Calibration(e) => Some(e),
            Self::MissingAssets(_) => None,
        }
    }
}

impl From<ConfigError> for StartupError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CalibrationError> for StartupError {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}
