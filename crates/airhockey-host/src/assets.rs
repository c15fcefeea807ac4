use std::path::{Path, PathBuf};

use airhockey_core::phase::GamePhase;
use airhockey_core::world::Player;

use crate::error::StartupError;

/// Every screen the display can show, by file name.
pub const REQUIRED_ASSETS: [&str; 7] = [
    "startupSplash.png",
    "tableTop.png",
    "goalPlayerOne.png",
    "goalPlayerTwo.png",
    "winPlayerOne.png",
    "winPlayerTwo.png",
    "error.png",
];

/// Resolved paths to the display images.
#[derive(Debug, Clone)]
pub struct AssetSet {
    dir: PathBuf,
}

impl AssetSet {
    /// Check that every required image exists in `dir`.
    pub fn load(dir: &Path) -> Result<Self, StartupError> {
        let missing: Vec<String> = REQUIRED_ASSETS
            .iter()
            .filter(|name| !dir.join(name).is_file())
            .map(|name| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StartupError::MissingAssets(missing));
        }
        tracing::info!(dir = %dir.display(), "Display assets found");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Asset set that is never checked against the filesystem.
    pub fn unchecked(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Image shown for `phase`.
    pub fn image_for(&self, phase: GamePhase) -> PathBuf {
        let name = match phase {
            GamePhase::Setup => "startupSplash.png",
            GamePhase::InPlay => "tableTop.png",
            GamePhase::GoalOne => "goalPlayerOne.png",
            GamePhase::GoalTwo => "goalPlayerTwo.png",
            GamePhase::WinOne => "winPlayerOne.png",
            GamePhase::WinTwo => "winPlayerTwo.png",
            GamePhase::Error => "error.png",
        };
        self.dir.join(name)
    }

    pub fn goal_image(&self, player: Player) -> PathBuf {
        self.image_for(GamePhase::after_goal(player, false))
    }

    pub fn win_image(&self, player: Player) -> PathBuf {
        self.image_for(GamePhase::after_goal(player, true))
    }
}
