//! Display side: what one frame shows and the renderers that show it.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use airhockey_core::config::EngineConfig;
use airhockey_core::phase::GamePhase;
use airhockey_core::table::Vec2;
use airhockey_core::world::{Player, Score, WorldState};

use crate::assets::AssetSet;
use crate::config::OutputConfig;

/// A filled or outlined circle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenCircle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Axis-aligned rectangle in screen pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Everything needed to draw one gameplay frame, already in screen space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub phase: GamePhase,
    pub table_width: f64,
    pub table_height: f64,
    /// Screen pixels per table unit, horizontally.
    pub width_ratio: f64,
    /// Screen pixels per table unit, vertically.
    pub height_ratio: f64,
    pub puck: ScreenCircle,
    pub paddles: [ScreenCircle; 2],
    pub score: Score,
    /// Left and right goal mouths.
    pub goals: [ScreenRect; 2],
}

impl RenderFrame {
    pub fn compose(
        world: &WorldState,
        phase: GamePhase,
        engine: &EngineConfig,
        output: &OutputConfig,
    ) -> Self {
        let w = world.table.width();
        let h = world.table.height();
        let width_ratio = f64::from(output.width) / w;
        let height_ratio = f64::from(output.height) / h;

        // Circles are scaled on the horizontal ratio only.
        let circle = |center: Vec2, radius: f64| ScreenCircle {
            x: center.x * width_ratio,
            y: center.y * height_ratio,
            radius: radius * width_ratio,
        };

        let (low, high) = world.table.goal_band(engine.goal_width);
        let mouth = |x: f64| ScreenRect {
            x,
            y: low * height_ratio,
            width: engine.wall_padding * width_ratio,
            height: (high - low) * height_ratio,
        };

        Self {
            phase,
            table_width: w,
            table_height: h,
            width_ratio,
            height_ratio,
            puck: circle(world.puck.position, engine.puck_radius),
            paddles: [
                circle(world.paddles[0].position, engine.paddle_radius),
                circle(world.paddles[1].position, engine.paddle_radius),
            ],
            score: world.score,
            goals: [mouth(0.0), mouth((w - engine.wall_padding) * width_ratio)],
        }
    }
}

/// One full screen the display can show.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    StartupSplash,
    Gameplay(Box<RenderFrame>),
    Goal(Player),
    Win(Player),
    Error,
}

impl Screen {
    /// The screen for `phase`, composing a gameplay frame only when in play.
    pub fn for_phase(
        phase: GamePhase,
        world: &WorldState,
        engine: &EngineConfig,
        output: &OutputConfig,
    ) -> Self {
        match phase {
            GamePhase::Setup => Screen::StartupSplash,
            GamePhase::InPlay => {
                Screen::Gameplay(Box::new(RenderFrame::compose(world, phase, engine, output)))
            },
            GamePhase::GoalOne => Screen::Goal(Player::One),
            GamePhase::GoalTwo => Screen::Goal(Player::Two),
            GamePhase::WinOne => Screen::Win(Player::One),
            GamePhase::WinTwo => Screen::Win(Player::Two),
            GamePhase::Error => Screen::Error,
        }
    }
}

/// A display surface. Draw calls fill a back buffer; `present` shows it.
pub trait Renderer: Send {
    fn draw_startup_splash(&mut self);
    fn draw_gameplay(&mut self, frame: &RenderFrame);
    fn draw_goal(&mut self, player: Player);
    fn draw_win(&mut self, player: Player);
    fn draw_error(&mut self);
    fn present(&mut self);

    fn draw(&mut self, screen: &Screen) {
        match screen {
            Screen::StartupSplash => self.draw_startup_splash(),
            Screen::Gameplay(frame) => self.draw_gameplay(frame),
            Screen::Goal(player) => self.draw_goal(*player),
            Screen::Win(player) => self.draw_win(*player),
            Screen::Error => self.draw_error(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Buffered {
    Empty,
    Splash,
    Gameplay,
    Goal(Player),
    Win(Player),
    Error,
}

/// Headless renderer that reports frames through `tracing`.
///
/// Screen changes are logged at `info` with the image that would be shown;
/// gameplay frames are logged at `trace` as JSON.
pub struct TraceRenderer {
    assets: AssetSet,
    buffer: Buffered,
    shown: Buffered,
    frames: u64,
}

impl TraceRenderer {
    pub fn new(assets: AssetSet) -> Self {
        Self {
            assets,
            buffer: Buffered::Empty,
            shown: Buffered::Empty,
            frames: 0,
        }
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames
    }
}

impl Renderer for TraceRenderer {
    fn draw_startup_splash(&mut self) {
        self.buffer = Buffered::Splash;
    }

    fn draw_gameplay(&mut self, frame: &RenderFrame) {
        self.buffer = Buffered::Gameplay;
        if tracing::enabled!(tracing::Level::TRACE) {
            match serde_json::to_string(frame) {
                Ok(json) => tracing::trace!(frame = %json, "Gameplay frame"),
                Err(e) => tracing::warn!(error = %e, "Failed to encode gameplay frame"),
            }
        }
    }

    fn draw_goal(&mut self, player: Player) {
        self.buffer = Buffered::Goal(player);
    }

    fn draw_win(&mut self, player: Player) {
        self.buffer = Buffered::Win(player);
    }

    fn draw_error(&mut self) {
        self.buffer = Buffered::Error;
    }

    fn present(&mut self) {
        // Nothing drawn since the last present shows the error screen.
        let screen = std::mem::replace(&mut self.buffer, Buffered::Empty);
        let screen = if screen == Buffered::Empty {
            Buffered::Error
        } else {
            screen
        };
        if screen != self.shown {
            let image = match screen {
                Buffered::Splash => self.assets.image_for(GamePhase::Setup),
                Buffered::Goal(p) => self.assets.goal_image(p),
                Buffered::Win(p) => self.assets.win_image(p),
                Buffered::Error => self.assets.image_for(GamePhase::Error),
                Buffered::Gameplay | Buffered::Empty => self.assets.image_for(GamePhase::InPlay),
            };
            tracing::info!(screen = ?screen, image = %image.display(), "Display changed");
            self.shown = screen;
        }
        self.frames += 1;
    }
}

/// Renderer that keeps every presented screen, for inspection by tests
/// and tools.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    pending: Option<Screen>,
    presented: Arc<Mutex<Vec<Screen>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the list of presented screens, shared with clones.
    pub fn presented(&self) -> Arc<Mutex<Vec<Screen>>> {
        Arc::clone(&self.presented)
    }

    fn buffer(&mut self, screen: Screen) {
        self.pending = Some(screen);
    }
}

impl Renderer for RecordingRenderer {
    fn draw_startup_splash(&mut self) {
        self.buffer(Screen::StartupSplash);
    }

    fn draw_gameplay(&mut self, frame: &RenderFrame) {
        self.buffer(Screen::Gameplay(Box::new(frame.clone())));
    }

    fn draw_goal(&mut self, player: Player) {
        self.buffer(Screen::Goal(player));
    }

    fn draw_win(&mut self, player: Player) {
        self.buffer(Screen::Win(player));
    }

    fn draw_error(&mut self) {
        self.buffer(Screen::Error);
    }

    fn present(&mut self) {
        let screen = self.pending.take().unwrap_or(Screen::Error);
        self.presented
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(screen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airhockey_core::table::Table;
    use airhockey_core::world::Puck;

    fn world() -> WorldState {
        WorldState::new(Table::new(1000.0, 2000.0 / 3.0).unwrap())
    }

    #[test]
    fn compose_scales_to_output() {
        let mut w = world();
        w.puck = Puck::at_rest(Vec2::new(500.0, 100.0));
        w.score.player_two = 4;
        let frame = RenderFrame::compose(
            &w,
            GamePhase::InPlay,
            &EngineConfig::default(),
            &OutputConfig::default(),
        );

        assert!((frame.width_ratio - 1.2).abs() < 1e-12);
        assert!((frame.height_ratio - 1.2).abs() < 1e-9);
        assert!((frame.puck.x - 600.0).abs() < 1e-9);
        assert!((frame.puck.y - 120.0).abs() < 1e-9);
        assert!((frame.puck.radius - 30.0).abs() < 1e-9);
        assert!((frame.paddles[0].radius - 42.0).abs() < 1e-9);
        assert_eq!(frame.score.player_two, 4);
    }

    #[test]
    fn goal_mouths_sit_on_short_walls() {
        let frame = RenderFrame::compose(
            &world(),
            GamePhase::InPlay,
            &EngineConfig::default(),
            &OutputConfig::default(),
        );
        let [left, right] = frame.goals;
        assert_eq!(left.x, 0.0);
        assert!((left.width - 18.0 * 1.2).abs() < 1e-9);
        assert!((right.x + right.width - 1200.0).abs() < 1e-9);
        // Band centered vertically, 150 units tall.
        assert!((left.height - 180.0).abs() < 1e-6);
        assert!((left.y + left.height / 2.0 - 400.0).abs() < 1e-6);
        assert_eq!(left.y, right.y);
    }

    #[test]
    fn frame_serializes_to_json() {
        let frame = RenderFrame::compose(
            &world(),
            GamePhase::InPlay,
            &EngineConfig::default(),
            &OutputConfig::default(),
        );
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["phase"], "InPlay");
        assert_eq!(json["score"]["player_one"], 0);
        assert!(json["paddles"].as_array().unwrap().len() == 2);
    }

    #[test]
    fn phase_picks_screen() {
        let w = world();
        let e = EngineConfig::default();
        let o = OutputConfig::default();
        assert_eq!(
            Screen::for_phase(GamePhase::GoalTwo, &w, &e, &o),
            Screen::Goal(Player::Two)
        );
        assert_eq!(
            Screen::for_phase(GamePhase::WinOne, &w, &e, &o),
            Screen::Win(Player::One)
        );
        assert_eq!(Screen::for_phase(GamePhase::Error, &w, &e, &o), Screen::Error);
        assert_eq!(
            Screen::for_phase(GamePhase::Setup, &w, &e, &o),
            Screen::StartupSplash
        );
        assert!(matches!(
            Screen::for_phase(GamePhase::InPlay, &w, &e, &o),
            Screen::Gameplay(_)
        ));
    }

    #[test]
    fn present_without_draw_shows_error() {
        let mut r = RecordingRenderer::new();
        let presented = r.presented();
        r.draw_goal(Player::One);
        r.present();
        r.present();
        let screens = presented.lock().unwrap();
        assert_eq!(*screens, vec![Screen::Goal(Player::One), Screen::Error]);
    }

    #[test]
    fn trace_renderer_counts_frames() {
        let mut r = TraceRenderer::new(AssetSet::unchecked(std::path::Path::new("assets")));
        r.draw(&Screen::StartupSplash);
        r.present();
        r.draw(&Screen::Win(Player::Two));
        r.present();
        assert_eq!(r.frames_presented(), 2);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn on_table_points_land_on_screen(
                x in 0.0f64..=1.0,
                y in 0.0f64..=1.0,
                width in 100.0f64..5000.0,
                height in 100.0f64..5000.0,
            ) {
                let mut w = WorldState::new(Table::new(width, height).unwrap());
                w.puck = Puck::at_rest(Vec2::new(x * width, y * height));
                let frame = RenderFrame::compose(
                    &w,
                    GamePhase::InPlay,
                    &EngineConfig::default(),
                    &OutputConfig::default(),
                );
                prop_assert!(frame.puck.x >= 0.0 && frame.puck.x <= 1200.0 + 1e-6);
                prop_assert!(frame.puck.y >= 0.0 && frame.puck.y <= 800.0 + 1e-6);
            }
        }
    }
}
