use serde::{Deserialize, Serialize};

use crate::table::{Table, Vec2};

/// One of the two players. Player one holds the left half of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Player::One => write!(f, "player one"),
            Player::Two => write!(f, "player two"),
        }
    }
}

/// The puck. Written only by the physics loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Puck {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Puck {
    pub fn at_rest(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
        }
    }

    /// Move the puck to `position` and stop it.
    pub fn reset(&mut self, position: Vec2) {
        self.position = position;
        self.velocity = Vec2::ZERO;
    }

    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }
}

/// A tracked paddle. Written only by the paddle tracker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Paddle {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Paddle {
    pub fn at_rest(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Score {
    pub player_one: u32,
    pub player_two: u32,
}

impl Score {
    pub fn get(&self, player: Player) -> u32 {
        match player {
            Player::One => self.player_one,
            Player::Two => self.player_two,
        }
    }

    /// Add a goal for `player` and return their new total.
    pub fn increment(&mut self, player: Player) -> u32 {
        let slot = match player {
            Player::One => &mut self.player_one,
            Player::Two => &mut self.player_two,
        };
        *slot += 1;
        *slot
    }

    pub fn reset(&mut self) {
        self.player_one = 0;
        self.player_two = 0;
    }
}

/// Everything the three loops share: geometry, kinematics and score.
///
/// The game phase lives in [`crate::phase::PhaseCoordinator`] so it can be
/// read and written under its own lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldState {
    pub table: Table,
    pub puck: Puck,
    pub paddles: [Paddle; 2],
    pub score: Score,
}

impl WorldState {
    /// Puck at rest in the middle, each paddle at the center of its half.
    pub fn new(table: Table) -> Self {
        Self {
            puck: Puck::at_rest(table.center()),
            paddles: [
                Paddle::at_rest(table.center_left()),
                Paddle::at_rest(table.center_right()),
            ],
            score: Score::default(),
            table,
        }
    }

    pub fn paddle(&self, player: Player) -> &Paddle {
        &self.paddles[player.index()]
    }

    pub fn paddle_mut(&mut self, player: Player) -> &mut Paddle {
        &mut self.paddles[player.index()]
    }
}
