use crate::components::{offset, Dir, Pos};
use crate::cone::normalize_angle;
use crate::level::LevelGrid;

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub pos: Pos,
    facing: f32,
    pub health: i32,
}

impl Player {
    pub fn new(pos: Pos, health: i32) -> Self {
        Self {
            pos,
            facing: 0.0,
            health,
        }
    }

    /// Spawns at the middle cell of the grid.
    pub fn centered(grid: &LevelGrid, health: i32) -> Self {
        Self::new(Pos::new(grid.width() / 2, grid.height() / 2), health)
    }

    pub fn facing(&self) -> f32 {
        self.facing
    }

    pub fn set_facing(&mut self, angle: f32) {
        self.facing = normalize_angle(angle);
    }

    pub fn rotate(&mut self, delta: f32) {
        self.set_facing(self.facing + delta);
    }

    /// Turns toward `dir` and steps one cell that way. Steps that would leave
    /// the grid are dropped; returns whether the player moved.
    pub fn try_move(&mut self, dir: Dir, grid: &LevelGrid) -> bool {
        self.set_facing(dir.heading());
        let (dx, dy) = dir.delta();
        match offset(self.pos, dx, dy, grid.width(), grid.height()) {
            Some(next) => {
                self.pos = next;
                true
            }
            None => false,
        }
    }

    pub fn take_damage(&mut self, amount: i32) {
        self.health -= amount;
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }
}
