use rand::Rng;

use crate::components::{offset, Pos};
use crate::level::LevelGrid;
use crate::player::Player;

/// Cells to the right of the player where the first monster appears.
const FIRST_SPAWN_OFFSET: usize = 5;
/// Closest (Manhattan) a randomly placed monster may spawn to the player.
const MIN_SPAWN_DISTANCE: usize = 5;
const SPAWN_ATTEMPTS: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Monster {
    pub pos: Pos,
}

impl Monster {
    pub fn new(pos: Pos) -> Self {
        Self { pos }
    }

    /// Greedy pursuit: at most one unit step on each axis toward `target`.
    /// No path planning, walls are ignored.
    pub fn chase_step(&mut self, target: Pos, grid: &LevelGrid) {
        let dx = axis_step(self.pos.x, target.x);
        let dy = axis_step(self.pos.y, target.y);
        if let Some(next) = offset(self.pos, dx, 0, grid.width(), grid.height()) {
            self.pos = next;
        }
        if let Some(next) = offset(self.pos, 0, dy, grid.width(), grid.height()) {
            self.pos = next;
        }
    }
}

fn axis_step(from: usize, to: usize) -> isize {
    match to.cmp(&from) {
        std::cmp::Ordering::Greater => 1,
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
    }
}

/// Accumulates frame time and fires once per `interval` seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct ChaseClock {
    elapsed: f32,
    interval: f32,
}

impl ChaseClock {
    pub fn new(interval: f32) -> Self {
        Self {
            elapsed: 0.0,
            interval,
        }
    }

    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        if self.elapsed >= self.interval {
            self.elapsed = 0.0;
            return true;
        }
        false
    }
}

/// Damage dealt this frame: `per_hit` for every monster on the player's cell.
pub fn contact_damage(player: &Player, monsters: &[Monster], per_hit: i32) -> i32 {
    monsters.iter().filter(|m| m.pos == player.pos).count() as i32 * per_hit
}

pub fn spawn_monsters(rng: &mut impl Rng, grid: &LevelGrid, player: &Player, count: usize) -> Vec<Monster> {
    let mut monsters = Vec::with_capacity(count);
    if count == 0 || grid.width() == 0 || grid.height() == 0 {
        return monsters;
    }
    let first = Pos::new(
        (player.pos.x + FIRST_SPAWN_OFFSET).min(grid.width() - 1),
        player.pos.y,
    );
    monsters.push(Monster::new(first));

    while monsters.len() < count {
        let mut pos = random_cell(rng, grid);
        for _ in 0..SPAWN_ATTEMPTS {
            if pos.manhattan(player.pos) >= MIN_SPAWN_DISTANCE {
                break;
            }
            pos = random_cell(rng, grid);
        }
        monsters.push(Monster::new(pos));
    }
    tracing::debug!(count = monsters.len(), "spawned monsters");
    monsters
}

fn random_cell(rng: &mut impl Rng, grid: &LevelGrid) -> Pos {
    Pos::new(rng.gen_range(0..grid.width()), rng.gen_range(0..grid.height()))
}
