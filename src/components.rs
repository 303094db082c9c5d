use std::f32::consts::{FRAC_PI_2, PI};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Pos) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    /// Order in which held directions are applied within one frame.
    pub const FRAME_ORDER: [Dir; 4] = [Dir::Right, Dir::Left, Dir::Up, Dir::Down];

    pub fn delta(self) -> (isize, isize) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }

    /// Screen-space heading in radians; y grows downward.
    pub fn heading(self) -> f32 {
        match self {
            Dir::Right => 0.0,
            Dir::Down => FRAC_PI_2,
            Dir::Left => PI,
            Dir::Up => 3.0 * FRAC_PI_2,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Dir::Up => 0,
            Dir::Down => 1,
            Dir::Left => 2,
            Dir::Right => 3,
        }
    }
}

/// Offsets `pos` by `(dx, dy)`, returning `None` when the result leaves
/// `[0, width) x [0, height)`.
pub fn offset(pos: Pos, dx: isize, dy: isize, width: usize, height: usize) -> Option<Pos> {
    let nx = pos.x as isize + dx;
    let ny = pos.y as isize + dy;
    if nx < 0 || ny < 0 {
        return None;
    }
    let nx = nx as usize;
    let ny = ny as usize;
    if nx >= width || ny >= height {
        return None;
    }
    Some(Pos { x: nx, y: ny })
}
