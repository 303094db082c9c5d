//! Flashlight visibility: a per-pixel sweep that lights a wedge of the screen
//! toward the aim angle plus a small disc around the player. Walls do not
//! occlude anything; only angle and distance decide what is lit.

use std::f32::consts::{PI, TAU};

use serde::Deserialize;

use crate::components::Pos;
use crate::level::{LevelGrid, Tile};
use crate::monster::Monster;
use crate::player::Player;

/// Screen size in pixels and the pixel size of one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
    pub cell_px: usize,
}

impl Viewport {
    pub fn grid_width(&self) -> usize {
        self.width / self.cell_px
    }

    pub fn grid_height(&self) -> usize {
        self.height / self.cell_px
    }

    /// Pixel centre of a grid cell, used as the cone apex.
    pub fn cell_center(&self, pos: Pos) -> (i32, i32) {
        let half = self.cell_px / 2;
        (
            (pos.x * self.cell_px + half) as i32,
            (pos.y * self.cell_px + half) as i32,
        )
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConeParams {
    /// Half of the field of view, radians.
    pub half_angle: f32,
    /// Maximum lit distance inside the wedge, pixels.
    pub range: f32,
    /// Radius of the always-lit disc around the apex, pixels.
    pub ambient_radius: f32,
}

impl Default for ConeParams {
    fn default() -> Self {
        Self {
            half_angle: 15f32.to_radians(),
            range: 500.0,
            ambient_radius: 30.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lighting {
    Dark,
    Ambient,
    Cone,
}

impl Lighting {
    pub fn is_lit(self) -> bool {
        self != Lighting::Dark
    }
}

impl ConeParams {
    /// Classifies a pixel at offset `(dx, dy)` from the apex. The wedge test
    /// wins over the ambient disc so callers can tell in-cone pixels apart.
    pub fn classify(&self, dx: f32, dy: f32, target: f32) -> Lighting {
        let distance = (dx * dx + dy * dy).sqrt();
        if distance < self.range {
            let delta = wrap_angle(dy.atan2(dx) - target);
            if delta.abs() < self.half_angle {
                return Lighting::Cone;
            }
        }
        if distance < self.ambient_radius {
            return Lighting::Ambient;
        }
        Lighting::Dark
    }
}

/// Where the cone points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aim {
    Mouse,
    Facing,
}

impl Aim {
    pub fn toggled(self) -> Self {
        match self {
            Aim::Mouse => Aim::Facing,
            Aim::Facing => Aim::Mouse,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Aim::Mouse => "mouse",
            Aim::Facing => "facing",
        }
    }
}

/// Wraps an angle difference into `[-PI, PI]`.
pub fn wrap_angle(mut delta: f32) -> f32 {
    while delta > PI {
        delta -= TAU;
    }
    while delta < -PI {
        delta += TAU;
    }
    delta
}

/// Maps any angle into `[0, TAU)`.
pub fn normalize_angle(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU {
        0.0
    } else {
        a
    }
}

pub fn angle_to(apex: (i32, i32), point: (i32, i32)) -> f32 {
    let dx = (point.0 - apex.0) as f32;
    let dy = (point.1 - apex.1) as f32;
    dy.atan2(dx)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pixel {
    Dark,
    Lit(Tile),
    Monster,
    Player,
}

/// Owned pixel raster the sweep draws into.
#[derive(Clone, Debug)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<Pixel>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::Dark; width * height],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    fn set(&mut self, x: usize, y: usize, pixel: Pixel) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = pixel;
        }
    }

    fn clear(&mut self) {
        self.pixels.fill(Pixel::Dark);
    }

    fn fill_cell(&mut self, viewport: &Viewport, pos: Pos, pixel: Pixel) {
        let x0 = pos.x * viewport.cell_px;
        let y0 = pos.y * viewport.cell_px;
        for y in y0..y0 + viewport.cell_px {
            for x in x0..x0 + viewport.cell_px {
                self.set(x, y, pixel);
            }
        }
    }

    #[cfg(test)]
    pub fn count(&self, pixel: Pixel) -> usize {
        self.pixels.iter().filter(|p| **p == pixel).count()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Indices into the monster slice of every monster caught by the cone.
    pub visible_monsters: Vec<usize>,
    pub lit_pixels: usize,
}

/// Redraws `frame` for one tick of the flashlight.
pub fn sweep(
    frame: &mut Frame,
    viewport: &Viewport,
    params: &ConeParams,
    grid: &LevelGrid,
    player: &Player,
    target: f32,
    monsters: &[Monster],
) -> SweepReport {
    frame.clear();
    let (apex_x, apex_y) = viewport.cell_center(player.pos);

    // Cell -> index of the first monster standing there.
    let mut occupant: Vec<Option<usize>> = vec![None; grid.width() * grid.height()];
    for (idx, monster) in monsters.iter().enumerate() {
        if grid.contains(monster.pos.x, monster.pos.y) {
            let slot = &mut occupant[monster.pos.y * grid.width() + monster.pos.x];
            if slot.is_none() {
                *slot = Some(idx);
            }
        }
    }
    let mut seen = vec![false; monsters.len()];
    let mut report = SweepReport::default();

    for j in 0..viewport.height {
        let row = j * grid.height() / viewport.height;
        let dy = j as f32 - apex_y as f32;
        for i in 0..viewport.width {
            let dx = i as f32 - apex_x as f32;
            let lighting = params.classify(dx, dy, target);
            if !lighting.is_lit() {
                continue;
            }
            let col = i * grid.width() / viewport.width;
            let Some(tile) = grid.get(col, row) else {
                continue;
            };
            frame.set(i, j, Pixel::Lit(tile));
            report.lit_pixels += 1;

            if lighting == Lighting::Cone {
                let (cx, cy) = (i / viewport.cell_px, j / viewport.cell_px);
                if grid.contains(cx, cy) {
                    if let Some(idx) = occupant[cy * grid.width() + cx] {
                        seen[idx] = true;
                    }
                }
            }
        }
    }

    for (idx, monster) in monsters.iter().enumerate() {
        // co-located monsters share a block, any of them seen shows them all
        let cell_seen = occupant
            .get(monster.pos.y * grid.width() + monster.pos.x)
            .copied()
            .flatten()
            .is_some_and(|first| seen[first]);
        if cell_seen {
            frame.fill_cell(viewport, monster.pos, Pixel::Monster);
            report.visible_monsters.push(idx);
        }
    }
    frame.fill_cell(viewport, player.pos, Pixel::Player);
    report
}
