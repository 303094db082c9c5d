use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    Wall,
    Floor,
}

/// Procedural layouts the grid can be generated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelPattern {
    /// Wall wherever `x + y` is even.
    Checkerboard,
    /// Wall on the outer ring only.
    BorderedRoom,
}

#[derive(Debug)]
pub enum LevelError {
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Io { path, source } => {
                write!(f, "could not open level file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LevelError::Io { source, .. } => Some(source),
        }
    }
}

/// Rectangular wall/floor map, stored row-major and immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelGrid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl LevelGrid {
    fn from_fn(width: usize, height: usize, mut tile_at: impl FnMut(usize, usize) -> Tile) -> Self {
        let mut tiles = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                tiles.push(tile_at(x, y));
            }
        }
        Self {
            width,
            height,
            tiles,
        }
    }

    pub fn generate(pattern: LevelPattern, width: usize, height: usize) -> Self {
        match pattern {
            LevelPattern::Checkerboard => Self::checkerboard(width, height),
            LevelPattern::BorderedRoom => Self::bordered_room(width, height),
        }
    }

    pub fn checkerboard(width: usize, height: usize) -> Self {
        Self::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Tile::Wall
            } else {
                Tile::Floor
            }
        })
    }

    pub fn bordered_room(width: usize, height: usize) -> Self {
        Self::from_fn(width, height, |x, y| {
            if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                Tile::Wall
            } else {
                Tile::Floor
            }
        })
    }

    /// Reads the `*`-for-wall text format. Line breaks are skipped, a short
    /// input leaves the remaining cells as floor and surplus input is ignored.
    pub fn parse(text: &str, width: usize, height: usize) -> Self {
        let mut bytes = text.bytes().filter(|b| *b != b'\n' && *b != b'\r');
        Self::from_fn(width, height, |_, _| match bytes.next() {
            Some(b'*') => Tile::Wall,
            _ => Tile::Floor,
        })
    }

    pub fn load(path: impl AsRef<Path>, width: usize, height: usize) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let grid = Self::parse(&text, width, height);
        tracing::info!(
            path = %path.display(),
            width,
            height,
            walls = grid.wall_count(),
            "loaded level file"
        );
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Tile> {
        if !self.contains(x, y) {
            return None;
        }
        Some(self.tiles[y * self.width + x])
    }

    pub fn wall_count(&self) -> usize {
        self.tiles.iter().filter(|t| **t == Tile::Wall).count()
    }
}
