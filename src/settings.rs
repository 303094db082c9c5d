use std::path::PathBuf;

use anyhow::{ensure, Context};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;

use crate::cone::{Aim, Viewport};
use crate::level::LevelPattern;

const CONFIG_FILE: &str = "flashlight.toml";
const ENV_PREFIX: &str = "FLASHLIGHT";
/// The board is drawn two terminal columns per cell, plus a HUD and a
/// game-over row, and terminal coordinates are `u16`.
const MAX_GRID_WIDTH: usize = u16::MAX as usize / 2;
const MAX_GRID_HEIGHT: usize = u16::MAX as usize - 2;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub screen_width: usize,
    pub screen_height: usize,
    pub cell_px: usize,
    pub fps: u64,
    pub pattern: LevelPattern,
    pub aim: Aim,
    pub monsters: usize,
    pub start_health: i32,
    pub contact_damage: i32,
    pub chase_interval_secs: f32,
    /// Optional `*`-for-wall text level replacing the generated pattern.
    pub level_file: Option<PathBuf>,
    pub seed: Option<u64>,
    pub log_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            screen_width: 800,
            screen_height: 450,
            cell_px: 10,
            fps: 60,
            pattern: LevelPattern::Checkerboard,
            aim: Aim::Mouse,
            monsters: 1,
            start_health: 100,
            contact_damage: 10,
            chase_interval_secs: 0.3,
            level_file: None,
            seed: None,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Settings {
    /// Defaults, then `flashlight.toml` if present, then `FLASHLIGHT_*` variables.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_builder(
            Config::builder()
                .add_source(File::new(CONFIG_FILE, FileFormat::Toml).required(false))
                .add_source(env_overrides()),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let settings: Settings = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.cell_px > 0, "cell_px must be positive");
        ensure!(
            self.screen_width >= self.cell_px && self.screen_height >= self.cell_px,
            "screen {}x{} is smaller than one {}px cell",
            self.screen_width,
            self.screen_height,
            self.cell_px
        );
        let viewport = self.viewport();
        ensure!(
            viewport.grid_width() <= MAX_GRID_WIDTH && viewport.grid_height() <= MAX_GRID_HEIGHT,
            "{}x{} grid does not fit a terminal",
            viewport.grid_width(),
            viewport.grid_height()
        );
        ensure!(self.fps > 0, "fps must be positive");
        ensure!(
            self.chase_interval_secs > 0.0,
            "chase_interval_secs must be positive"
        );
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.screen_width,
            height: self.screen_height,
            cell_px: self.cell_px,
        }
    }
}

fn env_overrides() -> Environment {
    Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();
        env_overrides().source(Some(vars))
    }

    #[test]
    fn defaults_give_80_by_45_grid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        let viewport = settings.viewport();
        assert_eq!(viewport.grid_width(), 80);
        assert_eq!(viewport.grid_height(), 45);
        assert_eq!(settings.aim, Aim::Mouse);
        assert_eq!(settings.start_health, 100);
    }

    #[test]
    fn rejects_degenerate_values() {
        let mut settings = Settings::default();
        settings.cell_px = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.screen_height = 5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.fps = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_boards_wider_than_a_terminal() {
        let mut settings = Settings::default();
        settings.screen_width = 1_000_000;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("does not fit a terminal"));

        // 32767 cells take 65534 columns, still addressable
        settings.screen_width = MAX_GRID_WIDTH * settings.cell_px;
        settings.validate().unwrap();

        let mut settings = Settings::default();
        settings.screen_height = 70_000 * settings.cell_px;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn env_overrides_file_and_parses_numbers() {
        let settings = Settings::from_builder(
            Config::builder()
                .add_source(File::from_str("monsters = 3\nfps = 20\n", FileFormat::Toml))
                .add_source(env(&[
                    ("FLASHLIGHT_FPS", "30"),
                    ("FLASHLIGHT_PATTERN", "bordered_room"),
                    ("FLASHLIGHT_CHASE_INTERVAL_SECS", "0.5"),
                ])),
        )
        .unwrap();
        assert_eq!(settings.fps, 30);
        assert_eq!(settings.monsters, 3);
        assert_eq!(settings.pattern, LevelPattern::BorderedRoom);
        assert_eq!(settings.chase_interval_secs, 0.5);
        assert_eq!(settings.start_health, 100);
    }

    #[test]
    fn loaded_settings_are_validated() {
        let result = Settings::from_builder(
            Config::builder().add_source(env(&[("FLASHLIGHT_CELL_PX", "0")])),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cell_px must be positive"));
    }

    #[test]
    fn toml_overrides_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                "pattern = \"bordered_room\"\naim = \"facing\"\nmonsters = 3\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.pattern, LevelPattern::BorderedRoom);
        assert_eq!(settings.aim, Aim::Facing);
        assert_eq!(settings.monsters, 3);
        assert_eq!(settings.screen_width, 800);
    }
}
