use rand::Rng;

use crate::components::Dir;
use crate::cone::{angle_to, sweep, Aim, ConeParams, Frame, Viewport};
use crate::level::LevelGrid;
use crate::monster::{contact_damage, spawn_monsters, ChaseClock, Monster};
use crate::player::Player;
use crate::settings::Settings;

const ROTATE_STEP_DEGREES: f32 = 15.0;

/// Everything the driver collected since the previous frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Held directions, indexed by `Dir::index`.
    pub held: [bool; 4],
    /// Latest mouse position in screen pixels.
    pub mouse: Option<(i32, i32)>,
    /// Net number of facing rotation steps, positive is clockwise on screen.
    pub rotate: i32,
    pub toggle_aim: bool,
}

impl FrameInput {
    #[cfg(test)]
    pub fn hold(&mut self, dir: Dir) {
        self.held[dir.index()] = true;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    pub damage: i32,
    pub chased: bool,
    pub visible_monsters: usize,
}

pub struct Game {
    pub grid: LevelGrid,
    pub player: Player,
    pub monsters: Vec<Monster>,
    pub aim: Aim,
    viewport: Viewport,
    params: ConeParams,
    mouse: (i32, i32),
    clock: ChaseClock,
    contact_damage: i32,
    frame: Frame,
    game_over_reported: bool,
}

impl Game {
    pub fn new(settings: &Settings, grid: LevelGrid, rng: &mut impl Rng) -> Self {
        let viewport = settings.viewport();
        let player = Player::centered(&grid, settings.start_health);
        let monsters = spawn_monsters(rng, &grid, &player, settings.monsters);
        Self {
            grid,
            player,
            monsters,
            aim: settings.aim,
            viewport,
            params: ConeParams::default(),
            mouse: viewport.center(),
            clock: ChaseClock::new(settings.chase_interval_secs),
            contact_damage: settings.contact_damage,
            frame: Frame::new(viewport.width, viewport.height),
            game_over_reported: false,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn target_angle(&self) -> f32 {
        match self.aim {
            Aim::Mouse => angle_to(self.viewport.cell_center(self.player.pos), self.mouse),
            Aim::Facing => self.player.facing(),
        }
    }

    /// One frame: movement, flashlight sweep, contact damage, then the
    /// chase step if the clock fired. Game over does not stop the simulation.
    pub fn update(&mut self, input: &FrameInput, dt: f32) -> FrameOutcome {
        if input.toggle_aim {
            self.aim = self.aim.toggled();
            tracing::debug!(aim = self.aim.label(), "aim mode changed");
        }
        if input.rotate != 0 {
            self.player
                .rotate(input.rotate as f32 * ROTATE_STEP_DEGREES.to_radians());
        }
        for dir in Dir::FRAME_ORDER {
            if input.held[dir.index()] {
                self.player.try_move(dir, &self.grid);
            }
        }
        if let Some(mouse) = input.mouse {
            self.mouse = mouse;
        }

        let target = self.target_angle();
        let report = sweep(
            &mut self.frame,
            &self.viewport,
            &self.params,
            &self.grid,
            &self.player,
            target,
            &self.monsters,
        );

        let damage = contact_damage(&self.player, &self.monsters, self.contact_damage);
        if damage > 0 {
            self.player.take_damage(damage);
        }
        if self.player.is_dead() && !self.game_over_reported {
            self.game_over_reported = true;
            tracing::warn!(health = self.player.health, "game over");
        }

        let chased = self.clock.advance(dt);
        if chased {
            let target = self.player.pos;
            for monster in &mut self.monsters {
                monster.chase_step(target, &self.grid);
            }
            tracing::trace!(monsters = ?self.monsters, lit = report.lit_pixels, "chase tick");
        }

        FrameOutcome {
            damage,
            chased,
            visible_monsters: report.visible_monsters.len(),
        }
    }

    pub fn is_over(&self) -> bool {
        self.player.is_dead()
    }

    pub fn title(&self) -> String {
        format!(
            "x: {} y: {} health: {}",
            self.player.pos.x, self.player.pos.y, self.player.health
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Pos;
    use crate::cone::Pixel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn new_game(settings: &Settings) -> Game {
        let viewport = settings.viewport();
        let grid = LevelGrid::generate(settings.pattern, viewport.grid_width(), viewport.grid_height());
        let mut rng = StdRng::seed_from_u64(3);
        Game::new(settings, grid, &mut rng)
    }

    #[test]
    fn monster_closes_in_then_hurts_every_frame() {
        let mut game = new_game(&Settings::default());
        assert_eq!(game.player.pos, Pos::new(40, 22));
        assert_eq!(game.monsters[0].pos, Pos::new(45, 22));

        let idle = FrameInput::default();
        let outcome = game.update(&idle, 0.3);
        assert!(outcome.chased);
        assert_eq!(game.monsters[0].pos, Pos::new(44, 22));

        for _ in 0..4 {
            game.update(&idle, 0.3);
        }
        assert_eq!(game.monsters[0].pos, Pos::new(40, 22));
        assert_eq!(game.player.health, 100);

        let outcome = game.update(&idle, 0.3);
        assert_eq!(outcome.damage, 10);
        assert_eq!(game.player.health, 90);
        game.update(&idle, 0.3);
        assert_eq!(game.player.health, 80);
    }

    #[test]
    fn chase_waits_for_the_interval() {
        let mut game = new_game(&Settings::default());
        let idle = FrameInput::default();
        assert!(!game.update(&idle, 0.1).chased);
        assert!(!game.update(&idle, 0.1).chased);
        assert_eq!(game.monsters[0].pos, Pos::new(45, 22));
        assert!(game.update(&idle, 0.2).chased);
        assert_eq!(game.monsters[0].pos, Pos::new(44, 22));
    }

    #[test]
    fn co_located_monsters_stack_damage() {
        let mut game = new_game(&Settings::default());
        game.monsters = vec![Monster::new(Pos::new(40, 22)), Monster::new(Pos::new(40, 22))];
        let outcome = game.update(&FrameInput::default(), 0.0);
        assert_eq!(outcome.damage, 20);
        assert_eq!(game.player.health, 80);
    }

    #[test]
    fn game_keeps_running_after_death() {
        let settings = Settings {
            start_health: 10,
            ..Settings::default()
        };
        let mut game = new_game(&settings);
        game.monsters = vec![Monster::new(Pos::new(40, 22))];
        game.update(&FrameInput::default(), 0.0);
        assert!(game.is_over());

        let mut input = FrameInput::default();
        input.hold(Dir::Left);
        game.update(&input, 0.3);
        assert_eq!(game.player.pos, Pos::new(39, 22));
        assert_eq!(game.monsters[0].pos, Pos::new(39, 22));
        game.update(&FrameInput::default(), 0.0);
        assert_eq!(game.player.health, -10);
    }

    #[test]
    fn held_keys_apply_in_frame_order() {
        let mut game = new_game(&Settings::default());
        game.monsters.clear();
        let mut input = FrameInput::default();
        input.hold(Dir::Right);
        input.hold(Dir::Up);
        game.update(&input, 0.0);
        assert_eq!(game.player.pos, Pos::new(41, 21));
        // the last applied move decides the facing
        assert!((game.player.facing() - Dir::Up.heading()).abs() < 1e-6);
    }

    #[test]
    fn player_stays_on_grid() {
        let mut game = new_game(&Settings::default());
        game.monsters.clear();
        let mut input = FrameInput::default();
        input.hold(Dir::Down);
        for _ in 0..100 {
            game.update(&input, 0.0);
        }
        assert_eq!(game.player.pos, Pos::new(40, 44));
    }

    #[test]
    fn facing_aim_follows_rotation() {
        let settings = Settings {
            aim: Aim::Facing,
            monsters: 0,
            ..Settings::default()
        };
        let mut game = new_game(&settings);
        let input = FrameInput {
            rotate: 6,
            ..FrameInput::default()
        };
        game.update(&input, 0.0);
        // 6 * 15 degrees points straight down
        assert!((game.target_angle() - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert!(matches!(game.frame().get(405, 325), Some(Pixel::Lit(_))));
        assert_eq!(game.frame().get(505, 225), Some(Pixel::Dark));
    }

    #[test]
    fn mouse_aim_lights_toward_cursor() {
        let mut game = new_game(&Settings::default());
        game.monsters.clear();
        let input = FrameInput {
            mouse: Some((100, 225)),
            ..FrameInput::default()
        };
        game.update(&input, 0.0);
        assert!(matches!(game.frame().get(305, 225), Some(Pixel::Lit(_))));
        assert_eq!(game.frame().get(505, 225), Some(Pixel::Dark));

        let toggle = FrameInput {
            toggle_aim: true,
            ..FrameInput::default()
        };
        game.update(&toggle, 0.0);
        assert_eq!(game.aim, Aim::Facing);
        assert!(matches!(game.frame().get(505, 225), Some(Pixel::Lit(_))));
    }

    #[test]
    fn visible_monster_is_reported() {
        let mut game = new_game(&Settings::default());
        let input = FrameInput {
            mouse: Some((700, 225)),
            ..FrameInput::default()
        };
        let outcome = game.update(&input, 0.0);
        assert_eq!(outcome.visible_monsters, 1);
        assert_eq!(game.frame().get(455, 225), Some(Pixel::Monster));
    }

    #[test]
    fn title_tracks_position_and_health() {
        let mut game = new_game(&Settings::default());
        assert_eq!(game.title(), "x: 40 y: 22 health: 100");

        let mut input = FrameInput::default();
        input.hold(Dir::Left);
        game.update(&input, 0.0);
        assert_eq!(game.title(), "x: 39 y: 22 health: 100");

        game.monsters = vec![Monster::new(Pos::new(39, 22))];
        game.update(&FrameInput::default(), 0.0);
        assert_eq!(game.title(), "x: 39 y: 22 health: 90");
    }
}
