//! Authoritative pong simulation: ball, paddles, scores and the fixed-step
//! physics that advances them.
//!
//! The aggregate holds no lock of its own. The connection server wraps the
//! single `Game` instance in one mutex and runs every operation under it;
//! critical sections never span network I/O. The engine owns its random
//! source so ball launches are reproducible under a seeded generator in
//! tests.

use log::info;
use rand::rngs::StdRng;
use rand::Rng;
use shared::{
    GameState, BALL_SIZE, BALL_SPEED, GAME_HEIGHT, GAME_WIDTH, PADDLE_HEIGHT, PADDLE_SPEED,
    PADDLE_WIDTH,
};
use std::f32::consts::{FRAC_PI_4, PI};
use std::time::Duration;

/// Ball position and velocity, in game units per tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
}

/// One player's paddle position, score and ready flag.
#[derive(Debug, Clone, Copy)]
pub struct Player {
    /// Paddle top edge, clamped to [0, GAME_HEIGHT - PADDLE_HEIGHT].
    pub position: f32,
    pub score: u16,
    pub ready: bool,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            position: (GAME_HEIGHT - PADDLE_HEIGHT) / 2.0,
            score: 0,
            ready: false,
        }
    }
}

/// Complete game state for the single match this server hosts.
#[derive(Debug)]
pub struct Game {
    pub ball: Ball,
    pub player1: Player,
    pub player2: Player,
    pub is_running: bool,
    pub update_rate: Duration,
    rng: StdRng,
}

impl Game {
    /// Creates a stopped game: paddles centered, scores zero, ball resting
    /// at the center of the field.
    pub fn new(update_rate: Duration, rng: StdRng) -> Self {
        Self {
            ball: Ball {
                x: GAME_WIDTH / 2.0,
                y: GAME_HEIGHT / 2.0,
                ..Ball::default()
            },
            player1: Player::default(),
            player2: Player::default(),
            is_running: false,
            update_rate,
            rng,
        }
    }

    /// Recenters the ball and launches it at the fixed ball speed along a
    /// random angle within 45 degrees of horizontal, toward the left or
    /// right side with equal probability. The launch is never purely
    /// vertical.
    pub fn reset_ball(&mut self) {
        self.ball.x = GAME_WIDTH / 2.0;
        self.ball.y = GAME_HEIGHT / 2.0;

        let mut angle = self.rng.gen_range(-FRAC_PI_4..FRAC_PI_4);
        if self.rng.gen_bool(0.5) {
            angle += PI;
        }

        self.ball.velocity_x = BALL_SPEED * angle.cos();
        self.ball.velocity_y = BALL_SPEED * angle.sin();
    }

    /// Begins play: scores cleared, ball relaunched, running flag set.
    pub fn start(&mut self) {
        self.player1.score = 0;
        self.player2.score = 0;
        self.reset_ball();
        self.is_running = true;
        info!("Game started");
    }

    /// Moves a paddle one step in `direction` (-1 up, 0 stop, 1 down).
    /// Unknown player ids are silently ignored. Paddles may move before the
    /// game starts; only the ball is frozen pre-start.
    pub fn move_paddle(&mut self, player_id: u8, direction: i8) {
        let player = match player_id {
            1 => &mut self.player1,
            2 => &mut self.player2,
            _ => return,
        };

        let new_position = player.position + f32::from(direction) * PADDLE_SPEED;
        player.position = new_position.clamp(0.0, GAME_HEIGHT - PADDLE_HEIGHT);
    }

    /// Sets a player's ready flag; unknown ids are silently ignored. The
    /// game starts the moment both flags are true, and only then; repeating
    /// the signal while running has no further effect.
    pub fn set_player_ready(&mut self, player_id: u8, ready: bool) {
        match player_id {
            1 => self.player1.ready = ready,
            2 => self.player2.ready = ready,
            _ => return,
        }

        if self.player1.ready && self.player2.ready && !self.is_running {
            self.start();
        }
    }

    /// Advances the simulation by one tick. Does nothing while the game is
    /// not running.
    pub fn update(&mut self) {
        if !self.is_running {
            return;
        }

        self.ball.x += self.ball.velocity_x;
        self.ball.y += self.ball.velocity_y;

        // Top/bottom walls: reflect the vertical velocity only. The ball may
        // overshoot the boundary by up to one tick; the next tick brings it
        // back.
        if self.ball.y <= 0.0 || self.ball.y >= GAME_HEIGHT - BALL_SIZE {
            self.ball.velocity_y = -self.ball.velocity_y;
        }

        // Left paddle (player 1).
        if self.ball.x <= PADDLE_WIDTH
            && self.ball.y + BALL_SIZE >= self.player1.position
            && self.ball.y <= self.player1.position + PADDLE_HEIGHT
        {
            let bounce_angle = self.bounce_angle(self.player1.position);
            self.ball.velocity_x = BALL_SPEED * bounce_angle.cos();
            self.ball.velocity_y = -BALL_SPEED * bounce_angle.sin();
        }

        // Right paddle (player 2).
        if self.ball.x >= GAME_WIDTH - PADDLE_WIDTH - BALL_SIZE
            && self.ball.y + BALL_SIZE >= self.player2.position
            && self.ball.y <= self.player2.position + PADDLE_HEIGHT
        {
            let bounce_angle = self.bounce_angle(self.player2.position);
            self.ball.velocity_x = -BALL_SPEED * bounce_angle.cos();
            self.ball.velocity_y = -BALL_SPEED * bounce_angle.sin();
        }

        if self.ball.x <= 0.0 {
            self.player2.score += 1;
            info!(
                "Player 2 scores ({} - {})",
                self.player1.score, self.player2.score
            );
            self.reset_ball();
        } else if self.ball.x >= GAME_WIDTH {
            self.player1.score += 1;
            info!(
                "Player 1 scores ({} - {})",
                self.player1.score, self.player2.score
            );
            self.reset_ball();
        }
    }

    /// Maps where the ball struck a paddle to a bounce angle in [-45, +45]
    /// degrees: center hits fly flat, edge hits fly steep.
    fn bounce_angle(&self, paddle_position: f32) -> f32 {
        let relative_intersection =
            (paddle_position + PADDLE_HEIGHT / 2.0 - self.ball.y) / (PADDLE_HEIGHT / 2.0);
        relative_intersection * FRAC_PI_4
    }

    /// Copies the aggregate into a wire snapshot. Called under the server's
    /// game lock; encoding happens after the lock is released.
    pub fn snapshot(&self) -> GameState {
        GameState {
            ball_x: self.ball.x,
            ball_y: self.ball.y,
            player1_y: self.player1.position,
            player1_score: self.player1.score,
            player2_y: self.player2.position,
            player2_score: self.player2.score,
            is_running: u8::from(self.is_running),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;

    const PADDLE_CENTER: f32 = (GAME_HEIGHT - PADDLE_HEIGHT) / 2.0;

    fn test_game() -> Game {
        Game::new(Duration::from_millis(16), StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_new_game_is_centered_and_stopped() {
        let game = test_game();

        assert!(!game.is_running);
        assert_eq!(game.ball.x, GAME_WIDTH / 2.0);
        assert_eq!(game.ball.y, GAME_HEIGHT / 2.0);
        assert_eq!(game.ball.velocity_x, 0.0);
        assert_eq!(game.ball.velocity_y, 0.0);
        assert_eq!(game.player1.position, PADDLE_CENTER);
        assert_eq!(game.player2.position, PADDLE_CENTER);
        assert_eq!(game.player1.score, 0);
        assert_eq!(game.player2.score, 0);
        assert!(!game.player1.ready);
        assert!(!game.player2.ready);
    }

    #[test]
    fn test_reset_ball_speed_and_direction() {
        let mut game = test_game();
        let mut seen_left = false;
        let mut seen_right = false;

        for _ in 0..200 {
            game.reset_ball();

            assert_eq!(game.ball.x, GAME_WIDTH / 2.0);
            assert_eq!(game.ball.y, GAME_HEIGHT / 2.0);

            let speed =
                (game.ball.velocity_x.powi(2) + game.ball.velocity_y.powi(2)).sqrt();
            assert_approx_eq!(speed, BALL_SPEED, 1e-4);

            // The launch cone is within 45 degrees of horizontal, so the
            // horizontal component always dominates; never purely vertical.
            assert!(game.ball.velocity_x.abs() > 0.0);
            assert!(game.ball.velocity_x.abs() >= game.ball.velocity_y.abs() - 1e-4);

            if game.ball.velocity_x < 0.0 {
                seen_left = true;
            } else {
                seen_right = true;
            }
        }

        assert!(seen_left && seen_right);
    }

    #[test]
    fn test_move_paddle_clamps_to_field() {
        let mut game = test_game();

        for _ in 0..200 {
            game.move_paddle(1, -1);
        }
        assert_eq!(game.player1.position, 0.0);

        for _ in 0..200 {
            game.move_paddle(1, 1);
        }
        assert_eq!(game.player1.position, GAME_HEIGHT - PADDLE_HEIGHT);
    }

    #[test]
    fn test_move_paddle_steps_by_paddle_speed() {
        let mut game = test_game();

        game.move_paddle(2, 1);
        assert_approx_eq!(game.player2.position, PADDLE_CENTER + PADDLE_SPEED);

        game.move_paddle(2, -1);
        assert_approx_eq!(game.player2.position, PADDLE_CENTER);

        game.move_paddle(2, 0);
        assert_approx_eq!(game.player2.position, PADDLE_CENTER);
    }

    #[test]
    fn test_move_paddle_unknown_player_ignored() {
        let mut game = test_game();

        game.move_paddle(3, 1);
        game.move_paddle(0, -1);

        assert_eq!(game.player1.position, PADDLE_CENTER);
        assert_eq!(game.player2.position, PADDLE_CENTER);
    }

    #[test]
    fn test_paddles_move_before_game_starts() {
        let mut game = test_game();
        assert!(!game.is_running);

        game.move_paddle(1, 1);
        assert_approx_eq!(game.player1.position, PADDLE_CENTER + PADDLE_SPEED);
    }

    #[test]
    fn test_ready_handshake_starts_game() {
        let mut game = test_game();
        game.player1.score = 3;
        game.player2.score = 5;

        game.set_player_ready(1, true);
        assert!(!game.is_running);

        game.set_player_ready(2, true);
        assert!(game.is_running);
        assert_eq!(game.player1.score, 0);
        assert_eq!(game.player2.score, 0);
        assert!(game.ball.velocity_x != 0.0);
    }

    #[test]
    fn test_repeated_ready_is_idempotent() {
        let mut game = test_game();
        game.set_player_ready(1, true);
        game.set_player_ready(2, true);
        assert!(game.is_running);

        game.player1.score = 2;
        let velocity_x = game.ball.velocity_x;

        game.set_player_ready(1, true);

        assert!(game.is_running);
        assert_eq!(game.player1.score, 2);
        assert_eq!(game.ball.velocity_x, velocity_x);
    }

    #[test]
    fn test_ready_unknown_player_ignored() {
        let mut game = test_game();

        game.set_player_ready(9, true);

        assert!(!game.player1.ready);
        assert!(!game.player2.ready);
        assert!(!game.is_running);
    }

    #[test]
    fn test_update_is_noop_when_not_running() {
        let mut game = test_game();
        game.ball.velocity_x = BALL_SPEED;
        game.ball.velocity_y = BALL_SPEED;
        let before = game.snapshot();

        game.update();

        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_update_integrates_velocity() {
        let mut game = test_game();
        game.set_player_ready(1, true);
        game.set_player_ready(2, true);

        game.ball.x = 400.0;
        game.ball.y = 300.0;
        game.ball.velocity_x = 3.0;
        game.ball.velocity_y = -2.0;

        game.update();

        assert_approx_eq!(game.ball.x, 403.0);
        assert_approx_eq!(game.ball.y, 298.0);
    }

    #[test]
    fn test_wall_bounce_reflects_vertical_velocity() {
        let mut game = test_game();
        game.set_player_ready(1, true);
        game.set_player_ready(2, true);

        game.ball.x = 400.0;
        game.ball.y = 2.0;
        game.ball.velocity_x = 1.0;
        game.ball.velocity_y = -4.0;

        game.update();

        assert_approx_eq!(game.ball.velocity_y, 4.0);
        assert_approx_eq!(game.ball.velocity_x, 1.0);
    }

    #[test]
    fn test_left_paddle_center_hit_bounces_flat() {
        let mut game = test_game();
        game.set_player_ready(1, true);
        game.set_player_ready(2, true);

        // One tick from now the ball sits inside the left paddle's x-range,
        // dead center on the paddle.
        game.ball.x = PADDLE_WIDTH + 3.0;
        game.ball.y = game.player1.position + PADDLE_HEIGHT / 2.0;
        game.ball.velocity_x = -BALL_SPEED;
        game.ball.velocity_y = 0.0;

        game.update();

        assert_approx_eq!(game.ball.velocity_x, BALL_SPEED, 1e-4);
        assert_approx_eq!(game.ball.velocity_y, 0.0, 1e-4);
    }

    #[test]
    fn test_right_paddle_reflects_leftward() {
        let mut game = test_game();
        game.set_player_ready(1, true);
        game.set_player_ready(2, true);

        game.ball.x = GAME_WIDTH - PADDLE_WIDTH - BALL_SIZE - 3.0;
        game.ball.y = game.player2.position + PADDLE_HEIGHT / 2.0;
        game.ball.velocity_x = BALL_SPEED;
        game.ball.velocity_y = 0.0;

        game.update();

        assert!(game.ball.velocity_x < 0.0);
        assert_approx_eq!(game.ball.velocity_x.abs(), BALL_SPEED, 1e-4);
    }

    #[test]
    fn test_upper_paddle_hit_angles_upward() {
        let mut game = test_game();
        game.set_player_ready(1, true);
        game.set_player_ready(2, true);

        // Strike near the top edge of the paddle: negative vy (upward).
        game.ball.x = PADDLE_WIDTH + 3.0;
        game.ball.y = game.player1.position + 5.0;
        game.ball.velocity_x = -BALL_SPEED;
        game.ball.velocity_y = 0.0;

        game.update();

        assert!(game.ball.velocity_x > 0.0);
        assert!(game.ball.velocity_y < 0.0);
    }

    #[test]
    fn test_left_wall_scores_for_player_2() {
        let mut game = test_game();
        game.set_player_ready(1, true);
        game.set_player_ready(2, true);

        // Clear of the paddle's vertical span so only the wall is hit.
        game.ball.x = 2.0;
        game.ball.y = 50.0;
        game.ball.velocity_x = -BALL_SPEED;
        game.ball.velocity_y = 0.0;

        game.update();

        assert_eq!(game.player2.score, 1);
        assert_eq!(game.player1.score, 0);
        assert_eq!(game.ball.x, GAME_WIDTH / 2.0);
        assert_eq!(game.ball.y, GAME_HEIGHT / 2.0);
        assert!(game.is_running);
    }

    #[test]
    fn test_right_wall_scores_for_player_1() {
        let mut game = test_game();
        game.set_player_ready(1, true);
        game.set_player_ready(2, true);

        game.ball.x = GAME_WIDTH - 2.0;
        game.ball.y = 50.0;
        game.ball.velocity_x = BALL_SPEED;
        game.ball.velocity_y = 0.0;

        game.update();

        assert_eq!(game.player1.score, 1);
        assert_eq!(game.player2.score, 0);
        assert_eq!(game.ball.x, GAME_WIDTH / 2.0);
    }

    #[test]
    fn test_scores_accumulate_across_resets() {
        let mut game = test_game();
        game.set_player_ready(1, true);
        game.set_player_ready(2, true);

        for expected in 1..=3u16 {
            game.ball.x = 2.0;
            game.ball.y = 50.0;
            game.ball.velocity_x = -BALL_SPEED;
            game.ball.velocity_y = 0.0;

            game.update();

            assert_eq!(game.player2.score, expected);
        }
    }

    #[test]
    fn test_snapshot_mirrors_state() {
        let mut game = test_game();
        game.set_player_ready(1, true);
        game.set_player_ready(2, true);
        game.move_paddle(1, 1);

        let snapshot = game.snapshot();

        assert_eq!(snapshot.ball_x, game.ball.x);
        assert_eq!(snapshot.ball_y, game.ball.y);
        assert_eq!(snapshot.player1_y, game.player1.position);
        assert_eq!(snapshot.player2_y, game.player2.position);
        assert_eq!(snapshot.player1_score, 0);
        assert_eq!(snapshot.player2_score, 0);
        assert_eq!(snapshot.is_running, 1);
    }

    #[test]
    fn test_seeded_games_launch_identically() {
        let mut a = Game::new(Duration::from_millis(16), StdRng::seed_from_u64(42));
        let mut b = Game::new(Duration::from_millis(16), StdRng::seed_from_u64(42));

        a.reset_ball();
        b.reset_ball();

        assert_eq!(a.ball.velocity_x, b.ball.velocity_x);
        assert_eq!(a.ball.velocity_y, b.ball.velocity_y);
    }
}
