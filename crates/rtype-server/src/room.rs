//! Room difficulty presets and their gameplay multipliers, pinned to the
//! original implementation's exact constants.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomDifficulty {
    Noob,
    Hell,
    Nightmare,
    Custom,
}

impl Default for RoomDifficulty {
    fn default() -> Self {
        RoomDifficulty::Hell
    }
}

/// Per-room gameplay tuning: enemy/player multipliers, score multiplier,
/// and starting lives. `Custom` rooms start from a preset and may then be
/// adjusted by the host, subject to [`RoomConfig::clamp_custom`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub mode: RoomDifficulty,
    pub enemy_stat_multiplier: f32,
    pub player_speed_multiplier: f32,
    pub score_multiplier: f32,
    pub player_lives: u8,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self::preset(RoomDifficulty::Hell)
    }
}

impl RoomConfig {
    pub fn preset(mode: RoomDifficulty) -> Self {
        let (enemy_stat_multiplier, player_speed_multiplier, score_multiplier, player_lives) = match mode {
            RoomDifficulty::Noob => (0.5, 1.0, 0.5, 3),
            RoomDifficulty::Hell => (1.0, 1.0, 1.0, 2),
            RoomDifficulty::Nightmare => (1.5, 0.67, 1.5, 1),
            RoomDifficulty::Custom => (1.0, 1.0, 1.0, 3),
        };
        Self {
            mode,
            enemy_stat_multiplier,
            player_speed_multiplier,
            score_multiplier,
            player_lives,
        }
    }

    /// Clamps a custom room's multipliers to `[0.5, 2.0]` and lives to
    /// `[1, 10]`. Presets are already within range; this only has teeth
    /// for host-supplied `Custom` values.
    pub fn clamp_custom(&mut self) {
        self.enemy_stat_multiplier = self.enemy_stat_multiplier.clamp(0.5, 2.0);
        self.player_speed_multiplier = self.player_speed_multiplier.clamp(0.5, 2.0);
        self.score_multiplier = self.score_multiplier.clamp(0.5, 2.0);
        self.player_lives = self.player_lives.clamp(1, 10);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noob_preset_matches_original_constants() {
        let cfg = RoomConfig::preset(RoomDifficulty::Noob);
        assert_eq!(cfg.enemy_stat_multiplier, 0.5);
        assert_eq!(cfg.player_speed_multiplier, 1.0);
        assert_eq!(cfg.score_multiplier, 0.5);
        assert_eq!(cfg.player_lives, 3);
    }

    #[test]
    fn nightmare_preset_matches_original_constants() {
        let cfg = RoomConfig::preset(RoomDifficulty::Nightmare);
        assert_eq!(cfg.enemy_stat_multiplier, 1.5);
        assert_eq!(cfg.player_speed_multiplier, 0.67);
        assert_eq!(cfg.score_multiplier, 1.5);
        assert_eq!(cfg.player_lives, 1);
    }

    #[test]
    fn clamp_custom_bounds_out_of_range_values() {
        let mut cfg = RoomConfig {
            mode: RoomDifficulty::Custom,
            enemy_stat_multiplier: 9.0,
            player_speed_multiplier: 0.01,
            score_multiplier: 3.0,
            player_lives: 200,
        };
        cfg.clamp_custom();
        assert_eq!(cfg.enemy_stat_multiplier, 2.0);
        assert_eq!(cfg.player_speed_multiplier, 0.5);
        assert_eq!(cfg.score_multiplier, 2.0);
        assert_eq!(cfg.player_lives, 10);
    }

    #[test]
    fn clamp_custom_leaves_in_range_values_untouched() {
        let mut cfg = RoomConfig {
            mode: RoomDifficulty::Custom,
            enemy_stat_multiplier: 1.2,
            player_speed_multiplier: 1.1,
            score_multiplier: 1.3,
            player_lives: 4,
        };
        let before = cfg;
        cfg.clamp_custom();
        assert_eq!(cfg, before);
    }
}
