use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const MAX_HP: i32 = 100;

pub const PLAYER_RADIUS: f32 = 22.0;
pub const PROJECTILE_RADIUS: f32 = 8.0;
/// Players are clamped this far away from the arena edges.
pub const PLAYER_MARGIN: f32 = 25.0;

pub const PLAYER_SPEED: f32 = 200.0;
pub const SPEED_BOOST_MULTIPLIER: f32 = 1.5;
pub const BOTTLE_SPEED: f32 = 250.0;
pub const MAX_SHOT_SPEED: f32 = 400.0;

pub const SWING_COOLDOWN_MS: u64 = 2000;
pub const SHOOT_COOLDOWN_MS: u64 = 300;

pub const BEER_DAMAGE: i32 = 10;
/// Damage power-up multiplier applied to beer shots. Tunable, not an invariant.
pub const DAMAGE_BOOST_MULTIPLIER: i32 = 2;
pub const BEER_HIT_RADIUS: f32 = 25.0;
pub const BEER_LIFETIME_MS: u64 = 5000;

pub const BOTTLE_LIFETIME_MS: u64 = 2000;
pub const BOTTLE_AOE_RADIUS: f32 = 60.0;
pub const BOTTLE_AOE_DAMAGE: i32 = 25;

pub const HIT_SCORE: f32 = 5.0;
pub const KILL_SCORE: f32 = 50.0;

pub const POWER_UP_DURATION_MS: u64 = 10_000;
pub const POWER_UP_RESPAWN_MS: u64 = 20_000;
pub const POWER_UP_PICKUP_RADIUS: f32 = 35.0;
pub const MAX_POWER_UPS: usize = 5;

pub const HILL_RADIUS: f32 = 80.0;
pub const HILL_SCORE_RATE: f32 = 25.0;
pub const HILL_MOVE_INTERVAL_MS: u64 = 45_000;

pub const NAME_MAX_LEN: usize = 20;

/// An axis-aligned point in arena space (bushes, trees, spawn markers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// A static rotated rectangular obstacle. `angle` is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    Speed,
    Damage,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub kind: PowerUpKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Straight-line shot that damages the first player it touches.
    Beer,
    /// Melee throw that detonates with area damage.
    Bottle,
}

/// Wire projection of a projectile, broadcast on creation so clients can
/// reconcile locally predicted shots via `local_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u32,
    pub owner: u32,
    pub local_id: Option<u32>,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub kind: ProjectileKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HillZone {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HillStatus {
    pub controller: Option<u32>,
    pub contested: bool,
    pub king: Option<u32>,
}

/// Rounded, broadcast-ready projection of a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u32,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub hp: i32,
    pub score: i32,
    pub kills: u32,
    pub damage_dealt: i32,
    pub alive: bool,
    pub dir_x: f32,
    pub dir_y: f32,
    pub power_up: Option<PowerUpKind>,
    pub hill_time: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: u32,
    pub name: String,
    pub score: i32,
    pub kills: u32,
    pub damage: i32,
}

/// All messages exchanged between clients and the server, carried as bincode
/// datagrams. The first four variants are client-to-server; the rest are
/// server-to-client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Packet {
    Join {
        name: String,
    },
    Input {
        sequence: u32,
        left: bool,
        right: bool,
        up: bool,
        down: bool,
        swing: bool,
        /// Claimed melee target. Informational only; damage always comes from
        /// server-side proximity checks.
        target_id: Option<u32>,
        /// Attacker position as the client saw it, likewise informational.
        aim_x: Option<f32>,
        aim_y: Option<f32>,
    },
    Shoot {
        x: f32,
        y: f32,
        vel_x: f32,
        vel_y: f32,
        local_id: Option<u32>,
    },
    Leave,

    Joined {
        client_id: u32,
        self_state: PlayerSnapshot,
        walls: Vec<Wall>,
        bushes: Vec<Point>,
        trees: Vec<Point>,
        world_width: f32,
        world_height: f32,
        power_ups: Vec<PowerUp>,
        hill: HillZone,
    },
    JoinError {
        message: String,
    },
    PlayerJoined {
        player: PlayerSnapshot,
    },
    PlayerLeft {
        id: u32,
    },
    State {
        players: Vec<PlayerSnapshot>,
        leaderboard: Vec<LeaderboardEntry>,
        hill: HillStatus,
        last_processed_input: HashMap<u32, u32>,
    },
    PlayerDied {
        id: u32,
        by: u32,
    },
    Respawned,
    BeerHit {
        attacker_id: u32,
        target_id: u32,
        x: f32,
        y: f32,
    },
    ProjectileCreated {
        projectile: ProjectileSnapshot,
    },
    ProjectileDestroyed {
        id: u32,
    },
    ProjectileShattered {
        id: u32,
        x: f32,
        y: f32,
    },
    PowerUpSpawned {
        power_up: PowerUp,
    },
    PowerUpCollected {
        power_up_id: u32,
        player_id: u32,
    },
    HillMoved {
        hill: HillZone,
    },
}

/// Truncates a display name to [`NAME_MAX_LEN`] characters and strips the
/// characters `<>/\:"|?*`. Empty or all-stripped names fall back to "Player".
pub fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .take(NAME_MAX_LEN)
        .filter(|c| !matches!(c, '<' | '>' | '/' | ':' | '"' | '\\' | '|' | '?' | '*'))
        .collect();

    if cleaned.trim().is_empty() {
        "Player".to_string()
    } else {
        cleaned
    }
}

/// Rounds a coordinate to two decimals for broadcast snapshots.
pub fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_sanitize_name_strips_reserved_characters() {
        assert_eq!(sanitize_name("<b>bob</b>"), "bbobb");
        assert_eq!(sanitize_name("a:b|c?d*e"), "abcde");
        assert_eq!(sanitize_name("back\\slash"), "backslash");
    }

    #[test]
    fn test_sanitize_name_truncates_before_stripping() {
        let long = "x".repeat(40);
        assert_eq!(sanitize_name(&long).len(), NAME_MAX_LEN);
    }

    #[test]
    fn test_sanitize_name_fallback() {
        assert_eq!(sanitize_name(""), "Player");
        assert_eq!(sanitize_name("<<>>"), "Player");
        assert_eq!(sanitize_name("   "), "Player");
    }

    #[test]
    fn test_round2() {
        assert_approx_eq!(round2(123.456_78), 123.46, 0.0001);
        assert_approx_eq!(round2(-0.005), 0.0, 0.011);
    }

    #[test]
    fn test_packet_serialization_join() {
        let packet = Packet::Join {
            name: "Heidi".to_string(),
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Join { name } => assert_eq!(name, "Heidi"),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_input() {
        let packet = Packet::Input {
            sequence: 123,
            left: true,
            right: false,
            up: false,
            down: true,
            swing: true,
            target_id: Some(7),
            aim_x: Some(100.0),
            aim_y: Some(200.0),
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Input {
                sequence,
                left,
                right,
                up,
                down,
                swing,
                target_id,
                ..
            } => {
                assert_eq!(sequence, 123);
                assert!(left);
                assert!(!right);
                assert!(!up);
                assert!(down);
                assert!(swing);
                assert_eq!(target_id, Some(7));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_shoot() {
        let packet = Packet::Shoot {
            x: 100.0,
            y: 200.0,
            vel_x: 300.0,
            vel_y: -100.0,
            local_id: Some(42),
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Shoot {
                x,
                y,
                vel_x,
                vel_y,
                local_id,
            } => {
                assert_approx_eq!(x, 100.0);
                assert_approx_eq!(y, 200.0);
                assert_approx_eq!(vel_x, 300.0);
                assert_approx_eq!(vel_y, -100.0);
                assert_eq!(local_id, Some(42));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_state() {
        let players = vec![PlayerSnapshot {
            id: 1,
            name: "Heidi".to_string(),
            x: 100.25,
            y: 200.5,
            hp: 80,
            score: 55,
            kills: 1,
            damage_dealt: 35,
            alive: true,
            dir_x: 1.0,
            dir_y: 0.0,
            power_up: Some(PowerUpKind::Speed),
            hill_time: 3,
        }];

        let leaderboard = vec![LeaderboardEntry {
            id: 1,
            name: "Heidi".to_string(),
            score: 55,
            kills: 1,
            damage: 35,
        }];

        let mut last_processed_input = HashMap::new();
        last_processed_input.insert(1u32, 17u32);

        let packet = Packet::State {
            players,
            leaderboard,
            hill: HillStatus {
                controller: Some(1),
                contested: false,
                king: Some(1),
            },
            last_processed_input,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::State {
                players,
                leaderboard,
                hill,
                last_processed_input,
            } => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].power_up, Some(PowerUpKind::Speed));
                assert_eq!(leaderboard[0].score, 55);
                assert_eq!(hill.controller, Some(1));
                assert!(!hill.contested);
                assert_eq!(last_processed_input.get(&1), Some(&17));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_projectile() {
        let packet = Packet::ProjectileCreated {
            projectile: ProjectileSnapshot {
                id: 9,
                owner: 1,
                local_id: None,
                x: 10.0,
                y: 20.0,
                vel_x: 250.0,
                vel_y: 0.0,
                kind: ProjectileKind::Bottle,
            },
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::ProjectileCreated { projectile } => {
                assert_eq!(projectile.kind, ProjectileKind::Bottle);
                assert_eq!(projectile.owner, 1);
                assert_eq!(projectile.local_id, None);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_damage_constants_relationship() {
        // The boosted beer shot must never one-shot a full-health player.
        assert!(BEER_DAMAGE * DAMAGE_BOOST_MULTIPLIER < MAX_HP);
        assert!(BOTTLE_AOE_DAMAGE < MAX_HP);
        // Bottles burn out well before beer shots.
        assert!(BOTTLE_LIFETIME_MS < BEER_LIFETIME_MS);
    }
}
