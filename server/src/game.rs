//! Authoritative world state and the fixed-tick simulation step
//!
//! [`World`] owns every live entity: players, in-flight projectiles, active
//! power-ups and the hill. It is mutated exclusively by the server's main
//! loop, which feeds it validated gateway commands ([`World::apply_input`],
//! [`World::apply_shoot`]) between ticks and advances the simulation with
//! [`World::tick`]. Every mutation that clients must hear about is pushed
//! into the caller's event buffer as an [`Outbound`] rather than sent
//! directly, which keeps the whole simulation constructible and steppable in
//! unit tests without a socket.

use crate::collision;
use crate::combat;
use crate::hill::HillState;
use crate::layout::ArenaLayout;
use log::info;
use rand::rngs::StdRng;
use rand::Rng;
use shared::{
    round2, sanitize_name, LeaderboardEntry, Packet, PlayerSnapshot, Point, PowerUp, PowerUpKind,
    ProjectileKind, ProjectileSnapshot, BEER_HIT_RADIUS, BEER_LIFETIME_MS, BOTTLE_LIFETIME_MS,
    BOTTLE_SPEED, MAX_HP, MAX_POWER_UPS, MAX_SHOT_SPEED, PLAYER_MARGIN, PLAYER_SPEED,
    POWER_UP_DURATION_MS, POWER_UP_PICKUP_RADIUS, POWER_UP_RESPAWN_MS, SHOOT_COOLDOWN_MS,
    SPEED_BOOST_MULTIPLIER, SWING_COOLDOWN_MS, WORLD_HEIGHT, WORLD_WIDTH,
};
use std::collections::HashMap;

/// Spawn searches reject positions a player could not stand on.
const SPAWN_CLEARANCE_RADIUS: f32 = 25.0;
const JOIN_SPAWN_ATTEMPTS: u32 = 50;
const RESPAWN_ATTEMPTS: u32 = 100;
/// A spawn marker is unavailable while an unpicked power-up sits this close.
const POWER_UP_MIN_SEPARATION: f32 = 50.0;

/// An outbound packet together with its delivery scope. The network layer
/// resolves player ids to socket addresses; the simulation never sees either.
#[derive(Debug)]
pub enum Outbound {
    Single { player_id: u32, packet: Packet },
    Broadcast { packet: Packet, exclude: Option<u32> },
}

impl Outbound {
    pub fn to(player_id: u32, packet: Packet) -> Self {
        Outbound::Single { player_id, packet }
    }

    pub fn broadcast(packet: Packet) -> Self {
        Outbound::Broadcast {
            packet,
            exclude: None,
        }
    }

    pub fn broadcast_except(exclude: u32, packet: Packet) -> Self {
        Outbound::Broadcast {
            packet,
            exclude: Some(exclude),
        }
    }
}

/// A validated movement/melee command from the gateway. Only the latest one
/// per player matters; there is no server-side input replay.
#[derive(Debug, Clone)]
pub struct InputCommand {
    pub sequence: u32,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub swing: bool,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub hp: i32,
    pub score: f32,
    pub kills: u32,
    pub damage_dealt: i32,
    pub alive: bool,
    pub respawn_at: Option<u64>,
    pub last_input_seq: u32,
    /// Last movement direction as a unit vector. Persists across zero-input
    /// frames so melee swings always have a facing.
    pub dir_x: f32,
    pub dir_y: f32,
    pub power_up: Option<PowerUpKind>,
    pub power_up_until: u64,
    pub last_swing_at: u64,
    pub last_shot_at: u64,
    pub hill_time: f32,
}

impl Player {
    pub fn new(id: u32, name: &str, x: f32, y: f32) -> Self {
        Self {
            id,
            name: name.to_string(),
            x,
            y,
            vel_x: 0.0,
            vel_y: 0.0,
            hp: MAX_HP,
            score: 0.0,
            kills: 0,
            damage_dealt: 0,
            alive: true,
            respawn_at: None,
            last_input_seq: 0,
            dir_x: 1.0,
            dir_y: 0.0,
            power_up: None,
            power_up_until: 0,
            last_swing_at: 0,
            last_shot_at: 0,
            hill_time: 0.0,
        }
    }

    /// Rounded projection for broadcast.
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            x: round2(self.x),
            y: round2(self.y),
            hp: self.hp,
            score: self.score.round() as i32,
            kills: self.kills,
            damage_dealt: self.damage_dealt,
            alive: self.alive,
            dir_x: self.dir_x,
            dir_y: self.dir_y,
            power_up: self.power_up,
            hill_time: self.hill_time.round() as u32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u32,
    pub owner: u32,
    pub local_id: Option<u32>,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub kind: ProjectileKind,
    pub created_at: u64,
}

impl Projectile {
    pub fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: self.id,
            owner: self.owner,
            local_id: self.local_id,
            x: self.x,
            y: self.y,
            vel_x: self.vel_x,
            vel_y: self.vel_y,
            kind: self.kind,
        }
    }
}

/// The authoritative world, owned by the simulation loop.
pub struct World {
    pub layout: ArenaLayout,
    pub players: HashMap<u32, Player>,
    pub projectiles: Vec<Projectile>,
    pub power_ups: HashMap<u32, PowerUp>,
    pub hill: HillState,
    next_power_up_id: u32,
    /// Deadlines for power-up respawns scheduled after pickups.
    pending_power_up_spawns: Vec<u64>,
    respawn_delay_ms: u64,
    rng: StdRng,
}

impl World {
    pub fn new(layout: ArenaLayout, respawn_delay_ms: u64, mut rng: StdRng) -> Self {
        let hill = HillState::new(&mut rng);
        Self {
            layout,
            players: HashMap::new(),
            projectiles: Vec::new(),
            power_ups: HashMap::new(),
            hill,
            next_power_up_id: 0,
            pending_power_up_spawns: Vec::new(),
            respawn_delay_ms,
            rng,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Creates a player at a wall-clear position (map center when the search
    /// budget runs out) and returns their snapshot for the join broadcast.
    pub fn add_player(&mut self, id: u32, raw_name: &str) -> PlayerSnapshot {
        let name = sanitize_name(raw_name);
        let (x, y) = sample_clear_position(&mut self.rng, &self.layout.walls, JOIN_SPAWN_ATTEMPTS)
            .unwrap_or((WORLD_WIDTH / 2.0, WORLD_HEIGHT / 2.0));

        let player = Player::new(id, &name, x, y);
        info!("Player {} ({}) joined at ({:.0}, {:.0})", id, name, x, y);

        let snapshot = player.snapshot();
        self.players.insert(id, player);
        snapshot
    }

    pub fn remove_player(&mut self, id: u32) -> bool {
        if let Some(player) = self.players.remove(&id) {
            info!("Player {} ({}) left", id, player.name);
            true
        } else {
            false
        }
    }

    /// The full world snapshot sent to a joining connection only.
    pub fn joined_packet(&self, id: u32) -> Option<Packet> {
        let player = self.players.get(&id)?;
        Some(Packet::Joined {
            client_id: id,
            self_state: player.snapshot(),
            walls: self.layout.walls.clone(),
            bushes: self.layout.bushes.clone(),
            trees: self.layout.trees.clone(),
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            power_ups: self.power_ups.values().copied().collect(),
            hill: self.hill.zone,
        })
    }

    /// Stores the player's movement intent for the next tick and resolves an
    /// optional melee swing. Ignored for dead or unknown players.
    pub fn apply_input(
        &mut self,
        id: u32,
        input: &InputCommand,
        now_ms: u64,
        events: &mut Vec<Outbound>,
    ) {
        let swing_from = if let Some(p) = self.players.get_mut(&id) {
            if !p.alive {
                return;
            }

            p.last_input_seq = input.sequence;

            let speed = if p.power_up == Some(PowerUpKind::Speed) {
                PLAYER_SPEED * SPEED_BOOST_MULTIPLIER
            } else {
                PLAYER_SPEED
            };

            let mut vx = 0.0_f32;
            let mut vy = 0.0_f32;
            if input.left {
                vx -= 1.0;
            }
            if input.right {
                vx += 1.0;
            }
            if input.up {
                vy -= 1.0;
            }
            if input.down {
                vy += 1.0;
            }

            let len = vx.hypot(vy);
            if len > 0.0 {
                p.vel_x = vx / len * speed;
                p.vel_y = vy / len * speed;
                p.dir_x = vx / len;
                p.dir_y = vy / len;
            } else {
                p.vel_x = 0.0;
                p.vel_y = 0.0;
            }

            if input.swing && now_ms.saturating_sub(p.last_swing_at) > SWING_COOLDOWN_MS {
                p.last_swing_at = now_ms;
                Some((p.x, p.y, p.dir_x, p.dir_y))
            } else {
                None
            }
        } else {
            return;
        };

        if let Some((x, y, dir_x, dir_y)) = swing_from {
            let mut vel_x = dir_x * BOTTLE_SPEED;
            let mut vel_y = dir_y * BOTTLE_SPEED;
            if vel_x == 0.0 && vel_y == 0.0 {
                vel_x = BOTTLE_SPEED;
            }

            let projectile = Projectile {
                id: self.rng.gen(),
                owner: id,
                local_id: None,
                x,
                y,
                vel_x,
                vel_y,
                kind: ProjectileKind::Bottle,
                created_at: now_ms,
            };

            events.push(Outbound::broadcast(Packet::ProjectileCreated {
                projectile: projectile.snapshot(),
            }));
            self.projectiles.push(projectile);
        }
    }

    /// Creates a beer projectile from a client `shoot`, clamping the
    /// requested speed. The client-reported origin is echoed as-is; only the
    /// velocity magnitude is server-validated.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_shoot(
        &mut self,
        id: u32,
        x: f32,
        y: f32,
        vel_x: f32,
        vel_y: f32,
        local_id: Option<u32>,
        now_ms: u64,
        events: &mut Vec<Outbound>,
    ) {
        if !x.is_finite() || !y.is_finite() || !vel_x.is_finite() || !vel_y.is_finite() {
            return;
        }

        let accepted = if let Some(p) = self.players.get_mut(&id) {
            if !p.alive || now_ms.saturating_sub(p.last_shot_at) < SHOOT_COOLDOWN_MS {
                false
            } else {
                p.last_shot_at = now_ms;
                true
            }
        } else {
            false
        };

        if !accepted {
            return;
        }

        let mut vel_x = vel_x;
        let mut vel_y = vel_y;
        let speed = vel_x.hypot(vel_y);
        if speed > MAX_SHOT_SPEED {
            vel_x = vel_x / speed * MAX_SHOT_SPEED;
            vel_y = vel_y / speed * MAX_SHOT_SPEED;
        }

        let projectile = Projectile {
            id: self.rng.gen(),
            owner: id,
            local_id,
            x,
            y,
            vel_x,
            vel_y,
            kind: ProjectileKind::Beer,
            created_at: now_ms,
        };

        events.push(Outbound::broadcast(Packet::ProjectileCreated {
            projectile: projectile.snapshot(),
        }));
        self.projectiles.push(projectile);
    }

    /// One fixed-rate simulation step. `dt` is the wall-clock delta in
    /// seconds, already clamped by the caller.
    pub fn tick(&mut self, dt: f32, now_ms: u64, events: &mut Vec<Outbound>) {
        self.step_players(dt, now_ms, events);
        self.hill.update(&mut self.players, dt);
        self.step_respawns(now_ms, events);
        self.step_power_up_queue(now_ms, events);
        self.step_projectiles(dt, now_ms, events);
    }

    /// Movement integration, power-up pickup and power-up expiry for every
    /// living player. Dead players stay frozen until their respawn.
    fn step_players(&mut self, dt: f32, now_ms: u64, events: &mut Vec<Outbound>) {
        let walls = &self.layout.walls;

        for p in self.players.values_mut() {
            if !p.alive {
                continue;
            }

            // Axis-separated sliding response: a blocked axis reverts and
            // zeroes, the other axis keeps moving.
            let next_x = (p.x + p.vel_x * dt).clamp(PLAYER_MARGIN, WORLD_WIDTH - PLAYER_MARGIN);
            if collision::player_blocked(walls, next_x, p.y) {
                p.vel_x = 0.0;
            } else {
                p.x = next_x;
            }

            let next_y = (p.y + p.vel_y * dt).clamp(PLAYER_MARGIN, WORLD_HEIGHT - PLAYER_MARGIN);
            if collision::player_blocked(walls, p.x, next_y) {
                p.vel_y = 0.0;
            } else {
                p.y = next_y;
            }

            let picked = self
                .power_ups
                .iter()
                .find(|(_, pu)| (p.x - pu.x).hypot(p.y - pu.y) < POWER_UP_PICKUP_RADIUS)
                .map(|(pu_id, _)| *pu_id);

            if let Some(pu_id) = picked {
                if let Some(pu) = self.power_ups.remove(&pu_id) {
                    p.power_up = Some(pu.kind);
                    p.power_up_until = now_ms + POWER_UP_DURATION_MS;
                    self.pending_power_up_spawns
                        .push(now_ms + POWER_UP_RESPAWN_MS);
                    events.push(Outbound::broadcast(Packet::PowerUpCollected {
                        power_up_id: pu_id,
                        player_id: p.id,
                    }));
                }
            }

            if p.power_up.is_some() && now_ms >= p.power_up_until {
                p.power_up = None;
                p.power_up_until = 0;
            }
        }
    }

    /// Revives dead players whose respawn deadline has passed.
    fn step_respawns(&mut self, now_ms: u64, events: &mut Vec<Outbound>) {
        let walls = &self.layout.walls;
        let rng = &mut self.rng;

        for p in self.players.values_mut() {
            if p.alive {
                continue;
            }
            let due = matches!(p.respawn_at, Some(at) if now_ms >= at);
            if !due {
                continue;
            }

            let (x, y) = sample_clear_position(rng, walls, RESPAWN_ATTEMPTS)
                .unwrap_or_else(|| fallback_safe_spot(rng));
            p.x = x;
            p.y = y;
            p.hp = MAX_HP;
            p.alive = true;
            p.respawn_at = None;
            p.vel_x = 0.0;
            p.vel_y = 0.0;

            events.push(Outbound::to(p.id, Packet::Respawned));
        }
    }

    /// Spawns power-ups whose post-pickup respawn deadline has passed.
    fn step_power_up_queue(&mut self, now_ms: u64, events: &mut Vec<Outbound>) {
        let due = self
            .pending_power_up_spawns
            .iter()
            .filter(|&&t| now_ms >= t)
            .count();
        if due == 0 {
            return;
        }

        self.pending_power_up_spawns.retain(|&t| now_ms < t);
        for _ in 0..due {
            self.spawn_power_up(events);
        }
    }

    /// Advances projectiles and resolves hits and expiries. Expiry wins when
    /// both apply in the same tick; a beer shot hits at most one player.
    fn step_projectiles(&mut self, dt: f32, now_ms: u64, events: &mut Vec<Outbound>) {
        let mut projectiles = std::mem::take(&mut self.projectiles);

        projectiles.retain_mut(|proj| {
            proj.x += proj.vel_x * dt;
            proj.y += proj.vel_y * dt;

            let lifetime = match proj.kind {
                ProjectileKind::Bottle => BOTTLE_LIFETIME_MS,
                ProjectileKind::Beer => BEER_LIFETIME_MS,
            };

            let expired = now_ms.saturating_sub(proj.created_at) > lifetime
                || collision::projectile_blocked(&self.layout.walls, proj.x, proj.y);

            if expired {
                match proj.kind {
                    ProjectileKind::Bottle => {
                        combat::detonate_bottle(
                            &mut self.players,
                            proj.owner,
                            proj.x,
                            proj.y,
                            now_ms,
                            self.respawn_delay_ms,
                            events,
                        );
                        events.push(Outbound::broadcast(Packet::ProjectileShattered {
                            id: proj.id,
                            x: proj.x,
                            y: proj.y,
                        }));
                    }
                    ProjectileKind::Beer => {
                        events.push(Outbound::broadcast(Packet::ProjectileDestroyed {
                            id: proj.id,
                        }));
                    }
                }
                return false;
            }

            let contact = self
                .players
                .values()
                .find(|p| {
                    p.alive
                        && p.id != proj.owner
                        && (p.x - proj.x).hypot(p.y - proj.y) < BEER_HIT_RADIUS
                })
                .map(|p| (p.id, p.x, p.y));

            if let Some((target_id, target_x, target_y)) = contact {
                match proj.kind {
                    ProjectileKind::Beer => {
                        let amount = combat::beer_damage(
                            self.players.get(&proj.owner).and_then(|a| a.power_up),
                        );
                        events.push(Outbound::broadcast(Packet::BeerHit {
                            attacker_id: proj.owner,
                            target_id,
                            x: target_x,
                            y: target_y,
                        }));
                        combat::damage_player(
                            &mut self.players,
                            proj.owner,
                            target_id,
                            amount,
                            now_ms,
                            self.respawn_delay_ms,
                            events,
                        );
                        events.push(Outbound::broadcast(Packet::ProjectileDestroyed {
                            id: proj.id,
                        }));
                    }
                    // Bottles never apply point damage: reaching a player
                    // triggers the detonation instead.
                    ProjectileKind::Bottle => {
                        combat::detonate_bottle(
                            &mut self.players,
                            proj.owner,
                            proj.x,
                            proj.y,
                            now_ms,
                            self.respawn_delay_ms,
                            events,
                        );
                        events.push(Outbound::broadcast(Packet::ProjectileShattered {
                            id: proj.id,
                            x: proj.x,
                            y: proj.y,
                        }));
                    }
                }
                return false;
            }

            true
        });

        self.projectiles = projectiles;
    }

    /// Places a new power-up on a free spawn marker, up to the cap.
    pub fn spawn_power_up(&mut self, events: &mut Vec<Outbound>) {
        if self.power_ups.len() >= MAX_POWER_UPS {
            return;
        }

        let available: Vec<Point> = self
            .layout
            .power_up_spawns
            .iter()
            .filter(|loc| {
                !self
                    .power_ups
                    .values()
                    .any(|pu| (pu.x - loc.x).hypot(pu.y - loc.y) < POWER_UP_MIN_SEPARATION)
            })
            .copied()
            .collect();

        if available.is_empty() {
            return;
        }

        let loc = available[self.rng.gen_range(0..available.len())];
        let kind = if self.rng.gen_bool(0.5) {
            PowerUpKind::Speed
        } else {
            PowerUpKind::Damage
        };
        let id = self.next_power_up_id;
        self.next_power_up_id += 1;

        let power_up = PowerUp {
            id,
            x: loc.x,
            y: loc.y,
            kind,
        };
        self.power_ups.insert(id, power_up);
        events.push(Outbound::broadcast(Packet::PowerUpSpawned { power_up }));
    }

    /// Relocates the hill and announces the new geometry.
    pub fn move_hill(&mut self, events: &mut Vec<Outbound>) {
        self.hill.relocate(&mut self.rng);
        info!(
            "Hill moved to ({:.0}, {:.0})",
            self.hill.zone.x, self.hill.zone.y
        );
        events.push(Outbound::broadcast(Packet::HillMoved {
            hill: self.hill.zone,
        }));
    }

    /// The throttled broadcast snapshot: rounded players, top-10 leaderboard
    /// and hill status, plus the per-player reconciliation sequence map.
    pub fn state_packet(&self) -> Packet {
        let players: Vec<PlayerSnapshot> = self.players.values().map(Player::snapshot).collect();

        let mut by_score: Vec<&Player> = self.players.values().collect();
        by_score.sort_by(|a, b| b.score.total_cmp(&a.score));
        let leaderboard: Vec<LeaderboardEntry> = by_score
            .into_iter()
            .take(10)
            .map(|p| LeaderboardEntry {
                id: p.id,
                name: p.name.clone(),
                score: p.score.round() as i32,
                kills: p.kills,
                damage: p.damage_dealt,
            })
            .collect();

        let last_processed_input = self
            .players
            .iter()
            .map(|(id, p)| (*id, p.last_input_seq))
            .collect();

        Packet::State {
            players,
            leaderboard,
            hill: self.hill.status(),
            last_processed_input,
        }
    }
}

/// Draws uniform candidates inside the player-reachable area until one clears
/// all walls, up to `attempts`.
fn sample_clear_position(
    rng: &mut StdRng,
    walls: &[shared::Wall],
    attempts: u32,
) -> Option<(f32, f32)> {
    for _ in 0..attempts {
        let x = 50.0 + rng.gen::<f32>() * (WORLD_WIDTH - 100.0);
        let y = 50.0 + rng.gen::<f32>() * (WORLD_HEIGHT - 100.0);
        if !collision::collides(walls, x, y, SPAWN_CLEARANCE_RADIUS) {
            return Some((x, y));
        }
    }
    None
}

/// Deterministic fallback corners/center used when the respawn search budget
/// is exhausted. These sit clear of the inset layout area.
fn fallback_safe_spot(rng: &mut StdRng) -> (f32, f32) {
    let spots = [
        (WORLD_WIDTH * 0.2, WORLD_HEIGHT * 0.2),
        (WORLD_WIDTH * 0.8, WORLD_HEIGHT * 0.2),
        (WORLD_WIDTH * 0.2, WORLD_HEIGHT * 0.8),
        (WORLD_WIDTH * 0.8, WORLD_HEIGHT * 0.8),
        (WORLD_WIDTH * 0.5, WORLD_HEIGHT * 0.5),
    ];
    spots[rng.gen_range(0..spots.len())]
}
