//! Damage resolution and death transitions
//!
//! All hp mutation funnels through [`damage_player`], which clamps hp to
//! `[0, MAX_HP]`, credits the attacker, and performs the death transition at
//! most once per target: a player who already died earlier in the same
//! resolution pass absorbs no further damage and yields no second kill.

use crate::game::{Outbound, Player};
use log::info;
use shared::{
    Packet, PowerUpKind, BEER_DAMAGE, BOTTLE_AOE_DAMAGE, BOTTLE_AOE_RADIUS,
    DAMAGE_BOOST_MULTIPLIER, HIT_SCORE, KILL_SCORE,
};
use std::collections::HashMap;

/// Point damage of one beer shot, doubled while the attacker holds the
/// damage power-up.
pub fn beer_damage(attacker_power_up: Option<PowerUpKind>) -> i32 {
    if attacker_power_up == Some(PowerUpKind::Damage) {
        BEER_DAMAGE * DAMAGE_BOOST_MULTIPLIER
    } else {
        BEER_DAMAGE
    }
}

/// Applies `amount` damage to `target_id`, attributed to `attacker_id`.
///
/// Dead or departed targets are ignored. The attacker, if still present,
/// receives the hit score and damage statistics, plus the kill bonus when the
/// target dies. Death schedules a respawn at `now_ms + respawn_delay_ms` and
/// broadcasts the kill.
pub fn damage_player(
    players: &mut HashMap<u32, Player>,
    attacker_id: u32,
    target_id: u32,
    amount: i32,
    now_ms: u64,
    respawn_delay_ms: u64,
    events: &mut Vec<Outbound>,
) {
    let died = match players.get_mut(&target_id) {
        Some(target) if target.alive => {
            target.hp -= amount;
            if target.hp <= 0 {
                target.hp = 0;
                target.alive = false;
                target.respawn_at = Some(now_ms + respawn_delay_ms);
                true
            } else {
                false
            }
        }
        _ => return,
    };

    if let Some(attacker) = players.get_mut(&attacker_id) {
        attacker.score += HIT_SCORE;
        attacker.damage_dealt += amount;
        if died {
            attacker.kills += 1;
            attacker.score += KILL_SCORE;
        }
    }

    if died {
        info!("Player {} killed by {}", target_id, attacker_id);
        events.push(Outbound::broadcast(Packet::PlayerDied {
            id: target_id,
            by: attacker_id,
        }));
    }
}

/// Detonates a bottle at `(x, y)`: every living player other than the owner
/// within the blast radius takes area damage once.
pub fn detonate_bottle(
    players: &mut HashMap<u32, Player>,
    owner: u32,
    x: f32,
    y: f32,
    now_ms: u64,
    respawn_delay_ms: u64,
    events: &mut Vec<Outbound>,
) {
    let targets: Vec<u32> = players
        .values()
        .filter(|p| p.alive && p.id != owner && (p.x - x).hypot(p.y - y) < BOTTLE_AOE_RADIUS)
        .map(|p| p.id)
        .collect();

    for target_id in targets {
        damage_player(
            players,
            owner,
            target_id,
            BOTTLE_AOE_DAMAGE,
            now_ms,
            respawn_delay_ms,
            events,
        );
    }
}
