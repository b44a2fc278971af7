//! King-of-the-hill zone tracking
//!
//! The contested zone cycles through `Unclaimed -> Controlled -> Contested`
//! based on how many living players stand inside it, and relocates on a fixed
//! timer independent of occupancy. Relocation always resets occupancy to
//! `Unclaimed`; the reigning king keeps the crown across moves.

use crate::game::Player;
use rand::Rng;
use shared::{HillStatus, HillZone, HILL_RADIUS, HILL_SCORE_RATE, WORLD_HEIGHT, WORLD_WIDTH};
use std::collections::HashMap;

/// Relocated zones keep this far from the arena edges.
const HILL_PADDING: f32 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Unclaimed,
    Controlled(u32),
    Contested,
}

#[derive(Debug, Clone)]
pub struct HillState {
    pub zone: HillZone,
    pub occupancy: Occupancy,
    /// Player with the highest cumulative hill time so far.
    pub king: Option<u32>,
}

impl HillState {
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let mut state = HillState {
            zone: HillZone {
                x: 0.0,
                y: 0.0,
                radius: HILL_RADIUS,
            },
            occupancy: Occupancy::Unclaimed,
            king: None,
        };
        state.relocate(rng);
        state
    }

    /// Moves the zone to a fresh random position and clears occupancy.
    pub fn relocate<R: Rng>(&mut self, rng: &mut R) {
        self.zone = HillZone {
            x: HILL_PADDING + rng.gen::<f32>() * (WORLD_WIDTH - HILL_PADDING * 2.0),
            y: HILL_PADDING + rng.gen::<f32>() * (WORLD_HEIGHT - HILL_PADDING * 2.0),
            radius: HILL_RADIUS,
        };
        self.occupancy = Occupancy::Unclaimed;
    }

    /// One tick of occupancy evaluation. A sole living occupant controls the
    /// zone and accrues score and hill time; more than one occupant contests
    /// it; nobody clears it.
    pub fn update(&mut self, players: &mut HashMap<u32, Player>, dt: f32) {
        let occupants: Vec<u32> = players
            .values()
            .filter(|p| p.alive && (p.x - self.zone.x).hypot(p.y - self.zone.y) < self.zone.radius)
            .map(|p| p.id)
            .collect();

        match occupants.as_slice() {
            [sole] => {
                let sole = *sole;
                self.occupancy = Occupancy::Controlled(sole);

                let mut hill_time = 0.0;
                if let Some(controller) = players.get_mut(&sole) {
                    controller.score += HILL_SCORE_RATE * dt;
                    controller.hill_time += dt;
                    hill_time = controller.hill_time;
                }

                let dethroned = match self.king.and_then(|k| players.get(&k)) {
                    Some(king) => hill_time > king.hill_time,
                    None => true,
                };
                if dethroned {
                    self.king = Some(sole);
                }
            }
            [] => self.occupancy = Occupancy::Unclaimed,
            _ => self.occupancy = Occupancy::Contested,
        }
    }

    pub fn status(&self) -> HillStatus {
        let (controller, contested) = match self.occupancy {
            Occupancy::Unclaimed => (None, false),
            Occupancy::Controlled(id) => (Some(id), false),
            Occupancy::Contested => (None, true),
        };

        HillStatus {
            controller,
            contested,
            king: self.king,
        }
    }
}
