//! Startup generation of the arena's static layout
//!
//! Walls, bushes, trees and power-up spawn markers are placed once before the
//! gateway accepts connections, using bounded rejection sampling: candidates
//! are drawn uniformly inside an inset play area and rejected when they land
//! within the minimum clearance of anything placed earlier. The attempt
//! budget caps the search so generation never loops unbounded; a crowded
//! request simply yields fewer points.

use rand::Rng;
use shared::{Point, Wall, WORLD_HEIGHT, WORLD_WIDTH};

/// Minimum pairwise distance between placed objects.
pub const MIN_CLEARANCE: f32 = 70.0;
/// Candidates are drawn at least this far from the arena edges.
pub const EDGE_INSET: f32 = 80.0;

pub const WALL_COUNT: usize = 8;
pub const BUSH_COUNT: usize = 6;
pub const TREE_COUNT: usize = 4;
pub const POWER_UP_SPAWN_COUNT: usize = 8;

/// Explicit attempt budget for rejection sampling.
#[derive(Debug, Clone, Copy)]
pub struct PlacementBudget {
    pub max_attempts: u32,
}

impl PlacementBudget {
    /// Ten candidate draws per requested point.
    pub fn per_point(count: usize) -> Self {
        Self {
            max_attempts: count as u32 * 10,
        }
    }
}

/// Places up to `count` points inside `width` x `height` such that every
/// pairwise distance, including against `existing`, is at least
/// [`MIN_CLEARANCE`]. Returns fewer points when the budget runs out.
pub fn generate_positions<R: Rng>(
    rng: &mut R,
    count: usize,
    width: f32,
    height: f32,
    existing: &[Point],
    budget: PlacementBudget,
) -> Vec<Point> {
    let mut positions: Vec<Point> = Vec::with_capacity(count);
    let mut attempts = 0;

    while positions.len() < count && attempts < budget.max_attempts {
        let x = EDGE_INSET + rng.gen::<f32>() * (width - EDGE_INSET * 2.0);
        let y = EDGE_INSET + rng.gen::<f32>() * (height - EDGE_INSET * 2.0);

        let clear = existing
            .iter()
            .chain(positions.iter())
            .all(|p| (x - p.x).hypot(y - p.y) >= MIN_CLEARANCE);

        if clear {
            positions.push(Point {
                x: x.floor(),
                y: y.floor(),
            });
        }

        attempts += 1;
    }

    positions
}

/// The immutable static layout of the arena, generated once per process.
#[derive(Debug, Clone)]
pub struct ArenaLayout {
    pub walls: Vec<Wall>,
    pub bushes: Vec<Point>,
    pub trees: Vec<Point>,
    pub power_up_spawns: Vec<Point>,
}

impl ArenaLayout {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let wall_centers = generate_positions(
            rng,
            WALL_COUNT,
            WORLD_WIDTH,
            WORLD_HEIGHT,
            &[],
            PlacementBudget::per_point(WALL_COUNT),
        );

        let walls: Vec<Wall> = wall_centers
            .iter()
            .map(|p| Wall {
                x: p.x,
                y: p.y,
                width: 25.0 + rng.gen::<f32>() * 35.0,
                height: 25.0 + rng.gen::<f32>() * 35.0,
                angle: rng.gen::<f32>() * 90.0,
            })
            .collect();

        let bushes = generate_positions(
            rng,
            BUSH_COUNT,
            WORLD_WIDTH,
            WORLD_HEIGHT,
            &wall_centers,
            PlacementBudget::per_point(BUSH_COUNT),
        );

        let mut occupied = wall_centers.clone();
        occupied.extend_from_slice(&bushes);

        let trees = generate_positions(
            rng,
            TREE_COUNT,
            WORLD_WIDTH,
            WORLD_HEIGHT,
            &occupied,
            PlacementBudget::per_point(TREE_COUNT),
        );
        occupied.extend_from_slice(&trees);

        let power_up_spawns = generate_positions(
            rng,
            POWER_UP_SPAWN_COUNT,
            WORLD_WIDTH,
            WORLD_HEIGHT,
            &occupied,
            PlacementBudget::per_point(POWER_UP_SPAWN_COUNT),
        );

        ArenaLayout {
            walls,
            bushes,
            trees,
            power_up_spawns,
        }
    }
}
