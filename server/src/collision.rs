//! Pure collision oracle for world bounds and the arena's rotated walls
//!
//! Movement and projectile travel both consult these checks every tick, so
//! they stay allocation-free and O(wall count). The wall test transforms the
//! query point into each wall's rotated local frame and runs a
//! Minkowski-padded AABB check there: a conservative approximation of
//! circle-vs-rotated-rectangle that slightly over-reports near corners.

use shared::{Wall, PLAYER_RADIUS, PROJECTILE_RADIUS, WORLD_HEIGHT, WORLD_WIDTH};

/// Returns true if a circle at `(x, y)` with the given radius leaves the
/// arena bounds or overlaps any wall's padded rectangle.
pub fn collides(walls: &[Wall], x: f32, y: f32, radius: f32) -> bool {
    if x - radius < 0.0 || x + radius > WORLD_WIDTH || y - radius < 0.0 || y + radius > WORLD_HEIGHT
    {
        return true;
    }

    for wall in walls {
        let (sin, cos) = wall.angle.to_radians().sin_cos();
        let dx = x - wall.x;
        let dy = y - wall.y;

        // Rotate the offset into the wall's local frame.
        let local_x = dx * cos + dy * sin;
        let local_y = -dx * sin + dy * cos;

        if local_x.abs() < wall.width / 2.0 + radius && local_y.abs() < wall.height / 2.0 + radius {
            return true;
        }
    }

    false
}

/// Player-radius preset of [`collides`].
pub fn player_blocked(walls: &[Wall], x: f32, y: f32) -> bool {
    collides(walls, x, y, PLAYER_RADIUS)
}

/// Projectile-radius preset of [`collides`].
pub fn projectile_blocked(walls: &[Wall], x: f32, y: f32) -> bool {
    collides(walls, x, y, PROJECTILE_RADIUS)
}
