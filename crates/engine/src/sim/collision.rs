use super::world::{Aabb, Obstacle};

/// Strict overlap: boxes that only share an edge do not collide.
pub fn overlaps(a: Aabb, b: Aabb) -> bool {
    a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
}

/// Index of the first obstacle overlapping `target`, if any.
pub fn first_collision(target: Aabb, obstacles: &[Obstacle]) -> Option<usize> {
    obstacles
        .iter()
        .position(|obstacle| overlaps(target, obstacle.bounds()))
}
