//! Built-in demo map.

use crate::geometry::{Interval, Ray, Vec2};
use crate::sector::Sector;
use crate::surface::Color;
use crate::world::{SectorWorld, WorldError};

pub const SPAWN_POSITION: Vec2 = Vec2::new(1.5, 2.0);
pub const SPAWN_FACING: Vec2 = Vec2::new(1.0, 0.0);

/// Closest a mover may get to a solid wall
pub const BODY_RADIUS: f64 = 0.2;

/// An L-shaped room, a raised side room behind a portal, and a pillar.
///
/// The L room is not convex; run it through
/// [`crate::decompose::ConvexDecomposer`] before rendering.
pub fn demo_world(capacity: usize) -> Result<SectorWorld, WorldError> {
    let mut world = SectorWorld::with_capacity(capacity);

    let hall = Sector::new(
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 8.0),
            Vec2::new(4.0, 8.0),
            Vec2::new(4.0, 4.0),
            Vec2::new(10.0, 4.0),
            Vec2::new(10.0, 0.0),
        ],
        &[(4, 5)],
    )
    .map_err(|source| WorldError::Sector { index: 0, source })?
    .with_heights(0.0, 3.0)
    .with_color(Color::new(0.7, 0.62, 0.5));
    world.push(hall)?;

    let side = Sector::new(
        vec![
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 4.0),
            Vec2::new(16.0, 4.0),
            Vec2::new(16.0, 0.0),
        ],
        &[(0, 1)],
    )
    .map_err(|source| WorldError::Sector { index: 1, source })?
    .with_heights(0.5, 2.5)
    .with_color(Color::new(0.45, 0.6, 0.75));
    world.push(side)?;

    let pillar = Sector::new(
        vec![
            Vec2::new(6.0, 1.5),
            Vec2::new(6.0, 2.5),
            Vec2::new(7.0, 2.5),
            Vec2::new(7.0, 1.5),
        ],
        &[],
    )
    .map_err(|source| WorldError::Sector { index: 2, source })?
    .with_heights(0.0, 3.0)
    .with_color(Color::new(0.8, 0.3, 0.25));
    world.push(pillar)?;

    Ok(world)
}

/// Whether a mover at `from` may step to `to`: the target must lie inside some
/// sector and the step may not cross, or end within [`BODY_RADIUS`] of, a
/// solid wall
pub fn can_move(world: &SectorWorld, from: Vec2, to: Vec2) -> bool {
    if world.find_sector(to).is_none() {
        return false;
    }
    let step = to - from;
    let len = step.length();
    if len <= f64::EPSILON {
        return true;
    }
    let ray = Ray::new(from, step);
    let reach = Interval::new(0.0, (len + BODY_RADIUS) / len);
    world.all_hits(&ray, reach).iter().all(|hit| hit.portal)
}
