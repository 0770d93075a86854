//! Overhead map drawn over the rendered frame.

use crate::geometry::Vec2;
use crate::surface::{Color, PixelSurface};
use crate::world::SectorWorld;

const WALL_COLOR: Color = Color::new(0.9, 0.9, 0.9);
const PORTAL_COLOR: Color = Color::new(0.3, 0.6, 0.9);
const CAMERA_COLOR: Color = Color::new(1.0, 0.85, 0.1);
const PORTAL_DASH: usize = 2;
/// World units the facing tick extends
const TICK_LENGTH: f64 = 1.0;

/// World-to-screen mapping for the overlay, y flipped so +y is up
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Minimap {
    /// Top-left screen pixel of the map area
    pub origin: (i64, i64),
    /// Pixels per world unit
    pub scale: f64,
    /// World-space bounds of everything drawn
    pub min: Vec2,
    pub max: Vec2,
}

impl Minimap {
    /// Fit `world` into a `size`-pixel square at `origin`.
    /// `None` for an empty world or a zero-sized box.
    pub fn fit(world: &SectorWorld, origin: (i64, i64), size: usize) -> Option<Self> {
        let mut corners = world.sectors().iter().flat_map(|s| s.corners().iter().copied());
        let first = corners.next()?;
        let (min, max) = corners.fold((first, first), |(lo, hi), p| {
            (
                Vec2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Vec2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        });

        let extent = (max.x - min.x).max(max.y - min.y);
        if size < 2 || extent <= f64::EPSILON {
            return None;
        }
        Some(Self {
            origin,
            scale: (size - 1) as f64 / extent,
            min,
            max,
        })
    }

    #[inline]
    pub fn to_screen(&self, p: Vec2) -> (i64, i64) {
        (
            self.origin.0 + ((p.x - self.min.x) * self.scale).round() as i64,
            self.origin.1 + ((self.max.y - p.y) * self.scale).round() as i64,
        )
    }

    /// Walls solid, portals dashed, then the camera marker on top
    pub fn draw<S: PixelSurface + ?Sized>(
        &self,
        surface: &mut S,
        world: &SectorWorld,
        position: Vec2,
        facing: Vec2,
    ) {
        for sector in world.sectors() {
            for edge in sector.edges() {
                let (color, dash) = if edge.portal {
                    (PORTAL_COLOR, Some(PORTAL_DASH))
                } else {
                    (WALL_COLOR, None)
                };
                surface.draw_line(self.to_screen(edge.p0), self.to_screen(edge.p1), color, dash);
            }
        }

        let (cx, cy) = self.to_screen(position);
        surface.fill_rect(cx - 1, cy - 1, 3, 3, CAMERA_COLOR);
        if let Some(dir) = facing.unit() {
            let tip = self.to_screen(position + dir * TICK_LENGTH);
            surface.draw_line((cx, cy), tip, CAMERA_COLOR, None);
        }
    }
}
