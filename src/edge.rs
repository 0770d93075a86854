use crate::geometry::{Interval, Ray, Vec2};
use crate::surface::Color;

/// Result of a single ray/edge intersection
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HitRecord {
    /// Distance along the ray, in units of the ray direction
    pub t: f64,
    pub color: Color,
    pub floor: f64,
    pub ceiling: f64,
    /// Ray struck the inside face of the polygon boundary
    pub backface: bool,
    pub portal: bool,
    /// Arena index of the originating sector; invalidated by world removal
    pub sector: usize,
    /// Index of the edge within its sector
    pub edge: usize,
}

/// Directed wall segment between two consecutive sector corners.
///
/// Corners are copied from the owning sector, so an edge has to be rebuilt
/// whenever the sector geometry changes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edge {
    pub p0: Vec2,
    pub p1: Vec2,
    /// Outward unit normal, assuming clockwise winding
    pub normal: Vec2,
    pub portal: bool,
    pub color: Color,
}

impl Edge {
    pub fn new(p0: Vec2, p1: Vec2, portal: bool, color: Color) -> Self {
        // clockwise polygon: interior is on the right of p0 -> p1
        let normal = (p1 - p0).perp().unit().unwrap_or(Vec2::ZERO);
        Self {
            p0,
            p1,
            normal,
            portal,
            color,
        }
    }

    /// Raw parametric intersection of the ray's line with the edge's line.
    ///
    /// Returns `(t1, t2)`: `t1` is the distance along the ray, `t2` the position
    /// along the edge (0 at `p0`, 1 at `p1`). `None` when the ray is parallel
    /// to the edge or the result is not finite.
    pub fn intersect(&self, ray: &Ray) -> Option<(f64, f64)> {
        let v1 = ray.origin - self.p0;
        let v2 = self.p1 - self.p0;
        let v3 = ray.direction.perp();

        let denom = v2.dot(v3);
        if denom == 0.0 || !denom.is_finite() {
            return None;
        }

        let t1 = v2.cross(v1) / denom;
        let t2 = v1.dot(v3) / denom;
        (t1.is_finite() && t2.is_finite()).then_some((t1, t2))
    }

    /// Ray/segment hit test.
    ///
    /// Accepts only hits in front of the ray origin, inside the segment, and
    /// strictly nearer than `interval.max`; on success `interval.max` shrinks
    /// to the hit distance. Equal distances therefore keep the edge tested first.
    pub fn hit(&self, ray: &Ray, interval: &mut Interval) -> Option<HitRecord> {
        let (t1, t2) = self.intersect(ray)?;

        if t1 < 0.0 || t1 < interval.min || t1 >= interval.max {
            return None;
        }
        if !(0.0..=1.0).contains(&t2) {
            return None;
        }

        interval.set_max(t1);
        Some(HitRecord {
            t: t1,
            color: self.color,
            floor: 0.0,
            ceiling: 0.0,
            backface: ray.direction.dot(self.normal) >= 0.0,
            portal: self.portal,
            sector: 0,
            edge: 0,
        })
    }
}
