use std::collections::BTreeSet;

use thiserror::Error;

use crate::edge::{Edge, HitRecord};
use crate::geometry::{Interval, Ray, Vec2};
use crate::surface::Color;

pub const DEFAULT_WALL_COLOR: Color = Color::new(0.75, 0.75, 0.75);

/// Pair of corner indices bounding a portal edge
pub type PortalPair = (usize, usize);

/// Reasons a polygon is rejected as a sector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SectorError {
    #[error("a sector needs at least 3 corners, got {0}")]
    TooFewCorners(usize),
    #[error("corner {0} is not finite")]
    NonFiniteCorner(usize),
    #[error("edge {0} has zero length")]
    DegenerateEdge(usize),
    #[error("edges {0} and {1} intersect")]
    SelfIntersecting(usize, usize),
    #[error("corners must wind clockwise (signed area {0})")]
    NotClockwise(f64),
    #[error("portal pair ({0}, {1}) is out of range for {2} corners")]
    PortalOutOfRange(usize, usize, usize),
    #[error("portal pair ({0}, {1}) does not name consecutive corners")]
    PortalNotAdjacent(usize, usize),
}

/// Convex or concave polygon region with its own floor and ceiling.
///
/// Corners wind clockwise (y up). A sector has no identity of its own; it is
/// addressed by its position in a [`crate::world::SectorWorld`].
#[derive(Clone, Debug, PartialEq)]
pub struct Sector {
    corners: Vec<Vec2>,
    edges: Vec<Edge>,
    portals: BTreeSet<PortalPair>,
    color: Color,
    pub floor: f64,
    pub ceiling: f64,
    /// Stored only, not used for shading yet
    pub light: f64,
}

#[inline]
pub(crate) fn ordered(i: usize, j: usize) -> PortalPair {
    if i <= j { (i, j) } else { (j, i) }
}

/// Shoelace area, positive for counter-clockwise winding
pub fn signed_area(corners: &[Vec2]) -> f64 {
    let n = corners.len();
    let twice: f64 = (0..n)
        .map(|i| corners[i].cross(corners[(i + 1) % n]))
        .sum();
    0.5 * twice
}

fn orientation(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    (b - a).cross(c - a)
}

fn on_segment(a: Vec2, b: Vec2, p: Vec2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Closed segment intersection, touching included
fn segments_intersect(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> bool {
    let d1 = orientation(b0, b1, a0);
    let d2 = orientation(b0, b1, a1);
    let d3 = orientation(a0, a1, b0);
    let d4 = orientation(a0, a1, b1);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(b0, b1, a0))
        || (d2 == 0.0 && on_segment(b0, b1, a1))
        || (d3 == 0.0 && on_segment(a0, a1, b0))
        || (d4 == 0.0 && on_segment(a0, a1, b1))
}

/// Check that `corners` form a simple clockwise polygon
pub fn validate_polygon(corners: &[Vec2]) -> Result<(), SectorError> {
    let n = corners.len();
    if n < 3 {
        return Err(SectorError::TooFewCorners(n));
    }
    if let Some(i) = corners.iter().position(|c| !c.is_finite()) {
        return Err(SectorError::NonFiniteCorner(i));
    }
    for i in 0..n {
        if corners[i] == corners[(i + 1) % n] {
            return Err(SectorError::DegenerateEdge(i));
        }
    }

    // every pair of non-neighbouring edges must be disjoint
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (a0, a1) = (corners[i], corners[(i + 1) % n]);
            let (b0, b1) = (corners[j], corners[(j + 1) % n]);
            if segments_intersect(a0, a1, b0, b1) {
                return Err(SectorError::SelfIntersecting(i, j));
            }
        }
    }

    let area = signed_area(corners);
    if area >= -f64::EPSILON {
        return Err(SectorError::NotClockwise(area));
    }
    Ok(())
}

impl Sector {
    /// Build a sector from clockwise corners and the corner pairs bounding its portals
    pub fn new(corners: Vec<Vec2>, portals: &[PortalPair]) -> Result<Self, SectorError> {
        validate_polygon(&corners)?;

        let n = corners.len();
        let mut portal_set = BTreeSet::new();
        for &(i, j) in portals {
            if i >= n || j >= n {
                return Err(SectorError::PortalOutOfRange(i, j, n));
            }
            if (i + 1) % n != j && (j + 1) % n != i {
                return Err(SectorError::PortalNotAdjacent(i, j));
            }
            portal_set.insert(ordered(i, j));
        }

        let mut sector = Self {
            corners,
            edges: Vec::new(),
            portals: portal_set,
            color: DEFAULT_WALL_COLOR,
            floor: 0.0,
            ceiling: 1.0,
            light: 1.0,
        };
        sector.rebuild_edges();
        Ok(sector)
    }

    pub fn with_heights(mut self, floor: f64, ceiling: f64) -> Self {
        self.set_heights(floor, ceiling);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.set_color(color);
        self
    }

    fn rebuild_edges(&mut self) {
        let n = self.corners.len();
        self.edges = (0..n)
            .map(|i| {
                let j = (i + 1) % n;
                Edge::new(
                    self.corners[i],
                    self.corners[j],
                    self.is_portal(i, j),
                    self.color,
                )
            })
            .collect();
    }

    #[inline]
    pub fn corners(&self) -> &[Vec2] {
        &self.corners
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.corners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    /// True iff the pair `{i, j}` bounds a portal edge
    #[inline]
    pub fn is_portal(&self, i: usize, j: usize) -> bool {
        self.portals.contains(&ordered(i, j))
    }

    /// True iff corner `i` bounds at least one portal edge
    pub fn is_portal_corner(&self, i: usize) -> bool {
        self.portals.iter().any(|&(a, b)| a == i || b == i)
    }

    pub fn portal_pairs(&self) -> impl Iterator<Item = PortalPair> + '_ {
        self.portals.iter().copied()
    }

    pub fn set_heights(&mut self, floor: f64, ceiling: f64) {
        self.floor = floor;
        self.ceiling = ceiling;
    }

    pub fn set_light(&mut self, light: f64) {
        self.light = light;
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.rebuild_edges();
    }

    /// Copy heights, light and colour from another sector
    pub fn inherit_attributes(&mut self, parent: &Sector) {
        self.floor = parent.floor;
        self.ceiling = parent.ceiling;
        self.light = parent.light;
        self.set_color(parent.color);
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.corners).abs()
    }

    /// Even-odd point-in-polygon test
    pub fn contains(&self, point: Vec2) -> bool {
        let mut inside = false;
        for edge in &self.edges {
            let (a, b) = (edge.p0, edge.p1);
            if (a.y > point.y) != (b.y > point.y) {
                let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if point.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    fn stamp(&self, mut hit: HitRecord, edge: usize) -> HitRecord {
        hit.floor = self.floor;
        hit.ceiling = self.ceiling;
        hit.edge = edge;
        hit
    }

    /// Nearest hit over all edges, sharing one shrinking interval.
    /// Ties go to the lowest edge index.
    pub fn hit(&self, ray: &Ray, interval: &mut Interval) -> Option<HitRecord> {
        let mut closest = None;
        for (i, edge) in self.edges.iter().enumerate() {
            if let Some(hit) = edge.hit(ray, interval) {
                closest = Some(self.stamp(hit, i));
            }
        }
        closest
    }

    /// Every edge hit within `interval`, each edge tested independently,
    /// in edge index order
    pub fn all_hits(&self, ray: &Ray, interval: Interval) -> Vec<HitRecord> {
        let mut hits = Vec::new();
        self.collect_hits(ray, interval, 0, &mut hits);
        hits
    }

    pub(crate) fn collect_hits(
        &self,
        ray: &Ray,
        interval: Interval,
        sector: usize,
        out: &mut Vec<HitRecord>,
    ) {
        for (i, edge) in self.edges.iter().enumerate() {
            let mut own = interval;
            if let Some(hit) = edge.hit(ray, &mut own) {
                if interval.contains(hit.t) {
                    let mut hit = self.stamp(hit, i);
                    hit.sector = sector;
                    out.push(hit);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Vec2> {
        vec![
            Vec2::new(x0, y0),
            Vec2::new(x0, y0 + size),
            Vec2::new(x0 + size, y0 + size),
            Vec2::new(x0 + size, y0),
        ]
    }

    #[test]
    fn rejects_malformed_polygons() {
        assert_eq!(
            Sector::new(vec![Vec2::ZERO, Vec2::new(1.0, 0.0)], &[]),
            Err(SectorError::TooFewCorners(2))
        );

        let mut ccw = square(0.0, 0.0, 1.0);
        ccw.reverse();
        assert!(matches!(
            Sector::new(ccw, &[]),
            Err(SectorError::NotClockwise(_))
        ));

        // bow tie
        let bow = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
        ];
        assert!(matches!(
            Sector::new(bow, &[]),
            Err(SectorError::SelfIntersecting(_, _))
        ));

        let mut nan = square(0.0, 0.0, 1.0);
        nan[2].x = f64::NAN;
        assert_eq!(Sector::new(nan, &[]), Err(SectorError::NonFiniteCorner(2)));
    }

    #[test]
    fn rejects_bad_portal_pairs() {
        assert_eq!(
            Sector::new(square(0.0, 0.0, 1.0), &[(0, 4)]),
            Err(SectorError::PortalOutOfRange(0, 4, 4))
        );
        assert_eq!(
            Sector::new(square(0.0, 0.0, 1.0), &[(0, 2)]),
            Err(SectorError::PortalNotAdjacent(0, 2))
        );
    }

    #[test]
    fn portal_pairs_are_unordered_and_wrap() {
        let sector = Sector::new(square(0.0, 0.0, 1.0), &[(0, 3), (2, 1)]).unwrap();
        assert!(sector.is_portal(3, 0));
        assert!(sector.is_portal(1, 2));
        assert!(!sector.is_portal(0, 1));

        assert!(sector.edges()[1].portal);
        assert!(sector.edges()[3].portal);
        assert!(!sector.edges()[0].portal);
        assert!(sector.is_portal_corner(0));
    }

    #[test]
    fn outward_normals_for_clockwise_square() {
        let sector = Sector::new(square(0.0, 0.0, 1.0), &[]).unwrap();
        let normals: Vec<Vec2> = sector.edges().iter().map(|e| e.normal).collect();
        assert_eq!(
            normals,
            vec![
                Vec2::new(-1.0, 0.0),
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, -1.0),
            ]
        );
    }

    #[test]
    fn all_hits_tests_edges_independently() {
        let sector = Sector::new(square(0.0, 0.0, 2.0), &[])
            .unwrap()
            .with_heights(0.5, 3.0);
        let ray = Ray::new(Vec2::new(1.0, -1.0), Vec2::new(0.0, 1.0));

        let hits = sector.all_hits(&ray, Interval::UNIVERSE);
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0].t, 3.0);
        assert!(hits[0].backface);
        assert_relative_eq!(hits[1].t, 1.0);
        assert!(!hits[1].backface);
        assert!(hits.iter().all(|h| h.floor == 0.5 && h.ceiling == 3.0));

        // the far side falls outside a bounded interval
        let near_only = sector.all_hits(&ray, Interval::new(0.0, 2.0));
        assert_eq!(near_only.len(), 1);
        assert_eq!(near_only[0].edge, 3);
    }

    #[test]
    fn closest_hit_prefers_lowest_edge_on_ties() {
        let sector = Sector::new(square(0.0, 0.0, 2.0), &[]).unwrap();
        // diagonal through corner (0, 0), shared by edges 0 and 3
        let ray = Ray::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0));
        let mut interval = Interval::UNIVERSE;
        let hit = sector.hit(&ray, &mut interval).unwrap();
        assert_relative_eq!(hit.t, 1.0);
        assert_eq!(hit.edge, 0);
    }

    #[test]
    fn area_and_containment() {
        let sector = Sector::new(square(1.0, 1.0, 2.0), &[]).unwrap();
        assert_relative_eq!(sector.area(), 4.0);
        assert!(sector.contains(Vec2::new(2.0, 2.0)));
        assert!(!sector.contains(Vec2::new(0.0, 2.0)));
    }

    #[test]
    fn recolouring_rebuilds_edges() {
        let mut sector = Sector::new(square(0.0, 0.0, 1.0), &[]).unwrap();
        let red = Color::new(1.0, 0.0, 0.0);
        sector.set_color(red);
        assert!(sector.edges().iter().all(|e| e.color == red));
    }
}
