use log::{debug, warn};
use thiserror::Error;

use crate::edge::HitRecord;
use crate::geometry::{Interval, Ray, Vec2};
use crate::sector::{PortalPair, Sector, SectorError};

/// Default upper bound on sectors per world
pub const DEFAULT_MAX_SECTORS: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error("world is full ({capacity} sectors)")]
    Capacity { capacity: usize },
    #[error("sector {index} rejected: {source}")]
    Sector {
        index: usize,
        #[source]
        source: SectorError,
    },
}

/// Insertion-ordered arena of sectors.
///
/// A sector's index is its position in the arena. Removing a sector shifts
/// every later index down, so indices held elsewhere (in hit records, masks)
/// are only valid until the next removal. Never mutate the world while a
/// query or render sweep over it is running.
#[derive(Clone, Debug, PartialEq)]
pub struct SectorWorld {
    sectors: Vec<Sector>,
    capacity: usize,
}

impl Default for SectorWorld {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SECTORS)
    }
}

impl SectorWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sectors: Vec::new(),
            capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Sector> {
        self.sectors.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Sector> {
        self.sectors.get_mut(index)
    }

    #[inline]
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, &Sector)> {
        self.sectors.iter().enumerate()
    }

    /// Validate and append a sector built from raw corners; returns its index
    pub fn add_sector(
        &mut self,
        corners: Vec<Vec2>,
        portals: &[PortalPair],
    ) -> Result<usize, WorldError> {
        if self.sectors.len() >= self.capacity {
            return Err(WorldError::Capacity {
                capacity: self.capacity,
            });
        }
        let index = self.sectors.len();
        let sector = Sector::new(corners, portals).map_err(|source| {
            warn!("sector {index} rejected: {source}");
            WorldError::Sector { index, source }
        })?;
        self.push(sector)
    }

    /// Append an already validated sector; returns its index
    pub fn push(&mut self, sector: Sector) -> Result<usize, WorldError> {
        if self.sectors.len() >= self.capacity {
            return Err(WorldError::Capacity {
                capacity: self.capacity,
            });
        }
        debug!(
            "sector {} added ({} corners, floor {}, ceiling {})",
            self.sectors.len(),
            sector.len(),
            sector.floor,
            sector.ceiling
        );
        self.sectors.push(sector);
        Ok(self.sectors.len() - 1)
    }

    /// Remove the sector at `index`, shifting later indices down by one.
    /// Editor-time only.
    pub fn remove(&mut self, index: usize) -> Option<Sector> {
        (index < self.sectors.len()).then(|| self.sectors.remove(index))
    }

    /// Every edge hit of every sector, tagged with its sector index.
    /// Ordered by sector index, then edge index.
    pub fn all_hits(&self, ray: &Ray, interval: Interval) -> Vec<HitRecord> {
        let mut hits = Vec::new();
        self.collect_hits(ray, interval, &mut hits);
        hits
    }

    /// Like [`SectorWorld::all_hits`], appending into a reusable buffer
    pub fn collect_hits(&self, ray: &Ray, interval: Interval, out: &mut Vec<HitRecord>) {
        for (index, sector) in self.sectors.iter().enumerate() {
            sector.collect_hits(ray, interval, index, out);
        }
    }

    /// Nearest hit across the whole world.
    /// Ties go to the lowest sector index, then the lowest edge index.
    pub fn hit(&self, ray: &Ray, interval: Interval) -> Option<HitRecord> {
        let mut interval = interval;
        let mut closest = None;
        for (index, sector) in self.sectors.iter().enumerate() {
            if let Some(mut hit) = sector.hit(ray, &mut interval) {
                hit.sector = index;
                closest = Some(hit);
            }
        }
        closest
    }

    /// Index of the first sector containing `point`
    pub fn find_sector(&self, point: Vec2) -> Option<usize> {
        self.sectors.iter().position(|sector| sector.contains(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Vec2> {
        vec![
            Vec2::new(x0, y0),
            Vec2::new(x0, y0 + size),
            Vec2::new(x0 + size, y0 + size),
            Vec2::new(x0 + size, y0),
        ]
    }

    #[test]
    fn capacity_overflow_is_an_error() {
        let mut world = SectorWorld::with_capacity(1);
        assert_eq!(world.add_sector(square(0.0, 0.0, 1.0), &[]), Ok(0));
        assert_eq!(
            world.add_sector(square(2.0, 0.0, 1.0), &[]),
            Err(WorldError::Capacity { capacity: 1 })
        );
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn malformed_sector_reports_its_slot() {
        let mut world = SectorWorld::new();
        world.add_sector(square(0.0, 0.0, 1.0), &[]).unwrap();
        let err = world
            .add_sector(vec![Vec2::ZERO, Vec2::new(1.0, 0.0)], &[])
            .unwrap_err();
        assert_eq!(
            err,
            WorldError::Sector {
                index: 1,
                source: SectorError::TooFewCorners(2)
            }
        );
    }

    #[test]
    fn removal_shifts_indices() {
        let mut world = SectorWorld::new();
        world.add_sector(square(0.0, 0.0, 1.0), &[]).unwrap();
        world.add_sector(square(5.0, 0.0, 1.0), &[]).unwrap();
        assert!(world.remove(0).is_some());
        assert!(world.remove(3).is_none());
        assert_eq!(world.find_sector(Vec2::new(5.5, 0.5)), Some(0));
    }

    #[test]
    fn hits_are_tagged_with_sector_index() {
        let mut world = SectorWorld::new();
        world.add_sector(square(0.0, 0.0, 1.0), &[]).unwrap();
        world.add_sector(square(0.0, 3.0, 1.0), &[]).unwrap();

        let ray = Ray::new(Vec2::new(0.5, -1.0), Vec2::new(0.0, 1.0));
        let hits = world.all_hits(&ray, Interval::UNIVERSE);
        assert_eq!(hits.len(), 4);
        assert_eq!(
            hits.iter().map(|h| h.sector).collect::<Vec<_>>(),
            vec![0, 0, 1, 1]
        );

        let nearest = world.hit(&ray, Interval::UNIVERSE).unwrap();
        assert_eq!(nearest.sector, 0);
        assert_eq!(nearest.t, 1.0);
    }
}
