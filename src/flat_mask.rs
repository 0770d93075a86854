use rayon::prelude::*;

use crate::edge::HitRecord;

/// Screen rows of a wall span in one column, top-left origin, `top <= bottom`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VerticalBounds {
    pub top: i32,
    pub bottom: i32,
}

/// Floor and ceiling boundary rows seen so far for one sector in one column.
///
/// `None` is the "fully open" state: nothing recorded yet this frame.
/// `far` slots come from backface hits (the ray leaving the sector), `near`
/// slots from front-face hits (the ray entering it).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatBounds {
    pub floor_near: Option<i32>,
    pub floor_far: Option<i32>,
    pub ceiling_near: Option<i32>,
    pub ceiling_far: Option<i32>,
}

/// Rows newly uncovered by a backface hit, inclusive
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Revealed {
    /// Floor below the eye, from the far boundary down to the screen bottom
    pub floor: Option<(i32, i32)>,
    /// Ceiling above the eye, from the screen top down to the far boundary
    pub ceiling: Option<(i32, i32)>,
}

/// One column's slice of the mask, one entry per sector
pub struct ColumnMask<'a> {
    bounds: &'a mut [FlatBounds],
    height: i32,
}

impl ColumnMask<'_> {
    /// Record where `hit`'s sector floor and ceiling meet its edge in this
    /// column. Flats on the far side of the eye plane (floor above the eye,
    /// ceiling below it) are never visible and are left untouched.
    pub fn record_bounds(
        &mut self,
        elevation: f64,
        hit: &HitRecord,
        rows: VerticalBounds,
    ) -> Revealed {
        let Some(slot) = self.bounds.get_mut(hit.sector) else {
            return Revealed::default();
        };

        let floor_visible = hit.floor < elevation;
        let ceiling_visible = hit.ceiling > elevation;
        let mut revealed = Revealed::default();

        if hit.backface {
            if floor_visible {
                slot.floor_far = Some(rows.bottom);
                revealed.floor = Some((rows.bottom, self.height - 1));
            }
            if ceiling_visible {
                slot.ceiling_far = Some(rows.top);
                revealed.ceiling = Some((0, rows.top));
            }
        } else {
            if floor_visible {
                slot.floor_near = Some(rows.bottom);
            }
            if ceiling_visible {
                slot.ceiling_near = Some(rows.top);
            }
        }
        revealed
    }

    #[inline]
    pub fn get(&self, sector: usize) -> Option<&FlatBounds> {
        self.bounds.get(sector)
    }
}

/// Per-frame, per-sector, per-column floor/ceiling bookkeeping.
///
/// Stored column-major so each column's entries are contiguous and columns
/// can be swept in parallel.
#[derive(Clone, Debug, Default)]
pub struct FlatMask {
    width: usize,
    height: usize,
    sectors: usize,
    bounds: Vec<FlatBounds>,
}

impl FlatMask {
    pub fn new(width: usize, height: usize, sectors: usize) -> Self {
        let mut mask = Self::default();
        mask.reset(width, height, sectors);
        mask
    }

    /// Reopen every slot; resizes when the frame or world changed shape
    pub fn reset(&mut self, width: usize, height: usize, sectors: usize) {
        self.width = width;
        self.height = height;
        self.sectors = sectors;
        self.bounds.clear();
        self.bounds.resize(width * sectors, FlatBounds::default());
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn sectors(&self) -> usize {
        self.sectors
    }

    #[inline]
    pub fn get(&self, sector: usize, column: usize) -> Option<&FlatBounds> {
        if sector < self.sectors && column < self.width {
            self.bounds.get(column * self.sectors + sector)
        } else {
            None
        }
    }

    pub fn column_mut(&mut self, column: usize) -> Option<ColumnMask<'_>> {
        if column >= self.width || self.sectors == 0 {
            return None;
        }
        let start = column * self.sectors;
        Some(ColumnMask {
            bounds: &mut self.bounds[start..start + self.sectors],
            height: self.height as i32,
        })
    }

    /// See [`ColumnMask::record_bounds`]; out-of-range columns are ignored
    pub fn record_bounds(
        &mut self,
        elevation: f64,
        hit: &HitRecord,
        column: usize,
        rows: VerticalBounds,
    ) -> Revealed {
        match self.column_mut(column) {
            Some(mut mask) => mask.record_bounds(elevation, hit, rows),
            None => Revealed::default(),
        }
    }

    /// Disjoint column slices in column order, for a parallel sweep
    pub fn par_columns_mut(&mut self) -> impl IndexedParallelIterator<Item = ColumnMask<'_>> {
        let height = self.height as i32;
        // chunk size must be non-zero even for an empty world
        let chunk = self.sectors.max(1);
        self.bounds
            .par_chunks_mut(chunk)
            .map(move |bounds| ColumnMask { bounds, height })
    }
}
