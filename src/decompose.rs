//! Convex decomposition of sector worlds.
//!
//! The renderer's occlusion bookkeeping needs every sector to be convex. This
//! pass repeatedly cuts a sector at its first reflex corner, along the inward
//! bisector, until no reflex corner is left. Every cut becomes a portal on
//! both pieces, so the two halves render as one open room.

use std::collections::BTreeSet;
use std::f64::consts::FRAC_PI_2;

use log::{debug, info, warn};
use thiserror::Error;

use crate::geometry::{Interval, Ray, Vec2};
use crate::sector::{PortalPair, Sector, SectorError, ordered};
use crate::world::{SectorWorld, WorldError};

/// Why a sector could not be fully decomposed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecomposeError {
    #[error("no bisection target from reflex corner {corner}")]
    NoBisectionTarget { corner: usize },
    #[error("cut from corner {corner} to corner {target} is degenerate")]
    DegenerateCut { corner: usize, target: usize },
    #[error("gave up after {limit} cuts")]
    SplitLimit { limit: usize },
    #[error("cut produced an invalid piece: {0}")]
    InvalidPiece(#[from] SectorError),
}

/// Non-fatal failure on one input sector
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposeFailure {
    /// Index of the sector in the input world
    pub sector: usize,
    pub error: DecomposeError,
}

/// Output of [`ConvexDecomposer::decompose`]
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub world: SectorWorld,
    pub cuts: usize,
    pub failures: Vec<DecomposeFailure>,
}

#[derive(Copy, Clone, Debug)]
pub struct ConvexDecomposer {
    /// Slack above 90 degrees before a corner counts as reflex
    pub angle_epsilon: f64,
    /// Bisection hits closer than this to the reflex corner are ignored
    pub t_epsilon: f64,
    /// Bisection points this close to an existing corner snap to it
    pub snap_epsilon: f64,
    /// Cuts allowed per input sector
    pub max_splits: usize,
}

impl Default for ConvexDecomposer {
    fn default() -> Self {
        Self {
            angle_epsilon: 1e-4,
            t_epsilon: 1e-6,
            snap_epsilon: 1e-4,
            max_splits: 1024,
        }
    }
}

impl ConvexDecomposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corner `cur` is reflex when the outgoing edge turns away from the
    /// incoming edge's inward normal by more than a right angle
    fn is_reflex(&self, prev: Vec2, cur: Vec2, next: Vec2) -> bool {
        let in_vec = cur - prev;
        let out_vec = next - cur;
        // inward for clockwise winding
        let normal = Vec2::new(in_vec.y, -in_vec.x);

        let denom = normal.length() * out_vec.length();
        if denom <= f64::EPSILON || !denom.is_finite() {
            return false;
        }
        let cos = (normal.dot(out_vec) / denom).clamp(-1.0, 1.0);
        cos.acos() > FRAC_PI_2 + self.angle_epsilon
    }

    /// Index of the first reflex corner, if any
    pub fn first_reflex_corner(&self, corners: &[Vec2]) -> Option<usize> {
        let n = corners.len();
        (0..n).find(|&i| {
            self.is_reflex(corners[(i + n - 1) % n], corners[i], corners[(i + 1) % n])
        })
    }

    pub fn is_convex(&self, sector: &Sector) -> bool {
        self.first_reflex_corner(sector.corners()).is_none()
    }

    /// Build a new world in which every sector is convex.
    ///
    /// Sectors that cannot be resolved are copied through unchanged and
    /// reported in [`Decomposition::failures`]. Only running out of world
    /// capacity aborts the pass.
    pub fn decompose(&self, world: &SectorWorld) -> Result<Decomposition, WorldError> {
        let mut out = SectorWorld::with_capacity(world.capacity());
        let mut cuts = 0;
        let mut failures = Vec::new();

        for (index, sector) in world.iter() {
            let (pieces, split_count, error) = self.split_sector(sector);
            cuts += split_count;
            if let Some(error) = error {
                warn!("sector {index} left unresolved: {error}");
                failures.push(DecomposeFailure {
                    sector: index,
                    error,
                });
            }
            if split_count > 0 {
                debug!("sector {index} split into {} pieces", pieces.len());
            }
            for piece in pieces {
                out.push(piece)?;
            }
        }

        info!(
            "convex decomposition: {} sectors in, {} out, {} cuts, {} failures",
            world.len(),
            out.len(),
            cuts,
            failures.len()
        );

        Ok(Decomposition {
            world: out,
            cuts,
            failures,
        })
    }

    /// Cut one sector down to convex pieces, depth first: a fresh piece is
    /// resolved completely before its sibling. Unresolvable pieces are kept
    /// as they are.
    fn split_sector(&self, sector: &Sector) -> (Vec<Sector>, usize, Option<DecomposeError>) {
        let mut done = Vec::new();
        let mut pending = vec![sector.clone()];
        let mut cuts = 0;
        let mut error = None;

        while let Some(piece) = pending.pop() {
            let Some(reflex) = self.first_reflex_corner(piece.corners()) else {
                done.push(piece);
                continue;
            };

            if cuts >= self.max_splits {
                error = Some(DecomposeError::SplitLimit {
                    limit: self.max_splits,
                });
                done.push(piece);
                done.extend(pending.drain(..).rev());
                break;
            }

            match self.bisect(&piece, reflex) {
                Ok((left, right)) => {
                    cuts += 1;
                    pending.push(right);
                    pending.push(left);
                }
                Err(e) => {
                    done.push(piece);
                    if error.is_none() {
                        error = Some(e);
                    }
                }
            }
        }

        (done, cuts, error)
    }

    /// Split `sector` along the inward bisector of its reflex corner
    pub fn bisect(&self, sector: &Sector, reflex: usize) -> Result<(Sector, Sector), DecomposeError> {
        let n = sector.len();
        let edges = sector.edges();
        let incoming = edges[(reflex + n - 1) % n];
        let outgoing = edges[reflex];

        let direction = (-(incoming.normal + outgoing.normal) * 0.5)
            .unit()
            .ok_or(DecomposeError::NoBisectionTarget { corner: reflex })?;
        let origin = sector.corners()[reflex];
        let ray = Ray::new(origin, direction);

        let hit = sector
            .hit(&ray, &mut Interval::new(self.t_epsilon, f64::INFINITY))
            .ok_or(DecomposeError::NoBisectionTarget { corner: reflex })?;
        let point = ray.at(hit.t);

        let mut corners = sector.corners().to_vec();
        let mut portals: BTreeSet<PortalPair> = sector.portal_pairs().collect();
        let mut reflex = reflex;

        let target = match self.snap_corner(sector, reflex, point) {
            Some(existing) => existing,
            None => {
                // new corner right after the hit edge's start corner
                let a = hit.edge;
                let b = (a + 1) % n;
                let inserted = a + 1;
                let shift = |k: usize| if k > a { k + 1 } else { k };

                let split_portal = portals.contains(&ordered(a, b));
                portals = portals
                    .into_iter()
                    .filter(|&pair| pair != ordered(a, b))
                    .map(|(i, j)| ordered(shift(i), shift(j)))
                    .collect();
                if split_portal {
                    portals.insert(ordered(shift(a), inserted));
                    portals.insert(ordered(inserted, shift(b)));
                }

                corners.insert(inserted, point);
                reflex = shift(reflex);
                inserted
            }
        };

        let m = corners.len();
        if target == reflex || (reflex + 1) % m == target || (target + 1) % m == reflex {
            return Err(DecomposeError::DegenerateCut {
                corner: reflex,
                target,
            });
        }

        portals.insert(ordered(reflex, target));
        debug!(
            "cut {} -> {} ({} to {})",
            reflex, target, corners[reflex], corners[target]
        );

        let mut left = build_piece(&corners, &portals, reflex, target)?;
        let mut right = build_piece(&corners, &portals, target, reflex)?;
        left.inherit_attributes(sector);
        right.inherit_attributes(sector);
        Ok((left, right))
    }

    /// Existing corner within snapping distance of `point`, preferring
    /// corners that do not already bound a portal
    fn snap_corner(&self, sector: &Sector, reflex: usize, point: Vec2) -> Option<usize> {
        let near: Vec<usize> = sector
            .corners()
            .iter()
            .enumerate()
            .filter(|&(i, c)| i != reflex && c.distance(point) <= self.snap_epsilon)
            .map(|(i, _)| i)
            .collect();

        near.iter()
            .copied()
            .find(|&i| !sector.is_portal_corner(i))
            .or_else(|| near.first().copied())
    }
}

/// Piece walking the boundary from `from` to `to` (inclusive); its closing
/// edge is the cut. The cut corners land in both pieces.
fn build_piece(
    corners: &[Vec2],
    portals: &BTreeSet<PortalPair>,
    from: usize,
    to: usize,
) -> Result<Sector, SectorError> {
    let m = corners.len();
    let mut chain = vec![from];
    let mut k = from;
    while k != to {
        k = (k + 1) % m;
        chain.push(k);
    }

    let len = chain.len();
    let piece_portals: Vec<PortalPair> = (0..len)
        .filter(|&i| portals.contains(&ordered(chain[i], chain[(i + 1) % len])))
        .map(|i| (i, (i + 1) % len))
        .collect();

    let piece_corners = chain.iter().map(|&i| corners[i]).collect();
    Sector::new(piece_corners, &piece_portals)
}
