use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::camera::{RenderMode, View};
use crate::flat_mask::{ColumnMask, FlatMask, VerticalBounds};
use crate::geometry::Interval;
use crate::surface::{Color, PixelSurface};
use crate::world::SectorWorld;

pub const BACKGROUND_COLOR: Color = Color::new(0.02, 0.02, 0.04);
pub const FLOOR_COLOR: Color = Color::new(0.22, 0.18, 0.14);
pub const CEILING_COLOR: Color = Color::new(0.12, 0.12, 0.2);

/// Distance at which walls fade to black
pub const FALLOFF_DISTANCE: f64 = 20.0;

const MIN_DISTANCE: f64 = 1e-6;

const DEBUG_COLORS: [Color; 6] = [
    Color::new(0.9, 0.2, 0.2),
    Color::new(0.2, 0.9, 0.2),
    Color::new(0.2, 0.3, 0.9),
    Color::new(0.9, 0.9, 0.2),
    Color::new(0.9, 0.2, 0.9),
    Color::new(0.2, 0.9, 0.9),
];

/// Darken `color` linearly with distance
#[inline]
pub fn shade(color: Color, distance: f64) -> Color {
    color.scaled((1.0 - distance / FALLOFF_DISTANCE).max(0.0))
}

/// Screen rows where a sector's ceiling and floor meet a wall at `distance`.
///
/// `floor` and `ceiling` are relative to the eye. The projection counts rows
/// upward from the bottom; the result is flipped to top-left rows and clamped
/// into the image.
pub fn column_bounds(
    image_height: usize,
    distance: f64,
    floor: f64,
    ceiling: f64,
) -> VerticalBounds {
    if image_height == 0 {
        return VerticalBounds { top: 0, bottom: 0 };
    }
    let h = image_height as i64;
    let d = if distance.is_finite() && distance > MIN_DISTANCE {
        distance
    } else {
        MIN_DISTANCE
    };
    let scale = image_height as f64 / d;
    // float -> int casts saturate
    let offset = |rel: f64| (scale * rel).round() as i64;

    let bottom = (h / 2).saturating_add(offset(floor));
    let top = (h / 2).saturating_add(offset(ceiling));
    let flip = |row: i64| h.saturating_sub(row).clamp(0, h - 1) as i32;

    VerticalBounds {
        top: flip(top),
        bottom: flip(bottom),
    }
}

/// Paint command for one column
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColumnSpan {
    pub top: i32,
    pub bottom: i32,
    pub color: Color,
}

#[derive(Clone, Debug, Default)]
struct ColumnPaint {
    spans: Vec<ColumnSpan>,
    hits: usize,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub duration: Duration,
    /// Edge hits composited over all columns
    pub hits: usize,
}

/// Cast, sort, and composite one column back to front
fn render_column(
    view: &View,
    world: &SectorWorld,
    x: usize,
    mask: &mut ColumnMask<'_>,
) -> ColumnPaint {
    let ray = view.ray_for_column(x);
    let mut hits = world.all_hits(&ray, Interval::UNIVERSE);
    // stable: equal distances keep sector, then edge, order
    hits.sort_by(|a, b| a.t.total_cmp(&b.t));

    let dir_len = ray.direction.length();
    let mut paint = ColumnPaint {
        spans: Vec::with_capacity(hits.len() * 2),
        hits: hits.len(),
    };

    // farthest first so nearer geometry overwrites
    for hit in hits.iter().rev() {
        let distance = hit.t * dir_len;
        let rows = column_bounds(
            view.image_height,
            distance,
            hit.floor - view.elevation,
            hit.ceiling - view.elevation,
        );

        let revealed = mask.record_bounds(view.elevation, hit, rows);
        if hit.backface {
            let debug = DEBUG_COLORS[hit.sector % DEBUG_COLORS.len()];
            let (floor_color, ceiling_color) = match view.mode {
                RenderMode::Normal => (Some(FLOOR_COLOR), Some(CEILING_COLOR)),
                RenderMode::FloorMask => (Some(debug), None),
                RenderMode::CeilingMask => (None, Some(debug)),
            };
            if let (Some((top, bottom)), Some(color)) = (revealed.floor, floor_color) {
                paint.spans.push(ColumnSpan { top, bottom, color });
            }
            if let (Some((top, bottom)), Some(color)) = (revealed.ceiling, ceiling_color) {
                paint.spans.push(ColumnSpan { top, bottom, color });
            }
        }

        // portals are open
        if !hit.portal && view.mode == RenderMode::Normal {
            paint.spans.push(ColumnSpan {
                top: rows.top,
                bottom: rows.bottom,
                color: shade(hit.color, distance),
            });
        }
    }
    paint
}

/// Render one frame of `world` as seen through `view` and present it
pub fn render_frame<S: PixelSurface + ?Sized>(
    surface: &mut S,
    world: &SectorWorld,
    view: &View,
    flat_mask: &mut FlatMask,
) -> FrameStats {
    let start = Instant::now();
    let hits = draw_frame(surface, world, view, flat_mask);
    surface.present();
    FrameStats {
        duration: start.elapsed(),
        hits,
    }
}

/// Sweep every column of `view` into `surface` without presenting; returns
/// the number of edge hits composited.
///
/// Columns are independent: each one owns its paint list and its slice of
/// the flat mask, so the sweep runs in parallel and the spans are written to
/// the surface afterwards in column order.
pub fn draw_frame<S: PixelSurface + ?Sized>(
    surface: &mut S,
    world: &SectorWorld,
    view: &View,
    flat_mask: &mut FlatMask,
) -> usize {
    let (w, h) = (view.image_width, view.image_height);

    surface.fill_rect(0, 0, w as i64, h as i64, BACKGROUND_COLOR);
    flat_mask.reset(w, h, world.len());

    let columns: Vec<ColumnPaint> = if world.is_empty() {
        Vec::new()
    } else {
        flat_mask
            .par_columns_mut()
            .enumerate()
            .map(|(x, mut mask)| render_column(view, world, x, &mut mask))
            .collect()
    };

    let mut hits = 0;
    for (x, column) in columns.iter().enumerate() {
        hits += column.hits;
        for span in &column.spans {
            surface.draw_column(x, span.top, span.bottom, span.color);
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::surface::FrameBuffer;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn column_bounds_projects_and_flips() {
        let rows = column_bounds(320, 10.0, -1.0, 2.0);
        // offset(-1) = -32 -> 128 from the bottom -> row 192
        assert_eq!(rows.bottom, 192);
        // offset(2) = 64 -> 224 from the bottom -> row 96
        assert_eq!(rows.top, 96);
    }

    #[test]
    fn column_bounds_clamps_close_walls() {
        let rows = column_bounds(240, 0.01, -1.0, 2.0);
        assert_eq!(rows, VerticalBounds { top: 0, bottom: 239 });

        let degenerate = column_bounds(240, 0.0, -1.0, 2.0);
        assert_eq!(degenerate, VerticalBounds { top: 0, bottom: 239 });
        let nan = column_bounds(240, f64::NAN, -1.0, 2.0);
        assert_eq!(nan, VerticalBounds { top: 0, bottom: 239 });
    }

    #[test]
    fn shading_falls_off_with_distance() {
        assert_eq!(shade(Color::WHITE, 0.0), Color::WHITE);
        assert_eq!(shade(Color::WHITE, 10.0), Color::new(0.5, 0.5, 0.5));
        assert_eq!(shade(Color::WHITE, 25.0), Color::BLACK);
    }

    #[test]
    fn empty_world_renders_background() {
        let mut camera = Camera::new(4, 3, FRAC_PI_2);
        let mut fb = FrameBuffer::new(4, 3);
        let stats = camera.render(&SectorWorld::new(), &mut fb);
        assert_eq!(stats.hits, 0);
        assert_eq!(fb.presented(), 1);
        assert!(fb.pixels().iter().all(|&c| c == BACKGROUND_COLOR));
    }
}
