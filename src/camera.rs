use std::f64::consts::{FRAC_PI_2, PI};
use std::time::Instant;

use crate::config::Config;
use crate::flat_mask::FlatMask;
use crate::geometry::{Ray, Vec2};
use crate::renderer::{FrameStats, draw_frame, render_frame};
use crate::surface::PixelSurface;
use crate::world::SectorWorld;

/// Eye height above z = 0 for a fresh camera
pub const DEFAULT_ELEVATION: f64 = 1.0;

/// What the sweep paints
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Normal,
    /// Floor mask spans in per-sector colours, no walls
    FloorMask,
    /// Ceiling mask spans in per-sector colours, no walls
    CeilingMask,
}

impl RenderMode {
    pub fn next(self) -> Self {
        match self {
            Self::Normal => Self::FloorMask,
            Self::FloorMask => Self::CeilingMask,
            Self::CeilingMask => Self::Normal,
        }
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::FloorMask => "floor mask",
            Self::CeilingMask => "ceiling mask",
        })
    }
}

/// Basis derived from the camera state; everything a column sweep reads
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct View {
    pub origin: Vec2,
    pub back: Vec2,
    pub right: Vec2,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Ray direction through the centre of column 0
    pub first_direction: Vec2,
    pub column_delta: Vec2,
    pub image_width: usize,
    pub image_height: usize,
    pub elevation: f64,
    pub mode: RenderMode,
}

impl View {
    #[inline]
    pub fn ray_for_column(&self, x: usize) -> Ray {
        Ray::new(self.origin, self.first_direction + self.column_delta * x as f64)
    }
}

/// First-person camera over a sector world
pub struct Camera {
    position: Vec2,
    facing: Vec2,
    elevation: f64,
    mode: RenderMode,
    image_width: usize,
    image_height: usize,
    fov: f64,
    view: View,
    flat_mask: FlatMask,
}

impl Camera {
    /// Camera at the origin looking along +y; `fov` is the full horizontal
    /// field of view in radians
    pub fn new(image_width: usize, image_height: usize, fov: f64) -> Self {
        let fov = if fov.is_finite() {
            fov.clamp(0.01, PI - 0.01)
        } else {
            FRAC_PI_2
        };
        let mut camera = Self {
            position: Vec2::ZERO,
            facing: Vec2::new(0.0, 1.0),
            elevation: DEFAULT_ELEVATION,
            mode: RenderMode::Normal,
            image_width,
            image_height,
            fov,
            view: View {
                origin: Vec2::ZERO,
                back: Vec2::ZERO,
                right: Vec2::ZERO,
                viewport_width: 0.0,
                viewport_height: 0.0,
                first_direction: Vec2::ZERO,
                column_delta: Vec2::ZERO,
                image_width,
                image_height,
                elevation: DEFAULT_ELEVATION,
                mode: RenderMode::Normal,
            },
            flat_mask: FlatMask::default(),
        };
        camera.rebuild();
        camera
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.image_width, config.image_height(), config.fov())
    }

    fn rebuild(&mut self) {
        let back = -self.facing;
        // up x back with up = +z
        let right = Vec2::new(-back.y, back.x);

        let viewport_width = 2.0 * (self.fov * 0.5).tan();
        let viewport_height = if self.image_width > 0 {
            viewport_width * self.image_height as f64 / self.image_width as f64
        } else {
            0.0
        };
        let column_delta = if self.image_width > 0 {
            right * (viewport_width / self.image_width as f64)
        } else {
            Vec2::ZERO
        };
        let first_direction = self.facing - right * (viewport_width * 0.5) + column_delta * 0.5;

        self.view = View {
            origin: self.position,
            back,
            right,
            viewport_width,
            viewport_height,
            first_direction,
            column_delta,
            image_width: self.image_width,
            image_height: self.image_height,
            elevation: self.elevation,
            mode: self.mode,
        };
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn facing(&self) -> Vec2 {
        self.facing
    }

    #[inline]
    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    #[inline]
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    #[inline]
    pub fn image_width(&self) -> usize {
        self.image_width
    }

    #[inline]
    pub fn image_height(&self) -> usize {
        self.image_height
    }

    #[inline]
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Floor/ceiling bookkeeping from the last rendered frame
    #[inline]
    pub fn flat_mask(&self) -> &FlatMask {
        &self.flat_mask
    }

    pub fn set_position(&mut self, position: Vec2) {
        if position.is_finite() {
            self.position = position;
            self.rebuild();
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.set_position(self.position + delta);
    }

    /// Point the camera along `direction`; zero-length directions are refused
    pub fn set_facing(&mut self, direction: Vec2) -> bool {
        match direction.unit() {
            Some(unit) => {
                self.facing = unit;
                self.rebuild();
                true
            }
            None => false,
        }
    }

    /// Rotate counter-clockwise by `angle` radians
    pub fn turn(&mut self, angle: f64) {
        let (s, c) = angle.sin_cos();
        let f = self.facing;
        self.set_facing(Vec2::new(f.x * c - f.y * s, f.x * s + f.y * c));
    }

    pub fn set_elevation(&mut self, elevation: f64) {
        if elevation.is_finite() {
            self.elevation = elevation;
            self.rebuild();
        }
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
        self.rebuild();
    }

    pub fn cycle_mode(&mut self) -> RenderMode {
        self.set_mode(self.mode.next());
        self.mode
    }

    pub fn resize(&mut self, image_width: usize, image_height: usize) {
        self.image_width = image_width;
        self.image_height = image_height;
        self.rebuild();
    }

    #[inline]
    pub fn ray_for_column(&self, x: usize) -> Ray {
        self.view.ray_for_column(x)
    }

    /// Render one frame of `world` into `surface` and present it
    pub fn render<S: PixelSurface + ?Sized>(
        &mut self,
        world: &SectorWorld,
        surface: &mut S,
    ) -> FrameStats {
        render_frame(surface, world, &self.view, &mut self.flat_mask)
    }

    /// Like [`Camera::render`] but leaves presenting to the caller, so
    /// overlays can be drawn on top first
    pub fn draw<S: PixelSurface + ?Sized>(
        &mut self,
        world: &SectorWorld,
        surface: &mut S,
    ) -> FrameStats {
        let start = Instant::now();
        let hits = draw_frame(surface, world, &self.view, &mut self.flat_mask);
        FrameStats {
            duration: start.elapsed(),
            hits,
        }
    }
}
