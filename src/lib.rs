//! Sector-based 2.5D renderer.
//!
//! Maps are built from [`sector::Sector`] polygons collected in a
//! [`world::SectorWorld`], made convex by [`decompose::ConvexDecomposer`],
//! and drawn column by column by [`camera::Camera`] into any
//! [`surface::PixelSurface`].

pub mod camera;
pub mod config;
pub mod decompose;
pub mod edge;
pub mod flat_mask;
pub mod geometry;
pub mod level;
pub mod minimap;
pub mod renderer;
pub mod scaler;
pub mod sector;
pub mod surface;
pub mod world;
