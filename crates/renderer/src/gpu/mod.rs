//! wgpu side of the planet viewer.
//!
//! - `context` owns instance/surface/device wiring and picks the MSAA sample
//!   count the surface and depth formats can both use.
//! - `texture` decodes the embedded planet map and builds depth and
//!   multisample targets.
//! - `transform` computes the per-frame model-view-projection matrix.
//! - `planet` is the [`Renderable`](crate::Renderable) that ties them together.

mod context;
mod planet;
mod texture;
mod transform;

pub use context::GpuContext;
pub use planet::PlanetRenderer;
pub use transform::{planet_transform, rotation_degrees};
