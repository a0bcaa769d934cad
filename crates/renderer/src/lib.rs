//! Renderer crate for Lis, the rotating planet viewer.
//!
//! The crate builds a UV sphere, wraps it in an Earth texture and spins it in
//! a winit window through `wgpu`. The overall flow is:
//!
//! ```text
//!   lis binary
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ SurfaceDriver<WindowSurface, PlanetRenderer> ──▶ winit event loop
//!                              │
//!                              ├─ first expose: GpuContext + PlanetRenderer::on_activate
//!                              └─ every redraw: on_frame ─▶ present ─▶ request_redraw
//! ```
//!
//! `SurfaceDriver` knows nothing about winit or wgpu; it is written against the
//! [`Surface`] and [`Renderable`] traits so the frame loop can be exercised
//! without a display. Shaders are plain GLSL 450 files read from disk at
//! activation time (see [`compile`]).

pub mod compile;
mod gpu;
pub mod mesh;
pub mod surface;
mod types;
mod window;

use anyhow::Result;
use logger::Logger;

pub use compile::{ShaderError, ShaderInterface, ShaderProgramSource};
pub use gpu::{planet_transform, rotation_degrees, GpuContext, PlanetRenderer};
pub use mesh::{generate_sphere, Mesh, MeshError};
pub use surface::{RenderOutcome, Renderable, Surface, SurfaceDriver, SurfaceMetrics};
pub use types::{Antialiasing, PlanetSettings, RendererConfig};
pub use window::{run_window, WindowSurface};

/// Shaders shipped with the source tree.
pub const BUNDLED_SHADER_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders");

/// Thin entry point that owns the configuration until the window is opened.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Blocks until the window is closed or rendering fails.
    pub fn run(self, logger: Logger) -> Result<()> {
        tracing::debug!(
            width = self.config.surface_size.0,
            height = self.config.surface_size.1,
            shader_dir = %self.config.shader_dir.display(),
            animate = self.config.animate,
            "opening planet window"
        );
        run_window(self.config, logger)
    }
}
