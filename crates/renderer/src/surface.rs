//! Event-driven frame loop, independent of the windowing system.
//!
//! A [`Surface`] is something that can be shown, owns a lazily created GPU
//! context and presents frames. A [`Renderable`] draws into it. The
//! [`SurfaceDriver`] ties the two together: on every expose or update request
//! it makes the context current, activates the renderable the first time,
//! draws, presents, and schedules the next update while animating.

use anyhow::{Context, Result};

/// Window properties a renderable needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMetrics {
    /// Size in device-independent pixels.
    pub logical_size: (f64, f64),
    pub scale_factor: f64,
    /// Refresh rate of the display the surface is on, in Hz.
    pub refresh_rate: f32,
}

impl SurfaceMetrics {
    /// Viewport in device pixels: logical size times the scale factor.
    pub fn viewport(&self) -> (u32, u32) {
        let (width, height) = self.logical_size;
        (
            (width * self.scale_factor).round().max(0.0) as u32,
            (height * self.scale_factor).round().max(0.0) as u32,
        )
    }
}

impl Default for SurfaceMetrics {
    fn default() -> Self {
        Self {
            logical_size: (0.0, 0.0),
            scale_factor: 1.0,
            refresh_rate: 60.0,
        }
    }
}

pub trait Surface {
    type Context;
    type Frame;

    fn is_exposed(&self) -> bool;

    /// Creates the GPU context on first use. Returns true if it was created by this call.
    fn make_current(&mut self) -> Result<bool>;

    fn context(&mut self) -> Option<&mut Self::Context>;

    /// Next frame to draw into, or `None` if this frame should be skipped.
    fn acquire_frame(&mut self) -> Result<Option<Self::Frame>>;

    fn present(&mut self, frame: Self::Frame);

    /// Asks for another update; repeated requests before it is delivered coalesce.
    fn request_update(&mut self);

    fn metrics(&self) -> SurfaceMetrics;

    fn resize(&mut self, width: u32, height: u32);

    /// Called once after the renderable has been activated.
    fn activated(&mut self) {}
}

/// Something that draws into a [`Surface`].
pub trait Renderable {
    type Context;
    type Frame;

    /// One-time setup with a current context. Called before the first frame.
    fn on_activate(&mut self, context: &mut Self::Context, metrics: SurfaceMetrics) -> Result<()>;

    fn on_frame(
        &mut self,
        context: &mut Self::Context,
        frame: &Self::Frame,
        metrics: SurfaceMetrics,
    ) -> Result<()>;

    fn on_resize(&mut self, _context: &mut Self::Context, _metrics: SurfaceMetrics) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The surface is hidden; nothing was drawn and nothing was scheduled.
    NotExposed,
    /// The surface had no frame to give out.
    Skipped,
    Presented,
}

pub struct SurfaceDriver<S, R> {
    surface: S,
    renderable: R,
    animating: bool,
    activated: bool,
}

impl<S, R> SurfaceDriver<S, R>
where
    S: Surface,
    R: Renderable<Context = S::Context, Frame = S::Frame>,
{
    pub fn new(surface: S, renderable: R) -> Self {
        Self {
            surface,
            renderable,
            animating: false,
            activated: false,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn renderable(&self) -> &R {
        &self.renderable
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// While animating, every presented frame requests the next one.
    pub fn set_animating(&mut self, animating: bool) {
        self.animating = animating;
        if animating {
            self.render_later();
        }
    }

    pub fn render_later(&mut self) {
        self.surface.request_update();
    }

    pub fn render_now(&mut self) -> Result<RenderOutcome> {
        if !self.surface.is_exposed() {
            return Ok(RenderOutcome::NotExposed);
        }

        if self.surface.make_current()? {
            tracing::debug!("GPU context created");
        }
        let metrics = self.surface.metrics();
        if !self.activated {
            let context = self
                .surface
                .context()
                .context("surface reported a current context but has none")?;
            self.renderable.on_activate(context, metrics)?;
            self.activated = true;
            self.surface.activated();
        }

        let outcome = match self.surface.acquire_frame()? {
            Some(frame) => {
                let context = self
                    .surface
                    .context()
                    .context("surface lost its context while drawing")?;
                self.renderable.on_frame(context, &frame, metrics)?;
                self.surface.present(frame);
                RenderOutcome::Presented
            }
            None => RenderOutcome::Skipped,
        };

        if self.animating {
            self.render_later();
        }
        Ok(outcome)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
        let metrics = self.surface.metrics();
        if let Some(context) = self.surface.context() {
            self.renderable.on_resize(context, metrics);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeSurface {
        exposed: bool,
        context: Option<u32>,
        skip_frames: usize,
        next_frame: u64,
        presented: Vec<u64>,
        update_requests: usize,
        activated_hook: usize,
        size: (u32, u32),
    }

    impl FakeSurface {
        fn exposed() -> Self {
            Self {
                exposed: true,
                size: (800, 600),
                ..Self::default()
            }
        }
    }

    impl Surface for FakeSurface {
        type Context = u32;
        type Frame = u64;

        fn is_exposed(&self) -> bool {
            self.exposed
        }

        fn make_current(&mut self) -> Result<bool> {
            if self.context.is_some() {
                return Ok(false);
            }
            self.context = Some(0);
            Ok(true)
        }

        fn context(&mut self) -> Option<&mut u32> {
            self.context.as_mut()
        }

        fn acquire_frame(&mut self) -> Result<Option<u64>> {
            if self.skip_frames > 0 {
                self.skip_frames -= 1;
                return Ok(None);
            }
            self.next_frame += 1;
            Ok(Some(self.next_frame))
        }

        fn present(&mut self, frame: u64) {
            self.presented.push(frame);
        }

        fn request_update(&mut self) {
            self.update_requests += 1;
        }

        fn metrics(&self) -> SurfaceMetrics {
            SurfaceMetrics {
                logical_size: (self.size.0 as f64, self.size.1 as f64),
                scale_factor: 2.0,
                refresh_rate: 60.0,
            }
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }

        fn activated(&mut self) {
            self.activated_hook += 1;
        }
    }

    #[derive(Default)]
    struct CountingRenderable {
        activations: usize,
        frames: Vec<u64>,
        resizes: Vec<(u32, u32)>,
        fail_frames: bool,
    }

    impl Renderable for CountingRenderable {
        type Context = u32;
        type Frame = u64;

        fn on_activate(&mut self, context: &mut u32, _metrics: SurfaceMetrics) -> Result<()> {
            assert_eq!(self.activations, 0, "activated twice");
            self.activations += 1;
            *context += 1;
            Ok(())
        }

        fn on_frame(&mut self, context: &mut u32, frame: &u64, _metrics: SurfaceMetrics) -> Result<()> {
            assert_eq!(*context, 1, "drawing without activation");
            if self.fail_frames {
                anyhow::bail!("failed to bind the shader program");
            }
            self.frames.push(*frame);
            Ok(())
        }

        fn on_resize(&mut self, _context: &mut u32, metrics: SurfaceMetrics) {
            self.resizes.push(metrics.viewport());
        }
    }

    #[test]
    fn hidden_surface_is_left_alone() {
        let surface = FakeSurface::default();
        let mut driver = SurfaceDriver::new(surface, CountingRenderable::default());
        driver.set_animating(false);

        assert_eq!(driver.render_now().unwrap(), RenderOutcome::NotExposed);
        assert!(driver.surface().context.is_none());
        assert_eq!(driver.renderable().activations, 0);
        assert_eq!(driver.surface().update_requests, 0);
    }

    #[test]
    fn activates_once_then_draws_every_time() {
        let mut driver = SurfaceDriver::new(FakeSurface::exposed(), CountingRenderable::default());

        for _ in 0..3 {
            assert_eq!(driver.render_now().unwrap(), RenderOutcome::Presented);
        }

        assert_eq!(driver.renderable().activations, 1);
        assert_eq!(driver.surface().activated_hook, 1);
        assert_eq!(driver.renderable().frames, vec![1, 2, 3]);
        assert_eq!(driver.surface().presented, vec![1, 2, 3]);
    }

    #[test]
    fn animation_reschedules_itself() {
        let mut driver = SurfaceDriver::new(FakeSurface::exposed(), CountingRenderable::default());
        driver.set_animating(true);
        assert!(driver.is_animating());
        assert_eq!(driver.surface().update_requests, 1);

        driver.render_now().unwrap();
        driver.render_now().unwrap();
        assert_eq!(driver.surface().update_requests, 3);

        driver.set_animating(false);
        driver.render_now().unwrap();
        assert_eq!(driver.surface().update_requests, 3);
        assert_eq!(driver.renderable().frames.len(), 3);
    }

    #[test]
    fn skipped_frames_are_not_presented_but_still_rescheduled() {
        let mut surface = FakeSurface::exposed();
        surface.skip_frames = 1;
        let mut driver = SurfaceDriver::new(surface, CountingRenderable::default());
        driver.set_animating(true);

        assert_eq!(driver.render_now().unwrap(), RenderOutcome::Skipped);
        assert!(driver.surface().presented.is_empty());
        assert!(driver.renderable().frames.is_empty());
        assert_eq!(driver.renderable().activations, 1);
        assert_eq!(driver.surface().update_requests, 2);

        assert_eq!(driver.render_now().unwrap(), RenderOutcome::Presented);
    }

    #[test]
    fn frame_errors_propagate_without_presenting() {
        let renderable = CountingRenderable {
            fail_frames: true,
            ..CountingRenderable::default()
        };
        let mut driver = SurfaceDriver::new(FakeSurface::exposed(), renderable);

        let err = driver.render_now().unwrap_err();
        assert!(err.to_string().contains("failed to bind the shader program"));
        assert!(driver.surface().presented.is_empty());
    }

    #[test]
    fn resize_reaches_the_renderable_once_a_context_exists() {
        let mut driver = SurfaceDriver::new(FakeSurface::exposed(), CountingRenderable::default());
        driver.resize(400, 300);
        assert!(driver.renderable().resizes.is_empty());

        driver.render_now().unwrap();
        driver.resize(1024, 768);
        assert_eq!(driver.renderable().resizes, vec![(2048, 1536)]);
    }

    #[test]
    fn viewport_scales_logical_size() {
        let metrics = SurfaceMetrics {
            logical_size: (800.0, 600.0),
            scale_factor: 1.5,
            refresh_rate: 144.0,
        };
        assert_eq!(metrics.viewport(), (1200, 900));
    }
}
