use std::sync::Arc;

use anyhow::{anyhow, Result};
use logger::Logger;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{Event, StartCause, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::gpu::{GpuContext, PlanetRenderer};
use crate::surface::{RenderOutcome, Surface, SurfaceDriver, SurfaceMetrics};
use crate::types::{Antialiasing, RendererConfig};

const DEFAULT_REFRESH_RATE: f32 = 60.0;

/// [`Surface`] backed by a winit window.
///
/// The GPU context is created on the first [`Surface::make_current`] call and
/// dropped before the window it draws to.
pub struct WindowSurface {
    gpu: Option<GpuContext>,
    window: Arc<Window>,
    exposed: bool,
    refresh_rate: f32,
    antialiasing: Antialiasing,
    debug_context: bool,
}

impl WindowSurface {
    pub fn new(window: Arc<Window>, config: &RendererConfig) -> Self {
        let refresh_rate = monitor_refresh_rate(&window);
        Self {
            gpu: None,
            window,
            exposed: true,
            refresh_rate,
            antialiasing: config.antialiasing,
            debug_context: config.debug_context,
        }
    }

    pub fn set_exposed(&mut self, exposed: bool) {
        self.exposed = exposed;
    }

    /// Re-reads the refresh rate, e.g. after the window moved to another monitor.
    pub fn refresh_monitor(&mut self) {
        self.refresh_rate = monitor_refresh_rate(&self.window);
    }
}

impl Surface for WindowSurface {
    type Context = GpuContext;
    type Frame = wgpu::SurfaceTexture;

    fn is_exposed(&self) -> bool {
        let size = self.window.inner_size();
        self.exposed && size.width > 0 && size.height > 0
    }

    fn make_current(&mut self) -> Result<bool> {
        if self.gpu.is_some() {
            return Ok(false);
        }
        let gpu = GpuContext::new(
            self.window.as_ref(),
            self.window.inner_size(),
            self.antialiasing,
            self.debug_context,
        )?;
        self.gpu = Some(gpu);
        Ok(true)
    }

    fn context(&mut self) -> Option<&mut GpuContext> {
        self.gpu.as_mut()
    }

    fn acquire_frame(&mut self) -> Result<Option<wgpu::SurfaceTexture>> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(None);
        };
        match gpu.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated; reconfiguring");
                gpu.resize(self.window.inner_size());
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("surface timeout; retrying next frame");
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(anyhow!("surface out of memory")),
            Err(other) => {
                tracing::warn!("surface error: {other}; retrying next frame");
                Ok(None)
            }
        }
    }

    fn present(&mut self, frame: wgpu::SurfaceTexture) {
        self.window.pre_present_notify();
        frame.present();
    }

    fn request_update(&mut self) {
        self.window.request_redraw();
    }

    fn metrics(&self) -> SurfaceMetrics {
        let scale_factor = self.window.scale_factor();
        let logical: LogicalSize<f64> = self.window.inner_size().to_logical(scale_factor);
        SurfaceMetrics {
            logical_size: (logical.width, logical.height),
            scale_factor,
            refresh_rate: self.refresh_rate,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(PhysicalSize::new(width, height));
        }
    }

    fn activated(&mut self) {
        if let Some(gpu) = self.gpu.as_ref() {
            let info = &gpu.adapter_info;
            tracing::info!("GPU adapter: {} ({:?})", info.name, info.device_type);
            tracing::info!("GPU driver: {} {}", info.driver, info.driver_info);
            tracing::info!("GPU backend: {:?}", info.backend);
        }
    }
}

fn monitor_refresh_rate(window: &Window) -> f32 {
    window
        .current_monitor()
        .and_then(|monitor| monitor.refresh_rate_millihertz())
        .map(|millihertz| millihertz as f32 / 1000.0)
        .filter(|rate| *rate > 0.0)
        .unwrap_or(DEFAULT_REFRESH_RATE)
}

type PlanetDriver = SurfaceDriver<WindowSurface, PlanetRenderer>;

/// Opens the planet window and runs the event loop until it is closed.
///
/// A rendering failure closes the window and is returned to the caller.
pub fn run_window(config: RendererConfig, logger: Logger) -> Result<()> {
    let renderer = PlanetRenderer::new(&config, logger)?;

    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(LogicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create planet window: {err}"))?;
    let window = Arc::new(window);

    let window_id = window.id();
    let mut driver = SurfaceDriver::new(WindowSurface::new(window, &config), renderer);
    driver.set_animating(config.animate);
    if !config.animate {
        driver.render_later();
    }

    let mut failure: Option<anyhow::Error> = None;
    let run_result = event_loop.run(|event, elwt| match event {
        Event::NewEvents(StartCause::Init) => {
            elwt.set_control_flow(ControlFlow::Wait);
        }
        Event::WindowEvent { window_id: id, event } if id == window_id => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::Occluded(occluded) => {
                driver.surface_mut().set_exposed(!occluded);
                if !occluded {
                    render(&mut driver, elwt, &mut failure);
                }
            }
            WindowEvent::Resized(size) => {
                driver.resize(size.width, size.height);
                driver.render_later();
            }
            WindowEvent::ScaleFactorChanged { .. } => driver.render_later(),
            WindowEvent::Moved(_) => driver.surface_mut().refresh_monitor(),
            WindowEvent::RedrawRequested => render(&mut driver, elwt, &mut failure),
            _ => {}
        },
        _ => {}
    });

    if let Some(err) = failure {
        return Err(err);
    }
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

fn render(
    driver: &mut PlanetDriver,
    elwt: &EventLoopWindowTarget<()>,
    failure: &mut Option<anyhow::Error>,
) {
    match driver.render_now() {
        Ok(RenderOutcome::Presented) => {
            let frame = driver.renderable().frame();
            if frame % 600 == 0 {
                tracing::debug!(frame, "planet frames drawn");
            }
        }
        Ok(RenderOutcome::Skipped | RenderOutcome::NotExposed) => {}
        Err(err) => {
            tracing::debug!("rendering failed; closing the planet window");
            *failure = Some(err);
            elwt.exit();
        }
    }
}
