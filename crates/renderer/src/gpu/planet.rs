use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use logger::Logger;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::compile::{
    ShaderError, ShaderInterface, ShaderProgramSource, SAMPLER_BINDING, TEXTURE_BINDING,
};
use crate::mesh::{generate_sphere, Mesh, TexCoord, Vertex};
use crate::surface::{Renderable, SurfaceMetrics};
use crate::types::{PlanetSettings, RendererConfig};

use super::context::GpuContext;
use super::texture::{
    decode_planet_texture, DepthTarget, MultisampleTarget, PlanetTexture, DEPTH_FORMAT,
    PLANET_TEXTURE,
};
use super::transform::{planet_transform, TransformUniform};

/// Draws the textured, slowly rotating sphere.
///
/// GPU resources are created in [`Renderable::on_activate`]; until then
/// [`Renderable::on_frame`] refuses to draw. The frame counter only advances
/// on frames that were actually encoded and submitted.
pub struct PlanetRenderer {
    settings: PlanetSettings,
    mesh: Mesh,
    shader_dir: PathBuf,
    logger: Logger,
    frame: u64,
    resources: Option<PlanetResources>,
}

struct PlanetResources {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    position_buffer: wgpu::Buffer,
    tex_coord_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    _texture: PlanetTexture,
    depth: DepthTarget,
    multisample: Option<MultisampleTarget>,
}

impl PlanetRenderer {
    pub fn new(config: &RendererConfig, logger: Logger) -> Result<Self> {
        let planet = config.planet;
        let mesh = generate_sphere(planet.lat_lines, planet.long_lines, planet.radius)
            .context("failed to generate the planet mesh")?;
        logger
            .message(logger::LogLevel::Debug)
            .append(format_args!(
                "planet mesh: {} vertices, {} indices",
                mesh.vertex_count(),
                mesh.index_count()
            ))
            .commit();
        Ok(Self {
            settings: planet,
            mesh,
            shader_dir: config.shader_dir.clone(),
            logger,
            frame: 0,
            resources: None,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Number of frames drawn so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_activated(&self) -> bool {
        self.resources.is_some()
    }

    fn attach_debug_listener(&self, context: &GpuContext) {
        if !context.debug {
            return;
        }
        let logger = self.logger.clone();
        context.device.on_uncaptured_error(Box::new(move |error| {
            logger.debug(format!("GPU: {error}"));
        }));
        self.logger.debug("GPU debug listener attached");
    }
}

impl Renderable for PlanetRenderer {
    type Context = GpuContext;
    type Frame = wgpu::SurfaceTexture;

    fn on_activate(&mut self, context: &mut GpuContext, _metrics: SurfaceMetrics) -> Result<()> {
        assert!(
            self.resources.is_none(),
            "PlanetRenderer::on_activate called twice"
        );

        self.attach_debug_listener(context);

        let image = decode_planet_texture(PLANET_TEXTURE)?;
        let texture = PlanetTexture::upload(&context.device, &context.queue, &image);

        let program = ShaderProgramSource::load(&self.shader_dir)?;
        let interface = program.interface()?;
        let pipeline = PipelineParts::build(context, &program, &interface)?;

        let device = &context.device;
        let vertex_slots = self.mesh.max_index() as usize + 1;
        let positions = padded(self.mesh.vertices(), vertex_slots);
        let tex_coords = padded(self.mesh.tex_coords(), vertex_slots);
        let position_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("planet positions"),
            contents: bytemuck::cast_slice::<Vertex, u8>(&positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let tex_coord_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("planet texture coordinates"),
            contents: bytemuck::cast_slice::<TexCoord, u8>(&tex_coords),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("planet indices"),
            contents: bytemuck::cast_slice(self.mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("planet transform"),
            size: std::mem::size_of::<TransformUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (_, matrix_binding) = interface.matrix_binding;
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("planet bind group"),
            layout: &pipeline.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: matrix_binding,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: TEXTURE_BINDING,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        });

        let size = context.size();
        let (depth, multisample) = render_targets(context, size);
        let index_count = u32::try_from(self.mesh.index_count())
            .map_err(|_| anyhow!("planet mesh has too many indices"))?;

        self.resources = Some(PlanetResources {
            pipeline: pipeline.pipeline,
            bind_group,
            uniform_buffer,
            position_buffer,
            tex_coord_buffer,
            index_buffer,
            index_count,
            _texture: texture,
            depth,
            multisample,
        });
        self.logger.info(format!(
            "planet ready: {}x{} lines, {} samples per pixel",
            self.settings.lat_lines, self.settings.long_lines, context.sample_count
        ));
        Ok(())
    }

    fn on_frame(
        &mut self,
        context: &mut GpuContext,
        frame: &wgpu::SurfaceTexture,
        metrics: SurfaceMetrics,
    ) -> Result<()> {
        let Some(resources) = self.resources.as_mut() else {
            bail!("failed to bind the shader program: the planet renderer is not activated");
        };

        let frame_size = PhysicalSize::new(frame.texture.width(), frame.texture.height());
        if resources.depth.size != frame_size {
            let (depth, multisample) = render_targets(context, frame_size);
            resources.depth = depth;
            resources.multisample = multisample;
        }

        let (viewport_width, viewport_height) = metrics.viewport();
        let viewport_width = viewport_width.clamp(1, frame_size.width.max(1));
        let viewport_height = viewport_height.clamp(1, frame_size.height.max(1));

        let uniform = TransformUniform::new(planet_transform(self.frame, metrics.refresh_rate));
        context
            .queue
            .write_buffer(&resources.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let (attachment_view, resolve_target) = match resources.multisample.as_ref() {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("planet encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("planet pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &resources.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_viewport(
                0.0,
                0.0,
                viewport_width as f32,
                viewport_height as f32,
                0.0,
                1.0,
            );
            render_pass.set_pipeline(&resources.pipeline);
            render_pass.set_bind_group(0, &resources.bind_group, &[]);
            render_pass.set_vertex_buffer(0, resources.position_buffer.slice(..));
            render_pass.set_vertex_buffer(1, resources.tex_coord_buffer.slice(..));
            render_pass.set_index_buffer(resources.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..resources.index_count, 0, 0..1);
        }
        context.queue.submit(std::iter::once(encoder.finish()));

        self.frame += 1;
        Ok(())
    }

    fn on_resize(&mut self, context: &mut GpuContext, _metrics: SurfaceMetrics) {
        if let Some(resources) = self.resources.as_mut() {
            let (depth, multisample) = render_targets(context, context.size());
            resources.depth = depth;
            resources.multisample = multisample;
        }
    }
}

struct PipelineParts {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl PipelineParts {
    /// Builds the pipeline inside a validation scope so that interface
    /// mismatches between the stages surface as a link error.
    fn build(
        context: &GpuContext,
        program: &ShaderProgramSource,
        interface: &ShaderInterface,
    ) -> Result<Self> {
        let (matrix_group, matrix_binding) = interface.matrix_binding;
        if matrix_group != 0 || matrix_binding == TEXTURE_BINDING || matrix_binding == SAMPLER_BINDING
        {
            return Err(ShaderError::Link(format!(
                "uniform block holding `matrix` must use set 0 and a binding other than {TEXTURE_BINDING} or {SAMPLER_BINDING}, found set {matrix_group} binding {matrix_binding}"
            ))
            .into());
        }

        let device = &context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = program.vertex.create_module(device);
        let fragment_module = program.fragment.create_module(device);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("planet layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: matrix_binding,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: TEXTURE_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("planet pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let position_attributes = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: interface.position_location,
        }];
        let tex_coord_attributes = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: interface.tex_coord_location,
        }];
        let vertex_buffers = [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &position_attributes,
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<TexCoord>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &tex_coord_attributes,
            },
        ];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("planet pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: context.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.surface_format(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Link(error.to_string()).into());
        }

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }
}

fn render_targets(
    context: &GpuContext,
    size: PhysicalSize<u32>,
) -> (DepthTarget, Option<MultisampleTarget>) {
    let depth = DepthTarget::new(&context.device, size, context.sample_count);
    let multisample = (context.sample_count > 1).then(|| {
        MultisampleTarget::new(
            &context.device,
            context.surface_format(),
            size,
            context.sample_count,
        )
    });
    (depth, multisample)
}

/// Extends `items` to `len` entries by repeating the last one.
///
/// The index list reaches past the south pole for more than two meridians;
/// padding the GPU buffers keeps every index pointing at a defined vertex.
fn padded<T: Copy>(items: &[T], len: usize) -> Vec<T> {
    let mut out = items.to_vec();
    if let Some(&last) = items.last() {
        out.resize(len.max(items.len()), last);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_repeats_the_south_pole() {
        let mesh = generate_sphere(2, 4, 1.0).unwrap();
        let slots = mesh.max_index() as usize + 1;
        let positions = padded(mesh.vertices(), slots);
        assert_eq!(positions.len(), 12);
        assert_eq!(&positions[..10], mesh.vertices());
        assert_eq!(positions[10], mesh.south_pole());
        assert_eq!(positions[11], mesh.south_pole());

        let tex_coords = padded(mesh.tex_coords(), slots);
        assert_eq!(tex_coords[11], [0.0, 0.0]);
    }

    #[test]
    fn padding_never_truncates() {
        let mesh = generate_sphere(6, 1, 1.0).unwrap();
        let positions = padded(mesh.vertices(), mesh.max_index() as usize + 1);
        assert_eq!(positions.len(), mesh.vertex_count());
    }

    #[test]
    fn renderer_starts_inactive_with_configured_mesh() {
        let config = RendererConfig {
            planet: PlanetSettings {
                lat_lines: 3,
                long_lines: 5,
                radius: 1.0,
            },
            ..RendererConfig::default()
        };
        let renderer = PlanetRenderer::new(&config, Logger::default()).unwrap();
        assert!(!renderer.is_activated());
        assert_eq!(renderer.frame(), 0);
        assert_eq!(renderer.mesh().vertex_count(), 17);
    }

    #[test]
    fn invalid_planet_fails_before_any_gpu_work() {
        let config = RendererConfig {
            planet: PlanetSettings {
                lat_lines: 0,
                long_lines: 5,
                radius: 1.0,
            },
            ..RendererConfig::default()
        };
        let Err(err) = PlanetRenderer::new(&config, Logger::default()) else {
            panic!("a planet without latitude lines must be rejected");
        };
        assert!(format!("{err:#}").contains("latitude"));
    }
}
