//! Loading, parsing and reflecting the planet's GLSL program.
//!
//! Both stages are parsed with naga's GLSL front end before they reach wgpu so
//! that syntax errors come back with the front end's own diagnostics, and so
//! that the vertex stage can be queried for the names the renderer binds by:
//! the `matrix` uniform and the `vertexPosition` / `texCoord` inputs.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use wgpu::naga::front::glsl::{Frontend, Options};
use wgpu::naga::{AddressSpace, Binding, Module, ShaderStage, TypeInner};

pub const VERTEX_SHADER_FILE: &str = "vertex.shader";
pub const FRAGMENT_SHADER_FILE: &str = "fragment.shader";

pub const MATRIX_UNIFORM: &str = "matrix";
pub const POSITION_ATTRIBUTE: &str = "vertexPosition";
pub const TEX_COORD_ATTRIBUTE: &str = "texCoord";

/// Bindings the fragment stage samples the planet texture through (set 0).
pub const TEXTURE_BINDING: u32 = 1;
pub const SAMPLER_BINDING: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read the shader {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to compile the shader {}: {log}", path.display())]
    Compile { path: PathBuf, log: String },
    #[error("failed to link shader program: {0}")]
    Link(String),
    #[error("shader program does not declare `{0}`")]
    MissingSymbol(&'static str),
}

/// One parsed shader stage.
#[derive(Debug)]
pub struct ShaderStageSource {
    pub path: PathBuf,
    pub stage: ShaderStage,
    pub code: String,
    pub module: Module,
}

impl ShaderStageSource {
    pub fn load(path: &Path, stage: ShaderStage) -> Result<Self, ShaderError> {
        let code = fs::read_to_string(path).map_err(|source| ShaderError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, stage, code)
    }

    pub fn parse(path: &Path, stage: ShaderStage, code: String) -> Result<Self, ShaderError> {
        let mut frontend = Frontend::default();
        let module = frontend
            .parse(&Options::from(stage), &code)
            .map_err(|errors| ShaderError::Compile {
                path: path.to_path_buf(),
                log: errors.emit_to_string(&code),
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            stage,
            code,
            module,
        })
    }

    pub(crate) fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        let label = self.path.display().to_string();
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(&self.code),
                stage: self.stage,
                defines: &[],
            },
        })
    }
}

/// Vertex and fragment stages read from a shader directory.
#[derive(Debug)]
pub struct ShaderProgramSource {
    pub vertex: ShaderStageSource,
    pub fragment: ShaderStageSource,
}

impl ShaderProgramSource {
    /// Reads `vertex.shader` and `fragment.shader` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ShaderError> {
        let vertex = ShaderStageSource::load(&dir.join(VERTEX_SHADER_FILE), ShaderStage::Vertex)?;
        let fragment =
            ShaderStageSource::load(&dir.join(FRAGMENT_SHADER_FILE), ShaderStage::Fragment)?;
        Ok(Self { vertex, fragment })
    }

    pub fn interface(&self) -> Result<ShaderInterface, ShaderError> {
        ShaderInterface::reflect(&self.vertex.module)
    }
}

/// Where the vertex stage expects its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderInterface {
    /// `(group, binding)` of the uniform block holding `matrix`.
    pub matrix_binding: (u32, u32),
    pub position_location: u32,
    pub tex_coord_location: u32,
}

impl ShaderInterface {
    pub fn reflect(module: &Module) -> Result<Self, ShaderError> {
        Ok(Self {
            matrix_binding: uniform_binding(module, MATRIX_UNIFORM)?,
            position_location: input_location(module, POSITION_ATTRIBUTE)?,
            tex_coord_location: input_location(module, TEX_COORD_ATTRIBUTE)?,
        })
    }
}

fn uniform_binding(module: &Module, member: &'static str) -> Result<(u32, u32), ShaderError> {
    module
        .global_variables
        .iter()
        .filter(|(_, global)| global.space == AddressSpace::Uniform)
        .find_map(|(_, global)| {
            let declares_member = match &module.types[global.ty].inner {
                TypeInner::Struct { members, .. } => members
                    .iter()
                    .any(|candidate| candidate.name.as_deref() == Some(member)),
                _ => global.name.as_deref() == Some(member),
            };
            if !declares_member {
                return None;
            }
            global
                .binding
                .as_ref()
                .map(|binding| (binding.group, binding.binding))
        })
        .ok_or(ShaderError::MissingSymbol(member))
}

fn input_location(module: &Module, name: &'static str) -> Result<u32, ShaderError> {
    module
        .entry_points
        .iter()
        .filter(|entry| entry.stage == ShaderStage::Vertex)
        .flat_map(|entry| entry.function.arguments.iter())
        .find_map(|argument| match (&argument.name, &argument.binding) {
            (Some(argument_name), Some(Binding::Location { location, .. }))
                if argument_name == name =>
            {
                Some(*location)
            }
            _ => None,
        })
        .ok_or(ShaderError::MissingSymbol(name))
}
