//! UV sphere generation.
//!
//! The sphere is built from a north pole vertex, `lat_lines` rings of
//! `long_lines` vertices each (north to south, parallels evenly spaced
//! strictly between the poles) and a south pole vertex:
//!
//! ```text
//!   index 0                      north pole   (0,  r, 0)   uv (0, 1)
//!   index 1 + lat·n + lon        ring vertex  lat ∈ [0, m), lon ∈ [0, n)
//!   index m·n + 1                south pole   (0, -r, 0)   uv (0, 0)
//! ```
//!
//! Every ring cell contributes two indices, `lat·n + lon` and
//! `(lat + 1)·n + lon`, which the planet renderer draws as a triangle list.
//! These indices are not offset by the north pole, so the first cell points at
//! the north pole and, for more than two meridians, the last ring points past
//! the south pole (see [`Mesh::max_index`]).

use std::f32::consts::PI;

pub type Vertex = [f32; 3];
pub type TexCoord = [f32; 2];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("a sphere needs at least one line of latitude")]
    NoLatitudeLines,
    #[error("a sphere needs at least one line of longitude")]
    NoLongitudeLines,
    #[error("sphere radius must be a positive number, got {0}")]
    InvalidRadius(f32),
    #[error("{lat_lines}x{long_lines} lines do not fit 32-bit indices")]
    TooLarge { lat_lines: u32, long_lines: u32 },
}

/// Vertex positions, texture coordinates and triangle indices of a sphere.
///
/// `vertices` and `tex_coords` always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    tex_coords: Vec<TexCoord>,
    indices: Vec<u32>,
    long_lines: u32,
    lat_lines: u32,
}

impl Mesh {
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn tex_coords(&self) -> &[TexCoord] {
        &self.tex_coords
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Largest index in the index list: `(lat_lines + 1)·long_lines − 1`.
    ///
    /// This is below [`Mesh::vertex_count`] only for one or two meridians.
    pub fn max_index(&self) -> u32 {
        (self.lat_lines + 1) * self.long_lines - 1
    }

    pub fn north_pole(&self) -> Vertex {
        self.vertices[0]
    }

    pub fn south_pole(&self) -> Vertex {
        self.vertices[self.vertices.len() - 1]
    }
}

/// Builds the sphere for `lat_lines` parallels and `long_lines` meridians.
///
/// The result is a pure function of the inputs.
pub fn generate_sphere(lat_lines: u32, long_lines: u32, radius: f32) -> Result<Mesh, MeshError> {
    if lat_lines == 0 {
        return Err(MeshError::NoLatitudeLines);
    }
    if long_lines == 0 {
        return Err(MeshError::NoLongitudeLines);
    }
    if !radius.is_finite() || radius <= 0.0 {
        return Err(MeshError::InvalidRadius(radius));
    }
    let fits = (u64::from(lat_lines) + 1)
        .checked_mul(u64::from(long_lines))
        .is_some_and(|cells| cells + 1 <= u64::from(u32::MAX));
    if !fits {
        return Err(MeshError::TooLarge {
            lat_lines,
            long_lines,
        });
    }

    let ring_vertices = lat_lines as usize * long_lines as usize;
    let mut vertices = Vec::with_capacity(ring_vertices + 2);
    let mut tex_coords = Vec::with_capacity(ring_vertices + 2);
    let mut indices = Vec::with_capacity(ring_vertices * 2);

    vertices.push([0.0, radius, 0.0]);
    tex_coords.push([0.0, 1.0]);

    // The poles sit one spacing away from the first and last parallel.
    let latitude_spacing = 1.0 / (lat_lines as f32 + 1.0);
    let longitude_spacing = 1.0 / long_lines as f32;

    for lat in 0..lat_lines {
        for lon in 0..long_lines {
            let u = lon as f32 * longitude_spacing;
            let v = 1.0 - (lat + 1) as f32 * latitude_spacing;
            tex_coords.push([u, v]);

            let theta = u * 2.0 * PI;
            let phi = (v - 0.5) * PI;
            let ring_radius = phi.cos();
            vertices.push([
                ring_radius * theta.cos() * radius,
                phi.sin() * radius,
                ring_radius * theta.sin() * radius,
            ]);

            indices.push(lat * long_lines + (lon % long_lines));
            indices.push((lat + 1) * long_lines + (lon % long_lines));
        }
    }

    vertices.push([0.0, -radius, 0.0]);
    tex_coords.push([0.0, 0.0]);

    Ok(Mesh {
        vertices,
        tex_coords,
        indices,
        long_lines,
        lat_lines,
    })
}
