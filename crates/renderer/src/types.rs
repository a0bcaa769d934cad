use std::path::PathBuf;

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count the surface and depth formats both support.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl Antialiasing {
    /// Sample count to use given the counts the device supports, in ascending order.
    pub fn resolve(self, supported: &[u32]) -> u32 {
        match self {
            Antialiasing::Off => 1,
            Antialiasing::Auto => supported.last().copied().unwrap_or(1),
            Antialiasing::Samples(requested) => supported
                .iter()
                .copied()
                .filter(|&count| count <= requested)
                .max()
                .unwrap_or(1),
        }
    }
}

/// Sphere tessellation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanetSettings {
    pub lat_lines: u32,
    pub long_lines: u32,
    pub radius: f32,
}

impl Default for PlanetSettings {
    fn default() -> Self {
        Self {
            lat_lines: 40,
            long_lines: 40,
            radius: 0.7,
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// Built by the binary from the configuration file and CLI overrides.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in logical pixels.
    pub surface_size: (u32, u32),
    pub title: String,
    /// Keep redrawing at the display refresh rate.
    pub animate: bool,
    pub antialiasing: Antialiasing,
    pub planet: PlanetSettings,
    /// Directory holding `vertex.shader` and `fragment.shader`.
    pub shader_dir: PathBuf,
    /// Request validation and forward GPU diagnostics to the debug log.
    pub debug_context: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (800, 600),
            title: "Lis".to_string(),
            animate: true,
            antialiasing: Antialiasing::Samples(16),
            planet: PlanetSettings::default(),
            shader_dir: PathBuf::from(crate::BUNDLED_SHADER_DIR),
            debug_context: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antialiasing_clamps_to_supported_counts() {
        let supported = [1, 2, 4];
        assert_eq!(Antialiasing::Samples(16).resolve(&supported), 4);
        assert_eq!(Antialiasing::Samples(2).resolve(&supported), 2);
        assert_eq!(Antialiasing::Auto.resolve(&supported), 4);
        assert_eq!(Antialiasing::Off.resolve(&supported), 1);
        assert_eq!(Antialiasing::Samples(8).resolve(&[1]), 1);
    }

    #[test]
    fn default_antialiasing_picks_the_best_supported_count() {
        assert_eq!(Antialiasing::default(), Antialiasing::Auto);
        assert_eq!(Antialiasing::default().resolve(&[1, 4, 8]), 8);
        assert_eq!(RendererConfig::default().antialiasing, Antialiasing::Samples(16));
    }
}
