use nalgebra::Vector3;

pub const LIGHTS_MAX: usize = 16;
pub const MATERIALS_MAX: usize = 16;

/// Point light, positioned in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vector3<f32>,
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
}

impl Light {
    pub fn point(position: Vector3<f32>, diffuse: [f32; 3], specular: [f32; 3]) -> Self {
        Light {
            position,
            diffuse,
            specular,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub shininess: f32,
}

impl Material {
    /// Opaque material with ambient equal to diffuse and a white highlight.
    pub fn matte(color: [f32; 3], specular: f32, shininess: f32) -> Self {
        let [r, g, b] = color;
        Material {
            ambient: [r, g, b, 1.0],
            diffuse: [r, g, b, 1.0],
            specular: [specular, specular, specular, 1.0],
            shininess,
        }
    }
}
