extern crate nalgebra_glm as glm;

use nalgebra::Matrix4;
use nalgebra::Vector3;

/// Maps OpenGL clip space onto Vulkan's: y points down and depth spans 0..1.
#[rustfmt::skip]
fn vulkan_clip_correction() -> Matrix4<f32> {
    Matrix4::new(
        1.0,  0.0, 0.0, 0.0,
        0.0, -1.0, 0.0, 0.0,
        0.0,  0.0, 0.5, 0.5,
        0.0,  0.0, 0.0, 1.0,
    )
}

fn calculate_view_m(eye: &Vector3<f32>, direction: &Vector3<f32>) -> Matrix4<f32> {
    let mut up: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);
    if direction.cross(&up).norm() < 1e-6 {
        up = Vector3::new(0.0, 0.0, 1.0);
    }
    let center = eye + direction;
    glm::look_at(eye, &center, &up)
}

fn calculate_proj_m(
    fov: f32,
    aspect_ratio: f32,
    near_plane_dist: f32,
    far_plane_dist: f32,
) -> Matrix4<f32> {
    vulkan_clip_correction() * glm::perspective(aspect_ratio, fov, near_plane_dist, far_plane_dist)
}

/// First-person camera built from the scene's eye position and direction.
#[derive(Debug, Copy, Clone)]
pub struct EyeCamera {
    view_m: Matrix4<f32>,
    proj_m: Matrix4<f32>,
}

impl EyeCamera {
    pub const FOV: f32 = std::f32::consts::FRAC_PI_4;
    pub const NEAR_PLANE_DIST: f32 = 1.0;
    pub const FAR_PLANE_DIST: f32 = 1000.0;

    pub fn new(eye: &Vector3<f32>, direction: &Vector3<f32>, extent: [u32; 2]) -> Self {
        let aspect_ratio = if extent[1] == 0 {
            1.0
        } else {
            extent[0] as f32 / extent[1] as f32
        };
        EyeCamera {
            view_m: calculate_view_m(eye, direction),
            proj_m: calculate_proj_m(
                Self::FOV,
                aspect_ratio,
                Self::NEAR_PLANE_DIST,
                Self::FAR_PLANE_DIST,
            ),
        }
    }

    pub fn view_m(&self) -> Matrix4<f32> {
        self.view_m
    }

    pub fn proj_m(&self) -> Matrix4<f32> {
        self.proj_m
    }
}
