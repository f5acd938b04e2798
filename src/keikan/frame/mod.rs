//! Per-frame work of the renderer: scene layout, uniform and instance
//! preparation, submission through the swapchain.

pub mod fences;
pub mod layout;
pub mod swapchain;

use crate::debug::tracing::timed;
use crate::frame::layout::SceneLayout;
use crate::frame::swapchain::SwapchainManager;
use crate::gpu::{
    Extent, FrameCommands, FrameUniforms, GpuBackend, GpuError, InstanceData, LightData,
    MaterialData,
};
use crate::scene::camera::EyeCamera;
use crate::scene::lights::{Light, Material};
use crate::scene::Scene;
use nalgebra::{Matrix4, Vector3};

pub const CLEAR_COLOR: [f32; 4] = [0.53, 0.71, 0.92, 1.0];

fn light_data(light: &Light) -> LightData {
    let [dr, dg, db] = light.diffuse;
    let [sr, sg, sb] = light.specular;
    LightData {
        position: [light.position.x, light.position.y, light.position.z, 1.0],
        diffuse: [dr, dg, db, 1.0],
        specular: [sr, sg, sb, 1.0],
    }
}

fn material_data(material: &Material) -> MaterialData {
    MaterialData {
        ambient: material.ambient,
        diffuse: material.diffuse,
        specular: material.specular,
        shininess: [material.shininess, 0.0, 0.0, 0.0],
    }
}

/// Model-view, model-view-projection and the inverse transpose of the
/// model-view for normals.
pub fn instance_data(view: &Matrix4<f32>, proj: &Matrix4<f32>, model: &Matrix4<f32>) -> InstanceData {
    let mv = view * model;
    let mvp = proj * mv;
    let normal = mv.try_inverse().unwrap_or_else(Matrix4::identity).transpose();
    InstanceData {
        mv_matrix: mv.into(),
        mvp_matrix: mvp.into(),
        normal_matrix: normal.into(),
    }
}

/// Buffers laid out once from the scene at renderer start, plus the cached
/// light and material tables.
pub struct FramePipeline {
    layout: SceneLayout,
    uniforms: FrameUniforms,
    ignored_objects_reported: bool,
}

impl FramePipeline {
    /// Snapshots the whole scene under its lock and uploads the geometry.
    pub fn build<B: GpuBackend>(backend: &mut B, scene: &Scene) -> Result<Self, GpuError> {
        log::trace!("insance of {}", std::any::type_name::<Self>());
        let (layout, upload) = {
            let mut state = scene.lock();
            let built = SceneLayout::build(&state);
            state.clear_object_dirty(built.0.len());
            state.objects_dirty = false;
            built
        };
        timed("pipeline build", || backend.build_pipeline(&upload))?;
        Ok(FramePipeline {
            layout,
            uniforms: FrameUniforms::default(),
            ignored_objects_reported: false,
        })
    }

    pub fn layout(&self) -> &SceneLayout {
        &self.layout
    }

    /// Reads the scene once under lock and computes everything the GPU needs
    /// for the next frame. Matrices are recomputed for every object each frame.
    pub fn prepare(&mut self, scene: &Scene, extent: Extent) -> FrameCommands {
        let (eye_pos, eye_dir, models): (Vector3<f32>, Vector3<f32>, Vec<Matrix4<f32>>) = {
            let mut state = scene.lock();
            let total = state.objects().len();
            if total > self.layout.len() && !self.ignored_objects_reported {
                log::warn!(
                    "{} objects added after the renderer started are not drawn",
                    total - self.layout.len()
                );
                self.ignored_objects_reported = true;
            }
            if state.materials_dirty {
                self.refresh_tables(state.ambient_light, state.lights(), state.materials());
                state.materials_dirty = false;
            }
            state.view_dirty = false;
            let models = state
                .objects()
                .iter()
                .take(self.layout.len())
                .map(|o| o.model_matrix)
                .collect();
            (state.eye_pos, state.eye_dir, models)
        };

        let camera = EyeCamera::new(&eye_pos, &eye_dir, extent.as_array());
        let view = camera.view_m();
        let proj = camera.proj_m();
        let instances = models
            .iter()
            .map(|model| instance_data(&view, &proj, model))
            .collect();

        let mut uniforms = self.uniforms;
        uniforms.view = view.into();
        FrameCommands {
            extent,
            clear_color: CLEAR_COLOR,
            uniforms,
            instances,
            draws: self.layout.draws(),
        }
    }

    fn refresh_tables(&mut self, ambient: [f32; 3], lights: &[Light], materials: &[Material]) {
        let [r, g, b] = ambient;
        self.uniforms.ambient_light = [r, g, b, 1.0];
        self.uniforms.counts = [lights.len() as u32, materials.len() as u32, 0, 0];
        for (slot, light) in self.uniforms.lights.iter_mut().zip(lights) {
            *slot = light_data(light);
        }
        for (slot, material) in self.uniforms.materials.iter_mut().zip(materials) {
            *slot = material_data(material);
        }
    }

    /// Prepares and submits the frame for `image`.
    pub fn render<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        swapchain: &mut SwapchainManager<B>,
        image: usize,
        scene: &Scene,
        fence: &mut B::Fence,
    ) -> Result<(), GpuError> {
        let frame = self.prepare(scene, swapchain.extent());
        swapchain.submit(backend, image, &frame, fence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{Call, RecordingBackend};
    use crate::model::figure::{cube, tetrahedron};
    use crate::scene::lights::Material;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;
    use std::sync::Arc;

    fn scene() -> Scene {
        let light = Light::point(Vector3::new(0.0, 10.0, 0.0), [1.0; 3], [0.5; 3]);
        let scene = Scene::create(
            [0.1, 0.2, 0.3],
            &[light],
            &[Material::matte([1.0, 0.0, 0.0], 0.5, 16.0)],
        );
        scene.add_object(Arc::new(tetrahedron(0)), Matrix4::identity());
        scene.add_object(
            Arc::new(cube(0)),
            Matrix4::new_translation(&Vector3::new(3.0, 0.0, 5.0)),
        );
        scene.set_eye(Vector3::new(0.0, 2.0, -10.0), Vector3::new(0.0, 0.0, 1.0));
        scene
    }

    #[test]
    fn build_uploads_once_and_clears_object_dirt() {
        let mut backend = RecordingBackend::new();
        let scene = scene();
        let pipeline = FramePipeline::build(&mut backend, &scene).unwrap();
        assert_eq!(pipeline.layout().len(), 2);
        assert_eq!(
            backend.count(|c| matches!(c, Call::BuildPipeline { indices: 0, .. })),
            1
        );
        let state = scene.lock();
        assert!(!state.objects_dirty);
        assert!(state.objects().iter().all(|o| !o.matrix_dirty && !o.mesh_dirty));
    }

    #[test]
    fn prepare_fills_tables_and_clears_flags() {
        let mut backend = RecordingBackend::new();
        let scene = scene();
        let mut pipeline = FramePipeline::build(&mut backend, &scene).unwrap();
        let frame = pipeline.prepare(&scene, Extent::new(640, 480));
        assert_eq!(frame.instances.len(), 2);
        assert_eq!(frame.draws.len(), 2);
        assert_eq!(frame.uniforms.counts[..2], [1, 1]);
        assert_eq!(frame.uniforms.ambient_light, [0.1, 0.2, 0.3, 1.0]);
        assert_relative_eq!(frame.uniforms.materials[0].shininess[0], 16.0);
        let state = scene.lock();
        assert!(!state.view_dirty && !state.materials_dirty);
    }

    #[test]
    fn instance_matrices_follow_the_camera() {
        let mut backend = RecordingBackend::new();
        let scene = scene();
        let mut pipeline = FramePipeline::build(&mut backend, &scene).unwrap();
        let first = pipeline.prepare(&scene, Extent::new(500, 500));
        scene.set_eye(Vector3::new(5.0, 2.0, -10.0), Vector3::new(0.0, 0.0, 1.0));
        let second = pipeline.prepare(&scene, Extent::new(500, 500));
        assert_ne!(first.instances[0].mv_matrix, second.instances[0].mv_matrix);
        assert_ne!(first.uniforms.view, second.uniforms.view);
    }

    #[test]
    fn normal_matrix_is_inverse_transpose() {
        let view = Matrix4::new_translation(&Vector3::new(0.0, -2.0, 10.0));
        let proj = Matrix4::identity();
        let model = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 4.0));
        let data = instance_data(&view, &proj, &model);
        let mv = Matrix4::from(data.mv_matrix);
        let normal = Matrix4::from(data.normal_matrix);
        // A normal stays orthogonal to a transformed tangent.
        let tangent = Vector4::new(1.0, 0.0, -1.0, 0.0);
        let surface_normal = Vector4::new(1.0, 0.0, 1.0, 0.0);
        let dot = (mv * tangent).dot(&(normal * surface_normal));
        assert_relative_eq!(dot, 0.0, epsilon = 1e-5);
        assert_eq!(data.mvp_matrix, data.mv_matrix);
    }

    #[test]
    fn late_objects_are_not_drawn() {
        let mut backend = RecordingBackend::new();
        let scene = scene();
        let mut pipeline = FramePipeline::build(&mut backend, &scene).unwrap();
        scene.add_object(Arc::new(tetrahedron(0)), Matrix4::identity());
        let frame = pipeline.prepare(&scene, Extent::new(500, 500));
        assert_eq!(frame.instances.len(), 2);
        assert_eq!(frame.draws.len(), 2);
    }
}
