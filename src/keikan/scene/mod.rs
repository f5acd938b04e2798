pub mod camera;
pub mod lights;

use crate::model::Model;
use crate::scene::lights::{Light, Material, LIGHTS_MAX, MATERIALS_MAX};
use nalgebra::Matrix4;
use nalgebra::Vector3;
use std::sync::Arc;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const INITIAL_OBJECT_CAPACITY: usize = 10;

/// One placed instance of a model.
///
/// Only the writer side lives here: the renderer keeps the GPU layout of each
/// object in its own array indexed the same way, so the two never share a field.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub model: Arc<Model>,
    pub model_matrix: Matrix4<f32>,
    pub matrix_dirty: bool,
    pub mesh_dirty: bool,
}

/// Everything guarded by the scene mutex.
#[derive(Debug)]
pub struct SceneState {
    pub eye_pos: Vector3<f32>,
    pub eye_dir: Vector3<f32>,
    pub ambient_light: [f32; 3],
    lights: Vec<Light>,
    materials: Vec<Material>,
    objects: Vec<SceneObject>,
    pub view_dirty: bool,
    pub objects_dirty: bool,
    pub materials_dirty: bool,
}

impl SceneState {
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object_capacity(&self) -> usize {
        self.objects.capacity()
    }

    /// Clears the per-object dirty bits of the first `count` objects once the
    /// renderer has uploaded them.
    pub fn clear_object_dirty(&mut self, count: usize) {
        for object in self.objects.iter_mut().take(count) {
            object.matrix_dirty = false;
            object.mesh_dirty = false;
        }
    }
}

/// Thread-safe scene shared by the world simulation (writer) and the renderer
/// (reader).
#[derive(Debug)]
pub struct Scene {
    state: Mutex<SceneState>,
}

impl Scene {
    /// Tables longer than the fixed maximum are truncated.
    pub fn create(ambient_light: [f32; 3], lights: &[Light], materials: &[Material]) -> Self {
        log::trace!("insance of {}", std::any::type_name::<Self>());
        if lights.len() > LIGHTS_MAX {
            log::warn!("scene supports {} lights, {} given", LIGHTS_MAX, lights.len());
        }
        if materials.len() > MATERIALS_MAX {
            log::warn!(
                "scene supports {} materials, {} given",
                MATERIALS_MAX,
                materials.len()
            );
        }
        let state = SceneState {
            eye_pos: Vector3::zeros(),
            eye_dir: Vector3::new(0.0, 0.0, 1.0),
            ambient_light,
            lights: lights.iter().take(LIGHTS_MAX).cloned().collect(),
            materials: materials.iter().take(MATERIALS_MAX).cloned().collect(),
            objects: Vec::with_capacity(INITIAL_OBJECT_CAPACITY),
            view_dirty: true,
            objects_dirty: true,
            materials_dirty: true,
        };
        Scene {
            state: Mutex::new(state),
        }
    }

    /// Appends an object and returns its index.
    pub fn add_object(&self, model: Arc<Model>, model_matrix: Matrix4<f32>) -> usize {
        let mut state = self.lock();
        let capacity = state.objects.capacity();
        if state.objects.len() == capacity {
            let grow_by = std::cmp::max(capacity / 2, 1);
            state.objects.reserve_exact(grow_by);
            log::debug!(
                "scene object array grown from {} to {}",
                capacity,
                state.objects.capacity()
            );
        }
        state.objects.push(SceneObject {
            model,
            model_matrix,
            matrix_dirty: true,
            mesh_dirty: true,
        });
        state.objects_dirty = true;
        state.objects.len() - 1
    }

    /// Replaces eye position and direction together.
    pub fn set_eye(&self, position: Vector3<f32>, direction: Vector3<f32>) {
        let mut state = self.lock();
        state.eye_pos = position;
        state.eye_dir = direction;
        state.view_dirty = true;
    }

    /// Locks the scene for a consistent multi-field read or write. Dropping the
    /// guard unlocks.
    pub fn lock(&self) -> MutexGuard<'_, SceneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        log::trace!("destroying scene with {} objects", state.objects.len());
        state.objects.clear();
    }
}
