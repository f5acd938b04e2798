use crate::gpu::{DrawCall, SceneUpload};
use crate::scene::SceneState;

/// Renderer-owned placement of one scene object inside the shared buffers.
/// Indexed like the scene's object list; the scene side never writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLayout {
    pub vertex_index: usize,
    pub vertex_count: usize,
    pub index_index: usize,
    pub index_count: usize,
    pub instance_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SceneLayout {
    objects: Vec<ObjectLayout>,
}

impl SceneLayout {
    /// Walks the object list once, packing every model's vertices (and
    /// indices, if any) back to back.
    pub fn build(state: &SceneState) -> (SceneLayout, SceneUpload) {
        let mut upload = SceneUpload::default();
        let mut objects = Vec::with_capacity(state.objects().len());
        for (instance_index, object) in state.objects().iter().enumerate() {
            let model = &object.model;
            let vertex_index = upload.vertices.len();
            upload.vertices.extend_from_slice(model.vertices());
            let index_index = upload.indices.len();
            let index_count = match model.indices() {
                Some(indices) => {
                    upload.indices.extend_from_slice(indices);
                    indices.len()
                }
                None => 0,
            };
            objects.push(ObjectLayout {
                vertex_index,
                vertex_count: model.vertices().len(),
                index_index,
                index_count,
                instance_index,
            });
        }
        log::debug!(
            "scene layout: {} objects, {} vertices, {} indices",
            objects.len(),
            upload.vertices.len(),
            upload.indices.len()
        );
        (SceneLayout { objects }, upload)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[ObjectLayout] {
        &self.objects
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.objects
            .iter()
            .map(|o| DrawCall {
                vertex_offset: o.vertex_index,
                vertex_count: o.vertex_count,
                index_offset: o.index_index,
                index_count: o.index_count,
                instance: o.instance_index,
            })
            .collect()
    }
}
