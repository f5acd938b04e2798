pub mod figure;
pub mod sphere;
pub mod terrain;

/// Per-vertex attributes as laid out in the shared vertex buffer.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 4],
    pub normal: [f32; 4],
    pub material: u32,
}
vulkano::impl_vertex!(Vertex, position, normal, material);

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], material: u32) -> Self {
        Vertex {
            position: [position[0], position[1], position[2], 1.0],
            normal: [normal[0], normal[1], normal[2], 0.0],
            material,
        }
    }
}

/// Geometry produced by a mesh provider. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    vertices: Vec<Vertex>,
    indices: Option<Vec<u32>>,
    triangle_count: usize,
}

impl Model {
    pub fn new(vertices: Vec<Vertex>, indices: Option<Vec<u32>>) -> Self {
        let triangle_count = match &indices {
            Some(indices) => indices.len() / 3,
            None => vertices.len() / 3,
        };
        Model {
            vertices,
            indices,
            triangle_count,
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }
}
