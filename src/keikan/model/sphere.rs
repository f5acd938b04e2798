use crate::model::{Model, Vertex};
use std::f32::consts::PI;

/// Indexed UV sphere of radius 1 with smooth normals.
pub fn sphere(material: u32, slices: u32, stacks: u32) -> Model {
    let slices = slices.max(3);
    let stacks = stacks.max(2);

    let mut vertices = Vec::with_capacity(((slices + 1) * (stacks + 1)) as usize);
    for stack in 0..=stacks {
        let phi = PI * stack as f32 / stacks as f32;
        for slice in 0..=slices {
            let theta = 2.0 * PI * slice as f32 / slices as f32;
            let p = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];
            vertices.push(Vertex::new(p, p, material));
        }
    }

    let row = slices + 1;
    let mut indices = Vec::with_capacity((slices * stacks * 6) as usize);
    for stack in 0..stacks {
        for slice in 0..slices {
            let a = stack * row + slice;
            let b = a + row;
            // degenerate triangles at the poles are skipped
            if stack != 0 {
                indices.extend_from_slice(&[a, b, a + 1]);
            }
            if stack != stacks - 1 {
                indices.extend_from_slice(&[a + 1, b, b + 1]);
            }
        }
    }

    Model::new(vertices, Some(indices))
}
