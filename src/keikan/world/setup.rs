use crate::model::figure::{cube, plane, tetrahedron};
use crate::model::sphere::sphere;
use crate::model::terrain::{HeightSampler, Terrain, TerrainMaterials};
use crate::scene::lights::{Light, Material};
use crate::scene::Scene;
use nalgebra::{Matrix4, Vector3};
use std::sync::Arc;

pub const MATERIAL_SAND: u32 = 0;
pub const MATERIAL_GRASS: u32 = 1;
pub const MATERIAL_ROCK: u32 = 2;
pub const MATERIAL_SNOW: u32 = 3;
pub const MATERIAL_RED_PLASTIC: u32 = 4;
pub const MATERIAL_GOLD: u32 = 5;
pub const MATERIAL_STONE: u32 = 6;

fn materials() -> Vec<Material> {
    vec![
        Material::matte([0.76, 0.70, 0.50], 0.1, 4.0),
        Material::matte([0.25, 0.55, 0.20], 0.05, 2.0),
        Material::matte([0.45, 0.42, 0.40], 0.2, 8.0),
        Material::matte([0.95, 0.95, 0.97], 0.6, 32.0),
        Material::matte([0.80, 0.10, 0.10], 0.8, 64.0),
        Material {
            ambient: [0.25, 0.20, 0.07, 1.0],
            diffuse: [0.75, 0.61, 0.23, 1.0],
            specular: [0.63, 0.56, 0.37, 1.0],
            shininess: 51.2,
        },
        Material::matte([0.35, 0.35, 0.38], 0.1, 4.0),
    ]
}

fn lights() -> Vec<Light> {
    vec![
        Light::point(
            Vector3::new(-60.0, 80.0, -40.0),
            [0.85, 0.80, 0.70],
            [0.6, 0.6, 0.6],
        ),
        Light::point(
            Vector3::new(40.0, 30.0, 60.0),
            [0.25, 0.30, 0.45],
            [0.2, 0.2, 0.3],
        ),
    ]
}

fn placed_on(terrain: &Terrain, x: f32, z: f32, lift: f32, scale: f32) -> Matrix4<f32> {
    let y = terrain.sample_height(x, z) + lift;
    Matrix4::new_translation(&Vector3::new(x, y, z)) * Matrix4::new_scaling(scale)
}

/// Lights, materials, the terrain and a few props standing on it.
pub fn default_scene(terrain: &Terrain) -> Scene {
    let scene = Scene::create([0.2, 0.2, 0.22], &lights(), &materials());

    let terrain_model = terrain.to_model(TerrainMaterials {
        sand: MATERIAL_SAND,
        grass: MATERIAL_GRASS,
        rock: MATERIAL_ROCK,
        snow: MATERIAL_SNOW,
    });
    scene.add_object(Arc::new(terrain_model), Matrix4::identity());

    scene.add_object(
        Arc::new(tetrahedron(MATERIAL_RED_PLASTIC)),
        placed_on(terrain, 0.0, 0.0, 2.0, 1.5),
    );
    scene.add_object(
        Arc::new(sphere(MATERIAL_GOLD, 24, 16)),
        placed_on(terrain, 8.0, 6.0, 2.0, 2.0),
    );
    scene.add_object(
        Arc::new(cube(MATERIAL_STONE)),
        placed_on(terrain, -8.0, 4.0, 1.0, 1.0),
    );
    // slab under the starting point
    scene.add_object(
        Arc::new(plane(MATERIAL_STONE)),
        placed_on(terrain, 0.0, -10.0, 0.05, 2.0),
    );

    scene
}
