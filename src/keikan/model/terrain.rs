use crate::model::{Model, Vertex};
use nalgebra::Vector3;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const X_STEP: f32 = 2.0;
const Y_STEP: f32 = 1.0;
const Z_STEP: f32 = 2.0;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("failed to read heightmap {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("heightmap {path} holds {found} samples, {expected} expected")]
    Truncated {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("heightmap must be at least 2x2, got {0}x{1}")]
    TooSmall(u32, u32),
    #[error("heightmap of {width}x{depth} samples is too large")]
    TooLarge { width: u32, depth: u32 },
}

/// Grid offsets are computed in `u32`, so the whole field must be addressable by one.
fn sample_count(width: u32, depth: u32) -> Result<usize, TerrainError> {
    width
        .checked_mul(depth)
        .map(|count| count as usize)
        .ok_or(TerrainError::TooLarge { width, depth })
}

/// Ground height query used by the world simulation.
pub trait HeightSampler {
    fn sample_height(&self, x: f32, z: f32) -> f32;
}

/// Material indices the terrain mesh assigns by elevation.
#[derive(Debug, Clone, Copy)]
pub struct TerrainMaterials {
    pub sand: u32,
    pub grass: u32,
    pub rock: u32,
    pub snow: u32,
}

impl TerrainMaterials {
    const GRASS_THRESHOLD: f32 = 1.0;
    const ROCK_THRESHOLD: f32 = 10.0;
    const SNOW_THRESHOLD: f32 = 18.0;

    fn for_height(&self, height: f32) -> u32 {
        if height < Self::GRASS_THRESHOLD {
            self.sand
        } else if height < Self::ROCK_THRESHOLD {
            self.grass
        } else if height < Self::SNOW_THRESHOLD {
            self.rock
        } else {
            self.snow
        }
    }
}

/// Height field centered on the world origin. Rows run along z, columns along x.
#[derive(Debug, Clone)]
pub struct Terrain {
    width: u32,
    depth: u32,
    heightmap: Vec<f32>,
}

impl Terrain {
    pub fn from_heights(width: u32, depth: u32, heightmap: Vec<f32>) -> Result<Self, TerrainError> {
        if width < 2 || depth < 2 {
            return Err(TerrainError::TooSmall(width, depth));
        }
        let expected = sample_count(width, depth)?;
        if heightmap.len() < expected {
            return Err(TerrainError::Truncated {
                path: PathBuf::new(),
                expected,
                found: heightmap.len(),
            });
        }
        let mut heightmap = heightmap;
        heightmap.truncate(expected);
        Ok(Terrain {
            width,
            depth,
            heightmap,
        })
    }

    /// Reads `width * depth` unsigned bytes; `sea_level` is subtracted from each.
    pub fn from_heightmap(
        path: &Path,
        width: u32,
        depth: u32,
        sea_level: f32,
    ) -> Result<Self, TerrainError> {
        let expected = sample_count(width, depth)?;
        let bytes = fs::read(path).map_err(|source| TerrainError::Io {
            path: path.to_owned(),
            source,
        })?;
        if bytes.len() < expected {
            return Err(TerrainError::Truncated {
                path: path.to_owned(),
                expected,
                found: bytes.len(),
            });
        }
        log::info!("loaded {}x{} heightmap from {}", width, depth, path.display());
        let heights = bytes[..expected]
            .iter()
            .map(|&b| f32::from(b) - sea_level)
            .collect();
        Self::from_heights(width, depth, heights)
    }

    /// Deterministic rolling hills, used when no heightmap file is given.
    pub fn generated(width: u32, depth: u32) -> Result<Self, TerrainError> {
        let mut heights = Vec::with_capacity(sample_count(width, depth)?);
        for row in 0..depth {
            for col in 0..width {
                let (r, c) = (row as f32, col as f32);
                let h = 9.0 * (0.07 * r).sin() * (0.05 * c).cos()
                    + 4.0 * (0.19 * r + 0.7).sin() * (0.13 * c).sin()
                    + 2.0 * (0.31 * c + 1.3).cos()
                    + 3.0;
                heights.push(h);
            }
        }
        Self::from_heights(width, depth, heights)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    fn height_at(&self, row: u32, col: u32) -> f32 {
        self.heightmap[((self.depth - row - 1) * self.width + col) as usize] * Y_STEP
    }

    fn grid_point(&self, row: u32, col: u32) -> Vector3<f32> {
        Vector3::new(
            -X_STEP * self.width as f32 / 2.0 + col as f32 * X_STEP,
            self.height_at(row, col),
            -Z_STEP * self.depth as f32 / 2.0 + row as f32 * Z_STEP,
        )
    }

    /// Flat-shaded mesh, two triangles per grid cell.
    pub fn to_model(&self, materials: TerrainMaterials) -> Model {
        let cells = (self.width as usize - 1) * (self.depth as usize - 1);
        let mut vertices = Vec::with_capacity(cells * 6);
        for row in 0..self.depth - 1 {
            for col in 0..self.width - 1 {
                let p00 = self.grid_point(row, col);
                let p01 = self.grid_point(row, col + 1);
                let p10 = self.grid_point(row + 1, col);
                let p11 = self.grid_point(row + 1, col + 1);
                for tri in &[[p00, p10, p11], [p00, p11, p01]] {
                    let mut normal = (tri[1] - tri[0]).cross(&(tri[2] - tri[0])).normalize();
                    if normal.y < 0.0 {
                        normal = -normal;
                    }
                    let height = (tri[0].y + tri[1].y + tri[2].y) / (3.0 * Y_STEP);
                    let material = materials.for_height(height);
                    for p in tri {
                        vertices.push(Vertex::new(
                            [p.x, p.y, p.z],
                            [normal.x, normal.y, normal.z],
                            material,
                        ));
                    }
                }
            }
        }
        Model::new(vertices, None)
    }
}

impl HeightSampler for Terrain {
    /// Nearest grid sample; positions outside the field use the border.
    fn sample_height(&self, x: f32, z: f32) -> f32 {
        let sx = (x / X_STEP + self.width as f32 / 2.0 + 0.5).floor();
        let sz = (z / Z_STEP + self.depth as f32 / 2.0 + 0.5).floor();
        let col = sx.max(0.0).min((self.width - 1) as f32) as u32;
        let row = sz.max(0.0).min((self.depth - 1) as f32) as u32;
        self.height_at(row, col)
    }
}
