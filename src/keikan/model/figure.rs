use crate::model::{Model, Vertex};
use nalgebra::Point3;
use nalgebra::Vector3;

#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Point3<f32>; 3],
    pub normal: Vector3<f32>,
}

impl Triangle {
    /// Flat triangle whose normal points away from the figure's origin.
    pub fn outward(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        let mut normal = (b - a).cross(&(c - a)).normalize();
        let centroid = (a.coords + b.coords + c.coords) / 3.0;
        if normal.dot(&centroid) < 0.0 {
            normal = -normal;
        }
        Triangle {
            vertices: [a, b, c],
            normal,
        }
    }

    fn to_vertexes(&self, material: u32) -> [Vertex; 3] {
        let n = [self.normal.x, self.normal.y, self.normal.z];
        let v = |p: &Point3<f32>| Vertex::new([p.x, p.y, p.z], n, material);
        [
            v(&self.vertices[0]),
            v(&self.vertices[1]),
            v(&self.vertices[2]),
        ]
    }
}

/// Collects flat-shaded triangles of a convex figure centered on the origin.
pub struct FigureBuilder {
    triangles: Vec<Triangle>,
    material: u32,
}

impl FigureBuilder {
    pub fn new(material: u32) -> Self {
        FigureBuilder {
            triangles: Vec::new(),
            material,
        }
    }

    pub fn t(mut self, a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> FigureBuilder {
        self.triangles.push(Triangle::outward(a, b, c));
        self
    }

    pub fn build(self) -> Model {
        let material = self.material;
        let vertices = self
            .triangles
            .iter()
            .flat_map(|t| t.to_vertexes(material).to_vec())
            .collect();
        Model::new(vertices, None)
    }
}

pub fn tetrahedron(material: u32) -> Model {
    let unit = 1.0;

    let a = Point3::new(-unit, unit, unit);
    let b = Point3::new(unit, -unit, unit);
    let c = Point3::new(unit, unit, -unit);
    let d = Point3::new(-unit, -unit, -unit);

    FigureBuilder::new(material)
        .t(a, b, c)
        .t(a, b, d)
        .t(a, c, d)
        .t(b, c, d)
        .build()
}

pub fn cube(material: u32) -> Model {
    let unit = 1.0;

    //front face dots. ccw from top left
    let a = Point3::new(unit, unit, -unit);
    let b = Point3::new(unit, unit, unit);
    let c = Point3::new(unit, -unit, unit);
    let d = Point3::new(unit, -unit, -unit);

    //rear face dots. ccw from top left
    let e = Point3::new(-unit, unit, -unit);
    let f = Point3::new(-unit, unit, unit);
    let j = Point3::new(-unit, -unit, unit);
    let h = Point3::new(-unit, -unit, -unit);

    FigureBuilder::new(material)
        .t(a, b, c)
        .t(a, d, c)
        .t(e, f, j)
        .t(e, h, j)
        .t(b, c, f)
        .t(f, j, c)
        .t(a, d, e)
        .t(e, h, d)
        .t(a, b, e)
        .t(e, f, b)
        .t(h, j, c)
        .t(c, d, h)
        .build()
}

/// Unit square in the xz plane, facing +y.
pub fn plane(material: u32) -> Model {
    let unit = 1.0;

    let a = Point3::new(-unit, 0.0, -unit);
    let b = Point3::new(-unit, 0.0, unit);
    let c = Point3::new(unit, 0.0, unit);
    let d = Point3::new(unit, 0.0, -unit);

    FigureBuilder::new(material).t(a, b, c).t(a, c, d).build()
}
