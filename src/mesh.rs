use hashbrown::HashSet;

use crate::types::{Edge, Point3D, VertexId};

/// Color given to the vertices of generated meshes
pub const DEFAULT_VERTEX_COLOR: [f32; 3] = [0., 0., 0.];

/// A mesh vertex, laid out as it is uploaded to the GPU: position then color.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SMVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
}
impl SMVertex {
    #[inline]
    pub fn new(position: Point3D, color: [f32; 3]) -> Self {
        Self {
            x: position.x,
            y: position.y,
            z: position.z,
            r: color[0],
            g: color[1],
            b: color[2],
        }
    }

    #[inline]
    pub fn position(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn color(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Indexed triangle mesh. Every 3 consecutive indices form a triangle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SurfaceMeshData {
    vertices: Vec<SMVertex>,
    indices: Vec<u32>,
}

impl SurfaceMeshData {
    pub fn new(vertices: Vec<SMVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Builds a mesh from triangulated `points`. `triangles` index into `points`.
    pub fn from_triangulation(
        points: &[Point3D],
        triangles: &[[VertexId; 3]],
        color: [f32; 3],
    ) -> Self {
        let vertices = points.iter().map(|p| SMVertex::new(*p, color)).collect();
        let indices = triangles.iter().flatten().copied().collect();
        Self { vertices, indices }
    }

    pub fn vertices(&self) -> &Vec<SMVertex> {
        &self.vertices
    }

    pub fn indices(&self) -> &Vec<u32> {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
    }

    /// Every edge of the mesh, once, whatever the number of triangles sharing it.
    ///
    /// Edges are returned in the order they are first met while iterating the triangles.
    pub fn unique_edges(&self) -> Vec<Edge> {
        let mut seen = HashSet::with_capacity(self.indices.len());
        let mut edges = Vec::with_capacity(self.indices.len() / 2);
        for [v1, v2, v3] in self.triangles() {
            for edge in [Edge::new(v1, v2), Edge::new(v2, v3), Edge::new(v3, v1)] {
                if seen.insert(edge.undirected_key()) {
                    edges.push(edge);
                }
            }
        }
        edges
    }
}

/// Number of grid nodes along x in [generate_sample_mesh]
pub const SAMPLE_MESH_X_SIZE: usize = 11;
/// Number of grid nodes along y in [generate_sample_mesh]
pub const SAMPLE_MESH_Y_SIZE: usize = 6;

/// Regular grid mesh, centered on the origin, used to check the rendering path without running a triangulation.
///
/// ```text
/// tl ---- tr
/// |  \     |
/// |    \   |
/// |      \ |
/// bl ---- br
/// ```
///
/// Each grid cell is split along its `tl-br` diagonal.
pub fn generate_sample_mesh() -> SurfaceMeshData {
    let (xsize, ysize) = (SAMPLE_MESH_X_SIZE, SAMPLE_MESH_Y_SIZE);

    let scale = 1.0 / (xsize - 1) as f32;
    let xoffset = -0.5;
    let yoffset = scale * (ysize - 1) as f32 / 2.0;

    let mut vertices = Vec::with_capacity(xsize * ysize);
    let mut indices = Vec::with_capacity(6 * (xsize - 1) * (ysize - 1));

    for j in 0..ysize {
        for i in 0..xsize {
            let x = i as f32 * scale + xoffset;
            let y = -(j as f32) * scale + yoffset;
            vertices.push(SMVertex::new(
                Point3D::new(x, y, 0.),
                DEFAULT_VERTEX_COLOR,
            ));
        }
    }

    for j in 0..ysize - 1 {
        for i in 0..xsize - 1 {
            let top_left = (i + xsize * j) as u32;
            let top_right = top_left + 1;
            let bottom_right = top_left + 1 + xsize as u32;
            let bottom_left = top_left + xsize as u32;

            indices.extend([top_left, top_right, bottom_right]);
            indices.extend([top_left, bottom_right, bottom_left]);
        }
    }

    SurfaceMeshData::new(vertices, indices)
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
