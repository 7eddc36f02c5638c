#[cfg(not(feature = "f64"))]
pub mod f32;
#[cfg(not(feature = "f64"))]
pub use f32::*;

#[cfg(feature = "f64")]
pub mod f64;
#[cfg(feature = "f64")]
pub use f64::*;

pub mod vertex;
pub use vertex::{Vertex2d, Vertex3d};

/// Index type used for both vertices and triangles.
///
/// Mesh indices are handed to the renderer as `u32`, which bounds the vertex count anyway.
pub type IndexType = u32;

pub type VertexId = IndexType;
pub type TriangleId = IndexType;

/// Sample points as produced by the sampling stage and stored in the mesh.
pub type Point3D = glam::Vec3;

pub type TriangleVertexIndex = u8;
pub const VERT_1: TriangleVertexIndex = 0;
pub const VERT_2: TriangleVertexIndex = 1;
pub const VERT_3: TriangleVertexIndex = 2;

pub type TriangleEdgeIndex = u8;
pub const EDGE_12: TriangleEdgeIndex = 0;
pub const EDGE_23: TriangleEdgeIndex = 1;
pub const EDGE_31: TriangleEdgeIndex = 2;

pub type QuadVertexIndex = u8;
pub const QUAD_1: QuadVertexIndex = 0;
pub const QUAD_2: QuadVertexIndex = 1;
pub const QUAD_3: QuadVertexIndex = 2;
pub const QUAD_4: QuadVertexIndex = 3;

/// From a TriangleEdgeIndex, gives the corresponding pair of TriangleVertexIndex
pub const EDGE_TO_VERTS: [[TriangleVertexIndex; 2]; 3] =
    [[VERT_1, VERT_2], [VERT_2, VERT_3], [VERT_3, VERT_1]];

/// From a TriangleVertexIndex, gives the next vertex index in the triangle's (clockwise) order
pub const NEXT_CW_VERTEX_INDEX: [TriangleVertexIndex; 3] = [VERT_2, VERT_3, VERT_1];

/// A reference to an adjacent triangle. [`Neighbor::NONE`] when there is no triangle across the edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Neighbor {
    pub id: TriangleId,
}
impl Neighbor {
    pub const NONE: Neighbor = Neighbor {
        id: TriangleId::MAX,
    };

    #[inline]
    pub fn new(id: TriangleId) -> Self {
        Self { id }
    }

    #[inline]
    pub fn exists(&self) -> bool {
        self.id != TriangleId::MAX
    }
}
impl From<TriangleId> for Neighbor {
    #[inline]
    fn from(id: TriangleId) -> Self {
        Neighbor::new(id)
    }
}

#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct Edge {
    pub from: VertexId,
    pub to: VertexId,
}
impl Edge {
    #[inline]
    pub fn new(from: VertexId, to: VertexId) -> Self {
        Self { from, to }
    }

    /// Same edge with its vertices ordered by id. Two triangles sharing an edge yield the same key.
    #[inline]
    pub fn undirected_key(&self) -> Edge {
        if self.from <= self.to {
            *self
        } else {
            Edge::new(self.to, self.from)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangleData {
    /// Triangle vertices indexes, in a clockwise order
    pub verts: [VertexId; 3],
    /// Adjacent neighbors on each edge.
    ///
    /// Can be [`Neighbor::NONE`] for the container triangle added by the triangulation process which has no neighbors,
    /// and contains all the points to triangulate
    pub neighbors: [Neighbor; 3],
}

impl TriangleData {
    pub(crate) fn new_container_triangle(first_index: VertexId) -> Self {
        TriangleData {
            verts: [first_index, first_index + 1, first_index + 2],
            neighbors: [Neighbor::NONE, Neighbor::NONE, Neighbor::NONE],
        }
    }

    #[inline]
    pub fn v(&self, vertex_index: TriangleVertexIndex) -> VertexId {
        self.verts[vertex_index as usize]
    }
    #[inline]
    pub fn v1(&self) -> VertexId {
        self.verts[VERT_1 as usize]
    }
    #[inline]
    pub fn v2(&self) -> VertexId {
        self.verts[VERT_2 as usize]
    }
    #[inline]
    pub fn v3(&self) -> VertexId {
        self.verts[VERT_3 as usize]
    }

    #[inline]
    pub fn neighbor(&self, edge_index: TriangleEdgeIndex) -> Neighbor {
        self.neighbors[edge_index as usize]
    }
    #[inline]
    pub fn neighbor12(&self) -> Neighbor {
        self.neighbors[EDGE_12 as usize]
    }
    #[inline]
    pub fn neighbor23(&self) -> Neighbor {
        self.neighbors[EDGE_23 as usize]
    }
    #[inline]
    pub fn neighbor31(&self) -> Neighbor {
        self.neighbors[EDGE_31 as usize]
    }

    #[inline]
    pub fn neighbor23_mut(&mut self) -> &mut Neighbor {
        &mut self.neighbors[EDGE_23 as usize]
    }
    #[inline]
    pub fn neighbor31_mut(&mut self) -> &mut Neighbor {
        &mut self.neighbors[EDGE_31 as usize]
    }

    #[inline]
    pub fn to_vertices(&self, vertices: &[Vertex]) -> TriangleVertices {
        (
            vertices[self.v1() as usize],
            vertices[self.v2() as usize],
            vertices[self.v3() as usize],
        )
    }

    #[inline]
    pub fn to_vertices_array(&self, vertices: &[Vertex]) -> [Vertex; 3] {
        [
            vertices[self.v1() as usize],
            vertices[self.v2() as usize],
            vertices[self.v3() as usize],
        ]
    }

    /// Returns `true` if any of the triangle vertices has an id `>= min_vertex_id`
    #[inline]
    pub fn has_vertex_from(&self, min_vertex_id: VertexId) -> bool {
        self.verts.iter().any(|&v| v >= min_vertex_id)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Triangles {
    pub buffer: Vec<TriangleData>,
}
impl Triangles {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn get(&self, id: TriangleId) -> &TriangleData {
        &self.buffer[id as usize]
    }
    #[inline]
    pub fn get_mut(&mut self, id: TriangleId) -> &mut TriangleData {
        &mut self.buffer[id as usize]
    }

    #[inline]
    pub fn buffer(&self) -> &Vec<TriangleData> {
        &self.buffer
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.buffer.len()
    }
    #[inline]
    pub fn next_id(&self) -> TriangleId {
        self.buffer.len() as TriangleId
    }
    /// MUST only be called on a non-empty buffer
    #[inline]
    pub fn last_id(&self) -> TriangleId {
        (self.buffer.len() - 1) as TriangleId
    }

    #[inline]
    pub fn create(&mut self, verts: [VertexId; 3], neighbors: [Neighbor; 3]) {
        self.buffer.push(TriangleData { verts, neighbors })
    }
    #[inline]
    pub fn push(&mut self, triangle: TriangleData) {
        self.buffer.push(triangle)
    }
}

/// Quad made of two adjacent triangles.
///
/// `q1-q2` is the shared edge, `q1 q2 q3` is in counter-clockwise order and `q4` is the vertex opposite to `q3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quad {
    pub verts: [VertexId; 4],
}
impl Quad {
    #[inline]
    pub fn new(verts: [VertexId; 4]) -> Self {
        Self { verts }
    }

    #[inline]
    pub fn v1(&self) -> VertexId {
        self.verts[QUAD_1 as usize]
    }
    #[inline]
    pub fn v2(&self) -> VertexId {
        self.verts[QUAD_2 as usize]
    }
    #[inline]
    pub fn v3(&self) -> VertexId {
        self.verts[QUAD_3 as usize]
    }
    #[inline]
    pub fn v4(&self) -> VertexId {
        self.verts[QUAD_4 as usize]
    }

    #[inline]
    pub fn to_vertices(&self, vertices: &[Vertex]) -> QuadVertices {
        QuadVertices([
            vertices[self.v1() as usize],
            vertices[self.v2() as usize],
            vertices[self.v3() as usize],
            vertices[self.v4() as usize],
        ])
    }
}

pub type EdgeVertices = (Vertex, Vertex);
pub type TriangleVertices = (Vertex, Vertex, Vertex);

#[derive(Debug)]
pub struct QuadVertices(pub [Vertex; 4]);
impl QuadVertices {
    #[inline]
    pub fn q1(&self) -> Vertex {
        self.0[QUAD_1 as usize]
    }
    #[inline]
    pub fn q2(&self) -> Vertex {
        self.0[QUAD_2 as usize]
    }
    #[inline]
    pub fn q3(&self) -> Vertex {
        self.0[QUAD_3 as usize]
    }
    #[inline]
    pub fn q4(&self) -> Vertex {
        self.0[QUAD_4 as usize]
    }
}
