use arrayvec::ArrayVec;
use thiserror::Error;
use tracing::{debug, error, trace};

use crate::mesh::{SurfaceMeshData, DEFAULT_VERTEX_COLOR};
use crate::types::{
    Float, Neighbor, Point3D, Quad, QuadVertices, TriangleData, TriangleEdgeIndex, TriangleId,
    Triangles, Vertex, Vertex2d, Vertex3d, VertexId, EDGE_12, EDGE_23, EDGE_31, EDGE_TO_VERTS,
    NEXT_CW_VERTEX_INDEX, VERT_1, VERT_2, VERT_3,
};
use crate::utils::{
    is_point_on_right_side_of_edge, is_vertex_in_triangle_circumcircle, triplet_orientation,
    Orientation,
};

#[cfg(feature = "progress_log")]
use tracing::info;

#[cfg(feature = "profile_traces")]
use tracing::{span, Level};

/// Binsort will cover the region to be triangulated by a rectangular grid so that each bin contains roughly N^(density_power) points.
pub const DEFAULT_BIN_VERTEX_DENSITY_POWER: f64 = 0.5;

pub const DEFAULT_FILTER_PARALLEL_TRI_COUNT_THRESHOLD: usize = 100_000;
pub const DEFAULT_FILTER_PARALLEL_MIN_BATCH_LEN: usize = 1000;

#[derive(Clone, Debug)]
pub struct TriangulationConfiguration {
    /// Binsort will cover the region to be triangulated by a rectangular grid so that each bin contains roughly N^(density_power) points.
    pub bin_vertex_density_power: f64,
    /// Triangle count above which the final filtering is done in parallel (with the `parallel_filtering` feature)
    pub filter_parallel_tri_count_threshold: usize,
    pub filter_parallel_min_batch_len: usize,
}
impl Default for TriangulationConfiguration {
    fn default() -> Self {
        Self {
            bin_vertex_density_power: DEFAULT_BIN_VERTEX_DENSITY_POWER,
            filter_parallel_tri_count_threshold: DEFAULT_FILTER_PARALLEL_TRI_COUNT_THRESHOLD,
            filter_parallel_min_batch_len: DEFAULT_FILTER_PARALLEL_MIN_BATCH_LEN,
        }
    }
}

/// Distance from the center of the input vertices to the container triangle vertices (on each axis),
/// relative to the largest extent of the input vertices.
///
/// Hull triangles with a circumcircle reaching that far are missing from the output.
pub const CONTAINER_TRIANGLE_SCALE: Float = 16_777_216.;

/// Container triangle vertices, in a clockwise order
pub fn container_triangle_vertices(center: Vertex, extent: Float) -> [Vertex; 3] {
    let distance = CONTAINER_TRIANGLE_SCALE * extent;
    [
        center + Vertex::new(-distance, -distance),
        center + Vertex::new(0., distance),
        center + Vertex::new(distance, -distance),
    ]
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriangulationError {
    #[error("found no triangle enclosing vertex {vertex}")]
    EnclosingTriangleNotFound { vertex: VertexId },
    #[error("vertex {vertex} has a non-finite coordinate")]
    NonFiniteVertex { vertex: VertexId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Triangulation {
    /// Indices of the original vertices by groups of 3 to form triangles, in a clockwise order.
    pub triangles: Vec<[VertexId; 3]>,
    /// Input vertices too close to an already inserted vertex, as `(merged vertex, kept vertex)`.
    ///
    /// Merged vertices do not appear in `triangles`.
    pub merged_vertices: Vec<(VertexId, VertexId)>,
}

/// Same as [triangulation_from_2d_vertices] but input vertices are in 3d and will be transformed to 2d before the triangulation.
///
/// - All the vertices are expected to belong to the same 2d plane, with the provided `plane_normal`.
/// - `plane_normal` must be normalized
pub fn triangulation_from_3d_planar_vertices<T: Vertex3d>(
    vertices: &[T],
    plane_normal: T,
    config: TriangulationConfiguration,
) -> Result<Triangulation, TriangulationError> {
    if vertices.len() < 3 {
        return Ok(Triangulation::default());
    }

    let planar_vertices = transform_to_2d_planar_coordinate_system(vertices, plane_normal);
    triangulation_from_2d_vertices(&planar_vertices, config)
}

/// Creates a Delaunay triangulation of the input vertices.
///
/// Vertices that are identical (or extremely close to one another) are merged, see [Triangulation::merged_vertices].
pub fn triangulation_from_2d_vertices<T: Vertex2d>(
    vertices: &[T],
    config: TriangulationConfiguration,
) -> Result<Triangulation, TriangulationError> {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "triangulation_from_2d_vertices").entered();

    DelaunayGenerator::from_2d_vertices(vertices, config).triangulate()
}

/// Transforms 3d coordinates of all vertices into 2d coordinates on a plane defined by the given normal and vertices.
/// - Input vertices need to all belong to the same 3d plan
/// - There must be at least one vertex
pub(crate) fn transform_to_2d_planar_coordinate_system<T: Vertex3d>(
    vertices: &[T],
    plane_normal: T,
) -> Vec<Vertex> {
    let origin = vertices[0];
    // Non-finite coordinates count as distinct, so that they reach the triangulation and get reported
    let Some(&other) = vertices.iter().find(|&&v| (v - origin).dot(v - origin) != 0.) else {
        // All identical, any basis of the plane gives the same single 2d point
        return vec![Vertex::ZERO; vertices.len()];
    };

    // Create a base, using the first two distinct vertices as the first base vector and plane_normal as the second
    let basis_1 = (origin - other).normalize();
    // basis_3 is already normalized since basis_1 and plane_normal are normalized and orthogonal
    let basis_3 = basis_1.cross(plane_normal);

    vertices
        .iter()
        .map(|vertex| Vertex::new(vertex.dot(basis_1), vertex.dot(basis_3)))
        .collect()
}

#[derive(PartialEq, Eq, Debug)]
pub enum QuadSwapResult {
    /// Contains the new triangle pairs to check
    Swapped((TriangleId, Neighbor), (TriangleId, Neighbor)),
    NotSwapped,
}

/// Incremental Delaunay triangulation of a set of sample points.
///
/// Points are triangulated using their x-y coordinates. The algorithm follows S. W. Sloan,
/// "A fast algorithm for constructing Delaunay triangulations in the plane" (1987):
/// sort the points into spatially coherent bins (using normalized coordinates), wrap them in a container triangle,
/// then insert them one by one, restoring the Delaunay property with diagonal swaps after each insertion.
///
/// Geometric predicates are exact and evaluated on the input coordinates, so colinear or cocircular
/// inputs are detected as such.
pub struct DelaunayGenerator {
    config: TriangulationConfiguration,
    /// Input points, used to build the output mesh
    points: Vec<Point3D>,
    /// Planar coordinates of the points, followed by the container triangle vertices once the triangulation has started
    vertices: Vec<Vertex>,
    input_vertices_count: usize,
    triangles: Triangles,
    /// Every vertex with an id greater or equal is a container vertex
    min_container_vertex_id: VertexId,
    merged_vertices: Vec<(VertexId, VertexId)>,
    /// Largest extent of the input vertices, scales the distance under which vertices are merged
    scale_factor: Float,
}

impl DelaunayGenerator {
    pub fn new(points: Vec<Point3D>, config: TriangulationConfiguration) -> Self {
        let vertices: Vec<Vertex> = points.iter().map(|p| p.to_vertex()).collect();
        Self::with_vertices(points, vertices, config)
    }

    pub fn from_2d_vertices<T: Vertex2d>(
        vertices: &[T],
        config: TriangulationConfiguration,
    ) -> Self {
        let vertices: Vec<Vertex> = vertices.iter().map(|v| v.to_vertex()).collect();
        let points = vertices
            .iter()
            .map(|v| Point3D::new(v.x as f32, v.y as f32, 0.))
            .collect();
        Self::with_vertices(points, vertices, config)
    }

    /// Builds a generator from an existing (partial) triangulation.
    ///
    /// Mostly useful to exercise the individual steps of the algorithm.
    pub fn from_parts(
        vertices: Vec<Vertex>,
        triangles: Triangles,
        min_container_vertex_id: VertexId,
    ) -> Self {
        let points = vertices
            .iter()
            .map(|v| Point3D::new(v.x as f32, v.y as f32, 0.))
            .collect();
        Self {
            config: TriangulationConfiguration::default(),
            points,
            input_vertices_count: (min_container_vertex_id as usize).min(vertices.len()),
            vertices,
            triangles,
            min_container_vertex_id,
            merged_vertices: Vec::new(),
            scale_factor: 1.,
        }
    }

    fn with_vertices(
        points: Vec<Point3D>,
        vertices: Vec<Vertex>,
        config: TriangulationConfiguration,
    ) -> Self {
        Self {
            config,
            points,
            input_vertices_count: vertices.len(),
            min_container_vertex_id: vertices.len() as VertexId,
            vertices,
            triangles: Triangles::new(),
            merged_vertices: Vec::new(),
            scale_factor: 0.,
        }
    }

    pub fn points(&self) -> &[Point3D] {
        &self.points
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &Triangles {
        &self.triangles
    }

    /// Lower and upper corners of the axis-aligned box enclosing the input vertices
    fn bounds(&self) -> (Vertex, Vertex) {
        let input_vertices = &self.vertices[..self.input_vertices_count];
        let (mut x_min, mut y_min, mut x_max, mut y_max) =
            (Float::MAX, Float::MAX, Float::MIN, Float::MIN);

        for vertex in input_vertices.iter() {
            x_min = x_min.min(vertex.x);
            x_max = x_max.max(vertex.x);
            y_min = y_min.min(vertex.y);
            y_max = y_max.max(vertex.y);
        }
        (Vertex::new(x_min, y_min), Vertex::new(x_max, y_max))
    }

    /// Returns the coordinates of the input points, uniformly scaled so that they all lie between 0 and 1.
    ///
    /// This scaling does not modify the relative positions of the points in the x-y plane.
    /// Normalized coordinates are only used to sort the points, the predicates run on the input coordinates.
    pub fn normalize_points(&self) -> Vec<Vertex> {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "normalize_points").entered();

        let (min, max) = self.bounds();
        let scale_factor = (max.x - min.x).max(max.y - min.y);
        // A single point, or only identical points: only translate them
        let inverse_scale = if scale_factor > 0. {
            1. / scale_factor
        } else {
            1.
        };

        self.vertices[..self.input_vertices_count]
            .iter()
            .map(|vertex| (*vertex - min) * inverse_scale)
            .collect()
    }

    /// Sort points into bins. Returns the ids of the input vertices, in the order they should be inserted.
    pub fn sort_points(&self) -> Vec<VertexId> {
        VertexBinSort::sort(
            &self.normalize_points(),
            self.config.bin_vertex_density_power,
        )
    }

    /// Walks through the triangles, starting from `from`, towards the triangle enclosing `vertex`.
    ///
    /// Returns [None] if the walk leaves the triangulation (`vertex` is not inside the container triangle).
    pub fn find_enclosing_triangle(&self, vertex: Vertex, from: Neighbor) -> Option<TriangleId> {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "find_enclosing_triangle").entered();

        let mut current = from;
        // We use `triangles.count()` as an upper bound on the number of triangles to visit
        for _ in 0..self.triangles.count() {
            if !current.exists() {
                return None;
            }
            let triangle = self.triangles.get(current.id);
            let (v1, v2, v3) = triangle.to_vertices(&self.vertices);

            // Check if the point is inside the triangle, if not check the neighbours
            if !is_point_on_right_side_of_edge((v1, v2), vertex) {
                current = triangle.neighbor12();
            } else if !is_point_on_right_side_of_edge((v2, v3), vertex) {
                current = triangle.neighbor23();
            } else if !is_point_on_right_side_of_edge((v3, v1), vertex) {
                current = triangle.neighbor31();
            } else {
                return Some(current.id);
            }
        }
        None
    }

    /// In `target`, replaces the reference to `old_neighbor` by `new_neighbor`. Does nothing if `target` does not exist.
    pub fn update_adjacent(
        &mut self,
        target: Neighbor,
        old_neighbor: Neighbor,
        new_neighbor: Neighbor,
    ) {
        if target.exists() {
            for neighbor in self.triangles.get_mut(target.id).neighbors.iter_mut() {
                if *neighbor == old_neighbor {
                    *neighbor = new_neighbor;
                    break;
                }
            }
        }
    }

    /// Returns `true` if the diagonal of the quad formed by `from_triangle_id` and `opposite_triangle_id` must be swapped.
    ///
    /// `from_vertex_id` MUST be the first vertex of `from_triangle_id`, and `opposite_triangle_id` MUST be its neighbor across the opposite edge.
    pub fn check_delaunay(
        &self,
        from_triangle_id: TriangleId,
        opposite_triangle_id: TriangleId,
        from_vertex_id: VertexId,
    ) -> bool {
        let (quad, _, _) = self.quad_from(from_triangle_id, opposite_triangle_id, from_vertex_id);
        let quad_vertices = quad.to_vertices(&self.vertices);
        // Test if `from_vertex_id` is inside the circumcircle of `opposite_triangle`
        is_vertex_in_triangle_circumcircle(&quad_vertices.0[0..=2], quad_vertices.q4())
            && is_swap_valid(&quad_vertices)
    }

    /// Swaps the diagonal of the quad formed by two adjacent triangles, and updates the adjacency of the surrounding triangles.
    ///
    /// Same requirements as [DelaunayGenerator::check_delaunay]. Returns the new pairs of triangles facing `from_vertex_id`.
    ///
    /// ```text
    ///                q3
    ///         t3   /    \   t4
    ///            /   To   \
    ///          /            \
    ///         q1 ---------- q2
    ///          \ 2        3 /
    ///            \   Tf   /
    ///              \ 1  /
    ///                q4
    /// ```
    ///
    /// becomes
    ///
    /// ```text
    ///               q3
    ///         t3  / 3|2 \   t4
    ///           /    |    \
    ///         /      |      \
    ///        q1 2  Tf|To   3 q2
    ///         \      |      /
    ///           \    |    /
    ///             \ 1|1 /
    ///               q4
    /// ```
    pub fn swap_triangles(
        &mut self,
        from_triangle_id: TriangleId,
        opposite_triangle_id: TriangleId,
        from_vertex_id: VertexId,
    ) -> (Neighbor, Neighbor) {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "swap_triangles").entered();

        let (quad, triangle_3, triangle_4) =
            self.quad_from(from_triangle_id, opposite_triangle_id, from_vertex_id);

        let opposite_neighbor = Neighbor::new(opposite_triangle_id);
        let from_neighbor = Neighbor::new(from_triangle_id);
        let from_outer_neighbor = self.triangles.get(from_triangle_id).neighbor31();

        self.update_adjacent(triangle_3, opposite_neighbor, from_neighbor);
        self.update_adjacent(from_outer_neighbor, from_neighbor, opposite_neighbor);

        let from_triangle = self.triangles.get_mut(from_triangle_id);
        from_triangle.verts = [quad.v4(), quad.v1(), quad.v3()];
        *from_triangle.neighbor23_mut() = triangle_3;
        *from_triangle.neighbor31_mut() = opposite_neighbor;

        let opposite_triangle = self.triangles.get_mut(opposite_triangle_id);
        opposite_triangle.verts = [quad.v4(), quad.v3(), quad.v2()];
        opposite_triangle.neighbors = [from_neighbor, triangle_4, from_outer_neighbor];

        (triangle_3, triangle_4)
    }

    /// Triangulates the points then builds the resulting mesh, with the original (non-normalized) point coordinates.
    pub fn generate_delaunay_mesh(&mut self) -> Result<SurfaceMeshData, TriangulationError> {
        let triangulation = self.triangulate()?;
        Ok(SurfaceMeshData::from_triangulation(
            &self.points,
            &triangulation.triangles,
            DEFAULT_VERTEX_COLOR,
        ))
    }

    /// Runs the whole triangulation. Can be called multiple times, the internal state is reset on each call.
    pub fn triangulate(&mut self) -> Result<Triangulation, TriangulationError> {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "triangulate").entered();

        self.vertices.truncate(self.input_vertices_count);
        self.triangles = Triangles::new();
        self.merged_vertices.clear();

        if let Some(vertex) = self.vertices.iter().position(|v| !v.is_finite()) {
            return Err(TriangulationError::NonFiniteVertex {
                vertex: vertex as VertexId,
            });
        }
        if self.vertices.len() < 3 {
            return Ok(Triangulation::default());
        }
        let (min, max) = self.bounds();
        self.scale_factor = (max.x - min.x).max(max.y - min.y);
        if self.scale_factor <= 0. {
            debug!("All the vertices are identical, nothing to triangulate");
            return Ok(Triangulation::default());
        }

        // Sort points into bins. Cover the region to be triangulated by a rectangular grid so that each bin contains roughly N^(1/2) points.
        // Label the bins so that consecutive bins are adjacent to one another, and then allocate each point to its appropriate bin.
        // Sort the list of points in ascending sequence of their bin numbers so that consecutive points are grouped together in the x-y plane.
        let sorted_vertices = self.sort_points();

        self.add_container_triangle((min + max) / 2., self.scale_factor);

        // Id of the triangle we start the next search from
        let mut triangle_id = Neighbor::new(0);

        // This buffer is used by all calls to `restore_delaunay_triangulation`.
        // We create if here to share the allocation between all those calls.
        let mut quads_to_check = Vec::new();

        for (_index, &vertex_id) in sorted_vertices.iter().enumerate() {
            let vertex = self.vertices[vertex_id as usize];

            let Some(enclosing_triangle_id) = self.find_enclosing_triangle(vertex, triangle_id)
            else {
                error!(
                    "Found no triangle enclosing vertex {:?}, step {}",
                    vertex_id, _index
                );
                return Err(TriangulationError::EnclosingTriangleNotFound { vertex: vertex_id });
            };

            // Compare to the points in the triangle, if too close to one, skip it
            if let Some(existing_vertex_id) =
                self.find_existing_close_vertex(enclosing_triangle_id, vertex)
            {
                trace!(
                    "Vertex {} merged with existing vertex {}",
                    vertex_id,
                    existing_vertex_id
                );
                self.merged_vertices.push((vertex_id, existing_vertex_id));
                continue;
            }

            let new_triangles: ArrayVec<TriangleId, 4> =
                match self.find_vertex_edge(enclosing_triangle_id, vertex) {
                    // P lies on an edge: split the edge and both triangles sharing it.
                    Some(edge) => self
                        .split_edge_at_vertex(enclosing_triangle_id, edge, vertex_id)
                        .into(),
                    // Form three new triangles by connecting P to each of the enclosing triangle's vertices.
                    None => self
                        .split_triangle_in_three_at_vertex(enclosing_triangle_id, vertex_id)
                        .into_iter()
                        .collect(),
                };

            self.restore_delaunay_triangulation(vertex_id, &new_triangles, &mut quads_to_check);

            // We'll start the search for the next enclosing triangle from the last created triangle.
            // This is a pretty good heuristic since the vertices were spatially partitionned
            triangle_id = Neighbor::new(self.triangles.last_id());

            #[cfg(feature = "progress_log")]
            {
                if _index % ((sorted_vertices.len() / 50) + 1) == 0 {
                    let progress = 100. * _index as f32 / sorted_vertices.len() as f32;
                    info!(
                        "Triangulation progress, {}%: {}/{}",
                        progress,
                        _index,
                        sorted_vertices.len()
                    );
                }
            }
        }

        let triangles = self.remove_wrapping();
        debug!(
            "Triangulated {} vertices into {} triangles, {} merged vertices",
            self.input_vertices_count,
            triangles.len(),
            self.merged_vertices.len()
        );

        Ok(Triangulation {
            triangles,
            merged_vertices: self.merged_vertices.clone(),
        })
    }

    /// Select three dummy points to form a container triangle that completely encompasses all of the points to be triangulated.
    ///  This triangle initially defines a Delaunay triangulation which is comprised of a single triangle.
    ///  Its vertices are located at a considerable distance from the window which encloses the set of points.
    fn add_container_triangle(&mut self, center: Vertex, extent: Float) {
        self.min_container_vertex_id = self.vertices.len() as VertexId;
        self.vertices.extend(container_triangle_vertices(center, extent));
        self.triangles = Triangles::with_capacity(self.input_vertices_count * 2 + 1);
        self.triangles
            .push(TriangleData::new_container_triangle(self.min_container_vertex_id));
    }

    fn find_existing_close_vertex(
        &self,
        triangle_id: TriangleId,
        vertex: Vertex,
    ) -> Option<VertexId> {
        let triangle = self.triangles.get(triangle_id);
        let triangle_verts = triangle.to_vertices_array(&self.vertices);
        let merge_distance = Float::EPSILON * self.scale_factor;
        for (vertex_index, triangle_vertex) in triangle_verts.iter().enumerate() {
            let dist = *triangle_vertex - vertex;
            if dist.x.abs() <= merge_distance && dist.y.abs() <= merge_distance {
                return Some(triangle.verts[vertex_index]);
            }
        }
        None
    }

    /// Returns the edge of `triangle_id` that `vertex` lies on, if this edge is shared with another triangle.
    ///
    /// `vertex` MUST be inside the triangle or on its boundary, and distinct from the triangle vertices.
    fn find_vertex_edge(
        &self,
        triangle_id: TriangleId,
        vertex: Vertex,
    ) -> Option<TriangleEdgeIndex> {
        let triangle = self.triangles.get(triangle_id);
        [EDGE_12, EDGE_23, EDGE_31].into_iter().find(|&edge| {
            let [from, to] = EDGE_TO_VERTS[edge as usize];
            triangle.neighbor(edge).exists()
                && triplet_orientation(
                    self.vertices[triangle.v(from) as usize],
                    self.vertices[triangle.v(to) as usize],
                    vertex,
                ) == Orientation::Colinear
        })
    }

    /// Splits `triangle_id` into 3 triangles (re-using the existing triangle id)
    ///
    /// All the resulting triangles will share `vertex_id` as their first vertex, and will be oriented in a CW order
    ///
    /// ```text
    ///                  v1
    ///                / | \
    ///               / 3|2 \
    ///              /   |   \
    ///             /    |    \
    ///            / t1  |  t3 \
    ///           /     1|1     \
    ///          /      /1\      \
    ///         /     /     \     \
    ///        /    /         \    \
    ///       /   /             \   \
    ///      /2 /        t2       \ 3\
    ///     / / 3                 2 \ \
    ///   v3 ------------------------- v2
    /// ```
    fn split_triangle_in_three_at_vertex(
        &mut self,
        triangle_id: TriangleId,
        vertex_id: VertexId,
    ) -> [TriangleId; 3] {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "split_triangle_in_three_at_vertex").entered();

        // Re-use the existing triangle id for the first triangle
        let t1 = triangle_id;
        // Create two new triangles for the other two
        let t2 = self.triangles.next_id();
        let t3 = t2 + 1;

        let triangle = self.triangles.get(t1).clone();

        // t2
        self.triangles.create(
            [vertex_id, triangle.v2(), triangle.v3()],
            [t3.into(), triangle.neighbor23(), t1.into()],
        );
        // t3
        self.triangles.create(
            [vertex_id, triangle.v1(), triangle.v2()],
            [t1.into(), triangle.neighbor12(), t2.into()],
        );

        self.update_adjacent(triangle.neighbor12(), t1.into(), t3.into());
        self.update_adjacent(triangle.neighbor23(), t1.into(), t2.into());

        *self.triangles.get_mut(t1) = TriangleData {
            verts: [vertex_id, triangle.v3(), triangle.v1()],
            neighbors: [t2.into(), triangle.neighbor31(), t3.into()],
        };

        [t1, t2, t3]
    }

    /// Splits the edge `edge` of `triangle_id`, on which `vertex_id` lies, and the two triangles sharing it, into 4 triangles
    /// (re-using the two existing triangle ids).
    ///
    /// All the resulting triangles will share `vertex_id` as their first vertex, and will be oriented in a CW order.
    /// The edge MUST have a neighbor triangle.
    ///
    /// ```text
    ///               c                                 c
    ///             /   \                             / | \
    ///           /   t   \                         / t1|t2 \
    ///          b ------- a       becomes         b -- P -- a
    ///           \   u   /                         \ u2|u1 /
    ///             \   /                             \ | /
    ///               d                                 d
    /// ```
    fn split_edge_at_vertex(
        &mut self,
        triangle_id: TriangleId,
        edge: TriangleEdgeIndex,
        vertex_id: VertexId,
    ) -> [TriangleId; 4] {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "split_edge_at_vertex").entered();

        let triangle = self.triangles.get(triangle_id).clone();
        let opposite_triangle_id = triangle.neighbor(edge).id;
        let opposite_triangle = self.triangles.get(opposite_triangle_id).clone();

        // Re-use the existing triangle ids for t1 and u1
        let (t1, u1) = (triangle_id, opposite_triangle_id);
        let t2 = self.triangles.next_id();
        let u2 = t2 + 1;

        // Edge `i` goes from vertex `i` to the next one, in both triangles
        let a_index = edge;
        let b_index = NEXT_CW_VERTEX_INDEX[a_index as usize];
        let c_index = NEXT_CW_VERTEX_INDEX[b_index as usize];
        let (a, b, c) = (
            triangle.v(a_index),
            triangle.v(b_index),
            triangle.v(c_index),
        );
        let (neighbor_bc, neighbor_ca) = (triangle.neighbor(b_index), triangle.neighbor(c_index));

        // In the opposite triangle, the shared edge goes from b to a
        let opposite_b_index = if opposite_triangle.neighbor12().id == triangle_id {
            VERT_1
        } else if opposite_triangle.neighbor23().id == triangle_id {
            VERT_2
        } else {
            VERT_3
        };
        let opposite_a_index = NEXT_CW_VERTEX_INDEX[opposite_b_index as usize];
        let opposite_d_index = NEXT_CW_VERTEX_INDEX[opposite_a_index as usize];
        let d = opposite_triangle.v(opposite_d_index);
        let (neighbor_ad, neighbor_db) = (
            opposite_triangle.neighbor(opposite_a_index),
            opposite_triangle.neighbor(opposite_d_index),
        );

        // t2
        self.triangles.create([vertex_id, c, a], [t1.into(), neighbor_ca, u1.into()]);
        // u2
        self.triangles.create([vertex_id, d, b], [u1.into(), neighbor_db, t1.into()]);

        self.update_adjacent(neighbor_ca, t1.into(), t2.into());
        self.update_adjacent(neighbor_db, u1.into(), u2.into());

        *self.triangles.get_mut(t1) = TriangleData {
            verts: [vertex_id, b, c],
            neighbors: [u2.into(), neighbor_bc, t2.into()],
        };
        *self.triangles.get_mut(u1) = TriangleData {
            verts: [vertex_id, a, d],
            neighbors: [t2.into(), neighbor_ad, u2.into()],
        };

        [t1, t2, u1, u2]
    }

    /// `quads_to_check` is a shared pre-allocated buffer.
    /// - It does not need to be cleared since it is fully emptied by each call
    fn restore_delaunay_triangulation(
        &mut self,
        from_vertex_id: VertexId,
        new_triangles: &[TriangleId],
        quads_to_check: &mut Vec<(TriangleId, TriangleId)>,
    ) {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "restore_delaunay_triangulation").entered();

        for &from_triangle_id in new_triangles {
            // EDGE_23 is the opposite edge of `from_vertex_id` in all the new triangles
            let neighbor = self.triangles.get(from_triangle_id).neighbor23();
            if neighbor.exists() {
                quads_to_check.push((from_triangle_id, neighbor.id));
            }
        }

        while let Some((from_triangle_id, opposite_triangle_id)) = quads_to_check.pop() {
            match self.check_and_swap_quad_diagonal(
                from_vertex_id,
                from_triangle_id,
                opposite_triangle_id,
            ) {
                QuadSwapResult::Swapped(quad_1, quad_2) => {
                    // Place any new triangles pairs which are now opposite to `from_vertex_id` on the stack, to be checked
                    if quad_1.1.exists() {
                        quads_to_check.push((quad_1.0, quad_1.1.id));
                    }
                    if quad_2.1.exists() {
                        quads_to_check.push((quad_2.0, quad_2.1.id));
                    }
                }
                QuadSwapResult::NotSwapped => (),
            }
        }
    }

    /// If q4 is in the circumcircle of the triangle q1q2q3, the two triangles form a convex quadrilateral
    /// whose diagonal is drawn in the wrong direction. We swap this diagonal to form two new triangles so
    /// that the structure of the Delaunay triangulation is locally restored.
    fn check_and_swap_quad_diagonal(
        &mut self,
        from_vertex_id: VertexId,
        from_triangle_id: TriangleId,
        opposite_triangle_id: TriangleId,
    ) -> QuadSwapResult {
        #[cfg(feature = "more_profile_traces")]
        let _span = span!(Level::TRACE, "check_and_swap_quad_diagonal").entered();

        if self.check_delaunay(from_triangle_id, opposite_triangle_id, from_vertex_id) {
            let (triangle_3, triangle_4) =
                self.swap_triangles(from_triangle_id, opposite_triangle_id, from_vertex_id);
            QuadSwapResult::Swapped(
                (from_triangle_id, triangle_3),
                (opposite_triangle_id, triangle_4),
            )
        } else {
            QuadSwapResult::NotSwapped
        }
    }

    /// Returns the quad formed by the two triangles, and the outer neighbors of the opposite triangle
    /// (across `q1-q3` and `q3-q2`).
    fn quad_from(
        &self,
        from_triangle_id: TriangleId,
        opposite_triangle_id: TriangleId,
        from_vertex_id: VertexId,
    ) -> (Quad, Neighbor, Neighbor) {
        let opposite_triangle = self.triangles.get(opposite_triangle_id);
        // No need to check if neighbor exists, handled by the == check since `from_triangle_id` exists
        if opposite_triangle.neighbor12().id == from_triangle_id {
            (
                Quad::new([
                    opposite_triangle.v2(),
                    opposite_triangle.v1(),
                    opposite_triangle.v3(),
                    from_vertex_id,
                ]),
                opposite_triangle.neighbor23(),
                opposite_triangle.neighbor31(),
            )
        } else if opposite_triangle.neighbor23().id == from_triangle_id {
            (
                Quad::new([
                    opposite_triangle.v3(),
                    opposite_triangle.v2(),
                    opposite_triangle.v1(),
                    from_vertex_id,
                ]),
                opposite_triangle.neighbor31(),
                opposite_triangle.neighbor12(),
            )
        } else {
            (
                Quad::new([
                    opposite_triangle.v1(),
                    opposite_triangle.v3(),
                    opposite_triangle.v2(),
                    from_vertex_id,
                ]),
                opposite_triangle.neighbor12(),
                opposite_triangle.neighbor23(),
            )
        }
    }

    /// Drops every triangle using a container vertex
    fn remove_wrapping(&self) -> Vec<[VertexId; 3]> {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "remove_wrapping").entered();

        let min_container_vertex_id = self.min_container_vertex_id;

        #[cfg(feature = "parallel_filtering")]
        if self.triangles.count() > self.config.filter_parallel_tri_count_threshold {
            use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

            return self
                .triangles
                .buffer()
                .par_iter()
                .with_min_len(self.config.filter_parallel_min_batch_len)
                .filter(|t| !t.has_vertex_from(min_container_vertex_id))
                .map(|t| t.verts)
                .collect();
        }

        self.triangles
            .buffer()
            .iter()
            .filter(|t| !t.has_vertex_from(min_container_vertex_id))
            .map(|t| t.verts)
            .collect()
    }
}

/// The new diagonal `q3-q4` must strictly separate `q1` from `q2`, or the swap would create flat or overlapping triangles.
#[inline(always)]
fn is_swap_valid(quad_vertices: &QuadVertices) -> bool {
    let (q3, q4) = (quad_vertices.q3(), quad_vertices.q4());
    let q1_side = triplet_orientation(q3, q4, quad_vertices.q1());
    let q2_side = triplet_orientation(q3, q4, quad_vertices.q2());
    q1_side != Orientation::Colinear && q2_side != Orientation::Colinear && q1_side != q2_side
}

pub(crate) struct VertexBinSort {
    bins_per_row: usize,
    bins_count: usize,
}

impl VertexBinSort {
    /// Each bin will contain roughly vertices.len()^(vertex_density_power) vertices
    pub fn sort(vertices: &[Vertex], vertex_density_power: f64) -> Vec<VertexId> {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "sort").entered();

        let bins_per_row = ((vertices.len() as f64)
            .powf(vertex_density_power / 2.)
            .round() as usize)
            .max(1);

        let bin_sort = Self {
            bins_per_row,
            bins_count: bins_per_row * bins_per_row,
        };

        // Indexes of the bin corresponding to each vertex
        let mut vertices_bin_indexes = Vec::with_capacity(vertices.len());
        // Will be used to represent the index of a sorted vertex
        let mut bins_counters = vec![0; bin_sort.bins_count];

        for vertex in vertices {
            let bin_index = bin_sort.bin_index_from_vertex(*vertex);
            vertices_bin_indexes.push(bin_index);
            // Start by counting vertices in each bin
            bins_counters[bin_index] += 1;
        }

        // Add the amount of vertices in previous bins to each bin
        for bin_index in 1..bin_sort.bins_count {
            bins_counters[bin_index] += bins_counters[bin_index - 1];
        }

        let mut sorted = vec![0; vertices.len()];
        for vertex_id in 0..vertices.len() {
            let bin_index = vertices_bin_indexes[vertex_id];
            bins_counters[bin_index] -= 1;
            sorted[bins_counters[bin_index]] = vertex_id as VertexId;
        }
        sorted
    }

    fn bin_index_from_vertex(&self, vertex: Vertex) -> usize {
        // Compute a bin index from a vertex position which is in [0.,1]
        let max_bin = self.bins_per_row - 1;
        let bin_x = ((0.99 * self.bins_per_row as Float * vertex.x) as usize).min(max_bin);
        let bin_y = ((0.99 * self.bins_per_row as Float * vertex.y) as usize).min(max_bin);
        self.bin_index_from_bin_position(bin_x, bin_y)
    }

    // Label the bins so that bins with consecutive indexes are spatially adjacent to one another
    fn bin_index_from_bin_position(&self, x: usize, y: usize) -> usize {
        if y % 2 == 0 {
            (y * self.bins_per_row) + x
        } else {
            (y + 1) * self.bins_per_row - x - 1
        }
    }
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::{
        sampling::{generate_sample_points, sample_points_count},
        triangulation::{
            transform_to_2d_planar_coordinate_system, triangulation_from_2d_vertices,
            triangulation_from_3d_planar_vertices, DelaunayGenerator, QuadSwapResult,
            TriangulationConfiguration, TriangulationError, VertexBinSort,
        },
        types::{Float, Neighbor, Point3D, TriangleData, Triangles, Vertex, VertexId, EDGE_23},
        utils::check_delaunay_optimal,
    };

    fn signed_area(vertices: &[Vertex], triangle: [VertexId; 3]) -> Float {
        let (a, b, c) = (
            vertices[triangle[0] as usize],
            vertices[triangle[1] as usize],
            vertices[triangle[2] as usize],
        );
        ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)) / 2.
    }

    fn assert_valid_triangulation(vertices: &[Vertex], triangles: &[[VertexId; 3]]) {
        for &triangle in triangles {
            assert!(
                signed_area(vertices, triangle) < 0.,
                "{triangle:?} should be clockwise"
            );
        }
        let quality = check_delaunay_optimal(triangles.iter().copied(), vertices);
        assert!(
            quality.is_optimal(),
            "Not Delaunay: {:?}",
            quality.bad_triangles
        );
    }

    #[test]
    fn delaunay_level_1() {
        // 1-------------2
        // |             |
        // |             |
        // |             |
        // |             |
        // 0-------------3
        let vertices = vec![
            Vertex::new(0., 0.),
            Vertex::new(0., 5.),
            Vertex::new(5., 5.),
            Vertex::new(5., 0.),
        ];

        let triangulation =
            triangulation_from_2d_vertices(&vertices, TriangulationConfiguration::default())
                .expect("Triangulation should succeed");

        assert_eq!(2, triangulation.triangles.len());
        assert!(triangulation.merged_vertices.is_empty());
        for vertex_id in 0..4 {
            assert!(triangulation.triangles.iter().any(|t| t.contains(&vertex_id)));
        }
        assert_valid_triangulation(&vertices, &triangulation.triangles);
    }

    #[test]
    fn delaunay_level_2() {
        // 1-------------5
        // |             |
        // 2-------------4
        // |             |
        // 0-------------3
        let vertices = vec![
            Vertex::new(0., 0.),
            Vertex::new(0., 10.),
            Vertex::new(0., 5.),
            Vertex::new(5., 0.),
            Vertex::new(5., 5.),
            Vertex::new(5., 10.),
        ];

        let triangulation =
            triangulation_from_2d_vertices(&vertices, TriangulationConfiguration::default())
                .expect("Triangulation should succeed");

        assert_eq!(4, triangulation.triangles.len());
        assert_valid_triangulation(&vertices, &triangulation.triangles);
    }

    #[test]
    fn colinear_vertex_on_hull_edge() {
        // 0 lies on the hull edge 1-3
        let vertices = vec![
            Vertex::new(5., 8.),
            Vertex::new(0., 3.),
            Vertex::new(5., 0.),
            Vertex::new(6., 9.),
        ];

        let triangulation =
            triangulation_from_2d_vertices(&vertices, TriangulationConfiguration::default())
                .expect("Triangulation should succeed");

        assert_eq!(2, triangulation.triangles.len());
        for vertex_id in 0..4 {
            assert!(triangulation.triangles.iter().any(|t| t.contains(&vertex_id)));
        }
        assert_valid_triangulation(&vertices, &triangulation.triangles);
    }

    #[test]
    fn no_flat_triangle_along_hull_edge() {
        // 3 lies on the hull edge 0-1, 4 is inside
        let vertices = vec![
            Vertex::new(9., 2.),
            Vertex::new(3., 8.),
            Vertex::new(9., 8.),
            Vertex::new(5., 6.),
            Vertex::new(6., 6.),
        ];

        let triangulation =
            triangulation_from_2d_vertices(&vertices, TriangulationConfiguration::default())
                .expect("Triangulation should succeed");

        // 5 vertices, 4 on the convex hull
        assert_eq!(4, triangulation.triangles.len());
        assert!(!triangulation.triangles.iter().any(|t| {
            t.contains(&0) && t.contains(&1) && t.contains(&3)
        }));
        assert_valid_triangulation(&vertices, &triangulation.triangles);
    }

    /// Twice the area of the convex hull of `points`
    fn convex_hull_double_area(points: &[(i64, i64)]) -> i64 {
        let mut points = points.to_vec();
        points.sort();
        points.dedup();

        let cross = |o: (i64, i64), a: (i64, i64), b: (i64, i64)| {
            (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
        };
        let half_hull = |points: &mut dyn Iterator<Item = (i64, i64)>| {
            let mut hull: Vec<(i64, i64)> = Vec::new();
            for p in points {
                while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0
                {
                    hull.pop();
                }
                hull.push(p);
            }
            hull.pop();
            hull
        };
        let mut hull = half_hull(&mut points.iter().copied());
        hull.extend(half_hull(&mut points.iter().rev().copied()));

        let n = hull.len();
        (0..n)
            .map(|i| {
                let (a, b) = (hull[i], hull[(i + 1) % n]);
                a.0 * b.1 - b.0 * a.1
            })
            .sum::<i64>()
            .abs()
    }

    #[test]
    fn integer_grid_vertices() {
        // Small integer coordinates: many colinear, cocircular and duplicated vertices
        let mut rng = StdRng::seed_from_u64(0x6121D);
        for _ in 0..500 {
            let count = rng.gen_range(3..10);
            let coords: Vec<(i64, i64)> = (0..count)
                .map(|_| (rng.gen_range(0..8), rng.gen_range(0..8)))
                .collect();
            let vertices: Vec<Vertex> = coords
                .iter()
                .map(|&(x, y)| Vertex::new(x as Float, y as Float))
                .collect();

            let triangulation =
                triangulation_from_2d_vertices(&vertices, TriangulationConfiguration::default())
                    .unwrap_or_else(|err| panic!("{coords:?}: {err}"));

            let mut double_area = 0;
            for triangle in triangulation.triangles.iter() {
                let [a, b, c] = triangle.map(|v| coords[v as usize]);
                let signed_double_area = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
                assert!(
                    signed_double_area < 0,
                    "{coords:?}: {triangle:?} should be clockwise and not flat"
                );
                double_area -= signed_double_area;
            }
            // Triangles cover the convex hull exactly
            assert_eq!(
                convex_hull_double_area(&coords),
                double_area,
                "{coords:?}: {:?}",
                triangulation.triangles
            );
            for &(merged, kept) in triangulation.merged_vertices.iter() {
                assert_eq!(coords[merged as usize], coords[kept as usize]);
            }
            if double_area > 0 {
                for coord in coords.iter() {
                    assert!(
                        triangulation
                            .triangles
                            .iter()
                            .any(|t| t.iter().any(|&v| coords[v as usize] == *coord)),
                        "{coords:?}: {coord:?} is missing"
                    );
                }
            }
            let quality =
                check_delaunay_optimal(triangulation.triangles.iter().copied(), &vertices);
            assert!(quality.is_optimal(), "{coords:?}: {:?}", triangulation.triangles);
        }
    }

    #[test]
    fn delaunay_random_vertices() {
        let mut rng = StdRng::seed_from_u64(0xDE1A);
        let vertices: Vec<Vertex> = (0..300)
            .map(|_| Vertex::new(rng.gen_range(-50. ..50.), rng.gen_range(0. ..10.)))
            .collect();

        let triangulation =
            triangulation_from_2d_vertices(&vertices, TriangulationConfiguration::default())
                .expect("Triangulation should succeed");

        assert!(triangulation.merged_vertices.is_empty());
        for vertex_id in 0..vertices.len() as VertexId {
            assert!(
                triangulation.triangles.iter().any(|t| t.contains(&vertex_id)),
                "Vertex {vertex_id} is missing"
            );
        }
        assert_valid_triangulation(&vertices, &triangulation.triangles);
    }

    #[test]
    fn delaunay_sampled_disc() {
        let density = 3;
        let points = generate_sample_points(1., density).unwrap();
        let vertices: Vec<Vertex> = points
            .iter()
            .map(|p| Vertex::new(p.x as Float, p.y as Float))
            .collect();

        let mut generator = DelaunayGenerator::new(points, TriangulationConfiguration::default());
        let triangulation = generator.triangulate().expect("Triangulation should succeed");

        // Triangles count of any triangulation of n points, with h of them on the convex hull: 2n - h - 2
        let n = sample_points_count(density).unwrap();
        let h = 6 * density as usize;
        assert_eq!(2 * n - h - 2, triangulation.triangles.len());
        assert_valid_triangulation(&vertices, &triangulation.triangles);
    }

    #[test]
    fn delaunay_mesh_keeps_original_coordinates() {
        let points = vec![
            Point3D::new(10., 10., 3.),
            Point3D::new(10., 20., 3.),
            Point3D::new(20., 20., 3.),
            Point3D::new(20., 10., 3.),
        ];
        let mut generator =
            DelaunayGenerator::new(points.clone(), TriangulationConfiguration::default());

        let mesh = generator
            .generate_delaunay_mesh()
            .expect("Triangulation should succeed");

        assert_eq!(2, mesh.triangle_count());
        assert_eq!(4, mesh.vertices().len());
        for (vertex, point) in mesh.vertices().iter().zip(points.iter()) {
            assert_eq!(point.to_array(), vertex.position());
        }
        // Can run again
        assert_eq!(mesh, generator.generate_delaunay_mesh().unwrap());
    }

    #[test]
    fn degenerate_inputs() {
        let config = TriangulationConfiguration::default;

        let two_vertices = vec![Vertex::new(0., 0.), Vertex::new(1., 1.)];
        let triangulation = triangulation_from_2d_vertices(&two_vertices, config()).unwrap();
        assert!(triangulation.triangles.is_empty());

        let identical_vertices = vec![Vertex::new(10., 10.); 4];
        let triangulation = triangulation_from_2d_vertices(&identical_vertices, config()).unwrap();
        assert!(triangulation.triangles.is_empty());

        let colinear_vertices = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 1.),
            Vertex::new(2., 2.),
        ];
        let triangulation = triangulation_from_2d_vertices(&colinear_vertices, config()).unwrap();
        assert!(triangulation.triangles.is_empty());

        let nan_vertices = vec![
            Vertex::new(0., 0.),
            Vertex::new(Float::NAN, 1.),
            Vertex::new(2., 0.),
        ];
        assert_eq!(
            Err(TriangulationError::NonFiniteVertex { vertex: 1 }),
            triangulation_from_2d_vertices(&nan_vertices, config())
        );
    }

    #[test]
    fn duplicated_vertices_are_merged() {
        let vertices = vec![
            Vertex::new(0., 0.),
            Vertex::new(0., 5.),
            Vertex::new(5., 5.),
            Vertex::new(5., 0.),
            Vertex::new(0., 0.),
        ];

        let triangulation =
            triangulation_from_2d_vertices(&vertices, TriangulationConfiguration::default())
                .expect("Triangulation should succeed");

        assert_eq!(2, triangulation.triangles.len());
        assert_eq!(1, triangulation.merged_vertices.len());
        let (merged, kept) = triangulation.merged_vertices[0];
        assert!((merged, kept) == (4, 0) || (merged, kept) == (0, 4));
        assert!(!triangulation.triangles.iter().any(|t| t.contains(&merged)));
    }

    #[test]
    fn triangulation_of_3d_planar_vertices() {
        let vertices = vec![
            Vec3::new(0., 0., 2.),
            Vec3::new(0., 5., 2.),
            Vec3::new(5., 5., 2.),
            Vec3::new(5., 0., 2.),
            Vec3::new(2., 1., 2.),
        ];

        let triangulation = triangulation_from_3d_planar_vertices(
            &vertices,
            Vec3::Z,
            TriangulationConfiguration::default(),
        )
        .expect("Triangulation should succeed");

        // 5 vertices, 4 on the convex hull
        assert_eq!(4, triangulation.triangles.len());
    }

    #[test]
    fn triangulation_of_3d_planar_vertices_starting_with_duplicates() {
        let vertices = vec![
            Vec3::new(1., 1., 2.),
            Vec3::new(1., 1., 2.),
            Vec3::new(4., 1., 2.),
            Vec3::new(1., 5., 2.),
        ];

        let triangulation = triangulation_from_3d_planar_vertices(
            &vertices,
            Vec3::Z,
            TriangulationConfiguration::default(),
        )
        .expect("Triangulation should succeed");

        assert_eq!(1, triangulation.triangles.len());
        assert_eq!(1, triangulation.merged_vertices.len());

        let identical_vertices = vec![Vec3::new(1., 1., 2.); 3];
        let triangulation = triangulation_from_3d_planar_vertices(
            &identical_vertices,
            Vec3::Z,
            TriangulationConfiguration::default(),
        )
        .expect("Triangulation should succeed");
        assert!(triangulation.triangles.is_empty());

        let nan_vertices = vec![
            Vec3::new(1., 1., 2.),
            Vec3::new(Float::NAN, 1., 2.),
            Vec3::new(1., 5., 2.),
        ];
        assert!(matches!(
            triangulation_from_3d_planar_vertices(
                &nan_vertices,
                Vec3::Z,
                TriangulationConfiguration::default(),
            ),
            Err(TriangulationError::NonFiniteVertex { .. })
        ));
    }

    #[test]
    fn triangulation_normalize_set_of_vertices() {
        let vertices = vec![
            Vertex::new(3.0, 2.0),
            Vertex::new(-1.0, 2.0),
            Vertex::new(-1.0, -2.0),
            Vertex::new(3.0, -2.0),
        ];

        let generator =
            DelaunayGenerator::from_2d_vertices(&vertices, TriangulationConfiguration::default());

        assert_eq!(
            vec![
                Vertex::new(1., 1.),
                Vertex::new(0., 1.),
                Vertex::new(0., 0.),
                Vertex::new(1., 0.)
            ],
            generator.normalize_points()
        );
        // Input coordinates are kept as is
        assert_eq!(&vertices[..], generator.vertices());
    }

    #[test]
    fn normalize_single_point() {
        let generator = DelaunayGenerator::new(
            vec![Point3D::new(10., 10., 10.)],
            TriangulationConfiguration::default(),
        );

        // All points should lie in the range 0 to 1
        for vertex in generator.normalize_points() {
            assert!(vertex.is_finite());
            assert!(vertex.x >= 0. && vertex.x <= 1.);
            assert!(vertex.y >= 0. && vertex.y <= 1.);
        }
    }

    #[test]
    fn triangulation_set_to_2d_plane_vertices() {
        let vertices = vec![
            Vec3::new(-3., 2., 0.),
            Vec3::new(1., 2., 0.),
            Vec3::new(1., -2., 0.),
            Vec3::new(-3., -2., 0.),
        ];

        let planar_vertices = transform_to_2d_planar_coordinate_system(&vertices, Vec3::Z);

        assert_eq!(
            vec![
                Vertex::new(3.0, 2.0),
                Vertex::new(-1.0, 2.0),
                Vertex::new(-1.0, -2.0),
                Vertex::new(3.0, -2.0)
            ],
            planar_vertices
        );
    }

    #[test]
    fn bin_sort_groups_close_vertices() {
        // 16 vertices, 2 bins per row
        let mut vertices = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                vertices.push(Vertex::new(i as Float / 3., j as Float / 3.));
            }
        }

        let sorted = VertexBinSort::sort(&vertices, 0.5);

        assert_eq!(16, sorted.len());
        let mut all: Vec<VertexId> = sorted.clone();
        all.sort();
        assert_eq!((0..16).collect::<Vec<VertexId>>(), all);

        // Bins are visited in a snake order: bottom left, bottom right, top right, top left
        let bin_of = |id: VertexId| {
            let v = vertices[id as usize];
            match (v.x < 0.5, v.y < 0.5) {
                (true, true) => 0,
                (false, true) => 1,
                (false, false) => 2,
                (true, false) => 3,
            }
        };
        let bins: Vec<usize> = sorted.iter().map(|&id| bin_of(id)).collect();
        assert!(bins.windows(2).all(|w| w[0] <= w[1]), "{bins:?}");
    }

    #[test]
    fn split_in_three_triangle() {
        let vertices = vec![
            Vertex::new(0., 0.), // vertex to be added
            // container triangle, to be split by the vertex
            Vertex::new(-3., -3.),
            Vertex::new(0., 3.),
            Vertex::new(3., -3.),
        ];
        let mut triangles = Triangles::new();
        triangles.push(TriangleData::new_container_triangle(1));

        let mut generator = DelaunayGenerator::from_parts(vertices, triangles, 1);
        let new_triangles = generator.split_triangle_in_three_at_vertex(0, 0);

        assert_eq!([0, 1, 2], new_triangles);
        let triangles = generator.triangles();
        assert_eq!(3, triangles.count());
        for triangle in triangles.buffer() {
            assert_eq!(0, triangle.v1());
            assert!(signed_area(generator.vertices(), triangle.verts) < 0.);
        }
        assert_eq!([0, 3, 1], triangles.get(0).verts);
        assert_eq!([0, 2, 3], triangles.get(1).verts);
        assert_eq!([0, 1, 2], triangles.get(2).verts);
        assert_eq!(
            [Neighbor::new(1), Neighbor::NONE, Neighbor::new(2)],
            triangles.get(0).neighbors
        );
        assert_eq!(
            [Neighbor::new(2), Neighbor::NONE, Neighbor::new(0)],
            triangles.get(1).neighbors
        );
        assert_eq!(
            [Neighbor::new(0), Neighbor::NONE, Neighbor::new(1)],
            triangles.get(2).neighbors
        );
    }

    #[test]
    fn split_edge_in_four() {
        let vertices = vec![
            Vertex::new(1., 1.), // vertex to be added, on the diagonal 2-4
            Vertex::new(0., 0.),
            Vertex::new(0., 2.),
            Vertex::new(2., 2.),
            Vertex::new(2., 0.),
        ];
        let mut triangles = Triangles::new();
        triangles.create([1, 2, 4], [Neighbor::NONE, Neighbor::new(1), Neighbor::NONE]);
        triangles.create([2, 3, 4], [Neighbor::NONE, Neighbor::NONE, Neighbor::new(0)]);
        let mut generator = DelaunayGenerator::from_parts(vertices, triangles, 5);

        assert_eq!(Some(EDGE_23), generator.find_vertex_edge(0, Vertex::new(1., 1.)));
        assert_eq!(None, generator.find_vertex_edge(0, Vertex::new(0.5, 1.)));
        // Edges without a neighbor are never split
        assert_eq!(None, generator.find_vertex_edge(0, Vertex::new(0., 1.)));

        let new_triangles = generator.split_edge_at_vertex(0, EDGE_23, 0);

        assert_eq!([0, 2, 1, 3], new_triangles);
        let triangles = generator.triangles();
        assert_eq!(4, triangles.count());
        for triangle in triangles.buffer() {
            assert_eq!(0, triangle.v1());
            assert!(signed_area(generator.vertices(), triangle.verts) < 0.);
        }
        assert_eq!([0, 4, 1], triangles.get(0).verts);
        assert_eq!([0, 2, 3], triangles.get(1).verts);
        assert_eq!([0, 1, 2], triangles.get(2).verts);
        assert_eq!([0, 3, 4], triangles.get(3).verts);
        assert_eq!(
            [Neighbor::new(3), Neighbor::NONE, Neighbor::new(2)],
            triangles.get(0).neighbors
        );
        assert_eq!(
            [Neighbor::new(2), Neighbor::NONE, Neighbor::new(3)],
            triangles.get(1).neighbors
        );
        assert_eq!(
            [Neighbor::new(0), Neighbor::NONE, Neighbor::new(1)],
            triangles.get(2).neighbors
        );
        assert_eq!(
            [Neighbor::new(1), Neighbor::NONE, Neighbor::new(0)],
            triangles.get(3).neighbors
        );
    }

    #[test]
    fn find_enclosing_triangle() {
        let vertices = vec![
            Vertex::new(0., 0.),
            Vertex::new(0., 1.),
            Vertex::new(1., 1.),
            Vertex::new(1., 0.),
        ];
        let mut triangles = Triangles::new();
        triangles.create([0, 1, 3], [Neighbor::NONE, Neighbor::new(1), Neighbor::NONE]);
        triangles.create([1, 2, 3], [Neighbor::NONE, Neighbor::NONE, Neighbor::new(0)]);

        let generator = DelaunayGenerator::from_parts(vertices, triangles, 4);

        assert_eq!(
            Some(0),
            generator.find_enclosing_triangle(Vertex::new(0.2, 0.2), Neighbor::new(0))
        );
        // Walks to the neighbor
        assert_eq!(
            Some(1),
            generator.find_enclosing_triangle(Vertex::new(0.8, 0.8), Neighbor::new(0))
        );
        // Outside of the triangulation
        assert_eq!(
            None,
            generator.find_enclosing_triangle(Vertex::new(2., 2.), Neighbor::new(0))
        );
        assert_eq!(
            None,
            generator.find_enclosing_triangle(Vertex::new(0.2, 0.2), Neighbor::NONE)
        );
    }

    #[test]
    fn update_adjacent() {
        let vertices = vec![Vertex::ZERO; 3];
        let mut triangles = Triangles::new();
        triangles.create([0, 1, 2], [Neighbor::new(1), Neighbor::new(2), Neighbor::new(3)]);
        for _ in 0..3 {
            triangles.create([0, 1, 2], [Neighbor::NONE, Neighbor::new(0), Neighbor::NONE]);
        }
        let mut generator = DelaunayGenerator::from_parts(vertices, triangles, 3);

        generator.update_adjacent(Neighbor::new(1), Neighbor::new(0), Neighbor::new(4));
        generator.update_adjacent(Neighbor::new(2), Neighbor::new(0), Neighbor::new(5));
        generator.update_adjacent(Neighbor::new(3), Neighbor::new(0), Neighbor::new(6));
        // No-op
        generator.update_adjacent(Neighbor::NONE, Neighbor::new(0), Neighbor::new(7));

        for (id, new_neighbor) in [(1, 4), (2, 5), (3, 6)] {
            assert_eq!(
                [Neighbor::NONE, Neighbor::new(new_neighbor), Neighbor::NONE],
                generator.triangles().get(id).neighbors
            );
        }
        assert_eq!(
            [Neighbor::new(1), Neighbor::new(2), Neighbor::new(3)],
            generator.triangles().get(0).neighbors
        );
    }

    /// ```text
    ///        3
    ///      /   \
    ///    1 ----- 2
    ///      \   /
    ///        0
    /// ```
    fn kite_generator(from_vertex: Vertex) -> DelaunayGenerator {
        let vertices = vec![
            from_vertex,
            Vertex::new(0., 0.),
            Vertex::new(4., 0.),
            Vertex::new(2., 1.),
        ];
        let mut triangles = Triangles::new();
        triangles.create([0, 1, 2], [Neighbor::NONE, Neighbor::new(1), Neighbor::NONE]);
        triangles.create([2, 1, 3], [Neighbor::new(0), Neighbor::NONE, Neighbor::NONE]);
        DelaunayGenerator::from_parts(vertices, triangles, 4)
    }

    #[test]
    fn check_delaunay() {
        // Inside the circumcircle of 1-2-3
        assert!(kite_generator(Vertex::new(2., -1.)).check_delaunay(0, 1, 0));
        // Outside
        assert!(!kite_generator(Vertex::new(2., -5.)).check_delaunay(0, 1, 0));
    }

    #[test]
    fn no_swap() {
        let mut generator = kite_generator(Vertex::new(2., -5.));

        let quad_swap = generator.check_and_swap_quad_diagonal(0, 0, 1);

        assert_eq!(QuadSwapResult::NotSwapped, quad_swap);
        assert_eq!([0, 1, 2], generator.triangles().get(0).verts);
        assert_eq!([2, 1, 3], generator.triangles().get(1).verts);
    }

    #[test]
    fn swap() {
        let mut generator = kite_generator(Vertex::new(2., -1.));

        let quad_swap = generator.check_and_swap_quad_diagonal(0, 0, 1);

        assert_eq!(
            QuadSwapResult::Swapped((0, Neighbor::NONE), (1, Neighbor::NONE)),
            quad_swap
        );
        let triangles = generator.triangles();
        assert_eq!([0, 1, 3], triangles.get(0).verts);
        assert_eq!([0, 3, 2], triangles.get(1).verts);
        assert_eq!(
            [Neighbor::NONE, Neighbor::NONE, Neighbor::new(1)],
            triangles.get(0).neighbors
        );
        assert_eq!(
            [Neighbor::new(0), Neighbor::NONE, Neighbor::NONE],
            triangles.get(1).neighbors
        );
        for triangle in triangles.buffer() {
            assert!(signed_area(generator.vertices(), triangle.verts) < 0.);
        }
    }
}
