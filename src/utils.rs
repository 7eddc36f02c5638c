use robust::{incircle, orient2d, Coord};

use crate::types::{EdgeVertices, Float, Vertex, VertexId};

#[cfg(feature = "more_profile_traces")]
use tracing::{span, Level};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Orientation {
    Colinear,
    Clockwise,
    CounterClockwise,
}

#[inline(always)]
fn coord(v: Vertex) -> Coord<Float> {
    Coord { x: v.x, y: v.y }
}

/// Returns the orientation of an ordered triplet (p, q, r).
///
/// The sign is exact: three colinear input vertices are always reported as [Orientation::Colinear].
pub fn triplet_orientation(p: Vertex, q: Vertex, r: Vertex) -> Orientation {
    let det = orient2d(coord(p), coord(q), coord(r));

    if det == 0. {
        Orientation::Colinear
    } else if det > 0. {
        Orientation::CounterClockwise
    } else {
        Orientation::Clockwise
    }
}

/// Returns `true` if and only if the point `p` is on the right side of the oriented edge `e`, or on the edge
#[inline]
pub fn is_point_on_right_side_of_edge(e: EdgeVertices, p: Vertex) -> bool {
    orient2d(coord(e.0), coord(e.1), coord(p)) <= 0.
}

/// Checks if vertex `p` is strictly inside the circumcircle of the triangle formed by the first three vertices in `triangle`
/// - `triangle` contains the vertices of the triangle.
///     - length of `triangle` **MUST** be >= 3.
///     - `triangle` vertices must be in a counter-clockwise order
/// - `p` vertex to check
///
/// ```text
/// v3 --------- v2
/// |          / |
/// |        /   |
/// |      /     |
/// |    /       |
/// |  /         |
/// v1 --------- p
/// ```
///
/// where v1, v2 and v3 are the vertices of the given triangle and p the vertex to check.
/// Uses Shewchuk's adaptive in-circle predicate, a cocircular `p` is never inside.
#[inline(always)]
pub fn is_vertex_in_triangle_circumcircle(triangle: &[Vertex], p: Vertex) -> bool {
    #[cfg(feature = "more_profile_traces")]
    let _span = span!(Level::TRACE, "is_vertex_in_triangle_circumcircle").entered();

    incircle(
        coord(triangle[0]),
        coord(triangle[1]),
        coord(triangle[2]),
        coord(p),
    ) > 0.
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DelaunayQuality {
    /// Indexes (in the input iterator order) of the triangles whose circumcircle contains another vertex
    pub bad_triangles: Vec<usize>,
    pub triangles_count: usize,
}
impl DelaunayQuality {
    pub fn is_optimal(&self) -> bool {
        self.bad_triangles.is_empty()
    }
}

/// Relative tolerance used by [check_delaunay_optimal] to ignore (nearly) cocircular vertices
pub const DELAUNAY_CHECK_TOLERANCE: f64 = 1e-6;

/// Brute force check of the empty circumcircle property of clockwise `triangles`, against every vertex of `vertices`.
///
/// Quadratic, meant for tests and debugging only. Unlike [is_vertex_in_triangle_circumcircle], which only answers
/// for a vertex facing the triangle across an edge, this uses the full in-circle determinant and accepts any vertex.
pub fn check_delaunay_optimal(
    triangles: impl Iterator<Item = [VertexId; 3]>,
    vertices: &[Vertex],
) -> DelaunayQuality {
    let mut quality = DelaunayQuality::default();
    for (index, [v1, v2, v3]) in triangles.enumerate() {
        quality.triangles_count += 1;
        // Reversed to get a counter-clockwise triangle
        let (a, b, c) = (
            vertices[v1 as usize],
            vertices[v3 as usize],
            vertices[v2 as usize],
        );
        let violated = vertices.iter().enumerate().any(|(vertex_id, &vertex)| {
            let vertex_id = vertex_id as VertexId;
            vertex_id != v1
                && vertex_id != v2
                && vertex_id != v3
                && vertex != a
                && vertex != b
                && vertex != c
                && is_vertex_strictly_in_circumcircle(a, b, c, vertex)
        });
        if violated {
            quality.bad_triangles.push(index);
        }
    }
    quality
}

/// In-circle determinant test, computed in f64. `a b c` MUST be in a counter-clockwise order.
fn is_vertex_strictly_in_circumcircle(a: Vertex, b: Vertex, c: Vertex, d: Vertex) -> bool {
    let (adx, ady) = ((a.x - d.x) as f64, (a.y - d.y) as f64);
    let (bdx, bdy) = ((b.x - d.x) as f64, (b.y - d.y) as f64);
    let (cdx, cdy) = ((c.x - d.x) as f64, (c.y - d.y) as f64);

    let ad = adx * adx + ady * ady;
    let bd = bdx * bdx + bdy * bdy;
    let cd = cdx * cdx + cdy * cdy;

    let det = ad * (bdx * cdy - bdy * cdx) + bd * (cdx * ady - cdy * adx)
        + cd * (adx * bdy - ady * bdx);
    let permanent = ad * ((bdx * cdy).abs() + (bdy * cdx).abs())
        + bd * ((cdx * ady).abs() + (cdy * adx).abs())
        + cd * ((adx * bdy).abs() + (ady * bdx).abs());

    det > permanent * DELAUNAY_CHECK_TOLERANCE
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
