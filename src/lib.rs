pub mod ffi;
pub mod mesh;
pub mod sampling;
pub mod triangulation;
pub mod types;
pub mod utils;

#[cfg(feature = "viewer")]
pub mod viewer;

pub use glam;
pub use hashbrown;

pub use ffi::{delaunay_sample, hello_simulation, DelaunayStatus, SimulationError};
pub use mesh::{generate_sample_mesh, SMVertex, SurfaceMeshData};
pub use sampling::generate_sample_points;
pub use triangulation::{
    triangulation_from_2d_vertices, triangulation_from_3d_planar_vertices, DelaunayGenerator,
    Triangulation,
};

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
