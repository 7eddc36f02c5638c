//! C-compatible entry points of `libsimulation.so`.
//!
//! Hosts load the library at runtime and call [delaunay_sample] or [hello_simulation].

use std::panic;

use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    mesh::{generate_sample_mesh, SurfaceMeshData},
    sampling::{generate_sample_points, SamplingError},
    triangulation::{DelaunayGenerator, TriangulationConfiguration, TriangulationError},
};

#[cfg(feature = "viewer")]
use crate::viewer::{show_mesh, ViewerConfiguration, ViewerError};

/// Status returned by the exported functions. Hosts may ignore it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelaunayStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Radius or density out of range.
    InvalidArgument = 1,
    TriangulationFailed = 2,
    /// The mesh could not be displayed.
    ViewerFailed = 3,
    /// A panic was caught at the library boundary.
    Panicked = 4,
}

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("invalid density {0}, must be at least 1")]
    InvalidDensity(i32),
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error(transparent)]
    Triangulation(#[from] TriangulationError),
    #[cfg(feature = "viewer")]
    #[error(transparent)]
    Viewer(#[from] ViewerError),
}

impl From<&SimulationError> for DelaunayStatus {
    fn from(err: &SimulationError) -> Self {
        match err {
            SimulationError::InvalidDensity(_) | SimulationError::Sampling(_) => {
                DelaunayStatus::InvalidArgument
            }
            SimulationError::Triangulation(_) => DelaunayStatus::TriangulationFailed,
            #[cfg(feature = "viewer")]
            SimulationError::Viewer(_) => DelaunayStatus::ViewerFailed,
        }
    }
}

/// Installs a `RUST_LOG` driven subscriber, unless the host process already has a global one.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Samples a disc of `radius` with `density` rings and triangulates the samples.
pub fn delaunay_sample_mesh(
    radius: f32,
    density: i32,
) -> Result<SurfaceMeshData, SimulationError> {
    let density = u32::try_from(density)
        .ok()
        .filter(|&d| d >= 1)
        .ok_or(SimulationError::InvalidDensity(density))?;

    let points = generate_sample_points(radius, density)?;
    let mut generator = DelaunayGenerator::new(points, TriangulationConfiguration::default());
    Ok(generator.generate_delaunay_mesh()?)
}

fn display_mesh(mesh: &SurfaceMeshData) -> Result<(), SimulationError> {
    #[cfg(feature = "viewer")]
    show_mesh(mesh, ViewerConfiguration::default())?;

    #[cfg(not(feature = "viewer"))]
    info!(
        "Mesh: {} vertices, {} triangles, {} edges",
        mesh.vertices().len(),
        mesh.triangle_count(),
        mesh.unique_edges().len()
    );

    Ok(())
}

fn run_delaunay_sample(radius: f32, density: i32) -> Result<(), SimulationError> {
    info!("Hello, Library");
    let mesh = delaunay_sample_mesh(radius, density)?;
    display_mesh(&mesh)
}

fn report<F: FnOnce() -> Result<(), SimulationError> + panic::UnwindSafe>(
    name: &str,
    f: F,
) -> DelaunayStatus {
    match panic::catch_unwind(f) {
        Ok(Ok(())) => DelaunayStatus::Ok,
        Ok(Err(err)) => {
            warn!("{} failed: {}", name, err);
            DelaunayStatus::from(&err)
        }
        Err(_) => {
            error!("{} panicked", name);
            DelaunayStatus::Panicked
        }
    }
}

/// Samples a disc of `radius` with `density` rings, builds its Delaunay triangulation and displays it.
///
/// With the `viewer` feature, blocks until the window is closed.
/// Without it, logs a summary of the mesh.
#[no_mangle]
pub extern "C" fn delaunay_sample(radius: f32, density: i32) -> DelaunayStatus {
    init_logging();
    report("delaunay_sample", || run_delaunay_sample(radius, density))
}

/// Displays a fixed grid mesh. Returns `true` on success.
#[no_mangle]
pub extern "C" fn hello_simulation() -> bool {
    init_logging();
    let status = report("hello_simulation", || display_mesh(&generate_sample_mesh()));
    status == DelaunayStatus::Ok
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
