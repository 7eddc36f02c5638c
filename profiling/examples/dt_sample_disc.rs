use simulation::ffi::delaunay_sample_mesh;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, Registry};
use tracing_tracy::TracyLayer;

/// 1 + 3 * 400 * 401 = 481_201 sample points
const DENSITY: i32 = 400;

fn main() {
    let subscriber = Registry::default().with(TracyLayer::default());
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let mesh = delaunay_sample_mesh(1.0, DENSITY).expect("Simulation should succeed");

    info!(
        "{} vertices, {} triangles",
        mesh.vertices().len(),
        mesh.triangle_count()
    );
}
