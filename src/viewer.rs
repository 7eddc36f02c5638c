use bevy::{
    app::{App, AppExit, PluginGroup, Startup},
    asset::Assets,
    color::Color,
    core_pipeline::core_3d::Camera3dBundle,
    ecs::system::{Commands, Res, ResMut, Resource},
    log::LogPlugin,
    math::Vec3,
    pbr::{PbrBundle, StandardMaterial},
    render::{
        camera::{ClearColor, OrthographicProjection, Projection, ScalingMode},
        mesh::{Mesh, PrimitiveTopology},
        render_asset::RenderAssetUsages,
    },
    transform::components::Transform,
    utils::default,
    window::{Window, WindowPlugin, WindowResolution},
    DefaultPlugins,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::mesh::SurfaceMeshData;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    #[error("nothing to display, the mesh has no triangles")]
    EmptyMesh,
    #[error("viewer exited with error code {0}")]
    Exit(u8),
}

#[derive(Clone, Debug)]
pub struct ViewerConfiguration {
    pub title: String,
    pub width: f32,
    pub height: f32,
    pub clear_color: [f32; 3],
    /// Margin around the mesh, as a ratio of its extent
    pub margin: f32,
}
impl Default for ViewerConfiguration {
    fn default() -> Self {
        Self {
            title: "Delaunay sample".to_string(),
            width: 800.,
            height: 600.,
            clear_color: [0.2, 0.3, 0.3],
            margin: 0.1,
        }
    }
}

/// Builds a [PrimitiveTopology::LineList] mesh with every unique edge of `mesh`, colored by its vertices colors.
pub fn wireframe_mesh(mesh: &SurfaceMeshData) -> Mesh {
    let edges = mesh.unique_edges();
    let mut positions = Vec::with_capacity(2 * edges.len());
    let mut colors = Vec::with_capacity(2 * edges.len());
    for edge in edges {
        for vertex_id in [edge.from, edge.to] {
            let vertex = mesh.vertices()[vertex_id as usize];
            positions.push(vertex.position());
            let [r, g, b] = vertex.color();
            colors.push([r, g, b, 1.]);
        }
    }

    Mesh::new(
        // Every pair of positions is a start and end point
        PrimitiveTopology::LineList,
        RenderAssetUsages::RENDER_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
    .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
}

/// Largest absolute x or y coordinate of the mesh vertices
fn mesh_extent(mesh: &SurfaceMeshData) -> f32 {
    mesh.vertices()
        .iter()
        .map(|v| v.x.abs().max(v.y.abs()))
        .fold(0., f32::max)
}

#[derive(Resource)]
struct DisplayedMesh {
    lines: Mesh,
    view_height: f32,
}

/// Opens a window rendering `mesh` as a wireframe, seen from above. Blocks until the window is closed.
///
/// The windowing event loop can only be created once per process, and on some platforms only from the main thread.
pub fn show_mesh(mesh: &SurfaceMeshData, config: ViewerConfiguration) -> Result<(), ViewerError> {
    if mesh.triangle_count() == 0 {
        return Err(ViewerError::EmptyMesh);
    }

    let extent = mesh_extent(mesh).max(f32::EPSILON);
    let displayed_mesh = DisplayedMesh {
        lines: wireframe_mesh(mesh),
        view_height: 2. * extent * (1. + config.margin),
    };
    let [r, g, b] = config.clear_color;

    info!(
        "Displaying {} triangles, close the window to continue",
        mesh.triangle_count()
    );

    let exit = App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: config.title,
                        resolution: WindowResolution::new(config.width, config.height),
                        ..default()
                    }),
                    ..default()
                })
                // The host process owns the log subscriber
                .disable::<LogPlugin>(),
        )
        .insert_resource(ClearColor(Color::srgb(r, g, b)))
        .insert_resource(displayed_mesh)
        .add_systems(Startup, setup_scene)
        .run();

    debug!("Viewer exited: {:?}", exit);
    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => Err(ViewerError::Exit(code.get())),
    }
}

fn setup_scene(
    mut commands: Commands,
    displayed_mesh: Res<DisplayedMesh>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn(Camera3dBundle {
        projection: Projection::Orthographic(OrthographicProjection {
            scaling_mode: ScalingMode::FixedVertical(displayed_mesh.view_height),
            ..default()
        }),
        transform: Transform::from_translation(Vec3::new(0., 0., 10.))
            .looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });

    commands.spawn(PbrBundle {
        mesh: meshes.add(displayed_mesh.lines.clone()),
        material: materials.add(StandardMaterial {
            base_color: Color::WHITE,
            unlit: true,
            ..default()
        }),
        ..default()
    });
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
