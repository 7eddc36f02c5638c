use std::f32::consts::TAU;

use thiserror::Error;
use tracing::debug;

use crate::types::{Point3D, TriangleId};

#[cfg(feature = "profile_traces")]
use tracing::{span, Level};

/// Number of points on the first ring. Ring `k` holds `k` times as many.
pub const FIRST_RING_POINTS_COUNT: u32 = 6;

/// Largest number of sample points. Their triangulation creates about twice as many triangles,
/// whose ids must stay below [TriangleId::MAX].
pub const MAX_SAMPLE_POINTS_COUNT: usize = (TriangleId::MAX / 2) as usize - 2;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplingError {
    #[error("sampling radius must be finite and strictly positive, got {0}")]
    InvalidRadius(f32),
    #[error("sampling density must be at least 1")]
    InvalidDensity,
    #[error("sampling density {0} gives more than {max} points", max = MAX_SAMPLE_POINTS_COUNT)]
    DensityTooLarge(u32),
    #[error("failed to allocate {0} sample points")]
    OutOfMemory(usize),
}

#[derive(Clone, Debug)]
pub struct SamplingConfiguration {
    /// Rotates odd rings by half an angular step, so that consecutive rings interleave instead of lining up radially.
    pub rotate_odd_rings: bool,
}
impl Default for SamplingConfiguration {
    fn default() -> Self {
        Self {
            rotate_odd_rings: true,
        }
    }
}

/// Number of points generated by [generate_sample_points] for a given `density`.
///
/// Returns [None] above [MAX_SAMPLE_POINTS_COUNT].
pub fn sample_points_count(density: u32) -> Option<usize> {
    let density = density as usize;
    density
        .checked_add(1)
        .and_then(|next| next.checked_mul(density))
        .and_then(|rings| rings.checked_mul(FIRST_RING_POINTS_COUNT as usize / 2))
        .and_then(|ring_points| ring_points.checked_add(1))
        .filter(|&count| count <= MAX_SAMPLE_POINTS_COUNT)
}

/// Samples a disc of `radius` centered on the origin, in the `z = 0` plane.
///
/// Generates the center point then `density` concentric rings, evenly spaced radially. Ring `k` (starting at 1)
/// has `6 * k` evenly spaced points, so that the point density stays roughly uniform over the disc.
pub fn generate_sample_points(radius: f32, density: u32) -> Result<Vec<Point3D>, SamplingError> {
    generate_sample_points_with_config(radius, density, &SamplingConfiguration::default())
}

pub fn generate_sample_points_with_config(
    radius: f32,
    density: u32,
    config: &SamplingConfiguration,
) -> Result<Vec<Point3D>, SamplingError> {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "generate_sample_points").entered();

    if !radius.is_finite() || radius <= 0. {
        return Err(SamplingError::InvalidRadius(radius));
    }
    if density == 0 {
        return Err(SamplingError::InvalidDensity);
    }
    let points_count =
        sample_points_count(density).ok_or(SamplingError::DensityTooLarge(density))?;

    let mut points = Vec::new();
    points
        .try_reserve_exact(points_count)
        .map_err(|_| SamplingError::OutOfMemory(points_count))?;
    points.push(Point3D::ZERO);

    for ring in 1..=density {
        let ring_radius = radius * ring as f32 / density as f32;
        let ring_points_count = FIRST_RING_POINTS_COUNT * ring;
        let angle_step = TAU / ring_points_count as f32;
        let angle_offset = if config.rotate_odd_rings && ring % 2 == 1 {
            angle_step / 2.
        } else {
            0.
        };

        for point_index in 0..ring_points_count {
            let angle = angle_offset + angle_step * point_index as f32;
            points.push(Point3D::new(
                ring_radius * angle.cos(),
                ring_radius * angle.sin(),
                0.,
            ));
        }
    }

    debug!(
        "Generated {} sample points, radius {}, density {}",
        points.len(),
        radius,
        density
    );
    Ok(points)
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
