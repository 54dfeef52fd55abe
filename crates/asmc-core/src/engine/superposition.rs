use super::error::EngineError;
use crate::core::models::structure::Structure;
use crate::core::utils::geometry::{calculate_rmsd, centroid};
use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

/// Minimum number of point pairs for a well-defined rotation.
pub const MIN_SUPERPOSITION_POINTS: usize = 3;

/// A proper rotation followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    #[inline]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation.transform_point(point) + self.translation
    }

    /// Returns a copy of `structure` with every atom transformed.
    pub fn apply_to_structure(&self, structure: &Structure) -> Structure {
        structure.map_coordinates(|p| self.apply(p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Superposition {
    /// Maps mobile coordinates onto the reference frame.
    pub transform: RigidTransform,
    pub rmsd: f64,
    pub n_points: usize,
}

/// Least-squares rigid fit of `mobile` onto `reference` (Kabsch).
///
/// Point `i` of `mobile` is paired with point `i` of `reference`. The
/// rotation comes from the SVD of the cross-covariance matrix, with the sign
/// of the weakest singular direction flipped when needed so the result is
/// never a reflection.
pub fn superimpose(
    reference: &[Point3<f64>],
    mobile: &[Point3<f64>],
) -> Result<Superposition, EngineError> {
    if reference.len() != mobile.len() {
        return Err(EngineError::PointCountMismatch {
            reference: reference.len(),
            mobile: mobile.len(),
        });
    }
    if reference.len() < MIN_SUPERPOSITION_POINTS {
        return Err(EngineError::InsufficientPoints {
            found: reference.len(),
            required: MIN_SUPERPOSITION_POINTS,
        });
    }
    if reference
        .iter()
        .chain(mobile.iter())
        .any(|p| !p.coords.iter().all(|c| c.is_finite()))
    {
        return Err(EngineError::DegenerateGeometry(
            "coordinates must be finite".to_string(),
        ));
    }

    let to_centroid = centroid(reference).unwrap_or_else(Point3::origin);
    let from_centroid = centroid(mobile).unwrap_or_else(Point3::origin);

    let h = mobile
        .iter()
        .zip(reference.iter())
        .fold(Matrix3::zeros(), |acc, (f, t)| {
            acc + (t - to_centroid) * (f - from_centroid).transpose()
        });

    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(EngineError::DegenerateGeometry(
            "singular value decomposition did not converge".to_string(),
        ));
    };

    let mut correction = Matrix3::identity();
    if (u * v_t).determinant() < 0.0 {
        let weakest = svd
            .singular_values
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(2);
        correction[(weakest, weakest)] = -1.0;
    }

    let rotation = Rotation3::from_matrix_unchecked(u * correction * v_t);
    let translation = to_centroid.coords - rotation * from_centroid.coords;
    let transform = RigidTransform {
        rotation,
        translation,
    };

    let moved: Vec<Point3<f64>> = mobile.iter().map(|p| transform.apply(p)).collect();
    let rmsd = calculate_rmsd(reference, &moved).unwrap_or_default();

    Ok(Superposition {
        transform,
        rmsd,
        n_points: reference.len(),
    })
}
