//! Construction-time errors.
//!
//! Everything here is raised before a single ray is traced. Degenerate
//! geometry met while tracing (parallel rays, tangent hits, grid misses) is
//! never an error; it is reported as "no intersection".

use lumen_math::MathError;
use thiserror::Error;

/// Errors that can occur while building geometry, samplers, cameras or renderers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error("{what} must be positive, got {value}")]
    NonPositive { what: &'static str, value: f64 },

    #[error("Camera basis vectors are not orthogonal")]
    NonOrthogonalBasis,

    #[error("Polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("Polygon vertices are not coplanar")]
    NonCoplanar,

    #[error("Polygon vertices are not convex")]
    NonConvex,

    #[error("Expected {expected} vertex normals, got {found}")]
    NormalCountMismatch { expected: usize, found: usize },

    #[error("Missing required configuration: {0}")]
    MissingField(&'static str),

    #[error("Invalid sampler configuration: {0}")]
    InvalidSampler(&'static str),

    #[error("Invalid resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
}

/// Result type for construction operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Reject zero, negative and NaN dimensions.
pub(crate) fn ensure_positive(what: &'static str, value: f64) -> RenderResult<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(RenderError::NonPositive { what, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_positive() {
        assert_eq!(ensure_positive("radius", 2.0), Ok(2.0));
        assert_eq!(
            ensure_positive("radius", 0.0),
            Err(RenderError::NonPositive { what: "radius", value: 0.0 })
        );
        assert!(ensure_positive("height", f64::NAN).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err: RenderError = MathError::DegenerateVector.into();
        assert_eq!(err.to_string(), "Math error: Degenerate vector: length is zero");
        assert_eq!(
            RenderError::MissingField("position").to_string(),
            "Missing required configuration: position"
        );
    }
}
