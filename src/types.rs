//! Common types and traits for box geometry.
//!
//! Items and container types both describe an axis-aligned cuboid with a
//! weight attached. This module holds the shared vocabulary for that: a small
//! `Vec3` for dimensions, the `Dimensional` trait and the numeric tolerance
//! used by every comparison in the engine.

/// Global numerical tolerance for floating-point comparisons.
///
/// Applied to dimension, volume and weight limits so that an item that fills a
/// container exactly is not rejected because of rounding.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Represents the three interior or exterior extents of a cuboid.
///
/// Axes are `x` = length, `y` = width, `z` = height. Items are never rotated,
/// so the axes of an item are always compared against the same axes of a
/// container.
///
/// # Examples
/// ```
/// use ecopack::types::Vec3;
///
/// let dims = Vec3::new(25.0, 18.0, 4.0);
/// assert_eq!(dims.volume(), 1800.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new dimension vector.
    ///
    /// # Parameters
    /// * `x` - Length
    /// * `y` - Width
    /// * `z` - Height
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates from tuple format.
    #[inline]
    pub const fn from_tuple(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }

    /// Calculates the volume (product of all components).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    ///
    /// No axis reordering takes place.
    ///
    /// # Parameters
    /// * `container` - The outer vector (e.g., container dimensions)
    /// * `tolerance` - Numerical tolerance for the comparison
    #[inline]
    pub fn fits_within(&self, container: &Self, tolerance: f64) -> bool {
        self.x <= container.x + tolerance
            && self.y <= container.y + tolerance
            && self.z <= container.z + tolerance
    }
}

/// Trait for objects with 3D dimensions.
pub trait Dimensional {
    /// Returns the dimensions of the object.
    fn dimensions(&self) -> Vec3;

    /// Checks if this object fits within the given extents on every axis.
    fn fits_in(&self, container_dims: &Vec3, tolerance: f64) -> bool {
        self.dimensions().fits_within(container_dims, tolerance)
    }
}

/// Validation functions shared by the model constructors.
pub mod validation {
    use crate::model::ValidationError;

    /// Validates a single dimension.
    ///
    /// # Parameters
    /// * `value` - The value to validate
    /// * `name` - Name of the dimension for error messages
    pub fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
        if value <= 0.0 || !value.is_finite() {
            return Err(ValidationError::InvalidDimension(format!(
                "{} must be positive and finite, got: {}",
                name, value
            )));
        }
        Ok(())
    }

    /// Validates a weight or weight limit.
    pub fn validate_weight(value: f64) -> Result<(), ValidationError> {
        if value <= 0.0 || !value.is_finite() {
            return Err(ValidationError::InvalidWeight(format!(
                "Weight must be positive and finite, got: {}",
                value
            )));
        }
        Ok(())
    }

    /// Validates all three dimensions of a cuboid.
    ///
    /// # Parameters
    /// * `dims` - The dimensions to validate (length, width, height)
    pub fn validate_dimensions_3d(dims: (f64, f64, f64)) -> Result<(), ValidationError> {
        validate_dimension(dims.0, "Length")?;
        validate_dimension(dims.1, "Width")?;
        validate_dimension(dims.2, "Height")?;
        Ok(())
    }

    /// Validates a carbon cost, which may be zero but never negative.
    pub fn validate_carbon(value: f64, name: &str) -> Result<(), ValidationError> {
        if value < 0.0 || !value.is_finite() {
            return Err(ValidationError::InvalidCarbonCost(format!(
                "{} must be non-negative and finite, got: {}",
                name, value
            )));
        }
        Ok(())
    }
}
