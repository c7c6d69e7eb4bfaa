//! Construction-time validation errors.

use thiserror::Error;

/// Errors raised while building a simulation from its parameters.
///
/// Every model validates its input up front; nothing here is produced by
/// `advance`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
	#[error("{name} must be positive, got {value}")]
	NonPositive { name: &'static str, value: f64 },

	#[error("{name} must not be negative, got {value}")]
	Negative { name: &'static str, value: f64 },

	#[error("{name} must be finite")]
	NotFinite { name: &'static str },

	#[error("{name} must be within [{min}, {max}], got {value}")]
	OutOfRange {
		name: &'static str,
		value: f64,
		min: f64,
		max: f64,
	},

	#[error("invalid range for {name}: {min} > {max}")]
	InvalidRange { name: &'static str, min: f64, max: f64 },

	#[error("{name} must contain at least one element")]
	EmptyPopulation { name: &'static str },

	#[error("grid {width}x{height} is too small (need at least 3x3)")]
	GridTooSmall { width: usize, height: usize },

	#[error("constraint references particle {index} but only {len} exist")]
	ConstraintIndex { index: usize, len: usize },
}

pub type SimResult<T> = std::result::Result<T, SimError>;

pub(crate) fn positive(name: &'static str, value: f64) -> SimResult<()> {
	if !value.is_finite() {
		return Err(SimError::NotFinite { name });
	}
	if value <= 0.0 {
		return Err(SimError::NonPositive { name, value });
	}
	Ok(())
}

pub(crate) fn non_negative(name: &'static str, value: f64) -> SimResult<()> {
	if !value.is_finite() {
		return Err(SimError::NotFinite { name });
	}
	if value < 0.0 {
		return Err(SimError::Negative { name, value });
	}
	Ok(())
}

pub(crate) fn in_range(
	name: &'static str,
	value: f64,
	min: f64,
	max: f64,
) -> SimResult<()> {
	if !value.is_finite() {
		return Err(SimError::NotFinite { name });
	}
	if value < min || value > max {
		return Err(SimError::OutOfRange {
			name,
			value,
			min,
			max,
		});
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_error_display() {
		let err = SimError::NonPositive {
			name: "length",
			value: -1.0,
		};
		assert_eq!(format!("{err}"), "length must be positive, got -1");
		let err = SimError::GridTooSmall {
			width: 2,
			height: 8,
		};
		assert!(format!("{err}").contains("2x8"));
	}

	#[test]
	fn test_validators() {
		assert!(positive("mass", 1.0).is_ok());
		assert_eq!(
			positive("mass", 0.0),
			Err(SimError::NonPositive {
				name: "mass",
				value: 0.0
			})
		);
		assert_eq!(
			positive("mass", f64::NAN),
			Err(SimError::NotFinite { name: "mass" })
		);
		assert!(non_negative("drag", 0.0).is_ok());
		assert!(non_negative("drag", -0.1).is_err());
		assert!(in_range("stiffness", 1.0, 0.0, 1.0).is_ok());
		assert!(in_range("stiffness", 1.5, 0.0, 1.0).is_err());
	}
}
