//! Normalized coordinate cache keys

use super::error::GeocodeError;
use std::fmt;

/// Default rounding precision in decimal places (~1.1 m at the equator)
pub const DEFAULT_PRECISION: u32 = 5;

/// Largest supported precision; keeps scaled coordinates well inside `i64`
pub const MAX_PRECISION: u32 = 9;

const LAT_RANGE: f64 = 90.0;
const LNG_RANGE: f64 = 180.0;

/// A (latitude, longitude) pair rounded to a fixed number of decimal places.
///
/// Coordinates are stored as scaled integers so that equality and hashing
/// are exact: two inputs that round to the same units are the same location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    lat_units: i64,
    lng_units: i64,
    precision: u32,
}

impl CoordinateKey {
    /// Build a key at [`DEFAULT_PRECISION`]
    pub fn new(
        lat: impl Into<Option<f64>>,
        lng: impl Into<Option<f64>>,
    ) -> Result<Self, GeocodeError> {
        Self::with_precision(lat, lng, DEFAULT_PRECISION)
    }

    /// Build a key rounded to `precision` decimal places.
    ///
    /// Fails with `InvalidCoordinate` when either component is missing,
    /// non-finite or out of range, or when `precision` exceeds [`MAX_PRECISION`].
    pub fn with_precision(
        lat: impl Into<Option<f64>>,
        lng: impl Into<Option<f64>>,
        precision: u32,
    ) -> Result<Self, GeocodeError> {
        if precision > MAX_PRECISION {
            return Err(GeocodeError::invalid(format!(
                "precision {} exceeds maximum of {}",
                precision, MAX_PRECISION
            )));
        }

        let lat = check_component("latitude", lat.into(), LAT_RANGE)?;
        let lng = check_component("longitude", lng.into(), LNG_RANGE)?;
        let scale = scale(precision);

        Ok(Self {
            lat_units: (lat * scale).round() as i64,
            lng_units: (lng * scale).round() as i64,
            precision,
        })
    }

    /// Rounded latitude in degrees
    pub fn lat(&self) -> f64 {
        self.lat_units as f64 / scale(self.precision)
    }

    /// Rounded longitude in degrees
    pub fn lng(&self) -> f64 {
        self.lng_units as f64 / scale(self.precision)
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }
}

impl fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.precision as usize;
        write!(f, "{:.*},{:.*}", p, self.lat(), p, self.lng())
    }
}

fn check_component(name: &str, value: Option<f64>, range: f64) -> Result<f64, GeocodeError> {
    let value = value.ok_or_else(|| GeocodeError::invalid(format!("{} is missing", name)))?;
    if !value.is_finite() {
        return Err(GeocodeError::invalid(format!(
            "{} is not a finite number",
            name
        )));
    }
    if !(-range..=range).contains(&value) {
        return Err(GeocodeError::invalid(format!(
            "{} {} is outside [-{}, {}]",
            name, value, range, range
        )));
    }
    Ok(value)
}

fn scale(precision: u32) -> f64 {
    10f64.powi(precision as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn noise_below_precision_shares_key() {
        let a = CoordinateKey::new(37.774900, -122.419400).unwrap();
        let b = CoordinateKey::new(37.774901, -122.419401).unwrap();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn difference_at_precision_splits_key() {
        let a = CoordinateKey::new(37.77490, -122.41940).unwrap();
        let b = CoordinateKey::new(37.77491, -122.41940).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn missing_component_is_invalid() {
        let err = CoordinateKey::new(None, 5.0).unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidCoordinate { .. }));
        assert!(err.to_string().contains("latitude is missing"));

        assert!(CoordinateKey::new(5.0, None).is_err());
    }

    #[test]
    fn non_finite_is_invalid() {
        assert!(CoordinateKey::new(f64::NAN, 0.0).is_err());
        assert!(CoordinateKey::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn range_bounds() {
        assert!(CoordinateKey::new(90.0, 180.0).is_ok());
        assert!(CoordinateKey::new(-90.0, -180.0).is_ok());
        assert!(CoordinateKey::new(90.000001, 0.0).is_err());
        assert!(CoordinateKey::new(0.0, -180.5).is_err());
    }

    #[test]
    fn zero_is_a_valid_coordinate() {
        let key = CoordinateKey::new(0.0, 0.0).unwrap();
        assert_eq!(key.lat(), 0.0);
        assert_eq!(key, CoordinateKey::new(-0.0, 0.0).unwrap());
    }

    #[test]
    fn precision_is_configurable() {
        let coarse_a = CoordinateKey::with_precision(37.7749, -122.4194, 2).unwrap();
        let coarse_b = CoordinateKey::with_precision(37.7712, -122.4151, 2).unwrap();
        assert_eq!(coarse_a, coarse_b);
        assert_eq!(coarse_a.to_string(), "37.77,-122.42");

        assert!(CoordinateKey::with_precision(1.0, 1.0, MAX_PRECISION + 1).is_err());
    }

    #[test]
    fn display_uses_rounded_values() {
        let key = CoordinateKey::new(37.7749012, -122.4194).unwrap();
        assert_eq!(key.to_string(), "37.77490,-122.41940");
    }
}
