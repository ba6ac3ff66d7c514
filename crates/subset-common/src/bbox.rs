//! Geographic bounding box used to clip granule rows.

use serde::{Deserialize, Serialize};

use crate::error::{SubsetError, SubsetResult};

/// A geographic bounding box in degrees.
///
/// Ordered as (min-lon, min-lat, max-lon, max-lat), the same order used by
/// catalog searches. Containment is a closed interval on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Parse a "min_lon,min_lat,max_lon,max_lat" string.
    pub fn from_csv(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |part: &str| {
            part.parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))
        };

        Ok(Self {
            min_lon: parse(parts[0])?,
            min_lat: parse(parts[1])?,
            max_lon: parse(parts[2])?,
            max_lat: parse(parts[3])?,
        })
    }

    /// Check that the box is usable for clipping.
    ///
    /// All corners must be finite, min must not exceed max on either axis and
    /// latitudes must lie within [-90, 90].
    pub fn validate(&self) -> SubsetResult<()> {
        let corners = [self.min_lon, self.min_lat, self.max_lon, self.max_lat];
        if corners.iter().any(|v| !v.is_finite()) {
            return Err(SubsetError::Config(format!(
                "bounding box has non-finite corner: {}",
                self.to_csv()
            )));
        }
        if self.min_lon > self.max_lon || self.min_lat > self.max_lat {
            return Err(SubsetError::Config(format!(
                "bounding box min exceeds max: {}",
                self.to_csv()
            )));
        }
        if self.min_lat < -90.0 || self.max_lat > 90.0 {
            return Err(SubsetError::Config(format!(
                "bounding box latitude outside [-90, 90]: {}",
                self.to_csv()
            )));
        }
        Ok(())
    }

    /// Check if a point lies inside the box, edges included.
    ///
    /// NaN coordinates are never contained.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Render as "min_lon,min_lat,max_lon,max_lat" (catalog search format).
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

impl From<(f64, f64, f64, f64)> for BoundingBox {
    fn from((min_lon, min_lat, max_lon, max_lat): (f64, f64, f64, f64)) -> Self {
        Self::new(min_lon, min_lat, max_lon, max_lat)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bounding box format: {0}. Expected 'min_lon,min_lat,max_lon,max_lat'")]
    InvalidFormat(String),

    #[error("Invalid number in bounding box: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_bbox() {
        let bbox = BoundingBox::from_csv("-45.38452,62.63238,-44.61547,62.98197").unwrap();
        assert_eq!(bbox.min_lon, -45.38452);
        assert_eq!(bbox.min_lat, 62.63238);
        assert_eq!(bbox.max_lon, -44.61547);
        assert_eq!(bbox.max_lat, 62.98197);
    }

    #[test]
    fn test_contains_edges() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(bbox.contains_point(0.0, 0.0));
        assert!(bbox.contains_point(10.0, 10.0));
        assert!(bbox.contains_point(0.0, 10.0));
        assert!(!bbox.contains_point(10.000001, 5.0));
        assert!(!bbox.contains_point(f64::NAN, 5.0));
    }

    #[test]
    fn test_validate_rejects_inverted() {
        let bbox = BoundingBox::new(10.0, 0.0, 5.0, 10.0);
        assert!(matches!(bbox.validate(), Err(SubsetError::Config(_))));
    }
}
