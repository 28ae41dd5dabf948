//! crates/incident_core/src/geo.rs
//!
//! Conversion of EXIF degree/minute/second triples into decimal degrees.

use crate::domain::GeoPoint;

/// Divisors applied to the degree, minute and second components.
pub const DMS_DIVISION: [f64; 3] = [1.0, 60.0, 3600.0];

/// One component of a DMS triple, as stored in an EXIF GPS tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DmsComponent {
    Number(f64),
    Ratio { numerator: i64, denominator: i64 },
}

impl DmsComponent {
    /// A rational with a zero denominator counts as zero.
    pub fn value(self) -> f64 {
        match self {
            DmsComponent::Number(x) => x,
            DmsComponent::Ratio { denominator: 0, .. } => 0.0,
            DmsComponent::Ratio {
                numerator,
                denominator,
            } => numerator as f64 / denominator as f64,
        }
    }
}

/// Converts a DMS triple to decimal degrees, negating it unless the
/// hemisphere reference equals `positive_ref`.
pub fn dms_to_decimal(dms: [DmsComponent; 3], reference: &str, positive_ref: &str) -> f64 {
    let magnitude: f64 = dms
        .iter()
        .zip(DMS_DIVISION.iter())
        .map(|(component, div)| component.value() / div)
        .sum();
    if reference.trim() == positive_ref {
        magnitude
    } else {
        -magnitude
    }
}

pub fn latitude(dms: [DmsComponent; 3], reference: &str) -> f64 {
    dms_to_decimal(dms, reference, "N")
}

pub fn longitude(dms: [DmsComponent; 3], reference: &str) -> f64 {
    dms_to_decimal(dms, reference, "E")
}

/// The raw GPS sub-tags of an image.
#[derive(Debug, Clone, Default)]
pub struct GpsTags {
    pub latitude: Option<[DmsComponent; 3]>,
    pub latitude_ref: Option<String>,
    pub longitude: Option<[DmsComponent; 3]>,
    pub longitude_ref: Option<String>,
}

impl GpsTags {
    /// Resolves a position only when all four sub-tags are present and the
    /// result is a finite point on the globe.
    pub fn to_point(&self) -> Option<GeoPoint> {
        match (
            self.latitude,
            self.latitude_ref.as_deref(),
            self.longitude,
            self.longitude_ref.as_deref(),
        ) {
            (Some(lat), Some(lat_ref), Some(lng), Some(lng_ref)) => {
                GeoPoint::checked(latitude(lat, lat_ref), longitude(lng, lng_ref))
            }
            _ => None,
        }
    }
}
