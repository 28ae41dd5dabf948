//! crates/incident_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or serialization format.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Marker used in prompts when an image carried no readable EXIF data.
pub const NO_METADATA_MARKER: &str = "No EXIF metadata available.";

pub const LAT_MAX_POS: f64 = 90.0;
pub const LNG_MAX_POS: f64 = 180.0;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a point only when both coordinates are finite and on the globe.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let point = Self::new(lat, lng);
        point.is_valid().then_some(point)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= LAT_MAX_POS
            && self.lng.abs() <= LNG_MAX_POS
    }

    /// Builds a point only when both coordinates are known and valid.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Self::checked(lat, lng),
            _ => None,
        }
    }
}

/// Picks a report location: the device fix wins over the photo's EXIF position.
pub fn resolve_location(device: Option<GeoPoint>, exif: Option<GeoPoint>) -> Option<GeoPoint> {
    device.or(exif)
}

// Represents a visitor identified by their cookie token.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: Uuid,
    pub profile_text: String,
    pub created_at: DateTime<Utc>,
}

/// One photo submission inside a report, enriched by the AI.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub entry_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub image_filename: String,
    pub device_location: Option<GeoPoint>,
    pub photo_time: Option<String>,
    pub exif_location: Option<GeoPoint>,
    pub ai_description: String,
    pub user_description: String,
    pub ai_advice: String,
}

impl Entry {
    pub fn resolved_location(&self) -> Option<GeoPoint> {
        resolve_location(self.device_location, self.exif_location)
    }
}

/// A user's report: an append-only list of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub report_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Fixed from the first entry at creation time.
    pub location: Option<GeoPoint>,
    pub entries: Vec<Entry>,
    pub confirmed: bool,
}

impl Report {
    /// Opens a new report around its first entry.
    pub fn open(user_id: Uuid, first_entry: Entry) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            user_id,
            created_at: first_entry.timestamp,
            location: first_entry.resolved_location(),
            entries: vec![first_entry],
            confirmed: false,
        }
    }

    pub fn latest_entry(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn entry_mut(&mut self, entry_id: Uuid) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.entry_id == entry_id)
    }
}

/// A group of reports describing the same event.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub incident_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub reports: Vec<Uuid>,
}

impl Incident {
    pub fn for_report(report: &Report) -> Self {
        Self {
            incident_id: Uuid::new_v4(),
            created_at: report.created_at,
            reports: vec![report.report_id],
        }
    }
}

/// EXIF data read from a stored image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMetadata {
    /// Tag name to displayed value.
    pub tags: BTreeMap<String, String>,
    pub photo_time: Option<String>,
    pub location: Option<GeoPoint>,
}

impl ImageMetadata {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.photo_time.is_none() && self.location.is_none()
    }

    /// Renders the metadata as the text block handed to the description prompt.
    pub fn describe(&self) -> String {
        if self.is_empty() {
            return NO_METADATA_MARKER.to_string();
        }
        let mut lines: Vec<String> = self
            .tags
            .iter()
            .map(|(tag, value)| format!("{}: {}", tag, value))
            .collect();
        if let Some(photo_time) = &self.photo_time {
            lines.push(format!("photo_time: {}", photo_time));
        }
        if let Some(point) = self.location {
            lines.push(format!("exif_lat: {}", point.lat));
            lines.push(format!("exif_lng: {}", point.lng));
        }
        lines.join("\n")
    }
}

/// An uploaded image as received from the browser.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub original_name: String,
    pub bytes: Bytes,
}

/// The latest state of one report as shown on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub report_id: Uuid,
    pub location: Option<GeoPoint>,
    pub ai_description: String,
    pub ai_advice: String,
    pub image_filename: String,
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncidentSummary {
    pub incident_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub reports: Vec<ReportSummary>,
}

/// Joins incidents with their reports, summarizing each report by its latest entry.
///
/// Dangling report ids and reports without entries are skipped.
pub fn summarize_incidents(incidents: &[Incident], reports: &[Report]) -> Vec<IncidentSummary> {
    incidents
        .iter()
        .map(|incident| IncidentSummary {
            incident_id: incident.incident_id,
            created_at: incident.created_at,
            reports: incident
                .reports
                .iter()
                .filter_map(|id| reports.iter().find(|r| r.report_id == *id))
                .filter_map(|report| {
                    let latest = report.latest_entry()?;
                    Some(ReportSummary {
                        report_id: report.report_id,
                        location: report.location,
                        ai_description: latest.ai_description.clone(),
                        ai_advice: latest.ai_advice.clone(),
                        image_filename: latest.image_filename.clone(),
                        confirmed: report.confirmed,
                    })
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(device: Option<GeoPoint>, exif: Option<GeoPoint>, description: &str) -> Entry {
        Entry {
            entry_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            image_filename: format!("{}.jpg", Uuid::new_v4()),
            device_location: device,
            photo_time: None,
            exif_location: exif,
            ai_description: description.to_string(),
            user_description: String::new(),
            ai_advice: format!("advice for {}", description),
        }
    }

    #[test]
    fn device_location_takes_precedence() {
        let device = GeoPoint::new(52.1, 21.0);
        let exif = GeoPoint::new(50.0, 19.9);
        assert_eq!(resolve_location(Some(device), Some(exif)), Some(device));
        assert_eq!(resolve_location(None, Some(exif)), Some(exif));
        assert_eq!(resolve_location(None, None), None);
    }

    #[test]
    fn from_parts_needs_both_coordinates() {
        assert_eq!(GeoPoint::from_parts(Some(1.0), None), None);
        assert_eq!(GeoPoint::from_parts(None, Some(1.0)), None);
        assert_eq!(
            GeoPoint::from_parts(Some(1.0), Some(2.0)),
            Some(GeoPoint::new(1.0, 2.0))
        );
    }

    #[test]
    fn off_globe_coordinates_are_rejected() {
        assert_eq!(GeoPoint::checked(f64::NAN, 19.9), None);
        assert_eq!(GeoPoint::checked(50.0, f64::INFINITY), None);
        assert_eq!(GeoPoint::checked(90.5, 0.0), None);
        assert_eq!(GeoPoint::checked(0.0, -180.1), None);
        assert!(GeoPoint::checked(-90.0, 180.0).is_some());
        assert_eq!(GeoPoint::from_parts(Some(1000.0), Some(2.0)), None);
    }

    #[test]
    fn report_location_is_fixed_by_first_entry() {
        let first = entry(None, Some(GeoPoint::new(50.0, 19.9)), "first");
        let mut report = Report::open(Uuid::new_v4(), first);
        report
            .entries
            .push(entry(Some(GeoPoint::new(1.0, 1.0)), None, "second"));

        assert_eq!(report.location, Some(GeoPoint::new(50.0, 19.9)));
        assert!(!report.confirmed);
        assert_eq!(report.latest_entry().unwrap().ai_description, "second");
    }

    #[test]
    fn empty_metadata_renders_marker() {
        assert_eq!(ImageMetadata::default().describe(), NO_METADATA_MARKER);

        let mut metadata = ImageMetadata::default();
        metadata.tags.insert("Make".to_string(), "Canon".to_string());
        metadata.location = Some(GeoPoint::new(50.0, 19.9));
        let block = metadata.describe();
        assert!(block.contains("Make: Canon"));
        assert!(block.contains("exif_lat: 50"));
        assert!(block.contains("exif_lng: 19.9"));
    }

    #[test]
    fn summaries_use_latest_entry_and_skip_missing_reports() {
        let mut report = Report::open(Uuid::new_v4(), entry(None, None, "old"));
        report.entries.push(entry(None, None, "new"));
        let mut empty = Report::open(Uuid::new_v4(), entry(None, None, "gone"));
        empty.entries.clear();

        let mut incident = Incident::for_report(&report);
        incident.reports.push(empty.report_id);
        incident.reports.push(Uuid::new_v4());

        let summaries = summarize_incidents(&[incident], &[report.clone(), empty]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].reports.len(), 1);
        let summary = &summaries[0].reports[0];
        assert_eq!(summary.report_id, report.report_id);
        assert_eq!(summary.ai_description, "new");
        assert_eq!(summary.ai_advice, "advice for new");
    }
}
