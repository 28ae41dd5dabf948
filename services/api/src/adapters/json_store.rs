//! services/api/src/adapters/json_store.rs
//!
//! This module contains the flat-file store, the concrete implementation of the
//! `ReportRepository` port from `incident_core`. Each collection is one JSON
//! array on disk.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use incident_core::domain::{Entry, GeoPoint, Incident, Report, User};
use incident_core::ports::{PortError, PortResult, ReportRepository};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// The three collections kept by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Reports,
    Incidents,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Users, Collection::Reports, Collection::Incidents];

    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Users => "users.json",
            Collection::Reports => "reports.json",
            Collection::Incidents => "incidents.json",
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A JSON file store that implements the `ReportRepository` port.
///
/// Every read-modify-write cycle runs under one process-wide lock and files are
/// replaced by rename, so readers never observe a half-written collection.
pub struct JsonStore {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    /// Creates a new `JsonStore` rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Creates the data directory and any missing collection file at startup.
    pub async fn init(&self) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        for collection in Collection::ALL {
            self.load_values(collection).await?;
        }
        Ok(())
    }

    pub fn path(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }

    /// Reads a collection. A missing file is created empty; one that is not a
    /// JSON array is reset to empty and its previous content discarded. Records
    /// that do not decode as `T` are skipped.
    pub async fn load<T: DeserializeOwned>(&self, collection: Collection) -> PortResult<Vec<T>> {
        let (records, _) = self.load_split(collection).await?;
        Ok(records)
    }

    /// Reads a collection, separating records that decode as `T` from the raw
    /// values of those that do not.
    async fn load_split<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> PortResult<(Vec<T>, Vec<Value>)> {
        let values = self.load_values(collection).await?;
        let mut records = Vec::with_capacity(values.len());
        let mut rejected = Vec::new();
        for value in values {
            match T::deserialize(&value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        "Skipping unreadable record in {}: {}",
                        collection.file_name(),
                        e
                    );
                    rejected.push(value);
                }
            }
        }
        Ok((records, rejected))
    }

    async fn load_values(&self, collection: Collection) -> PortResult<Vec<Value>> {
        let path = self.path(collection);
        match tokio::fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<Vec<Value>>(&raw) {
                Ok(values) => Ok(values),
                Err(e) => {
                    warn!(
                        "{} could not be parsed ({}); resetting it to an empty collection",
                        path.display(),
                        e
                    );
                    self.save::<Value>(collection, &[]).await?;
                    Ok(Vec::new())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Creating empty collection {}", path.display());
                self.save::<Value>(collection, &[]).await?;
                Ok(Vec::new())
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }

    /// Replaces a collection with `records`.
    pub async fn save<T: Serialize>(&self, collection: Collection, records: &[T]) -> PortResult<()> {
        let path = self.path(collection);
        let body = serde_json::to_vec_pretty(records)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode {}: {}", path.display(), e)))?;

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| io_error(&self.data_dir, e))?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, body)
            .await
            .map_err(|e| io_error(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| io_error(&path, e))?;
        Ok(())
    }

    /// Loads a collection, lets `f` change it, and saves it back.
    async fn modify<T, R, F>(&self, collection: Collection, f: F) -> PortResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> PortResult<R>,
    {
        let _guard = self.lock.lock().await;
        self.modify_locked(collection, f).await
    }

    /// `modify` for callers already holding the lock. Unreadable records are
    /// written back untouched after the decoded ones.
    async fn modify_locked<T, R, F>(&self, collection: Collection, f: F) -> PortResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> PortResult<R>,
    {
        let (mut records, rejected) = self.load_split::<T>(collection).await?;
        let result = f(&mut records)?;
        if rejected.is_empty() {
            self.save(collection, &records).await?;
        } else {
            let mut values = records
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<Value>, _>>()
                .map_err(|e| {
                    PortError::Unexpected(format!(
                        "Failed to encode {}: {}",
                        collection.file_name(),
                        e
                    ))
                })?;
            values.extend(rejected);
            self.save(collection, &values).await?;
        }
        Ok(result)
    }

    async fn read_all<T: DeserializeOwned>(&self, collection: Collection) -> PortResult<Vec<T>> {
        let _guard = self.lock.lock().await;
        self.load(collection).await
    }
}

fn io_error(path: &Path, e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("{}: {}", path.display(), e))
}

fn report_not_found(report_id: Uuid) -> PortError {
    PortError::NotFound(format!("Report {} not found", report_id))
}

//=========================================================================================
// Serialized Record Structs
//=========================================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct LocationRecord {
    lat: f64,
    lng: f64,
}

/// Non-finite or off-globe points are stored as `null`.
fn location_record(point: Option<GeoPoint>) -> Option<LocationRecord> {
    match point {
        Some(p) if p.is_valid() => Some(LocationRecord { lat: p.lat, lng: p.lng }),
        Some(p) => {
            warn!("Dropping invalid location ({}, {})", p.lat, p.lng);
            None
        }
        None => None,
    }
}

impl From<LocationRecord> for GeoPoint {
    fn from(r: LocationRecord) -> Self {
        GeoPoint::new(r.lat, r.lng)
    }
}

#[derive(Serialize, Deserialize)]
struct UserRecord {
    user_id: Uuid,
    #[serde(default)]
    profile_text: String,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            profile_text: self.profile_text,
            created_at: self.created_at,
        }
    }

    fn from_domain(user: User) -> Self {
        Self {
            user_id: user.user_id,
            profile_text: user.profile_text,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct EntryRecord {
    entry_id: Uuid,
    timestamp: DateTime<Utc>,
    image_filename: String,
    device_location: Option<LocationRecord>,
    photo_time: Option<String>,
    exif_location: Option<LocationRecord>,
    ai_description: String,
    #[serde(default)]
    user_description: String,
    ai_advice: String,
}

impl EntryRecord {
    fn to_domain(self) -> Entry {
        Entry {
            entry_id: self.entry_id,
            timestamp: self.timestamp,
            image_filename: self.image_filename,
            device_location: self.device_location.map(Into::into),
            photo_time: self.photo_time,
            exif_location: self.exif_location.map(Into::into),
            ai_description: self.ai_description,
            user_description: self.user_description,
            ai_advice: self.ai_advice,
        }
    }

    fn from_domain(entry: Entry) -> Self {
        Self {
            entry_id: entry.entry_id,
            timestamp: entry.timestamp,
            image_filename: entry.image_filename,
            device_location: location_record(entry.device_location),
            photo_time: entry.photo_time,
            exif_location: location_record(entry.exif_location),
            ai_description: entry.ai_description,
            user_description: entry.user_description,
            ai_advice: entry.ai_advice,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ReportRecord {
    report_id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    location: Option<LocationRecord>,
    #[serde(default)]
    entries: Vec<EntryRecord>,
    #[serde(default)]
    confirmed: bool,
}

impl ReportRecord {
    fn to_domain(self) -> Report {
        Report {
            report_id: self.report_id,
            user_id: self.user_id,
            created_at: self.created_at,
            location: self.location.map(Into::into),
            entries: self.entries.into_iter().map(EntryRecord::to_domain).collect(),
            confirmed: self.confirmed,
        }
    }

    fn from_domain(report: Report) -> Self {
        Self {
            report_id: report.report_id,
            user_id: report.user_id,
            created_at: report.created_at,
            location: location_record(report.location),
            entries: report.entries.into_iter().map(EntryRecord::from_domain).collect(),
            confirmed: report.confirmed,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct IncidentRecord {
    incident_id: Uuid,
    created_at: DateTime<Utc>,
    #[serde(default)]
    reports: Vec<Uuid>,
}

impl IncidentRecord {
    fn to_domain(self) -> Incident {
        Incident {
            incident_id: self.incident_id,
            created_at: self.created_at,
            reports: self.reports,
        }
    }

    fn from_domain(incident: Incident) -> Self {
        Self {
            incident_id: incident.incident_id,
            created_at: incident.created_at,
            reports: incident.reports,
        }
    }
}

//=========================================================================================
// `ReportRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl ReportRepository for JsonStore {
    async fn get_user(&self, user_id: Uuid) -> PortResult<Option<User>> {
        let users = self.read_all::<UserRecord>(Collection::Users).await?;
        Ok(users
            .into_iter()
            .find(|u| u.user_id == user_id)
            .map(UserRecord::to_domain))
    }

    async fn upsert_user(&self, user: User) -> PortResult<()> {
        self.modify(Collection::Users, move |users: &mut Vec<UserRecord>| {
            let record = UserRecord::from_domain(user);
            match users.iter_mut().find(|u| u.user_id == record.user_id) {
                Some(existing) => *existing = record,
                None => users.push(record),
            }
            Ok(())
        })
        .await
    }

    async fn insert_report(&self, report: Report, incident: Incident) -> PortResult<()> {
        let _guard = self.lock.lock().await;

        self.modify_locked(Collection::Reports, |reports: &mut Vec<ReportRecord>| {
            reports.push(ReportRecord::from_domain(report));
            Ok(())
        })
        .await?;
        self.modify_locked(Collection::Incidents, |incidents: &mut Vec<IncidentRecord>| {
            incidents.push(IncidentRecord::from_domain(incident));
            Ok(())
        })
        .await
    }

    async fn get_report(&self, report_id: Uuid) -> PortResult<Report> {
        let reports = self.read_all::<ReportRecord>(Collection::Reports).await?;
        reports
            .into_iter()
            .find(|r| r.report_id == report_id)
            .map(ReportRecord::to_domain)
            .ok_or_else(|| report_not_found(report_id))
    }

    async fn list_reports(&self) -> PortResult<Vec<Report>> {
        let reports = self.read_all::<ReportRecord>(Collection::Reports).await?;
        Ok(reports.into_iter().map(ReportRecord::to_domain).collect())
    }

    async fn list_reports_for_user(&self, user_id: Uuid) -> PortResult<Vec<Report>> {
        let reports = self.read_all::<ReportRecord>(Collection::Reports).await?;
        Ok(reports
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .map(ReportRecord::to_domain)
            .collect())
    }

    async fn append_entry(&self, report_id: Uuid, entry: Entry) -> PortResult<()> {
        self.modify(Collection::Reports, move |reports: &mut Vec<ReportRecord>| {
            let report = reports
                .iter_mut()
                .find(|r| r.report_id == report_id)
                .ok_or_else(|| report_not_found(report_id))?;
            report.entries.push(EntryRecord::from_domain(entry));
            Ok(())
        })
        .await
    }

    async fn update_entry_description(
        &self,
        report_id: Uuid,
        entry_id: Uuid,
        user_description: &str,
    ) -> PortResult<()> {
        self.modify(Collection::Reports, |reports: &mut Vec<ReportRecord>| {
            let report = reports
                .iter_mut()
                .find(|r| r.report_id == report_id)
                .ok_or_else(|| report_not_found(report_id))?;
            match report.entries.iter_mut().find(|e| e.entry_id == entry_id) {
                Some(entry) => entry.user_description = user_description.to_string(),
                None => debug!("Entry {} not in report {}; nothing to update", entry_id, report_id),
            }
            Ok(())
        })
        .await
    }

    async fn set_report_confirmed(&self, report_id: Uuid, confirmed: bool) -> PortResult<()> {
        self.modify(Collection::Reports, |reports: &mut Vec<ReportRecord>| {
            let report = reports
                .iter_mut()
                .find(|r| r.report_id == report_id)
                .ok_or_else(|| report_not_found(report_id))?;
            report.confirmed = confirmed;
            Ok(())
        })
        .await
    }

    async fn list_incidents(&self) -> PortResult<Vec<Incident>> {
        let incidents = self.read_all::<IncidentRecord>(Collection::Incidents).await?;
        Ok(incidents.into_iter().map(IncidentRecord::to_domain).collect())
    }
}
