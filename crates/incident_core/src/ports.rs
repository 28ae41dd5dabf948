//! crates/incident_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like file storage or APIs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::domain::{Entry, ImageMetadata, Incident, Report, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., filesystem, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ReportRepository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, user_id: Uuid) -> PortResult<Option<User>>;

    /// Inserts the user, or replaces the record with the same `user_id`.
    async fn upsert_user(&self, user: User) -> PortResult<()>;

    // --- Reports ---
    /// Stores a new report together with the incident that references it.
    async fn insert_report(&self, report: Report, incident: Incident) -> PortResult<()>;

    async fn get_report(&self, report_id: Uuid) -> PortResult<Report>;

    async fn list_reports(&self) -> PortResult<Vec<Report>>;

    async fn list_reports_for_user(&self, user_id: Uuid) -> PortResult<Vec<Report>>;

    async fn append_entry(&self, report_id: Uuid, entry: Entry) -> PortResult<()>;

    /// Overwrites an entry's user text. An unknown `entry_id` is ignored.
    async fn update_entry_description(
        &self,
        report_id: Uuid,
        entry_id: Uuid,
        user_description: &str,
    ) -> PortResult<()>;

    async fn set_report_confirmed(&self, report_id: Uuid, confirmed: bool) -> PortResult<()>;

    // --- Incidents ---
    async fn list_incidents(&self) -> PortResult<Vec<Incident>>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists the bytes under a freshly generated filename and returns that name.
    async fn store_image(&self, original_name: &str, bytes: &[u8]) -> PortResult<String>;

    fn image_path(&self, filename: &str) -> PathBuf;

    /// Deletes a stored image. Removing a missing file is not an error.
    async fn remove_image(&self, filename: &str) -> PortResult<()>;
}

#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Reads EXIF data. Unreadable files yield empty metadata.
    async fn extract(&self, path: &Path) -> ImageMetadata;
}

#[async_trait]
pub trait EnrichmentService: Send + Sync {
    /// Describes an image using a vision-capable model.
    async fn describe(&self, image: &[u8], image_name: &str, prompt: &str) -> PortResult<String>;

    /// Produces safety advice from a text-only prompt.
    async fn advise(&self, prompt: &str) -> PortResult<String>;
}

/// Values available to the image description prompt.
#[derive(Debug, Clone)]
pub struct DescriptionContext<'a> {
    pub image_filename: &'a str,
    pub metadata: &'a str,
    pub user_description: &'a str,
}

/// Values available to the advice prompt.
#[derive(Debug, Clone)]
pub struct AdviceContext<'a> {
    pub ai_description: &'a str,
    pub profile_text: &'a str,
    pub user_description: &'a str,
}

pub trait PromptRenderer: Send + Sync {
    fn description_prompt(&self, ctx: &DescriptionContext<'_>) -> String;
    fn advice_prompt(&self, ctx: &AdviceContext<'_>) -> String;
}
