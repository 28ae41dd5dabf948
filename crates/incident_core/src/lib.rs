pub mod domain;
pub mod enrichment;
pub mod geo;
pub mod ports;
pub mod reporting;

pub use domain::{
    Entry, GeoPoint, ImageMetadata, ImageUpload, Incident, IncidentSummary, Report,
    ReportSummary, User,
};
pub use enrichment::Enrichment;
pub use ports::{
    EnrichmentService, ImageStore, MetadataExtractor, PortError, PortResult, PromptRenderer,
    ReportRepository,
};
pub use reporting::{EntryOutcome, ReportingService};
