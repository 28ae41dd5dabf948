//! crates/incident_core/src/reporting.rs
//!
//! The report workflow: creating reports and incidents, appending enriched
//! entries, and editing what users wrote about them.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    summarize_incidents, Entry, GeoPoint, ImageUpload, Incident, IncidentSummary, Report, User,
};
use crate::enrichment::{Enrichment, ADVICE_UNAVAILABLE, DESCRIPTION_UNAVAILABLE};
use crate::ports::{
    AdviceContext, DescriptionContext, EnrichmentService, ImageStore, MetadataExtractor,
    PortError, PortResult, PromptRenderer, ReportRepository,
};

/// What a submission produced, used to redirect with the fresh advice.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryOutcome {
    pub report_id: Uuid,
    pub entry_id: Uuid,
    pub ai_advice: String,
}

/// Orchestrates storage, metadata extraction and AI enrichment.
#[derive(Clone)]
pub struct ReportingService {
    repo: Arc<dyn ReportRepository>,
    images: Arc<dyn ImageStore>,
    metadata: Arc<dyn MetadataExtractor>,
    ai: Arc<dyn EnrichmentService>,
    prompts: Arc<dyn PromptRenderer>,
}

impl ReportingService {
    pub fn new(
        repo: Arc<dyn ReportRepository>,
        images: Arc<dyn ImageStore>,
        metadata: Arc<dyn MetadataExtractor>,
        ai: Arc<dyn EnrichmentService>,
        prompts: Arc<dyn PromptRenderer>,
    ) -> Self {
        Self {
            repo,
            images,
            metadata,
            ai,
            prompts,
        }
    }

    // --- Visitors ---

    /// Looks up the user behind a visitor token, if any.
    pub async fn visitor(&self, user_id: Option<Uuid>) -> PortResult<Option<User>> {
        match user_id {
            Some(id) => self.repo.get_user(id).await,
            None => Ok(None),
        }
    }

    /// Updates the profile of a known visitor, or creates a new user.
    pub async fn save_profile(&self, user_id: Option<Uuid>, profile_text: &str) -> PortResult<User> {
        let user = match self.visitor(user_id).await? {
            Some(mut user) => {
                user.profile_text = profile_text.to_string();
                user
            }
            None => User {
                user_id: Uuid::new_v4(),
                profile_text: profile_text.to_string(),
                created_at: Utc::now(),
            },
        };
        self.repo.upsert_user(user.clone()).await?;
        Ok(user)
    }

    // --- Reports ---

    pub async fn create_report(
        &self,
        user: &User,
        upload: Option<ImageUpload>,
        device_location: Option<GeoPoint>,
    ) -> PortResult<EntryOutcome> {
        let upload = upload.ok_or_else(|| PortError::InvalidInput("No file".to_string()))?;

        let entry = self
            .build_entry(upload, String::new(), device_location, &user.profile_text)
            .await?;
        let ai_advice = entry.ai_advice.clone();
        let entry_id = entry.entry_id;

        let image_filename = entry.image_filename.clone();

        let report = Report::open(user.user_id, entry);
        let incident = Incident::for_report(&report);
        let report_id = report.report_id;
        if let Err(e) = self.repo.insert_report(report, incident).await {
            self.discard_image(&image_filename).await;
            return Err(e);
        }

        info!("Created report {} for user {}", report_id, user.user_id);
        Ok(EntryOutcome {
            report_id,
            entry_id,
            ai_advice,
        })
    }

    /// Appends a new enriched entry. The report's location is left untouched.
    pub async fn add_entry(
        &self,
        report_id: Uuid,
        upload: Option<ImageUpload>,
        user_description: &str,
        device_location: Option<GeoPoint>,
    ) -> PortResult<EntryOutcome> {
        let report = self.repo.get_report(report_id).await?;
        let upload = upload.ok_or_else(|| PortError::InvalidInput("No file".to_string()))?;

        let profile_text = self
            .repo
            .get_user(report.user_id)
            .await?
            .map(|u| u.profile_text)
            .unwrap_or_default();

        let entry = self
            .build_entry(
                upload,
                user_description.to_string(),
                device_location,
                &profile_text,
            )
            .await?;
        let outcome = EntryOutcome {
            report_id,
            entry_id: entry.entry_id,
            ai_advice: entry.ai_advice.clone(),
        };
        let image_filename = entry.image_filename.clone();
        if let Err(e) = self.repo.append_entry(report_id, entry).await {
            self.discard_image(&image_filename).await;
            return Err(e);
        }

        info!("Added entry {} to report {}", outcome.entry_id, report_id);
        Ok(outcome)
    }

    pub async fn update_entry_description(
        &self,
        report_id: Uuid,
        entry_id: Uuid,
        user_description: &str,
    ) -> PortResult<()> {
        self.repo
            .update_entry_description(report_id, entry_id, user_description)
            .await
    }

    /// The only way to flip a report's `confirmed` flag.
    pub async fn set_confirmed(&self, report_id: Uuid, confirmed: bool) -> PortResult<()> {
        self.repo.set_report_confirmed(report_id, confirmed).await
    }

    pub async fn get_report(&self, report_id: Uuid) -> PortResult<Report> {
        self.repo.get_report(report_id).await
    }

    pub async fn reports_for_user(&self, user_id: Uuid) -> PortResult<Vec<Report>> {
        self.repo.list_reports_for_user(user_id).await
    }

    pub async fn incident_summaries(&self) -> PortResult<Vec<IncidentSummary>> {
        let incidents = self.repo.list_incidents().await?;
        let reports = self.repo.list_reports().await?;
        Ok(summarize_incidents(&incidents, &reports))
    }

    // --- Enrichment pipeline ---

    /// Removes a stored photo whose entry could not be saved.
    async fn discard_image(&self, filename: &str) {
        if let Err(e) = self.images.remove_image(filename).await {
            warn!("Could not remove orphaned image {}: {}", filename, e);
        }
    }

    async fn build_entry(
        &self,
        upload: ImageUpload,
        user_description: String,
        device_location: Option<GeoPoint>,
        profile_text: &str,
    ) -> PortResult<Entry> {
        let image_filename = self
            .images
            .store_image(&upload.original_name, &upload.bytes)
            .await?;
        let metadata = self
            .metadata
            .extract(&self.images.image_path(&image_filename))
            .await;
        let metadata_block = metadata.describe();

        let description_prompt = self.prompts.description_prompt(&DescriptionContext {
            image_filename: &image_filename,
            metadata: &metadata_block,
            user_description: &user_description,
        });
        let description = Enrichment::from_result(
            self.ai
                .describe(&upload.bytes, &image_filename, &description_prompt)
                .await,
            DESCRIPTION_UNAVAILABLE,
        );
        log_degraded("description", &description);

        let advice_prompt = self.prompts.advice_prompt(&AdviceContext {
            ai_description: description.text(),
            profile_text,
            user_description: &user_description,
        });
        let advice = Enrichment::from_result(self.ai.advise(&advice_prompt).await, ADVICE_UNAVAILABLE);
        log_degraded("advice", &advice);

        Ok(Entry {
            entry_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            image_filename,
            device_location,
            photo_time: metadata.photo_time,
            exif_location: metadata.location,
            ai_description: description.into_text(),
            user_description,
            ai_advice: advice.into_text(),
        })
    }
}

fn log_degraded(call: &str, outcome: &Enrichment) {
    if let Enrichment::Degraded { reason, .. } = outcome {
        warn!("AI {} unavailable: {}", call, reason);
    }
}
