//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the JSON API consumed by the map widget and
//! the master definition for the OpenAPI specification.

use crate::web::{handlers::port_error, state::AppState};
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use incident_core::domain::{GeoPoint, IncidentSummary, ReportSummary};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_incidents_handler,
    ),
    components(
        schemas(IncidentResponse, ReportSummaryResponse, LocationResponse)
    ),
    tags(
        (name = "Incident Reporter API", description = "Aggregated incidents for the map view.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationResponse {
    lat: f64,
    lng: f64,
}

impl From<GeoPoint> for LocationResponse {
    fn from(p: GeoPoint) -> Self {
        Self { lat: p.lat, lng: p.lng }
    }
}

/// A report as of its most recent entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportSummaryResponse {
    report_id: Uuid,
    location: Option<LocationResponse>,
    ai_description: String,
    ai_advice: String,
    image_url: String,
    confirmed: bool,
}

impl From<ReportSummary> for ReportSummaryResponse {
    fn from(s: ReportSummary) -> Self {
        Self {
            report_id: s.report_id,
            location: s.location.map(Into::into),
            ai_description: s.ai_description,
            ai_advice: s.ai_advice,
            image_url: format!("/uploads/{}", s.image_filename),
            confirmed: s.confirmed,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IncidentResponse {
    incident_id: Uuid,
    created_at: DateTime<Utc>,
    reports: Vec<ReportSummaryResponse>,
}

impl From<IncidentSummary> for IncidentResponse {
    fn from(s: IncidentSummary) -> Self {
        Self {
            incident_id: s.incident_id,
            created_at: s.created_at,
            reports: s.reports.into_iter().map(Into::into).collect(),
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every incident with the latest state of its reports.
///
/// Reports that no longer exist or have no entries are left out.
#[utoipa::path(
    get,
    path = "/api/incidents",
    responses(
        (status = 200, description = "All incidents", body = [IncidentResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_incidents_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<IncidentResponse>>, (StatusCode, String)> {
    let summaries = app_state
        .reporting
        .incident_summaries()
        .await
        .map_err(port_error)?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}
