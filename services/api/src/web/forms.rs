//! services/api/src/web/forms.rs
//!
//! Parsing of the multipart forms used to submit photos.

use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
};
use incident_core::domain::{GeoPoint, ImageUpload};
use serde::Deserialize;
use uuid::Uuid;

/// Fields of the report, add-entry and edit-description forms.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub image: Option<ImageUpload>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub user_description: String,
    pub action: Option<String>,
    pub entry_id: Option<String>,
}

impl SubmissionForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, (StatusCode, String)> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    // Browsers send an empty part with no filename when nothing was picked.
                    if !file_name.is_empty() {
                        form.image = Some(ImageUpload {
                            original_name: file_name,
                            bytes,
                        });
                    }
                }
                "lat" => form.lat = parse_coordinate(&field.text().await.map_err(multipart_error)?),
                "lng" => form.lng = parse_coordinate(&field.text().await.map_err(multipart_error)?),
                "user_description" => {
                    form.user_description =
                        field.text().await.map_err(multipart_error)?.trim().to_string()
                }
                "action" => {
                    form.action = Some(field.text().await.map_err(multipart_error)?.trim().to_string())
                }
                "entry_id" => {
                    form.entry_id = Some(field.text().await.map_err(multipart_error)?.trim().to_string())
                }
                _ => {}
            }
        }
        Ok(form)
    }

    pub fn device_location(&self) -> Option<GeoPoint> {
        GeoPoint::from_parts(self.lat, self.lng)
    }

    pub fn entry_uuid(&self) -> Option<Uuid> {
        self.entry_id.as_deref().and_then(|id| Uuid::parse_str(id).ok())
    }
}

/// Blank or non-numeric coordinates mean the device gave no fix.
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn multipart_error(e: MultipartError) -> (StatusCode, String) {
    (e.status(), e.body_text())
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub profile_text: String,
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    pub tip: Option<String>,
}
