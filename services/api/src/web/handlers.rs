//! services/api/src/web/handlers.rs
//!
//! Axum handlers for the HTML pages and their form submissions.

use crate::web::{
    forms::{DetailQuery, ProfileForm, SubmissionForm},
    middleware::{visitor_cookie, Visitor},
    pages,
    state::AppState,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use incident_core::{domain::User, ports::PortError, EntryOutcome};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

type HandlerResult<T> = Result<T, (StatusCode, String)>;

/// Maps a port failure to a plain-text HTTP error.
pub fn port_error(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, "Report not found".to_string()),
        PortError::Unexpected(msg) => {
            error!("Request failed: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong".to_string(),
            )
        }
    }
}

fn parse_report_id(raw: &str) -> HandlerResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| (StatusCode::NOT_FOUND, "Report not found".to_string()))
}

/// Redirects to a report, surfacing fresh advice as the `tip` parameter.
fn redirect_with_tip(outcome: &EntryOutcome) -> Response {
    Redirect::to(&format!(
        "/report/{}?tip={}",
        outcome.report_id,
        urlencoding::encode(&outcome.ai_advice)
    ))
    .into_response()
}

async fn known_visitor(state: &AppState, visitor: Visitor) -> HandlerResult<Option<User>> {
    state
        .reporting
        .visitor(visitor.user_id())
        .await
        .map_err(port_error)
}

//=========================================================================================
// Landing Page
//=========================================================================================

pub async fn index_page() -> Html<String> {
    Html(pages::index_page())
}

pub async fn index_submit(
    State(state): State<Arc<AppState>>,
    Extension(visitor): Extension<Visitor>,
    multipart: Multipart,
) -> HandlerResult<Response> {
    create_report(&state, visitor, multipart).await
}

pub async fn map_page() -> Html<String> {
    Html(pages::map_page())
}

//=========================================================================================
// Profile
//=========================================================================================

pub async fn profile_page(
    State(state): State<Arc<AppState>>,
    Extension(visitor): Extension<Visitor>,
) -> HandlerResult<Html<String>> {
    let profile_text = known_visitor(&state, visitor)
        .await?
        .map(|u| u.profile_text)
        .unwrap_or_default();
    Ok(Html(pages::profile_page(&profile_text)))
}

pub async fn profile_submit(
    State(state): State<Arc<AppState>>,
    Extension(visitor): Extension<Visitor>,
    Form(form): Form<ProfileForm>,
) -> HandlerResult<Response> {
    let user = state
        .reporting
        .save_profile(visitor.user_id(), form.profile_text.trim())
        .await
        .map_err(port_error)?;
    info!("Saved profile for user {}", user.user_id);

    Ok((
        [(header::SET_COOKIE, visitor_cookie(user.user_id))],
        Redirect::to("/"),
    )
        .into_response())
}

//=========================================================================================
// Reports
//=========================================================================================

pub async fn report_form_page(
    State(state): State<Arc<AppState>>,
    Extension(visitor): Extension<Visitor>,
) -> HandlerResult<Response> {
    if known_visitor(&state, visitor).await?.is_none() {
        return Ok(Redirect::to("/profile").into_response());
    }
    Ok(Html(pages::report_form_page()).into_response())
}

pub async fn report_submit(
    State(state): State<Arc<AppState>>,
    Extension(visitor): Extension<Visitor>,
    multipart: Multipart,
) -> HandlerResult<Response> {
    create_report(&state, visitor, multipart).await
}

async fn create_report(
    state: &AppState,
    visitor: Visitor,
    multipart: Multipart,
) -> HandlerResult<Response> {
    let Some(user) = known_visitor(state, visitor).await? else {
        return Ok(Redirect::to("/profile").into_response());
    };
    let form = SubmissionForm::from_multipart(multipart).await?;
    let location = form.device_location();

    let outcome = state
        .reporting
        .create_report(&user, form.image, location)
        .await
        .map_err(port_error)?;
    Ok(redirect_with_tip(&outcome))
}

pub async fn report_detail_page(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
    Query(query): Query<DetailQuery>,
) -> HandlerResult<Html<String>> {
    let report_id = parse_report_id(&report_id)?;
    let report = state
        .reporting
        .get_report(report_id)
        .await
        .map_err(port_error)?;
    Ok(Html(pages::report_detail_page(&report, query.tip.as_deref())))
}

pub async fn report_detail_submit(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
    multipart: Multipart,
) -> HandlerResult<Response> {
    let report_id = parse_report_id(&report_id)?;
    // Unknown reports are rejected before anything is stored.
    state
        .reporting
        .get_report(report_id)
        .await
        .map_err(port_error)?;

    let form = SubmissionForm::from_multipart(multipart).await?;
    match form.action.as_deref() {
        Some("update_description") => {
            let entry_id = form
                .entry_uuid()
                .ok_or_else(|| (StatusCode::BAD_REQUEST, "Missing entry_id".to_string()))?;
            state
                .reporting
                .update_entry_description(report_id, entry_id, &form.user_description)
                .await
                .map_err(port_error)?;
            Ok(Redirect::to(&format!("/report/{}", report_id)).into_response())
        }
        Some("add_entry") => {
            let location = form.device_location();
            let outcome = state
                .reporting
                .add_entry(report_id, form.image, &form.user_description, location)
                .await
                .map_err(port_error)?;
            Ok(redirect_with_tip(&outcome))
        }
        _ => Err((StatusCode::BAD_REQUEST, "Unknown action".to_string())),
    }
}

pub async fn reports_page(
    State(state): State<Arc<AppState>>,
    Extension(visitor): Extension<Visitor>,
) -> HandlerResult<Response> {
    let Some(user) = known_visitor(&state, visitor).await? else {
        return Ok(Redirect::to("/profile").into_response());
    };
    let reports = state
        .reporting
        .reports_for_user(user.user_id)
        .await
        .map_err(port_error)?;
    Ok(Html(pages::reports_page(&reports)).into_response())
}
