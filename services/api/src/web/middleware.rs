//! services/api/src/web/middleware.rs
//!
//! Resolves the visitor token carried in the `user_id` cookie.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Duration;
use uuid::Uuid;

pub const VISITOR_COOKIE: &str = "user_id";

/// The opaque identity of the browser making the request.
///
/// This is per-browser continuity only; nothing here authenticates anyone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visitor(pub Option<Uuid>);

impl Visitor {
    pub fn user_id(self) -> Option<Uuid> {
        self.0
    }
}

/// Middleware that parses the visitor cookie and stores a `Visitor` in the
/// request extensions. Missing or malformed cookies yield an anonymous visitor.
pub async fn identify_visitor(mut req: Request, next: Next) -> Response {
    let user_id = req
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|h| cookie_value(h, VISITOR_COOKIE))
        .and_then(|v| Uuid::parse_str(v).ok());

    req.extensions_mut().insert(Visitor(user_id));
    next.run(req).await
}

/// Finds `name=value` in a `Cookie` header.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|c| {
        let (key, value) = c.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

/// The `Set-Cookie` value that remembers a visitor for a year.
pub fn visitor_cookie(user_id: Uuid) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        VISITOR_COOKIE,
        user_id,
        Duration::days(365).num_seconds()
    )
}
