//! services/api/src/web/pages.rs
//!
//! Server-rendered HTML pages.

use incident_core::domain::{Entry, GeoPoint, Report};

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn layout(title: &str, head_extra: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Incident Reporter</title>
    <style>
        body {{
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 860px;
            margin: 0 auto;
            padding: 20px;
            line-height: 1.5;
            color: #222;
        }}
        nav a {{ margin-right: 16px; }}
        .entry {{ border-top: 1px solid #ddd; padding: 12px 0; }}
        .entry img, .thumb {{ max-width: 100%; max-height: 360px; }}
        .tip {{ background: #fff6d5; border-left: 4px solid #e0b400; padding: 10px; }}
        .muted {{ color: #777; }}
        textarea {{ width: 100%; min-height: 80px; }}
        #map {{ height: 520px; }}
    </style>
    {head_extra}
</head>
<body>
    <nav>
        <a href="/">Home</a>
        <a href="/report">New report</a>
        <a href="/reports">My reports</a>
        <a href="/map">Map</a>
        <a href="/profile">Profile</a>
    </nav>
    <h1>{title}</h1>
    {body}
</body>
</html>"#,
        title = html_escape(title),
        head_extra = head_extra,
        body = body,
    )
}

/// Fills the hidden `lat`/`lng` inputs from the browser's geolocation.
const GEOLOCATION_SCRIPT: &str = r#"<script>
    if (navigator.geolocation) {
        navigator.geolocation.getCurrentPosition(function (pos) {
            document.querySelectorAll('input[name=lat]').forEach(function (el) { el.value = pos.coords.latitude; });
            document.querySelectorAll('input[name=lng]').forEach(function (el) { el.value = pos.coords.longitude; });
        });
    }
</script>"#;

fn upload_form(action: &str, extra_fields: &str) -> String {
    format!(
        r#"<form method="post" action="{action}" enctype="multipart/form-data">
        {extra_fields}
        <p><input type="file" name="image" accept="image/*" capture="environment" required></p>
        <input type="hidden" name="lat" value="">
        <input type="hidden" name="lng" value="">
        <p><button type="submit">Send</button></p>
    </form>
    {script}"#,
        action = html_escape(action),
        extra_fields = extra_fields,
        script = GEOLOCATION_SCRIPT,
    )
}

fn format_location(location: Option<GeoPoint>) -> String {
    match location {
        Some(p) => format!("{:.6}, {:.6}", p.lat, p.lng),
        None => "unknown".to_string(),
    }
}

pub fn index_page() -> String {
    layout(
        "Report an incident",
        "",
        &format!(
            r#"<p>Take a photo of what you see. We describe it, suggest how to stay safe,
    and put it on the <a href="/map">map</a>.</p>
    <p class="muted">Fill in your <a href="/profile">profile</a> first so the advice fits you.</p>
    {}"#,
            upload_form("/", "")
        ),
    )
}

pub fn profile_page(profile_text: &str) -> String {
    layout(
        "Your profile",
        "",
        &format!(
            r#"<form method="post" action="/profile">
        <p>Tell us anything that matters for safety advice (mobility, children, commute...).</p>
        <textarea name="profile_text">{}</textarea>
        <p><button type="submit">Save</button></p>
    </form>"#,
            html_escape(profile_text)
        ),
    )
}

pub fn report_form_page() -> String {
    layout("New report", "", &upload_form("/report", ""))
}

fn entry_section(report_id: &str, entry: &Entry) -> String {
    format!(
        r#"<div class="entry" id="entry-{entry_id}">
        <img src="/uploads/{image}" alt="Reported photo">
        <p class="muted">Sent {timestamp}{photo_time}</p>
        <p><strong>Description:</strong> {description}</p>
        <p><strong>Advice:</strong> {advice}</p>
        <form method="post" action="/report/{report_id}" enctype="multipart/form-data">
            <input type="hidden" name="action" value="update_description">
            <input type="hidden" name="entry_id" value="{entry_id}">
            <textarea name="user_description" placeholder="Add your own words">{user_description}</textarea>
            <button type="submit">Save description</button>
        </form>
    </div>"#,
        entry_id = entry.entry_id,
        image = html_escape(&entry.image_filename),
        timestamp = entry.timestamp.format("%Y-%m-%d %H:%M UTC"),
        photo_time = entry
            .photo_time
            .as_deref()
            .map(|t| format!(", photo taken {}", html_escape(t)))
            .unwrap_or_default(),
        description = html_escape(&entry.ai_description),
        advice = html_escape(&entry.ai_advice),
        report_id = html_escape(report_id),
        user_description = html_escape(&entry.user_description),
    )
}

pub fn report_detail_page(report: &Report, tip: Option<&str>) -> String {
    let report_id = report.report_id.to_string();
    let tip = tip
        .filter(|t| !t.trim().is_empty())
        .map(|t| format!(r#"<p class="tip">{}</p>"#, html_escape(t)))
        .unwrap_or_default();
    let entries: String = report
        .entries
        .iter()
        .map(|e| entry_section(&report_id, e))
        .collect();
    let add_entry = upload_form(
        &format!("/report/{}", report_id),
        r#"<input type="hidden" name="action" value="add_entry">
        <textarea name="user_description" placeholder="What changed?"></textarea>"#,
    );

    layout(
        "Report",
        "",
        &format!(
            r#"{tip}
    <p class="muted">Opened {created} &middot; location {location}{confirmed}</p>
    {entries}
    <h2>Add an update</h2>
    {add_entry}"#,
            tip = tip,
            created = report.created_at.format("%Y-%m-%d %H:%M UTC"),
            location = format_location(report.location),
            confirmed = if report.confirmed { " &middot; confirmed" } else { "" },
            entries = entries,
            add_entry = add_entry,
        ),
    )
}

pub fn reports_page(reports: &[Report]) -> String {
    if reports.is_empty() {
        return layout(
            "My reports",
            "",
            r#"<p>No reports yet. <a href="/report">Send the first one.</a></p>"#,
        );
    }
    let items: String = reports
        .iter()
        .map(|r| {
            let summary = r
                .latest_entry()
                .map(|e| html_escape(&e.ai_description))
                .unwrap_or_default();
            format!(
                r#"<li><a href="/report/{id}">{created}</a> ({count} entries) {summary}</li>"#,
                id = r.report_id,
                created = r.created_at.format("%Y-%m-%d %H:%M UTC"),
                count = r.entries.len(),
                summary = summary,
            )
        })
        .collect();
    layout("My reports", "", &format!("<ul>{}</ul>", items))
}

pub fn map_page() -> String {
    let head = r#"<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>"#;
    let body = r#"<div id="map"></div>
    <script>
        function esc(s) {
            return String(s).replace(/[&<>"']/g, function (c) {
                return {'&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#x27;'}[c];
            });
        }
        var map = L.map('map').setView([0, 0], 2);
        L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
            attribution: '&copy; OpenStreetMap contributors'
        }).addTo(map);
        fetch('/api/incidents').then(function (r) { return r.json(); }).then(function (incidents) {
            var bounds = [];
            incidents.forEach(function (incident) {
                incident.reports.forEach(function (report) {
                    if (!report.location) { return; }
                    var point = [report.location.lat, report.location.lng];
                    bounds.push(point);
                    L.marker(point).addTo(map).bindPopup(
                        '<img class="thumb" src="' + esc(report.image_url) + '" width="200"><br>' +
                        '<strong>' + esc(report.ai_description) + '</strong><br>' +
                        esc(report.ai_advice) + '<br>' +
                        '<a href="/report/' + esc(report.report_id) + '">Open report</a>'
                    );
                });
            });
            if (bounds.length) { map.fitBounds(bounds, {maxZoom: 15}); }
        });
    </script>"#;
    layout("Incident map", head, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape(r#"<b a="1">'&'</b>"#),
            "&lt;b a=&quot;1&quot;&gt;&#x27;&amp;&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn detail_page_escapes_ai_text_and_shows_tip() {
        let entry = Entry {
            entry_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            image_filename: "a.jpg".to_string(),
            device_location: None,
            photo_time: None,
            exif_location: None,
            ai_description: "<script>alert(1)</script>".to_string(),
            user_description: String::new(),
            ai_advice: "Stay back".to_string(),
        };
        let report = Report::open(Uuid::new_v4(), entry);

        let html = report_detail_page(&report, Some("Call 112"));

        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains(r#"<p class="tip">Call 112</p>"#));
        assert!(html.contains("location unknown"));
    }

    #[test]
    fn profile_page_keeps_existing_text() {
        assert!(profile_page("I use a <wheelchair>").contains("I use a &lt;wheelchair&gt;"));
    }
}
