use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, get, web};
use servicarr_guard::BlockRecord;
use servicarr_guard::csrf;

use crate::error::BLOCKED_MESSAGE;
use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index_route);
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Servicarr</title>
</head>
<body>
  <main>
    <h1>Servicarr</h1>
    <p>Live service status is available at <a href="/api/check">/api/check</a>.</p>
  </main>
</body>
</html>
"#;

/// Landing page. Every render hands out a fresh CSRF cookie for the login form.
#[get("/")]
pub async fn index_route(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .insert_header(("Cache-Control", "no-cache, no-store, must-revalidate"))
        .cookie(state.cookies.csrf(csrf::issue_token()))
        .body(INDEX_HTML)
}

/// Notice served to blocked clients outside the JSON API.
pub fn blocked_page(record: &BlockRecord) -> HttpResponse {
    let expires_at = record.expires_at.format("%Y-%m-%d %H:%M:%S UTC");
    let body = format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Access blocked</title>
</head>
<body>
  <main>
    <h1>Access blocked</h1>
    <p>{BLOCKED_MESSAGE}.</p>
    <p>Failed attempts: {attempts}</p>
    <p>The block expires at {expires_at}.</p>
  </main>
</body>
</html>
"#,
        attempts = record.attempts,
    );

    HttpResponse::Forbidden().content_type(ContentType::html()).body(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use chrono::{TimeZone, Utc};

    #[actix_web::test]
    async fn test_blocked_page_shows_expiry() {
        let record = BlockRecord {
            ip: "10.0.0.9".into(),
            attempts: 4,
            blocked_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()),
            expires_at: Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap(),
            reason: "Failed login attempts".into(),
        };

        let response = blocked_page(&record);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = to_bytes(response.into_body()).await.unwrap();
        let html = std::str::from_utf8(&body).unwrap();
        assert!(html.contains("2026-03-02 12:00:00 UTC"));
        assert!(html.contains("Failed attempts: 4"));
        assert!(!html.contains("10.0.0.9"));
    }
}
