//! Human-viewable status page.

use axum::extract::State;
use axum::response::Html;

use crate::server::AppState;

/// GET /
///
/// Renders the tracker snapshot as a small self-refreshing page, with the
/// QR image embedded while the session awaits a scan.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let session = state.tracker.current();

    let ready = session.is_ready();
    let status_class = if ready { "ready" } else { "not-ready" };
    let qr_block = match session.qr_image {
        Some(image) => format!(r#"<img class="qr-image" src="{image}" alt="QR Code" />"#),
        None if ready => String::new(),
        None => "<p>Menunggu QR Code...</p>".to_string(),
    };
    let error_block = match session.last_error {
        Some(err) => format!("<p class=\"error\">Last error: {err}</p>"),
        None => String::new(),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>WhatsApp Gateway Status</title>
    <meta http-equiv="refresh" content="5">
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; background-color: #f0f0f0; }}
        .container {{ max-width: 800px; margin: 0 auto; background-color: white;
                      padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        .status {{ padding: 10px; margin: 10px 0; border-radius: 4px; }}
        .ready {{ background-color: #d4edda; color: #155724; }}
        .not-ready {{ background-color: #f8d7da; color: #721c24; }}
        .qr-container {{ text-align: center; margin: 20px 0; }}
        .qr-image {{ max-width: 300px; margin: 0 auto; }}
        .error {{ color: #721c24; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>WhatsApp Gateway Status</h1>
        <div class="status {status_class}">{narrative}</div>
        <div class="qr-container">{qr_block}</div>
        {error_block}
    </div>
</body>
</html>
"#,
        narrative = session.narrative,
    ))
}
