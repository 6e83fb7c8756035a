//! QR challenge rendering.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use qrcode::QrCode;
use qrcode::render::svg;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),
}

/// Render a raw QR challenge into a `data:` URL suitable for an `<img>` tag.
pub fn render_data_url(raw: &str) -> Result<String, RenderError> {
    let code = QrCode::new(raw.as_bytes())?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(300, 300)
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image)
    ))
}
