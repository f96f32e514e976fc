//! Upload form page and multipart request parsing

use super::error::ApiError;
use crate::batch::Upload;
use crate::config::OperationOverrides;
use axum::extract::Multipart;
use tracing::debug;

/// Multipart field carrying image files
pub const IMAGES_FIELD: &str = "images";

/// Static upload page served at `GET /imageprocess`
pub const UPLOAD_FORM_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Product Image Processor</title>
</head>
<body>
  <h1>Product Image Processor</h1>
  <form action="/process" method="post" enctype="multipart/form-data">
    <p><input type="file" name="images" accept="image/*" multiple required></p>
    <p><label><input type="checkbox" name="resize" checked> Resize</label></p>
    <p><label><input type="checkbox" name="remove_background"> Remove background</label></p>
    <p><label><input type="checkbox" name="enhance" checked> Enhance</label></p>
    <p><button type="submit">Process</button></p>
  </form>
</body>
</html>
"#;

/// Parsed `POST /process` body
#[derive(Debug, Default)]
pub struct ProcessForm {
    /// Whether any `images` part was submitted (even one with an empty filename)
    pub images_present: bool,
    pub uploads: Vec<Upload>,
    /// Checkbox semantics: a flag is on only if its field was submitted
    pub overrides: OperationOverrides,
}

impl ProcessForm {
    /// Drain every multipart field
    ///
    /// # Errors
    /// - Malformed multipart stream
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                IMAGES_FIELD => {
                    form.images_present = true;
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    form.uploads.push(Upload::new(filename, bytes.to_vec()));
                },
                "resize" => form.overrides.resize = true,
                "remove_background" => form.overrides.remove_background = true,
                "enhance" => form.overrides.enhance = true,
                other => debug!(field = other, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }
}
