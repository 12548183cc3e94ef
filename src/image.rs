use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Datelike, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, info};

use crate::config::{CloudinaryConfig, UploadConfig};
use crate::content::cloudinary;
use crate::generate_truncated_uuid;
use crate::{ApiError, AppState};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

const WEBP_QUALITY: f32 = 82.0;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("file is empty")]
    Empty,
    #[error("file is {size} bytes, uploads are limited to 10MB")]
    TooLarge { size: usize },
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("declared type {declared} does not match the file content ({detected})")]
    TypeMismatch { declared: String, detected: String },
    #[error("multipart field 'file' is missing")]
    MissingFile,
    #[error("image decoding failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("webp encoding failed: {0}")]
    Encode(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cloudinary request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("cloudinary rejected the upload: {0}")]
    Upstream(String),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl MediaError {
    /// Problems with the uploaded file itself.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            MediaError::Empty
                | MediaError::TooLarge { .. }
                | MediaError::UnsupportedType(_)
                | MediaError::TypeMismatch { .. }
                | MediaError::MissingFile
        )
    }
}

/// A file as received from the multipart form.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: Option<String>,
    pub declared_type: Option<String>,
    pub bytes: Bytes,
}

/// An upload that passed the size and type checks.
#[derive(Debug, Clone)]
pub struct CheckedUpload {
    pub format: ImageFormat,
    pub mime: &'static str,
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMedia {
    pub url: String,
    pub provider: &'static str,
    pub mime: String,
    pub size: usize,
}

/// Checks size and type. The type is sniffed from the content, so a renamed
/// file or a lying content-type header cannot slip past the allow-list.
pub fn check_upload(file: UploadFile) -> Result<CheckedUpload, MediaError> {
    let size = file.bytes.len();
    if size == 0 {
        return Err(MediaError::Empty);
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(MediaError::TooLarge { size });
    }

    let format = image::guess_format(&file.bytes)
        .map_err(|_| MediaError::UnsupportedType("unrecognized content".to_string()))?;
    let mime = format.to_mime_type();
    if !ALLOWED_MIME_TYPES.contains(&mime) {
        return Err(MediaError::UnsupportedType(mime.to_string()));
    }

    if let Some(declared) = file.declared_type.as_deref().map(normalize_mime) {
        if declared != "application/octet-stream" {
            if !ALLOWED_MIME_TYPES.contains(&declared.as_str()) {
                return Err(MediaError::UnsupportedType(declared));
            }
            if declared != mime {
                return Err(MediaError::TypeMismatch {
                    declared,
                    detected: mime.to_string(),
                });
            }
        }
    }

    Ok(CheckedUpload {
        format,
        mime,
        file_name: file.file_name,
        bytes: file.bytes,
    })
}

fn normalize_mime(raw: &str) -> String {
    let essence = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => essence,
    }
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    fn provider(&self) -> &'static str;
    async fn store(&self, upload: CheckedUpload) -> Result<StoredMedia, MediaError>;
}

/// Local fallback: files land under `<dir>/<year>/<month>/`, JPEG and PNG
/// re-encoded to WebP.
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    dir: PathBuf,
    base_url: String,
}

impl LocalDiskStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

#[async_trait]
impl MediaStore for LocalDiskStore {
    fn provider(&self) -> &'static str {
        "local"
    }

    async fn store(&self, upload: CheckedUpload) -> Result<StoredMedia, MediaError> {
        let (bytes, format) = match upload.format {
            ImageFormat::Jpeg | ImageFormat::Png => {
                let original = upload.bytes.clone();
                let webp = tokio::task::spawn_blocking(move || encode_webp(&original)).await??;
                (Bytes::from(webp), ImageFormat::WebP)
            }
            other => (upload.bytes, other),
        };

        let now = Utc::now();
        let folder = format!("{}/{:02}", now.year(), now.month());
        let extension = format.extensions_str().first().copied().unwrap_or("bin");
        let file_name = format!("{}.{}", generate_truncated_uuid(), extension);

        let folder_path = self.dir.join(&folder);
        tokio::fs::create_dir_all(&folder_path).await?;
        tokio::fs::write(folder_path.join(&file_name), &bytes).await?;

        let url = format!("{}/{}/{}", self.base_url, folder, file_name);
        info!("image saved in: {}", &url);
        Ok(StoredMedia {
            url,
            provider: self.provider(),
            mime: format.to_mime_type().to_string(),
            size: bytes.len(),
        })
    }
}

fn encode_webp(bytes: &[u8]) -> Result<Vec<u8>, MediaError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode(WEBP_QUALITY);
    if encoded.is_empty() {
        return Err(MediaError::Encode(format!("empty output for {}x{} image", width, height)));
    }
    Ok(encoded.to_vec())
}

/// Signed uploads through Cloudinary's upload API.
#[derive(Debug, Clone)]
pub struct CloudinaryStore {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Debug, Deserialize)]
struct CloudinaryResponse {
    secure_url: Option<String>,
    bytes: Option<usize>,
    error: Option<CloudinaryErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    message: String,
}

impl CloudinaryStore {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(config: CloudinaryConfig) -> Result<Self, MediaError> {
        let http = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.config.cloud_name
        )
    }
}

/// Cloudinary request signature: the signed params sorted by name, joined as
/// `k=v&k=v`, followed by the API secret, hashed with SHA-256.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    fn provider(&self) -> &'static str {
        "cloudinary"
    }

    async fn store(&self, upload: CheckedUpload) -> Result<StoredMedia, MediaError> {
        let mut signed = vec![("timestamp", Utc::now().timestamp().to_string())];
        if let Some(folder) = &self.config.folder {
            signed.push(("folder", folder.clone()));
        }
        let signature = sign_params(&signed, &self.config.api_secret);

        let data_uri = format!("data:{};base64,{}", upload.mime, STANDARD.encode(&upload.bytes));
        let mut form: Vec<(&str, String)> = signed;
        form.push(("file", data_uri));
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        let res = self.http.post(self.endpoint()).form(&form).send().await?;
        let status = res.status();
        let body: CloudinaryResponse = res.json().await?;

        match (status.is_success(), body.secure_url) {
            (true, Some(secure_url)) => {
                info!("image uploaded to cloudinary: {}", &secure_url);
                Ok(StoredMedia {
                    url: cloudinary::optimize_url(&secure_url, None),
                    provider: self.provider(),
                    mime: upload.mime.to_string(),
                    size: body.bytes.unwrap_or(upload.bytes.len()),
                })
            }
            _ => {
                let message = body
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| format!("http {}", status));
                Err(MediaError::Upstream(message))
            }
        }
    }
}

/// POST /api/upload, a multipart form with a single `file` field.
pub async fn add_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredMedia>), ApiError> {
    tracing::info!("add_image started");

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let declared_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        upload = Some(UploadFile {
            file_name,
            declared_type,
            bytes,
        });
        break;
    }

    let upload = upload.ok_or(MediaError::MissingFile)?;
    let checked = check_upload(upload).map_err(|e| {
        info!("upload rejected: {}", e);
        e
    })?;
    let file_name = checked.file_name.clone().unwrap_or_default();

    match state.media.store(checked).await {
        Ok(stored) => {
            info!(file = %file_name, url = %stored.url, provider = stored.provider, "upload stored");
            Ok((StatusCode::CREATED, Json(stored)))
        }
        Err(e) => {
            error!("failed to store upload {}: {:?}", file_name, e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0";
    const PDF_MAGIC: &[u8] = b"%PDF-1.7\n%\xe2\xe3";

    fn file(bytes: &[u8], declared: Option<&str>, name: &str) -> UploadFile {
        UploadFile {
            file_name: Some(name.to_string()),
            declared_type: declared.map(str::to_string),
            bytes: Bytes::copy_from_slice(bytes),
        }
    }

    #[test]
    fn accepts_allowed_types() {
        let checked = check_upload(file(PNG_MAGIC, Some("image/png"), "a.png")).unwrap();
        assert_eq!(checked.mime, "image/png");
        let checked = check_upload(file(JPEG_MAGIC, Some("image/jpg"), "a.jpg")).unwrap();
        assert_eq!(checked.format, ImageFormat::Jpeg);
        let checked = check_upload(file(PNG_MAGIC, None, "blob")).unwrap();
        assert_eq!(checked.mime, "image/png");
    }

    #[test]
    fn rejects_oversized_files() {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(MAX_UPLOAD_BYTES + 1, 0);
        let err = check_upload(file(&bytes, Some("image/png"), "big.png")).unwrap_err();
        assert!(matches!(err, MediaError::TooLarge { size } if size == MAX_UPLOAD_BYTES + 1));

        bytes.truncate(MAX_UPLOAD_BYTES);
        assert!(check_upload(file(&bytes, Some("image/png"), "ok.png")).is_ok());
    }

    #[test]
    fn extension_and_header_spoofing_is_rejected() {
        // a PDF renamed to .png with an image content-type
        let err = check_upload(file(PDF_MAGIC, Some("image/png"), "cv.png")).unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedType(_)));

        // a real PNG claiming to be a JPEG
        let err = check_upload(file(PNG_MAGIC, Some("image/jpeg"), "a.jpg")).unwrap_err();
        assert!(matches!(err, MediaError::TypeMismatch { .. }));

        // a real PNG declared as something outside the allow-list
        let err = check_upload(file(PNG_MAGIC, Some("image/svg+xml"), "a.svg")).unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedType(t) if t == "image/svg+xml"));
    }

    #[test]
    fn rejects_empty_files() {
        assert!(matches!(
            check_upload(file(b"", Some("image/png"), "a.png")),
            Err(MediaError::Empty)
        ));
    }

    #[test]
    fn signature_sorts_params() {
        let a = sign_params(
            &[("timestamp", "1315060510".into()), ("folder", "blog".into())],
            "secret",
        );
        let b = sign_params(
            &[("folder", "blog".into()), ("timestamp", "1315060510".into())],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut hasher = Sha256::new();
        hasher.update(b"folder=blog&timestamp=1315060510secret");
        assert_eq!(a, hex::encode(hasher.finalize()));
    }

    #[tokio::test]
    async fn local_store_writes_into_dated_folder() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = LocalDiskStore::new(&UploadConfig {
            dir: temp.path().to_path_buf(),
            base_url: "/uploads".into(),
        });

        // GIFs are stored verbatim
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
        let checked = check_upload(file(gif, Some("image/gif"), "dot.gif")).unwrap();
        let stored = store.store(checked).await.unwrap();

        assert_eq!(stored.provider, "local");
        assert_eq!(stored.mime, "image/gif");
        assert!(stored.url.starts_with("/uploads/"));
        assert!(stored.url.ends_with(".gif"));

        let relative = stored.url.trim_start_matches("/uploads/");
        let on_disk = std::fs::read(temp.path().join(relative)).unwrap();
        assert_eq!(on_disk, gif);
    }

    #[tokio::test]
    async fn local_store_reencodes_png_as_webp() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = LocalDiskStore::new(&UploadConfig {
            dir: temp.path().to_path_buf(),
            base_url: "/uploads".into(),
        });

        let mut png = std::io::Cursor::new(Vec::new());
        image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 10, 10, 255]))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();

        let checked = check_upload(file(png.get_ref(), Some("image/png"), "red.png")).unwrap();
        let stored = store.store(checked).await.unwrap();
        assert_eq!(stored.mime, "image/webp");
        assert!(stored.url.ends_with(".webp"));
    }
}
