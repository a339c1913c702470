//! Image Attachments
//!
//! Local checks run before an upload is attempted, and the inline `data:`
//! URI form used as the message preview.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;
use tokio::io::AsyncReadExt;

/// Largest accepted upload, in bytes (5 MiB)
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Reasons an image is refused before any network call
#[derive(Debug, Error)]
pub enum ImageError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that was attempted
        path: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Declared media type is not `image/*`
    #[error("please upload a valid image file (got {media_type})")]
    NotAnImage {
        /// The rejected media type
        media_type: String,
    },

    /// Payload exceeds the size ceiling
    #[error("image size should be less than {} MB ({size} bytes given)", .limit / (1024 * 1024))]
    TooLarge {
        /// Payload size in bytes
        size: usize,
        /// Ceiling in bytes
        limit: usize,
    },

    /// A preview string is not a base64 `data:` URI
    #[error("malformed data URI")]
    MalformedDataUri,
}

/// An image selected for upload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAttachment {
    /// File name sent with the multipart part
    pub file_name: String,
    /// Declared media type
    pub media_type: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    /// Build an attachment from in-memory bytes
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file and guess its media type from the extension
    ///
    /// Reads at most `max_bytes + 1` bytes, so an oversized file (or a
    /// device that never ends) fails with [`ImageError::TooLarge`] without
    /// being buffered. `size` in that error is then a lower bound.
    pub async fn from_path(path: impl AsRef<Path>, max_bytes: usize) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let read_error = |source: std::io::Error| ImageError::Read {
            path: path.display().to_string(),
            source,
        };
        let too_large = |size: usize| ImageError::TooLarge {
            size,
            limit: max_bytes,
        };

        let file = tokio::fs::File::open(path).await.map_err(read_error)?;
        let declared = file.metadata().await.map_err(read_error)?.len();
        let ceiling = u64::try_from(max_bytes).unwrap_or(u64::MAX);
        if declared > ceiling {
            return Err(too_large(usize::try_from(declared).unwrap_or(usize::MAX)));
        }

        // Pipes and devices report a length of zero
        let mut bytes = Vec::new();
        file.take(ceiling.saturating_add(1))
            .read_to_end(&mut bytes)
            .await
            .map_err(read_error)?;
        if bytes.len() > max_bytes {
            return Err(too_large(bytes.len()));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            file_name,
            media_type: guess_media_type(path).to_string(),
            bytes,
        })
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Size in MiB, for display
    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / (1024.0 * 1024.0)
    }

    /// Check media type and size
    pub fn validate(&self, max_bytes: usize) -> Result<(), ImageError> {
        if !self.media_type.starts_with("image/") {
            return Err(ImageError::NotAnImage {
                media_type: self.media_type.clone(),
            });
        }
        if self.bytes.len() > max_bytes {
            return Err(ImageError::TooLarge {
                size: self.bytes.len(),
                limit: max_bytes,
            });
        }
        Ok(())
    }

    /// Inline `data:<media>;base64,<payload>` form
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, STANDARD.encode(&self.bytes))
    }
}

/// Media type for a file extension
pub fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => FALLBACK_MEDIA_TYPE,
    }
}

/// Split a base64 `data:` URI into media type and decoded bytes
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), ImageError> {
    let rest = uri.strip_prefix("data:").ok_or(ImageError::MalformedDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageError::MalformedDataUri)?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or(ImageError::MalformedDataUri)?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| ImageError::MalformedDataUri)?;
    Ok((media_type.to_string(), bytes))
}

/// File extension for a media type, used when writing a preview to disk
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_accepts_image_at_limit() {
        let image = ImageAttachment::new("cat.png", "image/png", vec![0u8; MAX_IMAGE_BYTES]);
        assert!(image.validate(MAX_IMAGE_BYTES).is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized() {
        let image = ImageAttachment::new("big.png", "image/png", vec![0u8; MAX_IMAGE_BYTES + 1]);
        match image.validate(MAX_IMAGE_BYTES) {
            Err(ImageError::TooLarge { size, limit }) => {
                assert_eq!(size, MAX_IMAGE_BYTES + 1);
                assert_eq!(limit, MAX_IMAGE_BYTES);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_non_image() {
        let doc = ImageAttachment::new("notes.txt", "text/plain", b"hello".to_vec());
        assert!(matches!(
            doc.validate(MAX_IMAGE_BYTES),
            Err(ImageError::NotAnImage { .. })
        ));
    }

    #[test]
    fn test_guess_media_type() {
        assert_eq!(guess_media_type(Path::new("a/b/photo.JPG")), "image/jpeg");
        assert_eq!(guess_media_type(Path::new("x.webp")), "image/webp");
        assert_eq!(guess_media_type(Path::new("report.pdf")), FALLBACK_MEDIA_TYPE);
        assert_eq!(guess_media_type(Path::new("README")), FALLBACK_MEDIA_TYPE);
    }

    #[test]
    fn test_data_uri_decodes_back() {
        let image = ImageAttachment::new("dot.gif", "image/gif", vec![71, 73, 70, 56]);
        let uri = image.data_uri();
        assert_eq!(uri, "data:image/gif;base64,R0lGOA==");

        let (media_type, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(media_type, "image/gif");
        assert_eq!(bytes, image.bytes);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_data_uri("https://example.com/a.png").is_err());
        assert!(decode_data_uri("data:image/png,raw").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let image =
            tokio_test::block_on(ImageAttachment::from_path(&path, MAX_IMAGE_BYTES)).unwrap();
        assert_eq!(image.file_name, "shot.png");
        assert_eq!(image.media_type, "image/png");
        assert_eq!(image.size(), 3);
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = tokio_test::block_on(ImageAttachment::from_path(
            "/nonexistent/streamchat.png",
            MAX_IMAGE_BYTES,
        ));
        assert!(matches!(result, Err(ImageError::Read { .. })));
    }

    #[test]
    fn test_from_path_refuses_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.png");
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        let result = tokio_test::block_on(ImageAttachment::from_path(&path, 1024));
        match result {
            Err(ImageError::TooLarge { size, limit }) => {
                assert_eq!(size, 4096);
                assert_eq!(limit, 1024);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }

        let exact = tokio_test::block_on(ImageAttachment::from_path(&path, 4096)).unwrap();
        assert_eq!(exact.size(), 4096);
    }

    #[cfg(unix)]
    #[test]
    fn test_from_path_stops_reading_endless_device() {
        let result = tokio_test::block_on(ImageAttachment::from_path("/dev/zero", 1024));
        match result {
            Err(ImageError::TooLarge { size, limit }) => {
                assert_eq!(size, 1025);
                assert_eq!(limit, 1024);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }
}
