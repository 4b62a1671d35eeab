//! Image file loading for uploads and avatars.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Normalizes user-provided file paths.
///
/// Handles common drag-and-drop shell escaping (`\ `, `\(`, `\)`) and
/// expands `~/` to the HOME directory when available.
#[must_use]
pub fn normalize_input_path(path: &str) -> PathBuf {
    let unescaped = path
        .replace("\\ ", " ")
        .replace("\\(", "(")
        .replace("\\)", ")");

    let path = Path::new(&unescaped);
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/"))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }

    path.to_path_buf()
}

/// Returns MIME type inferred from file extension for supported image formats.
#[must_use]
pub fn mime_type_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str())?;

    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// An image read from disk, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Reads an image file. Content sniffing wins over the extension;
    /// anything that is not an image is refused.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not an image.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
        if bytes.is_empty() {
            bail!("Image file {} is empty", path.display());
        }

        let sniffed = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .filter(|mime| mime.starts_with("image/"));
        let Some(mime_type) = sniffed.or_else(|| mime_type_for_extension(path)) else {
            bail!("{} is not a supported image file", path.display());
        };

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        Ok(Self {
            file_name,
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    /// Encodes the image as a `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_sniffs_png_regardless_of_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lesion.bin");
        fs::write(&path, PNG_MAGIC).unwrap();

        let image = ImageUpload::from_path(&path).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.file_name, "lesion.bin");
    }

    #[test]
    fn test_falls_back_to_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.JPG");
        fs::write(&path, b"not really a jpeg").unwrap();

        let image = ImageUpload::from_path(&path).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[test]
    fn test_rejects_non_images() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"hello").unwrap();

        let err = ImageUpload::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("not a supported image"));
    }

    #[test]
    fn test_rejects_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.png");
        fs::write(&path, b"").unwrap();

        assert!(ImageUpload::from_path(&path).is_err());
    }

    #[test]
    fn test_data_url() {
        let image = ImageUpload {
            file_name: "a.png".into(),
            mime_type: "image/png".into(),
            bytes: b"abc".to_vec(),
        };
        assert_eq!(image.to_data_url(), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_normalize_unescapes_spaces() {
        assert_eq!(
            normalize_input_path("/tmp/my\\ photo.png"),
            PathBuf::from("/tmp/my photo.png")
        );
    }
}
