//! Loading photos from disk for analysis and evidence.

use std::path::Path;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use habicase_ai::ImageInput;

/// MIME type from the file extension.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Read and base64-encode an image file.
pub fn load_image(path: &Path) -> anyhow::Result<ImageInput> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read image {}", path.display()))?;
    Ok(ImageInput::new(media_type_for(path), STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn media_types_by_extension() {
        assert_eq!(media_type_for(Path::new("a.png")), "image/png");
        assert_eq!(media_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(media_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(media_type_for(Path::new("a.gif")), "image/gif");
        assert_eq!(media_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(media_type_for(Path::new("a.heic")), "application/octet-stream");
        assert_eq!(media_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn load_encodes_base64() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"hello").unwrap();
        let img = load_image(file.path()).unwrap();
        assert_eq!(img.media_type, "image/png");
        assert_eq!(img.data, "aGVsbG8=");
    }

    #[test]
    fn missing_file_is_error() {
        let err = load_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(err.to_string().contains("failed to read image"));
    }
}
