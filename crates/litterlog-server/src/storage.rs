use std::io::Result;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::info;

/// Manages on-disk storage for submitted photos.
///
/// One flat directory; each photo is stored as `cleanup-<unix millis>.<ext>`
/// so a fresh name needs no coordination beyond the clock.
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Photo upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one photo to disk. Returns the public URL path the stored
    /// record should reference.
    pub async fn save(&self, original_name: Option<&str>, data: &[u8]) -> Result<String> {
        let filename = format!(
            "cleanup-{}.{}",
            Utc::now().timestamp_millis(),
            extension_for(original_name),
        );
        fs::write(self.dir.join(&filename), data).await?;

        info!("Stored photo {} ({} bytes)", filename, data.len());
        Ok(format!("/uploads/{}", filename))
    }
}

/// Client filenames are untrusted; keep at most a short alphanumeric
/// extension and fall back to jpg for anything else.
fn extension_for(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "jpg".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(extension_for(Some("park.png")), "png");
        assert_eq!(extension_for(Some("IMG_0042.JPEG")), "jpeg");
        assert_eq!(extension_for(Some("archive.tar.gz")), "gz");
        assert_eq!(extension_for(Some("no-extension")), "jpg");
        assert_eq!(extension_for(Some("dotfile.")), "jpg");
        assert_eq!(extension_for(Some("weird.p@g")), "jpg");
        assert_eq!(extension_for(Some("toolong.superduperlong")), "jpg");
        assert_eq!(extension_for(Some("../../etc/passwd")), "jpg");
        assert_eq!(extension_for(None), "jpg");
    }

    #[tokio::test]
    async fn save_writes_the_file_and_returns_its_public_path() {
        let dir = std::env::temp_dir().join(format!("litterlog_store_{}", std::process::id()));
        let store = PhotoStore::new(dir.clone()).await.unwrap();

        let public_path = store.save(Some("evidence.PNG"), b"not really a png").await.unwrap();
        let filename = public_path.strip_prefix("/uploads/").unwrap();
        assert!(filename.starts_with("cleanup-"));
        assert!(filename.ends_with(".png"));

        let on_disk = fs::read(dir.join(filename)).await.unwrap();
        assert_eq!(on_disk, b"not really a png");

        fs::remove_dir_all(dir).await.unwrap();
    }
}
