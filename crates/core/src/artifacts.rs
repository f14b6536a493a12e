//! Artifact persistence: durable storage of generated bytes plus
//! best-effort thumbnail derivation.
//!
//! Filenames are derived from `(job_id, index)` so that repeated
//! persistence of the same pair overwrites rather than duplicates.
//! Thumbnailing never fails the persist: bytes the `image` crate cannot
//! decode are still written at full size and simply get no thumbnail.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::generation::{artifact_filename, thumbnail_filename};
use crate::types::JobId;

/// Thumbnails fit within this bounding box (pixels).
pub const THUMBNAIL_MAX_DIM: u32 = 320;

/// Name of the nested directory holding thumbnails.
pub const THUMBS_DIR: &str = "thumbs";

/// A persisted artifact on disk.
#[derive(Debug, Clone)]
pub struct PersistedArtifact {
    /// Artifact filename (`{job_id}_{index}.png`).
    pub filename: String,
    /// Absolute or store-relative path of the artifact file.
    pub path: PathBuf,
    /// Thumbnail filename, when derivation succeeded.
    pub thumbnail_filename: Option<String>,
    /// Thumbnail path, when derivation succeeded.
    pub thumbnail_path: Option<PathBuf>,
    /// Decoded pixel width, when the bytes were a decodable image.
    pub width: Option<u32>,
    /// Decoded pixel height, when the bytes were a decodable image.
    pub height: Option<u32>,
    /// Size of the persisted artifact in bytes.
    pub size_bytes: u64,
}

/// Writes artifacts and thumbnails under a root directory.
///
/// Layout: `{root}/{filename}` for artifacts, `{root}/thumbs/{filename}`
/// for thumbnails. The root is served verbatim at `/generated` by the API.
pub struct ArtifactStore {
    root: PathBuf,
    thumbs: PathBuf,
}

impl ArtifactStore {
    /// Open (and create if missing) the store directories.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let root = root.into();
        let thumbs = root.join(THUMBS_DIR);
        fs::create_dir_all(&thumbs)?;
        Ok(Self { root, thumbs })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist one artifact's bytes and derive its thumbnail.
    pub fn persist(
        &self,
        job_id: JobId,
        index: usize,
        bytes: &[u8],
    ) -> Result<PersistedArtifact, CoreError> {
        let filename = artifact_filename(job_id, index);
        let path = self.root.join(&filename);
        fs::write(&path, bytes)?;

        // Best-effort: opaque text artifacts and other undecodable bytes
        // keep their full-size file and simply get no thumbnail.
        let (thumbnail_filename, thumbnail_path, width, height) =
            match self.write_thumbnail(job_id, index, bytes) {
                Ok((name, path, w, h)) => (Some(name), Some(path), Some(w), Some(h)),
                Err(_) => (None, None, None, None),
            };

        Ok(PersistedArtifact {
            filename,
            path,
            thumbnail_filename,
            thumbnail_path,
            width,
            height,
            size_bytes: bytes.len() as u64,
        })
    }

    /// Decode, downscale, and write the thumbnail for an artifact.
    ///
    /// Returns the source image dimensions along with the thumbnail
    /// location. Errors here are swallowed by [`persist`](Self::persist).
    fn write_thumbnail(
        &self,
        job_id: JobId,
        index: usize,
        bytes: &[u8],
    ) -> Result<(String, PathBuf, u32, u32), image::ImageError> {
        let decoded = image::load_from_memory(bytes)?;
        let (width, height) = (decoded.width(), decoded.height());

        let thumb = decoded.thumbnail(THUMBNAIL_MAX_DIM, THUMBNAIL_MAX_DIM);
        let name = thumbnail_filename(job_id, index);
        let path = self.thumbs.join(&name);

        // JPEG output: drop any alpha channel before encoding.
        image::DynamicImage::ImageRgb8(thumb.to_rgb8())
            .save_with_format(&path, image::ImageFormat::Jpeg)?;

        Ok((name, path, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn job_id() -> JobId {
        uuid::Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000002").unwrap()
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 40, 200]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn persists_decodable_image_with_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();

        let bytes = png_bytes(640, 480);
        let persisted = store.persist(job_id(), 0, &bytes).unwrap();

        assert!(persisted.path.exists());
        assert_eq!(persisted.filename, format!("{}_0.png", job_id()));
        assert_eq!(persisted.size_bytes, bytes.len() as u64);
        assert_eq!(persisted.width, Some(640));
        assert_eq!(persisted.height, Some(480));

        let thumb_path = persisted.thumbnail_path.expect("thumbnail expected");
        assert!(thumb_path.exists());
        assert_eq!(
            persisted.thumbnail_filename.as_deref(),
            Some(format!("{}_0_thumb.jpg", job_id()).as_str())
        );

        // Thumbnail fits the bounding box.
        let thumb = image::open(&thumb_path).unwrap();
        assert!(thumb.width() <= THUMBNAIL_MAX_DIM);
        assert!(thumb.height() <= THUMBNAIL_MAX_DIM);
    }

    #[test]
    fn undecodable_bytes_still_persist_without_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();

        let persisted = store.persist(job_id(), 1, b"not an image at all").unwrap();

        assert!(persisted.path.exists());
        assert!(persisted.thumbnail_filename.is_none());
        assert!(persisted.thumbnail_path.is_none());
        assert!(persisted.width.is_none());
        assert!(persisted.height.is_none());
    }

    #[test]
    fn repeated_persist_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();

        let first = store.persist(job_id(), 0, b"version one").unwrap();
        let second = store.persist(job_id(), 0, b"v2").unwrap();

        assert_eq!(first.path, second.path);
        assert_eq!(fs::read(&second.path).unwrap(), b"v2");
        // Exactly one non-directory entry in the root.
        let files: Vec<_> = fs::read_dir(store.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn store_creates_nested_thumbs_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("deep").join("generated")).unwrap();
        assert!(store.root().join(THUMBS_DIR).is_dir());
    }
}
