use std::path::{Path, PathBuf};

use uploadr_api_structs::Photo;

use crate::album::{add_photo, album_title, create_album, Album};
use crate::flickr::{ApiError, PhotoService, Retry};
use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyUploaded,
    NotAnImage,
    NotAFile,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadyUploaded => f.write_str("already uploaded"),
            SkipReason::NotAnImage => f.write_str("not an image"),
            SkipReason::NotAFile => f.write_str("not a file"),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Uploaded {
    /// The album the photos went into, if any was resolved or created.
    pub album: Option<Album>,
    pub created_album: bool,
    pub uploaded: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
}

/// Remote title for a local file: its name without the extension.
pub fn photo_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directory entries in file name order.
fn list_dir(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| {
            entry.map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
        })
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

/// Uploads every file of `dir` whose title isn't in `album` yet. Only the
/// photos `album` held before the run count, so local files sharing a stem
/// are all uploaded.
///
/// Without an album the first successful upload creates one, named `album_name`
/// or after the directory, with that photo as its cover. Later uploads are
/// added to it.
pub async fn upload_dir<S: PhotoService + ?Sized>(
    service: &S,
    retry: Retry,
    dir: &Path,
    album_name: Option<&str>,
    album: Option<Album>,
) -> Result<Uploaded, Error> {
    let existing = album.as_ref().map(Album::titles).unwrap_or_default();
    let mut uploaded = Uploaded {
        album,
        ..Default::default()
    };

    for (file_name, path) in list_dir(dir)? {
        if !path.is_file() {
            log::info!("Not a file: {}", file_name);
            uploaded.skipped.push((file_name, SkipReason::NotAFile));
            continue;
        }

        let title = photo_title(&path);
        if existing.contains(&title) {
            log::info!("Already exists: {}", file_name);
            uploaded.skipped.push((file_name, SkipReason::AlreadyUploaded));
            continue;
        }

        log::info!("Uploading {}", file_name);
        let photo_id = match service.upload_with_retry(retry, &path, &title).await {
            Ok(id) => id,
            Err(ApiError::NotAnImage(path)) => {
                log::info!("{} is not an image. Skipped...", path.display());
                uploaded.skipped.push((file_name, SkipReason::NotAnImage));
                continue;
            },
            Err(err) => return Err(err.into()),
        };
        let photo = Photo {
            id: photo_id,
            title,
        };

        match uploaded.album.as_mut() {
            None => {
                let title = album_title(album_name, dir);
                log::info!("Creating album {:?}", title);
                let album = create_album(service, retry, &title, photo).await?;
                log::info!("Photoset id: {}", album.id);
                uploaded.album = Some(album);
                uploaded.created_album = true;
            },
            Some(album) => {
                log::info!("Adding {} to album", photo.id);
                add_photo(service, retry, album, photo).await?;
            },
        }
        uploaded.uploaded.push(file_name);
    }

    Ok(uploaded)
}
