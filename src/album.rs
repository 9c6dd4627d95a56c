use std::collections::HashSet;
use std::path::Path;

use uploadr_api_structs::{
    CreatedPhotosetResponse, Photo, PhotosetId, PhotosetList, PhotosetListResponse,
    PhotosetPhotos, PhotosetPhotosResponse, PhotosetSummary,
};

use crate::flickr::{Arguments, Method, PhotoService, Retry};
use crate::Error;

/// Page size requested from the listing methods; the largest Flickr allows.
const PER_PAGE: &str = "500";

/// A remote photoset and the photos known to be in it.
#[derive(Clone, Debug, PartialEq)]
pub struct Album {
    pub id: PhotosetId,
    pub title: String,
    pub photos: Vec<Photo>,
}

impl Album {
    pub fn titles(&self) -> HashSet<String> {
        self.photos.iter().map(|p| p.title.clone()).collect()
    }
}

/// Name of the album to create: the explicit name, falling back to the
/// directory's base name.
pub fn album_title(name: Option<&str>, dir: &Path) -> String {
    if let Some(name) = name {
        return name.to_string();
    }

    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            dir.canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| dir.display().to_string())
}

fn page_args(page: u32) -> Arguments {
    let mut args = Arguments::new();
    args.insert("page", page.to_string());
    args.insert("per_page", PER_PAGE.to_string());
    args
}

fn has_more(page: Option<u32>, pages: Option<u32>) -> bool {
    match (page, pages) {
        (Some(page), Some(pages)) => page < pages,
        _ => false,
    }
}

async fn list_photosets<S: PhotoService + ?Sized>(
    service: &S,
    retry: Retry,
) -> Result<Vec<PhotosetSummary>, Error> {
    let mut photosets = Vec::new();
    let mut page = 1;
    loop {
        let body = service
            .execute_with_retry(retry, Method::PhotosetsGetList, &page_args(page))
            .await?;
        let list: PhotosetList = quick_xml::de::from_str::<PhotosetListResponse>(&body)?.photosets;
        photosets.extend(list.photosets);

        if !has_more(list.page, list.pages) {
            return Ok(photosets);
        }
        page += 1;
    }
}

async fn list_photos<S: PhotoService + ?Sized>(
    service: &S,
    retry: Retry,
    photoset_id: &str,
) -> Result<Vec<Photo>, Error> {
    let mut photos = Vec::new();
    let mut page = 1;
    loop {
        let mut args = page_args(page);
        args.insert("photoset_id", photoset_id.to_string());
        let body = service
            .execute_with_retry(retry, Method::PhotosetsGetPhotos, &args)
            .await?;
        let set: PhotosetPhotos = quick_xml::de::from_str::<PhotosetPhotosResponse>(&body)?.photoset;
        photos.extend(set.photos);

        if !has_more(set.page, set.pages) {
            return Ok(photos);
        }
        page += 1;
    }
}

/// Looks up an album by exact title, with its member photos.
pub async fn find_album<S: PhotoService + ?Sized>(
    service: &S,
    retry: Retry,
    title: &str,
) -> Result<Option<Album>, Error> {
    let summary = match list_photosets(service, retry)
        .await?
        .into_iter()
        .find(|s| s.title == title)
    {
        Some(summary) => summary,
        None => {
            log::info!("No album named {:?} yet", title);
            return Ok(None);
        },
    };

    let photos = list_photos(service, retry, &summary.id).await?;
    log::info!(
        "Found album {:?} ({}) with {} photos",
        summary.title,
        summary.id,
        photos.len()
    );
    Ok(Some(Album {
        id: summary.id,
        title: summary.title,
        photos,
    }))
}

/// Creates an album with `primary` as its cover photo.
pub async fn create_album<S: PhotoService + ?Sized>(
    service: &S,
    retry: Retry,
    title: &str,
    primary: Photo,
) -> Result<Album, Error> {
    let mut args = Arguments::new();
    args.insert("title", title.to_string());
    args.insert("primary_photo_id", primary.id.clone());

    let body = service
        .execute_with_retry(retry, Method::PhotosetsCreate, &args)
        .await?;
    let created: CreatedPhotosetResponse = quick_xml::de::from_str(&body)?;

    Ok(Album {
        id: created.photoset.id,
        title: title.to_string(),
        photos: vec![primary],
    })
}

pub async fn add_photo<S: PhotoService + ?Sized>(
    service: &S,
    retry: Retry,
    album: &mut Album,
    photo: Photo,
) -> Result<(), Error> {
    let mut args = Arguments::new();
    args.insert("photoset_id", album.id.clone());
    args.insert("photo_id", photo.id.clone());

    service
        .execute_with_retry(retry, Method::PhotosetsAddPhoto, &args)
        .await?;
    album.photos.push(photo);
    Ok(())
}
