//! Shapes of the Flickr REST responses used by uploadr.
//!
//! Every response is wrapped in a `<rsp stat="…">` element. The `*Response`
//! structs describe the whole document, the rest describe the elements inside
//! it.

use serde::Deserialize;

pub type PhotoId = String;
pub type PhotosetId = String;
pub type CollectionId = String;

/// The `<rsp>` envelope, only looking at the status and the failure element.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub stat: String,
    pub err: Option<Failure>,
}

impl Envelope {
    pub fn is_ok(&self) -> bool {
        self.stat == "ok"
    }
}

/// `<err code="4" msg="Set already in collection"/>`
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Failure {
    pub code: u32,
    pub msg: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    #[serde(default)]
    pub title: String,
}

/// A photoset as listed by `flickr.photosets.getList`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PhotosetSummary {
    pub id: PhotosetId,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct PhotosetList {
    pub page: Option<u32>,
    pub pages: Option<u32>,
    #[serde(rename = "photoset", default)]
    pub photosets: Vec<PhotosetSummary>,
}

#[derive(Debug, Deserialize)]
pub struct PhotosetListResponse {
    pub photosets: PhotosetList,
}

/// A page of photoset members as returned by `flickr.photosets.getPhotos`.
#[derive(Debug, Deserialize)]
pub struct PhotosetPhotos {
    pub id: PhotosetId,
    pub page: Option<u32>,
    pub pages: Option<u32>,
    #[serde(rename = "photo", default)]
    pub photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
pub struct PhotosetPhotosResponse {
    pub photoset: PhotosetPhotos,
}

#[derive(Debug, Deserialize)]
pub struct CreatedPhotoset {
    pub id: PhotosetId,
}

#[derive(Debug, Deserialize)]
pub struct CreatedPhotosetResponse {
    pub photoset: CreatedPhotoset,
}

/// A photoset reference inside a collection.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CollectionSet {
    pub id: PhotosetId,
    #[serde(default)]
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "collection", default)]
    pub collections: Vec<Collection>,
    #[serde(rename = "set", default)]
    pub sets: Vec<CollectionSet>,
}

impl Collection {
    /// Depth-first search for a collection with exactly the given title.
    pub fn find_by_title(&self, title: &str) -> Option<&Collection> {
        if self.title == title {
            return Some(self);
        }
        self.collections.iter().find_map(|c| c.find_by_title(title))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CollectionTree {
    #[serde(rename = "collection", default)]
    pub collections: Vec<Collection>,
}

impl CollectionTree {
    pub fn find_by_title(&self, title: &str) -> Option<&Collection> {
        self.collections.iter().find_map(|c| c.find_by_title(title))
    }
}

#[derive(Debug, Deserialize)]
pub struct CollectionTreeResponse {
    #[serde(default)]
    pub collections: CollectionTree,
}

#[derive(Debug, Deserialize)]
pub struct CreatedCollection {
    pub id: CollectionId,
}

#[derive(Debug, Deserialize)]
pub struct CreatedCollectionResponse {
    pub collection: CreatedCollection,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub photoid: PhotoId,
}
