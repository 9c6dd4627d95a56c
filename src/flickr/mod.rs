use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use uploadr_api_structs::{Envelope, PhotoId};

pub mod client;
#[cfg(test)]
pub(crate) mod mock;
pub mod signature;

/// Request arguments, kept sorted for signing.
pub type Arguments = BTreeMap<&'static str, String>;

/// Remote error code for `flickr.collections.addSet` when the set is already a member.
pub const SET_ALREADY_IN_COLLECTION: u32 = 4;
/// Remote error code for uploads whose file type isn't recognised.
pub const FILETYPE_NOT_RECOGNISED: u32 = 5;
const GENERAL_UPLOAD_FAILURE: u32 = 3;

/// Name reported for upload calls in [`ApiError::Remote`].
pub const UPLOAD: &str = "upload";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    PhotosetsGetList,
    PhotosetsGetPhotos,
    PhotosetsCreate,
    PhotosetsAddPhoto,
    CollectionsGetTree,
    CollectionsCreate,
    CollectionsAddSet,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::PhotosetsGetList => "flickr.photosets.getList",
            Method::PhotosetsGetPhotos => "flickr.photosets.getPhotos",
            Method::PhotosetsCreate => "flickr.photosets.create",
            Method::PhotosetsAddPhoto => "flickr.photosets.addPhoto",
            Method::CollectionsGetTree => "flickr.collections.getTree",
            Method::CollectionsCreate => "flickr.collections.create",
            Method::CollectionsAddSet => "flickr.collections.addSet",
        }
    }

    /// Whether the call changes remote state and must be sent as a POST.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Method::PhotosetsCreate
                | Method::PhotosetsAddPhoto
                | Method::CollectionsCreate
                | Method::CollectionsAddSet
        )
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(surf::Error),
    #[error("couldn't encode request: {0}")]
    Encode(surf::Error),
    #[error("unexpected HTTP status {status}: {body}")]
    Status {
        status: surf::StatusCode,
        body: String,
    },
    #[error("{method} failed with code {code}: {message}")]
    Remote {
        method: String,
        code: u32,
        message: String,
    },
    #[error("{} is not an image", .0.display())]
    NotAnImage(PathBuf),
    #[error("couldn't parse response envelope: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Transport failures, 5xx responses and remote failures on the service's
    /// side. Remote codes that describe the request itself are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => status.is_server_error(),
            ApiError::Remote { method, code, .. } => !is_final_code(method, *code),
            _ => false,
        }
    }

    pub fn remote_code(&self) -> Option<u32> {
        match self {
            ApiError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Remote codes that another attempt can't change.
fn is_final_code(method: &str, code: u32) -> bool {
    match code {
        GENERAL_UPLOAD_FAILURE if method == UPLOAD => false,
        // Method-specific codes: not found, invalid arguments, limits, and the
        // tolerated ones. Also the signature and authentication codes.
        1..=99 => true,
        // Invalid API key, unknown format or method, malformed request or URL.
        100 | 111..=116 => true,
        _ => false,
    }
}

/// Checks the `<rsp stat="…">` envelope of a response body.
pub fn check_envelope(method: &str, body: &str) -> Result<(), ApiError> {
    let envelope: Envelope = quick_xml::de::from_str(body)?;
    if envelope.is_ok() {
        return Ok(());
    }

    let (code, message) = match envelope.err {
        Some(failure) => (failure.code, failure.msg),
        None => (0, format!("stat=\"{}\" without error details", envelope.stat)),
    };
    Err(ApiError::Remote {
        method: method.to_string(),
        code,
        message,
    })
}

/// Fixed retry policy: `retries` extra attempts, `delay` apart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Retry {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for Retry {
    fn default() -> Self {
        Retry {
            retries: 2,
            delay: Duration::from_secs(1),
        }
    }
}

impl Retry {
    pub async fn run<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, ApiError>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(err) if err.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    log::warn!(
                        "{} failed: {}; retrying in {:?} ({}/{})",
                        what,
                        err,
                        self.delay,
                        attempt,
                        self.retries
                    );
                    async_std::task::sleep(self.delay).await;
                },
                result => return result,
            }
        }
    }
}

/// The narrow interface to the photo service.
#[async_trait::async_trait]
pub trait PhotoService: Send + Sync {
    /// Calls a REST method and returns the raw `<rsp>` body of a successful call.
    async fn execute(&self, method: Method, args: &Arguments) -> Result<String, ApiError>;

    /// Uploads a photo file with the given title and returns the new photo ID.
    async fn upload(&self, path: &Path, title: &str) -> Result<PhotoId, ApiError>;

    async fn execute_with_retry(
        &self,
        retry: Retry,
        method: Method,
        args: &Arguments,
    ) -> Result<String, ApiError> {
        retry
            .run(method.as_str(), move || self.execute(method, args))
            .await
    }

    async fn upload_with_retry(
        &self,
        retry: Retry,
        path: &Path,
        title: &str,
    ) -> Result<PhotoId, ApiError> {
        let what = format!("upload of {}", path.display());
        retry.run(&what, move || self.upload(path, title)).await
    }
}
