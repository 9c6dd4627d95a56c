use std::path::PathBuf;
use std::time::Duration;

use structopt::StructOpt;
use thiserror::Error;

pub mod album;
pub mod collection;
pub mod flickr;
pub mod upload;

use flickr::client::{Credentials, FlickrClient, DEFAULT_ENDPOINT, DEFAULT_UPLOAD_ENDPOINT};
use flickr::{ApiError, PhotoService, Retry};
use upload::Uploaded;
use uploadr_api_structs::CollectionId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid endpoint URL: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("couldn't parse response: {0}")]
    Xml(#[from] quick_xml::DeError),
}

impl From<Error> for u8 {
    fn from(error: Error) -> u8 {
        match error {
            Error::Endpoint(_) => 2,
            Error::Io(_) => 3,
            Error::Api(_) => 4,
            Error::Xml(_) => 5,
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(about = "Upload a directory of photos into a Flickr album")]
pub struct Args {
    /// Album to upload into. Created on the first upload if missing,
    /// named after the directory when not given.
    #[structopt(long, env = "UPLOADR_ALBUM")]
    album: Option<String>,

    /// Collection to file the album into, created if missing.
    #[structopt(long, env = "UPLOADR_COLLECTION")]
    collection: Option<String>,

    /// Flickr API key.
    #[structopt(long, env = "UPLOADR_API_KEY", hide_env_values = true)]
    api_key: String,
    /// Flickr API shared secret.
    #[structopt(long, env = "UPLOADR_SECRET", hide_env_values = true)]
    secret: String,
    /// Flickr authentication token.
    #[structopt(long, env = "UPLOADR_AUTH_TOKEN", hide_env_values = true)]
    auth_token: String,

    /// Flickr REST endpoint.
    #[structopt(long, default_value = DEFAULT_ENDPOINT, env = "UPLOADR_ENDPOINT")]
    endpoint: String,
    /// Flickr upload endpoint.
    #[structopt(
        long,
        default_value = DEFAULT_UPLOAD_ENDPOINT,
        env = "UPLOADR_UPLOAD_ENDPOINT"
    )]
    upload_endpoint: String,

    /// Number of times a failed call is retried.
    #[structopt(long, default_value = "2")]
    retries: u32,
    /// Delay between retries.
    #[structopt(long, default_value = "1s", parse(try_from_str = humantime::parse_duration))]
    retry_delay: Duration,

    /// Directory of photos to upload.
    #[structopt(name = "DIR", parse(from_os_str))]
    dir: PathBuf,
}

impl Args {
    pub fn target(&self) -> Target {
        Target {
            dir: self.dir.clone(),
            album: self.album.clone().filter(|a| !a.is_empty()),
            collection: self.collection.clone().filter(|c| !c.is_empty()),
        }
    }

    pub fn retry(&self) -> Retry {
        Retry {
            retries: self.retries,
            delay: self.retry_delay,
        }
    }

    pub fn client(&self) -> Result<FlickrClient, Error> {
        let credentials = Credentials {
            api_key: self.api_key.clone(),
            secret: self.secret.clone(),
            auth_token: self.auth_token.clone(),
        };
        Ok(FlickrClient::new(
            &self.endpoint,
            &self.upload_endpoint,
            credentials,
        )?)
    }
}

/// What to upload and where to put it.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub dir: PathBuf,
    pub album: Option<String>,
    pub collection: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct Report {
    pub uploaded: Uploaded,
    /// The collection the album was filed into.
    pub collection: Option<CollectionId>,
}

/// Resolves the album, uploads what's missing and files the album into the
/// collection. The first error that isn't tolerated ends the run.
pub async fn run<S: PhotoService + ?Sized>(
    service: &S,
    target: &Target,
    retry: Retry,
) -> Result<Report, Error> {
    let existing = match &target.album {
        Some(title) => album::find_album(service, retry, title).await?,
        None => None,
    };

    let uploaded = upload::upload_dir(
        service,
        retry,
        &target.dir,
        target.album.as_deref(),
        existing,
    )
    .await?;

    let collection = match (&uploaded.album, &target.collection) {
        (Some(album), Some(title)) => {
            Some(collection::attach_album(service, retry, album, title).await?)
        },
        _ => None,
    };

    Ok(Report {
        uploaded,
        collection,
    })
}

pub async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::from_args();
    let client = args.client()?;
    let report = run(&client, &args.target(), args.retry()).await?;

    match &report.uploaded.album {
        Some(album) => log::info!(
            "Uploaded {} files, skipped {}; album {:?} ({}) has {} photos",
            report.uploaded.uploaded.len(),
            report.uploaded.skipped.len(),
            album.title,
            album.id,
            album.photos.len()
        ),
        None => log::info!(
            "Nothing uploaded, skipped {} files",
            report.uploaded.skipped.len()
        ),
    }

    Ok(())
}
