use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use surf::http::Mime;
use surf::{Body, StatusCode};
use url::Url;

use super::signature::sign;
use super::{
    check_envelope, ApiError, Arguments, Method, PhotoService, FILETYPE_NOT_RECOGNISED, UPLOAD,
};
use uploadr_api_structs::{PhotoId, UploadResponse};

pub const DEFAULT_ENDPOINT: &str = "https://api.flickr.com/services/rest/";
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://up.flickr.com/services/upload/";

#[derive(Clone, Debug)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
    pub auth_token: String,
}

/// [`PhotoService`] talking to the Flickr REST and upload endpoints over HTTP.
#[derive(Debug)]
pub struct FlickrClient {
    endpoint: Url,
    upload_endpoint: Url,
    credentials: Credentials,
}

impl FlickrClient {
    pub fn new(
        endpoint: &str,
        upload_endpoint: &str,
        credentials: Credentials,
    ) -> Result<Self, url::ParseError> {
        Ok(FlickrClient {
            endpoint: Url::parse(endpoint)?,
            upload_endpoint: Url::parse(upload_endpoint)?,
            credentials,
        })
    }

    fn signed(&self, args: Arguments) -> Arguments {
        sign(
            &self.credentials.api_key,
            &self.credentials.auth_token,
            &self.credentials.secret,
            args,
        )
    }

    fn request(&self, method: Method, args: &Arguments) -> Result<surf::RequestBuilder, ApiError> {
        let mut params = args.clone();
        params.insert("method", method.as_str().to_string());
        let params = self.signed(params);

        if method.is_write() {
            let body = Body::from_form(&params).map_err(ApiError::Encode)?;
            Ok(surf::post(self.endpoint.clone()).body(body))
        } else {
            let mut url = self.endpoint.clone();
            url.query_pairs_mut().extend_pairs(params.iter());
            Ok(surf::get(url))
        }
    }
}

/// Reads the response body, failing on anything but a 2xx status.
async fn read_body(mut response: surf::Response) -> Result<String, ApiError> {
    let status: StatusCode = response.status();
    let body = response.body_string().await.map_err(ApiError::Transport)?;
    if !status.is_success() {
        return Err(ApiError::Status { status, body });
    }
    Ok(body)
}

/// Whether the file content is in an image format we can recognise. The file
/// name plays no part in it.
pub fn is_image(path: &Path) -> std::io::Result<bool> {
    let reader = image::io::Reader::new(BufReader::new(File::open(path)?));
    let reader = reader.with_guessed_format()?;
    Ok(reader.format().is_some())
}

/// Reads the new photo ID from an upload response body.
fn upload_result(path: &Path, body: &str) -> Result<PhotoId, ApiError> {
    match check_envelope(UPLOAD, body) {
        Err(err) if err.remote_code() == Some(FILETYPE_NOT_RECOGNISED) => {
            return Err(ApiError::NotAnImage(path.to_path_buf()));
        },
        result => result?,
    }
    let uploaded: UploadResponse = quick_xml::de::from_str(body)?;
    Ok(uploaded.photoid)
}

/// Encodes the upload form, returning its boundary and the encoded body.
fn encode_upload_form(fields: &Arguments, path: &Path) -> Result<(String, Vec<u8>), ApiError> {
    let mut form = multipart::client::lazy::Multipart::new();
    for (name, value) in fields {
        form.add_text(*name, value.as_str());
    }
    form.add_file("photo", path);

    let mut prepared = form.prepare().map_err(|err| ApiError::Io(err.error))?;
    let mut data = Vec::new();
    prepared.read_to_end(&mut data)?;
    Ok((prepared.boundary().to_string(), data))
}

#[async_trait::async_trait]
impl PhotoService for FlickrClient {
    async fn execute(&self, method: Method, args: &Arguments) -> Result<String, ApiError> {
        log::debug!("Calling {} with {:?}", method, args);
        let response = self
            .request(method, args)?
            .await
            .map_err(ApiError::Transport)?;
        let body = read_body(response).await?;
        log::debug!("{} response: {}", method, body);

        check_envelope(method.as_str(), &body)?;
        Ok(body)
    }

    async fn upload(&self, path: &Path, title: &str) -> Result<PhotoId, ApiError> {
        if !is_image(path)? {
            return Err(ApiError::NotAnImage(path.to_path_buf()));
        }

        let mut fields = Arguments::new();
        fields.insert("title", title.to_string());
        let fields = self.signed(fields);

        let (boundary, data) = encode_upload_form(&fields, path)?;
        let mime = Mime::from_str(&format!("multipart/form-data; boundary={}", boundary))
            .map_err(ApiError::Encode)?;
        let mut body = Body::from_bytes(data);
        body.set_mime(mime);

        log::debug!("Uploading {} as {:?}", path.display(), title);
        let response = surf::post(self.upload_endpoint.clone())
            .body(body)
            .await
            .map_err(ApiError::Transport)?;
        let body = read_body(response).await?;
        log::debug!("Upload response: {}", body);

        upload_result(path, &body)
    }
}
