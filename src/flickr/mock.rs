//! In-memory stand-in for a Flickr account, recording every call made to it.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{ApiError, Arguments, Method, PhotoService, SET_ALREADY_IN_COLLECTION, UPLOAD};
use uploadr_api_structs::{Photo, PhotoId};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Execute(Method, Arguments),
    Upload(PathBuf, String),
}

#[derive(Clone, Debug, Default)]
pub(crate) struct RemoteSet {
    pub id: String,
    pub title: String,
    pub primary: String,
    pub photos: Vec<Photo>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct RemoteCollection {
    pub id: String,
    pub title: String,
    pub sets: Vec<String>,
    pub children: Vec<RemoteCollection>,
}

impl RemoteCollection {
    fn find_mut(&mut self, id: &str) -> Option<&mut RemoteCollection> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"<collection id="{}" title="{}" description="">"#,
            self.id, self.title
        );
        for child in &self.children {
            xml.push_str(&child.to_xml());
        }
        for set in &self.sets {
            xml.push_str(&format!(r#"<set id="{}" title="" description=""/>"#, set));
        }
        xml.push_str("</collection>");
        xml
    }
}

#[derive(Debug, Default)]
struct State {
    sets: Vec<RemoteSet>,
    collections: Vec<RemoteCollection>,
    calls: Vec<Call>,
    titles: HashMap<String, String>,
    next_id: u32,
    transient_failures: u32,
}

impl State {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("{}", 1000 + self.next_id)
    }

    fn set_mut(&mut self, id: &str) -> Result<&mut RemoteSet, ApiError> {
        self.sets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| remote("photoset", 1, "Photoset not found"))
    }

    fn photo(&self, id: &str) -> Photo {
        Photo {
            id: id.to_string(),
            title: self.titles.get(id).cloned().unwrap_or_default(),
        }
    }

    fn collection_mut(&mut self, id: &str) -> Option<&mut RemoteCollection> {
        self.collections.iter_mut().find_map(|c| c.find_mut(id))
    }
}

fn remote(method: &str, code: u32, message: &str) -> ApiError {
    ApiError::Remote {
        method: method.to_string(),
        code,
        message: message.to_string(),
    }
}

fn arg<'a>(args: &'a Arguments, name: &str) -> &'a str {
    args.get(name).map(String::as_str).unwrap_or_default()
}

fn page_of<T: Clone>(items: &[T], page_size: usize, args: &Arguments) -> (Vec<T>, usize, usize) {
    let page: usize = arg(args, "page").parse().unwrap_or(1);
    let pages = std::cmp::max(1, (items.len() + page_size - 1) / page_size);
    let slice = items
        .iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect();
    (slice, page, pages)
}

pub(crate) struct MockService {
    state: Mutex<State>,
    not_images: HashSet<String>,
    failing: HashSet<String>,
    failing_method: Option<(Method, u32)>,
    page_size: usize,
}

impl MockService {
    pub fn new() -> Self {
        MockService {
            state: Mutex::new(State::default()),
            not_images: HashSet::new(),
            failing: HashSet::new(),
            failing_method: None,
            page_size: 500,
        }
    }

    /// Sets how many photosets or photos the listing calls return per page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Files with this name are rejected by [`PhotoService::upload`] as non-images.
    pub fn with_not_image(mut self, file_name: &str) -> Self {
        self.not_images.insert(file_name.to_string());
        self
    }

    /// Uploads of files with this name fail with a fatal remote error.
    pub fn with_failing_upload(mut self, file_name: &str) -> Self {
        self.failing.insert(file_name.to_string());
        self
    }

    /// Calls of `method` fail with the given remote error code.
    pub fn with_failing_method(mut self, method: Method, code: u32) -> Self {
        self.failing_method = Some((method, code));
        self
    }

    /// Fails the next `count` calls with a retryable error.
    pub fn with_transient_failures(self, count: u32) -> Self {
        self.state.lock().unwrap().transient_failures = count;
        self
    }

    pub fn with_set(self, title: &str, photo_titles: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id();
            let photos: Vec<Photo> = photo_titles
                .iter()
                .map(|title| Photo {
                    id: state.next_id(),
                    title: title.to_string(),
                })
                .collect();
            state.sets.push(RemoteSet {
                id,
                title: title.to_string(),
                primary: photos.first().map(|p| p.id.clone()).unwrap_or_default(),
                photos,
            });
        }
        self
    }

    pub fn with_collection(self, collection: RemoteCollection) -> Self {
        self.state.lock().unwrap().collections.push(collection);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn executed(&self, method: Method) -> Vec<Arguments> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Execute(m, args) if m == method => Some(args),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Upload(path, _) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn sets(&self) -> Vec<RemoteSet> {
        self.state.lock().unwrap().sets.clone()
    }

    pub fn set_id(&self, title: &str) -> Option<String> {
        self.sets()
            .into_iter()
            .find(|s| s.title == title)
            .map(|s| s.id)
    }

    pub fn collections(&self) -> Vec<RemoteCollection> {
        self.state.lock().unwrap().collections.clone()
    }

    fn respond(&self, state: &mut State, method: Method, args: &Arguments) -> Result<String, ApiError> {
        let name = method.as_str();
        let body = match method {
            Method::PhotosetsGetList => {
                let (sets, page, pages) = page_of(&state.sets, self.page_size, args);
                let mut xml = format!(r#"<photosets page="{}" pages="{}">"#, page, pages);
                for set in sets {
                    xml.push_str(&format!(
                        r#"<photoset id="{}" primary="{}"><title>{}</title><description/></photoset>"#,
                        set.id, set.primary, set.title
                    ));
                }
                xml.push_str("</photosets>");
                xml
            },
            Method::PhotosetsGetPhotos => {
                let id = arg(args, "photoset_id").to_string();
                let photos = state.set_mut(&id)?.photos.clone();
                let (photos, page, pages) = page_of(&photos, self.page_size, args);
                let mut xml = format!(
                    r#"<photoset id="{}" page="{}" pages="{}">"#,
                    id, page, pages
                );
                for photo in photos {
                    xml.push_str(&format!(
                        r#"<photo id="{}" secret="x" title="{}"/>"#,
                        photo.id, photo.title
                    ));
                }
                xml.push_str("</photoset>");
                xml
            },
            Method::PhotosetsCreate => {
                let id = state.next_id();
                let primary = state.photo(arg(args, "primary_photo_id"));
                state.sets.push(RemoteSet {
                    id: id.clone(),
                    title: arg(args, "title").to_string(),
                    primary: primary.id.clone(),
                    photos: vec![primary],
                });
                format!(r#"<photoset id="{}" url="https://example.com/sets/{}/"/>"#, id, id)
            },
            Method::PhotosetsAddPhoto => {
                let photo = state.photo(arg(args, "photo_id"));
                state.set_mut(arg(args, "photoset_id"))?.photos.push(photo);
                String::new()
            },
            Method::CollectionsGetTree => {
                let mut xml = "<collections>".to_string();
                for collection in &state.collections {
                    xml.push_str(&collection.to_xml());
                }
                xml.push_str("</collections>");
                xml
            },
            Method::CollectionsCreate => {
                let id = format!("1-{}", state.next_id());
                state.collections.push(RemoteCollection {
                    id: id.clone(),
                    title: arg(args, "title").to_string(),
                    ..Default::default()
                });
                format!(r#"<collection id="{}"/>"#, id)
            },
            Method::CollectionsAddSet => {
                let set_id = arg(args, "photoset_id").to_string();
                let collection = state
                    .collection_mut(arg(args, "collection_id"))
                    .ok_or_else(|| remote(name, 1, "Collection not found"))?;
                if collection.sets.contains(&set_id) {
                    return Err(remote(
                        name,
                        SET_ALREADY_IN_COLLECTION,
                        "Set already in collection",
                    ));
                }
                collection.sets.push(set_id);
                String::new()
            },
        };
        Ok(format!(r#"<rsp stat="ok">{}</rsp>"#, body))
    }
}

fn transient(state: &mut State) -> Result<(), ApiError> {
    if state.transient_failures > 0 {
        state.transient_failures -= 1;
        return Err(ApiError::Status {
            status: surf::StatusCode::BadGateway,
            body: String::new(),
        });
    }
    Ok(())
}

impl MockService {
    fn handle_execute(&self, method: Method, args: &Arguments) -> Result<String, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Execute(method, args.clone()));
        transient(&mut state)?;
        if let Some((failing, code)) = self.failing_method {
            if failing == method {
                return Err(remote(method.as_str(), code, "Failure"));
            }
        }
        self.respond(&mut state, method, args)
    }

    fn handle_upload(&self, path: &Path, title: &str) -> Result<PhotoId, ApiError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::Upload(path.to_path_buf(), title.to_string()));
        transient(&mut state)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.not_images.contains(&file_name) {
            return Err(ApiError::NotAnImage(path.to_path_buf()));
        }
        if self.failing.contains(&file_name) {
            return Err(remote(UPLOAD, 6, "User limit exceeded"));
        }

        let id = state.next_id();
        state.titles.insert(id.clone(), title.to_string());
        Ok(id)
    }
}

#[async_trait::async_trait]
impl PhotoService for MockService {
    async fn execute(&self, method: Method, args: &Arguments) -> Result<String, ApiError> {
        self.handle_execute(method, args)
    }

    async fn upload(&self, path: &Path, title: &str) -> Result<PhotoId, ApiError> {
        self.handle_upload(path, title)
    }
}
