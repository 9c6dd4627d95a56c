use uploadr_api_structs::{CollectionId, CollectionTreeResponse, CreatedCollectionResponse};

use crate::album::Album;
use crate::flickr::{ApiError, Arguments, Method, PhotoService, Retry, SET_ALREADY_IN_COLLECTION};
use crate::Error;

async fn find_collection<S: PhotoService + ?Sized>(
    service: &S,
    retry: Retry,
    title: &str,
) -> Result<Option<CollectionId>, Error> {
    let body = service
        .execute_with_retry(retry, Method::CollectionsGetTree, &Arguments::new())
        .await?;
    let tree: CollectionTreeResponse = quick_xml::de::from_str(&body)?;
    Ok(tree.collections.find_by_title(title).map(|c| c.id.clone()))
}

async fn create_collection<S: PhotoService + ?Sized>(
    service: &S,
    retry: Retry,
    title: &str,
) -> Result<CollectionId, Error> {
    let mut args = Arguments::new();
    args.insert("title", title.to_string());
    let body = service
        .execute_with_retry(retry, Method::CollectionsCreate, &args)
        .await?;
    let created: CreatedCollectionResponse = quick_xml::de::from_str(&body)?;
    Ok(created.collection.id)
}

/// Files `album` into the collection titled `title`, creating the collection
/// if there is none. An album that is already a member is left alone.
pub async fn attach_album<S: PhotoService + ?Sized>(
    service: &S,
    retry: Retry,
    album: &Album,
    title: &str,
) -> Result<CollectionId, Error> {
    let collection_id = match find_collection(service, retry, title).await? {
        Some(id) => id,
        None => {
            log::info!("Creating collection {}", title);
            create_collection(service, retry, title).await?
        },
    };

    log::info!("Adding album {} to collection {}", album.id, collection_id);
    let mut args = Arguments::new();
    args.insert("collection_id", collection_id.clone());
    args.insert("photoset_id", album.id.clone());
    match service
        .execute_with_retry(retry, Method::CollectionsAddSet, &args)
        .await
    {
        Ok(_) => {},
        Err(ApiError::Remote {
            code: SET_ALREADY_IN_COLLECTION,
            ..
        }) => log::info!("Album already in collection"),
        Err(err) => return Err(err.into()),
    }

    Ok(collection_id)
}
