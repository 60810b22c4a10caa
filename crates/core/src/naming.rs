//! Object storage naming for page illustrations.
//!
//! Keys are scoped by story and page id so every page owns exactly one
//! object. Re-running an illustration overwrites the same key instead of
//! leaving orphans behind.

use crate::types::DbId;

/// Bucket holding every page illustration.
pub const IMAGES_BUCKET: &str = "images";

/// Build the object key for a page illustration.
///
/// Convention: `{story_id}/{page_id}.{extension}`
///
/// ```
/// use curico_core::naming::page_image_key;
///
/// assert_eq!(page_image_key(7, 42, "png"), "7/42.png");
/// ```
pub fn page_image_key(story_id: DbId, page_id: DbId, extension: &str) -> String {
    format!("{story_id}/{page_id}.{}", extension.trim_start_matches('.'))
}

/// Join a public base URL and an object key without doubling slashes.
pub fn public_object_url(base_url: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}
