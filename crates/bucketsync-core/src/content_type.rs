//! Content-type guessing from object keys.

use crate::key::ObjectKey;

/// Content type used when the extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Guess the MIME type of an object from its key's extension.
pub fn content_type_for(key: &ObjectKey) -> &'static str {
    mime_guess::from_path(key.as_str())
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}
