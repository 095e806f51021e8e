//! Proptest generators for property-based testing.

use proptest::prelude::*;

use bucketsync_core::ObjectKey;

/// Generate file contents up to `max_len` bytes.
pub fn contents(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a small chunk size.
pub fn chunk_size() -> impl Strategy<Value = usize> {
    1usize..=512
}

/// Generate one path segment that is a valid file name on every host.
pub fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9_-]{0,11}(\\.[a-z]{1,4})?"
}

/// Generate a relative path of 1 to `max_depth` segments.
pub fn relative_path(max_depth: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(segment(), 1..=max_depth.max(1))
}

/// Generate a key made of slash-joined segments.
pub fn object_key() -> impl Strategy<Value = ObjectKey> {
    relative_path(4).prop_map(|parts| ObjectKey::new(parts.join("/")))
}

/// Generate a tree as (relative path, contents) pairs with distinct paths.
///
/// Leaves are named `leaf.<n>.bin`, which no generated segment can be, so
/// a file never shadows a directory.
pub fn tree(max_files: usize, max_len: usize) -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    prop::collection::vec((relative_path(3), contents(max_len)), 0..=max_files).prop_map(|files| {
        files
            .into_iter()
            .enumerate()
            .map(|(i, (mut parts, body))| {
                parts.pop();
                parts.push(format!("leaf.{}.bin", i));
                (parts.join("/"), body)
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketsync_core::{fingerprint_bytes, ChunkHasher};

    proptest! {
        #[test]
        fn test_fingerprint_deterministic(data in contents(2048), chunk in chunk_size()) {
            let a = fingerprint_bytes(&data, chunk).unwrap();
            let b = fingerprint_bytes(&data, chunk).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn test_streaming_split_is_irrelevant(
            data in contents(2048),
            chunk in chunk_size(),
            split in 0usize..2048,
        ) {
            let split = split.min(data.len());
            let mut hasher = ChunkHasher::new(chunk).unwrap();
            hasher.update(&data[..split]);
            hasher.update(&data[split..]);
            let streamed = hasher.finish();

            if data.is_empty() {
                prop_assert!(streamed.is_none());
            } else {
                prop_assert_eq!(streamed.unwrap(), fingerprint_bytes(&data, chunk).unwrap());
            }
        }

        #[test]
        fn test_keys_have_no_empty_segments(key in object_key()) {
            prop_assert!(!key.as_str().starts_with('/'));
            prop_assert!(!key.as_str().ends_with('/'));
            prop_assert!(!key.as_str().contains("//"));
        }
    }
}
