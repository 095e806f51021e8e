//! Golden fingerprint vectors.
//!
//! Expected values are the ETags an S3-compatible store reports for the
//! same bytes uploaded with the same part size.

use bucketsync_core::CHUNK_SIZE;

/// How a vector's content is generated.
#[derive(Debug, Clone, Copy)]
pub enum VectorContent {
    /// The given bytes.
    Literal(&'static [u8]),
    /// `len` copies of one byte.
    Repeat(u8, usize),
    /// `len` bytes where byte `i` is `i % 251`.
    Pattern(usize),
}

impl VectorContent {
    pub fn bytes(&self) -> Vec<u8> {
        match *self {
            VectorContent::Literal(bytes) => bytes.to_vec(),
            VectorContent::Repeat(byte, len) => vec![byte; len],
            VectorContent::Pattern(len) => pattern(len),
        }
    }

    pub fn len(&self) -> usize {
        match *self {
            VectorContent::Literal(bytes) => bytes.len(),
            VectorContent::Repeat(_, len) | VectorContent::Pattern(len) => len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deterministic filler bytes.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub content: VectorContent,
    /// Chunk size used for both hashing and upload parts.
    pub chunk_size: usize,
    /// Expected fingerprint.
    pub expected: &'static str,
}

impl GoldenVector {
    /// Whether the vector spans enough bytes to be slow in debug builds.
    pub fn is_large(&self) -> bool {
        self.content.len() > 1024 * 1024
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty file",
            content: VectorContent::Literal(b""),
            chunk_size: CHUNK_SIZE,
            expected: "d41d8cd98f00b204e9800998ecf8427e",
        },
        GoldenVector {
            name: "two bytes",
            content: VectorContent::Literal(b"hi"),
            chunk_size: CHUNK_SIZE,
            expected: "49f68a5c8493ec2c0bf489821c21fc3b",
        },
        GoldenVector {
            name: "hello world",
            content: VectorContent::Literal(b"hello world"),
            chunk_size: CHUNK_SIZE,
            expected: "5eb63bbbe01eeed093cb22bb8f5acdc3",
        },
        GoldenVector {
            name: "exactly one small chunk",
            content: VectorContent::Pattern(256),
            chunk_size: 256,
            expected: "f37caf20c55a8b74b224b3164409ad2d",
        },
        GoldenVector {
            name: "one byte past a small chunk",
            content: VectorContent::Pattern(257),
            chunk_size: 256,
            expected: "fbdbf724907c73549c7a2d970690db0f-2",
        },
        GoldenVector {
            name: "four small chunks",
            content: VectorContent::Pattern(1000),
            chunk_size: 256,
            expected: "32aad4f5270dd42bfa3fd29f11e7e002-4",
        },
        GoldenVector {
            name: "one-byte chunks",
            content: VectorContent::Repeat(0, 5),
            chunk_size: 1,
            expected: "b26ebf8d47f990001489470c0b4f15b3-5",
        },
        GoldenVector {
            name: "exactly one default chunk",
            content: VectorContent::Pattern(CHUNK_SIZE),
            chunk_size: CHUNK_SIZE,
            expected: "727943cf3cd0ed31e7fbe1bab434d5eb",
        },
        GoldenVector {
            name: "one byte past a default chunk",
            content: VectorContent::Pattern(CHUNK_SIZE + 1),
            chunk_size: CHUNK_SIZE,
            expected: "207d5ad937887dd79678eed060f706be-2",
        },
        GoldenVector {
            name: "17 MiB",
            content: VectorContent::Pattern(17 * 1024 * 1024),
            chunk_size: CHUNK_SIZE,
            expected: "b86e9527cc4867474348929cdbafaec9-3",
        },
    ]
}
