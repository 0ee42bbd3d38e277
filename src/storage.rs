pub mod blob_store;
pub use blob_store::{blob_key, BlobStore, FilesystemBlobStore};
