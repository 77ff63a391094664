//! Upload of finished recordings
//!
//! The handoff names the recording, writes it to the object store and
//! derives the shareable URL.

pub mod handoff;
pub mod naming;
pub mod s3;
pub mod store;

pub use handoff::{UploadHandoff, UploadResult, UrlDerivation};
pub use naming::{ObjectNamer, CONTENT_TYPE};
pub use s3::S3Store;
pub use store::{ObjectStore, PutRequest, StoredObject};
