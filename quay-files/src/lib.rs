//! File storage for the quay relay hub.

pub mod store;

pub use store::{FileStore, StoreError};
