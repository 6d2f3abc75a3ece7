//! Blob persistence for uploaded files

mod blob;

pub use blob::*;
