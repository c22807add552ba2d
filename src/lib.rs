#![forbid(unsafe_code)]

pub mod cli;
pub mod error;
pub mod importer;
pub mod library;
pub mod logging;
pub mod markdown;
pub mod merge;
pub mod render;
pub mod settings;
pub mod store;
pub mod taxonomy;
pub mod tree;

pub use error::{ImportError, Result};
