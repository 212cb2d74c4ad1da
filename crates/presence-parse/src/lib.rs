//! Filename-based content classification.
//!
//! Turns a raw media title (usually a file name) into a [`ContentClassification`]:
//! TV episode, movie, anime episode, or a generic video with a cleaned title.
//! Everything here is pure and never fails.

pub mod classify;
pub mod content;

pub use classify::{classify, clean_title};
pub use content::{ContentClassification, ContentMetadata, ContentType};
