//! Unsplash featured-image fetcher - attaches a matching photo to draft posts
//!
//! When the host saves a draft post that has a title and no featured image,
//! this crate searches Unsplash for a photo matching the title, re-encodes it
//! as PNG, and attaches it to the post as the featured image through the
//! host's media library.

pub mod attach;
pub mod error;
pub mod events;
pub mod guard;
pub mod image;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod settings;
pub mod trigger;
pub mod unsplash;

pub use error::{Error, Result};
