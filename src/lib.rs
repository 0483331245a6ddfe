//! Forum census library.
//!
//! Walks a Flarum-style forum's cursor-paginated JSON API, collects members
//! and discussions, caches avatars on disk, merges the two collections by
//! author identity, and exposes filtered/sorted views of the result.

pub mod associate;
pub mod avatar;
pub mod client;
pub mod config;
pub mod constants;
pub mod cookie;
pub mod crawl;
pub mod error;
pub mod model;
pub mod session;
pub mod view;
