//! Paginated collection of members and discussions.

pub mod paginator;
pub mod posts;
pub mod users;

pub use paginator::{paginate, PageBatch, PageEnvelope, PageMeta, PageSource};
pub use posts::{collect_posts, PostScope};
pub use users::collect_users;

/// How far a collector has gotten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Records collected so far.
    pub collected: usize,
    /// Total reported by the server before the walk began, when it could be
    /// read.
    pub total: Option<u64>,
}

/// Progress and completion events emitted by crawl workers.
///
/// Sent over an unbounded channel so workers never block on a slow consumer;
/// a dropped receiver is silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlEvent {
    Users(Progress),
    Posts(Progress),
    UsersDone { collected: usize },
    PostsDone { collected: usize },
}
