//! Collected entities and the merged dataset.

use chrono::NaiveDate;
use serde::Serialize;

use crate::associate::associate;
use crate::avatar::AvatarRef;

/// A forum member as assembled from the users endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar: AvatarRef,
    /// Day the account was created.
    pub registered_at: NaiveDate,
    /// Discussion + comment counters as reported by the server at collection
    /// time. Can diverge from `post_count` after the merge, since the server
    /// counts content the discussions endpoint never returns.
    pub reported_post_count: u64,
    /// Number of discussions attached to this user. Starts equal to
    /// `reported_post_count` and is recomputed by the association engine.
    pub post_count: u64,
    /// Discussions owned by this user; empty until association runs.
    pub posts: Vec<Post>,
}

/// A discussion as assembled from the discussions endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    /// Creation day, `None` when the server omitted the timestamp.
    pub created_at: Option<NaiveDate>,
    pub comment_count: u64,
    /// Authoring user id; may reference a user absent from the collected set.
    pub author_id: Option<String>,
}

/// The merged dataset of one crawl: every collected member plus the flat
/// discussion list, members owning their grouped discussions after the merge.
///
/// Owned by the interactive session and replaced wholesale by the next crawl.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Census {
    pub users: Vec<User>,
    pub posts: Vec<Post>,
}

impl Census {
    /// Merge freshly collected users and posts into a census.
    #[must_use]
    pub fn merged(mut users: Vec<User>, posts: Vec<Post>) -> Self {
        associate(&mut users, &posts);
        Self { users, posts }
    }
}

/// Truncate a server timestamp to its leading `YYYY-MM-DD` day.
///
/// The API emits RFC 3339 stamps; only the date part is kept, with no
/// timezone handling.
#[must_use]
pub fn parse_day(stamp: &str) -> Option<NaiveDate> {
    let day = stamp.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
