//! Filtered, ordered projections of the census for display.
//!
//! Projection never touches the network; it is cheap enough to rerun on
//! every search keystroke or sort toggle against the in-memory dataset.

use crate::model::{Post, User};

/// Column the member view can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    RegisteredAt,
    PostCount,
}

/// Project the member set into a filtered, ordered view.
///
/// The name filter is a case-insensitive substring match; an empty search
/// keeps everyone. Sorting is stable, so members tying on the key keep their
/// pre-filter relative order.
#[must_use]
pub fn project<'a>(users: &'a [User], search: &str, key: SortKey, ascending: bool) -> Vec<&'a User> {
    let needle = search.to_lowercase();
    let mut view: Vec<&User> = users
        .iter()
        .filter(|u| needle.is_empty() || u.name.to_lowercase().contains(&needle))
        .collect();

    match (key, ascending) {
        (SortKey::RegisteredAt, true) => view.sort_by(|a, b| a.registered_at.cmp(&b.registered_at)),
        (SortKey::RegisteredAt, false) => view.sort_by(|a, b| b.registered_at.cmp(&a.registered_at)),
        (SortKey::PostCount, true) => view.sort_by(|a, b| a.post_count.cmp(&b.post_count)),
        (SortKey::PostCount, false) => view.sort_by(|a, b| b.post_count.cmp(&a.post_count)),
    }

    view
}

/// Order the flat discussion list by creation day.
///
/// Dateless discussions sort before any dated one when ascending.
#[must_use]
pub fn project_posts(posts: &[Post], ascending: bool) -> Vec<&Post> {
    let mut view: Vec<&Post> = posts.iter().collect();
    if ascending {
        view.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    } else {
        view.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
    view
}
