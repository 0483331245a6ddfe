//! The merge step attaching discussions to their authors.

use std::collections::HashMap;

use crate::model::{Post, User};

/// Group `posts` under their owning users by author id.
///
/// Every user's group is cleared first, so repeated merges of the same
/// inputs converge to the same state. Posts whose author id is missing or
/// matches no collected user stay only in the flat collection. After
/// grouping, each user's `post_count` is recomputed from the attached group,
/// superseding the server-reported counter sum (`reported_post_count` keeps
/// that original value).
pub fn associate(users: &mut [User], posts: &[Post]) {
    for user in users.iter_mut() {
        user.posts.clear();
    }

    let index: HashMap<String, usize> = users
        .iter()
        .enumerate()
        .map(|(slot, user)| (user.id.clone(), slot))
        .collect();

    for post in posts {
        let Some(author) = post.author_id.as_deref() else {
            continue;
        };
        if let Some(&slot) = index.get(author) {
            users[slot].posts.push(post.clone());
        }
    }

    for user in users.iter_mut() {
        user.post_count = user.posts.len() as u64;
    }
}
