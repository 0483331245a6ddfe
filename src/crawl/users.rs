//! Member collection over the users endpoint.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::avatar::AvatarCache;
use crate::client::ForumClient;
use crate::crawl::paginator::{paginate, PageEnvelope, PageSource};
use crate::crawl::{CrawlEvent, Progress};
use crate::error::FetchError;
use crate::model::{parse_day, User};

/// Hidden system account, unconditionally excluded from every listing.
const SYSTEM_ACCOUNT_ID: &str = "4";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawUser {
    id: String,
    #[serde(default)]
    attributes: UserAttributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserAttributes {
    username: String,
    avatar_url: Option<String>,
    join_time: Option<String>,
    discussion_count: u64,
    comment_count: u64,
}

struct UserPages<'a> {
    client: &'a ForumClient,
}

#[async_trait]
impl PageSource for UserPages<'_> {
    type Record = RawUser;

    async fn fetch_page(&self, page: u32) -> Result<PageEnvelope<RawUser>, FetchError> {
        self.client
            .get_json("/api/users", &[("page[number]", page.to_string())])
            .await
    }
}

/// Collect every member the users endpoint will serve.
///
/// Pagination, pacing, and partial-failure behavior come from the paginator;
/// this layer filters the system account, builds entities, resolves avatars,
/// and reports progress after each record.
pub async fn collect_users(
    client: &ForumClient,
    avatars: &AvatarCache,
    pacing: Duration,
    cancel: CancellationToken,
    events: &mpsc::UnboundedSender<CrawlEvent>,
) -> Vec<User> {
    let source = UserPages { client };
    let stream = paginate(&source, pacing, cancel);
    tokio::pin!(stream);

    let mut users = Vec::new();
    while let Some(batch) = stream.next().await {
        for raw in batch.records {
            if raw.id == SYSTEM_ACCOUNT_ID {
                continue;
            }
            let Some(user) = build_user(raw, avatars).await else {
                continue;
            };
            users.push(user);
            let _ = events.send(CrawlEvent::Users(Progress {
                collected: users.len(),
                total: batch.total,
            }));
        }
    }

    let _ = events.send(CrawlEvent::UsersDone {
        collected: users.len(),
    });
    users
}

async fn build_user(raw: RawUser, avatars: &AvatarCache) -> Option<User> {
    let attrs = raw.attributes;
    let Some(registered_at) = attrs.join_time.as_deref().and_then(parse_day) else {
        warn!(id = %raw.id, "skipping member without a usable join time");
        return None;
    };

    let avatar = avatars
        .resolve(attrs.avatar_url.as_deref(), &attrs.username)
        .await;
    let reported = attrs.discussion_count + attrs.comment_count;

    Some(User {
        id: raw.id,
        name: attrs.username,
        avatar,
        registered_at,
        reported_post_count: reported,
        post_count: reported,
        posts: Vec::new(),
    })
}
