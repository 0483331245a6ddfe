//! Discussion collection over the discussions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::ForumClient;
use crate::constants::UNTITLED_TITLE;
use crate::crawl::paginator::{paginate, PageEnvelope, PageSource};
use crate::crawl::{CrawlEvent, Progress};
use crate::error::FetchError;
use crate::model::{parse_day, Post};

/// Which slice of the discussions endpoint a crawl covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostScope {
    /// Every discussion on the forum.
    All,
    /// Only discussions started by the given author id.
    ByAuthor(String),
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawDiscussion {
    id: String,
    #[serde(default)]
    attributes: DiscussionAttributes,
    #[serde(default)]
    relationships: DiscussionRelationships,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DiscussionAttributes {
    title: Option<String>,
    created_at: Option<String>,
    comment_count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct DiscussionRelationships {
    #[serde(default)]
    user: Option<RelationshipRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelationshipRef {
    data: Option<RelationshipData>,
}

#[derive(Debug, Deserialize)]
struct RelationshipData {
    id: String,
}

struct DiscussionPages<'a> {
    client: &'a ForumClient,
    scope: &'a PostScope,
}

#[async_trait]
impl PageSource for DiscussionPages<'_> {
    type Record = RawDiscussion;

    async fn fetch_page(&self, page: u32) -> Result<PageEnvelope<RawDiscussion>, FetchError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let PostScope::ByAuthor(author) = self.scope {
            query.push(("filter[author]", author.clone()));
        }
        query.push(("page[number]", page.to_string()));
        self.client.get_json("/api/discussions", &query).await
    }
}

/// Collect every discussion within `scope`.
///
/// Same pagination, pacing, and partial-failure behavior as the member
/// collector, with identically shaped progress events.
pub async fn collect_posts(
    client: &ForumClient,
    scope: &PostScope,
    pacing: Duration,
    cancel: CancellationToken,
    events: &mpsc::UnboundedSender<CrawlEvent>,
) -> Vec<Post> {
    let source = DiscussionPages { client, scope };
    let stream = paginate(&source, pacing, cancel);
    tokio::pin!(stream);

    let mut posts = Vec::new();
    while let Some(batch) = stream.next().await {
        for raw in batch.records {
            posts.push(build_post(raw));
            let _ = events.send(CrawlEvent::Posts(Progress {
                collected: posts.len(),
                total: batch.total,
            }));
        }
    }

    let _ = events.send(CrawlEvent::PostsDone {
        collected: posts.len(),
    });
    posts
}

fn build_post(raw: RawDiscussion) -> Post {
    let attrs = raw.attributes;
    Post {
        id: raw.id,
        title: attrs
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED_TITLE.to_string()),
        created_at: attrs.created_at.as_deref().and_then(parse_day),
        comment_count: attrs.comment_count,
        author_id: raw
            .relationships
            .user
            .and_then(|rel| rel.data)
            .map(|data| data.id),
    }
}
