//! Interactive session: crawl workers and ownership of the merged dataset.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::avatar::AvatarCache;
use crate::client::ForumClient;
use crate::crawl::{collect_posts, collect_users, CrawlEvent, PostScope};
use crate::model::{Census, Post, User};

/// Spawns crawl workers: one for members, one for discussions.
#[derive(Debug, Clone)]
pub struct Crawler {
    client: Arc<ForumClient>,
    avatars: Arc<AvatarCache>,
    pacing: Duration,
}

impl Crawler {
    #[must_use]
    pub fn new(client: Arc<ForumClient>, avatars: Arc<AvatarCache>, pacing: Duration) -> Self {
        Self {
            client,
            avatars,
            pacing,
        }
    }

    /// Launch both workers against the network.
    ///
    /// Each worker is a sequential pipeline of paginated fetches; the two run
    /// concurrently with each other and never block the caller. The event
    /// channel closes once both have finished.
    #[must_use]
    pub fn start(&self, scope: PostScope) -> RunningCrawl {
        let (events, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let users = {
            let client = Arc::clone(&self.client);
            let avatars = Arc::clone(&self.avatars);
            let events = events.clone();
            let cancel = cancel.clone();
            let pacing = self.pacing;
            tokio::spawn(async move {
                collect_users(&client, &avatars, pacing, cancel, &events).await
            })
        };

        let posts = {
            let client = Arc::clone(&self.client);
            let cancel = cancel.clone();
            let pacing = self.pacing;
            tokio::spawn(async move {
                collect_posts(&client, &scope, pacing, cancel, &events).await
            })
        };

        RunningCrawl {
            events: receiver,
            cancel,
            users,
            posts,
        }
    }
}

/// Everything a user worker and a post worker produced.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub users: Vec<User>,
    pub posts: Vec<Post>,
}

/// Handle on an in-flight crawl.
#[derive(Debug)]
pub struct RunningCrawl {
    events: mpsc::UnboundedReceiver<CrawlEvent>,
    cancel: CancellationToken,
    users: JoinHandle<Vec<User>>,
    posts: JoinHandle<Vec<Post>>,
}

impl RunningCrawl {
    /// Ask both workers to stop once their in-flight request settles.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next progress event; `None` once both workers have finished.
    pub async fn next_event(&mut self) -> Option<CrawlEvent> {
        self.events.recv().await
    }

    /// Wait for both workers. A worker that panicked contributes nothing,
    /// keeping the partial-result contract.
    pub async fn join(self) -> CrawlOutcome {
        CrawlOutcome {
            users: self.users.await.unwrap_or_default(),
            posts: self.posts.await.unwrap_or_default(),
        }
    }
}

/// One interactive session.
///
/// Owns the census; workers only ever hand results back by value, and the
/// census is replaced wholesale after a crawl signals full completion. No
/// partial writes are visible mid-crawl apart from progress events.
#[derive(Debug)]
pub struct Session {
    crawler: Crawler,
    census: Census,
    active: Option<RunningCrawl>,
}

impl Session {
    #[must_use]
    pub fn new(crawler: Crawler) -> Self {
        Self {
            crawler,
            census: Census::default(),
            active: None,
        }
    }

    /// Start a crawl, superseding any crawl still in flight.
    ///
    /// The superseded workers stop cooperatively and their output is
    /// discarded; in-flight requests finish or time out on their own.
    pub fn start_crawl(&mut self, scope: PostScope) {
        if let Some(prior) = self.active.take() {
            prior.cancel();
        }
        self.active = Some(self.crawler.start(scope));
    }

    /// Ask the active workers to stop after their current request.
    pub fn cancel_active(&self) {
        if let Some(run) = &self.active {
            run.cancel();
        }
    }

    /// Next progress event from the active crawl; `None` when it has
    /// finished or none is active.
    pub async fn next_event(&mut self) -> Option<CrawlEvent> {
        match self.active.as_mut() {
            Some(run) => run.next_event().await,
            None => None,
        }
    }

    /// Join the active crawl and replace the census with its merged output.
    pub async fn complete(&mut self) {
        if let Some(run) = self.active.take() {
            let outcome = run.join().await;
            self.census = Census::merged(outcome.users, outcome.posts);
        }
    }

    #[must_use]
    pub fn census(&self) -> &Census {
        &self.census
    }
}
