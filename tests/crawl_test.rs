//! Integration tests for the member and discussion collectors.

use forum_census::avatar::AvatarCache;
use forum_census::client::ForumClient;
use forum_census::config::Config;
use forum_census::crawl::{collect_posts, collect_users, CrawlEvent, PostScope, Progress};
use forum_census::model::{Post, User};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer, temp_dir: &TempDir) -> Config {
    Config {
        base_url: server.uri(),
        avatar_dir: temp_dir.path().join("avatars"),
        default_avatar_url: format!("{}/default.png", server.uri()),
        ..Config::for_testing()
    }
}

fn user_record(id: &str, username: &str, join_time: &str) -> serde_json::Value {
    json!({
        "id": id,
        "attributes": {
            "username": username,
            "avatarUrl": null,
            "joinTime": join_time,
            "discussionCount": 2,
            "commentCount": 3,
        }
    })
}

fn discussion_record(id: &str, title: Option<&str>, author: Option<&str>) -> serde_json::Value {
    let mut record = json!({
        "id": id,
        "attributes": {
            "title": title,
            "createdAt": "2023-06-01T12:00:00+00:00",
            "commentCount": 1,
        }
    });
    if let Some(author) = author {
        record["relationships"] = json!({ "user": { "data": { "type": "users", "id": author } } });
    }
    record
}

fn page_body(records: Vec<serde_json::Value>, total: u64) -> serde_json::Value {
    json!({ "data": records, "meta": { "total": total } })
}

async fn crawl_users(config: &Config, cookie: Option<String>) -> (Vec<User>, Vec<CrawlEvent>) {
    std::fs::create_dir_all(&config.avatar_dir).expect("Failed to create avatar dir");
    let client = ForumClient::new(config, cookie).expect("Failed to build client");
    let avatars = AvatarCache::new(config).expect("Failed to build avatar cache");
    let (events, mut receiver) = mpsc::unbounded_channel();

    let users = collect_users(
        &client,
        &avatars,
        config.page_delay,
        CancellationToken::new(),
        &events,
    )
    .await;
    drop(events);

    let mut seen = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        seen.push(event);
    }
    (users, seen)
}

async fn crawl_posts(config: &Config, scope: PostScope) -> (Vec<Post>, Vec<CrawlEvent>) {
    let client = ForumClient::new(config, None).expect("Failed to build client");
    let (events, mut receiver) = mpsc::unbounded_channel();

    let posts = collect_posts(
        &client,
        &scope,
        config.page_delay,
        CancellationToken::new(),
        &events,
    )
    .await;
    drop(events);

    let mut seen = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        seen.push(event);
    }
    (posts, seen)
}

#[tokio::test]
async fn test_users_walk_stops_on_empty_page() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("page[number]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
            vec![
                user_record("1", "alice", "2020-01-05T00:00:00+00:00"),
                user_record("2", "bob", "2021-03-09T00:00:00+00:00"),
            ],
            10,
        )))
        .expect(2) // preliminary total probe, then the walk itself
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("page[number]", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
            vec![
                user_record("5", "carol", "2022-07-20T00:00:00+00:00"),
                user_record("6", "dave", "2022-08-01T00:00:00+00:00"),
            ],
            10,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("page[number]", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![], 10)))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server, &temp_dir);
    let (users, events) = crawl_users(&config, None).await;

    let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["alice", "bob", "carol", "dave"]);
    // discussionCount + commentCount
    assert_eq!(users[0].reported_post_count, 5);
    assert_eq!(users[0].post_count, 5);

    // progress finishes at the collected count against the reported total
    assert!(events.contains(&CrawlEvent::Users(Progress {
        collected: 4,
        total: Some(10),
    })));
    assert_eq!(events.last(), Some(&CrawlEvent::UsersDone { collected: 4 }));
}

#[tokio::test]
async fn test_users_system_account_is_filtered() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("page[number]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
            vec![
                user_record("3", "alice", "2020-01-05T00:00:00+00:00"),
                user_record("4", "system", "2019-01-01T00:00:00+00:00"),
                user_record("5", "bob", "2021-03-09T00:00:00+00:00"),
            ],
            3,
        )))
        .mount(&server)
        .await;

    let config = test_config(&server, &temp_dir);
    let (users, _) = crawl_users(&config, None).await;

    assert!(users.iter().all(|u| u.id != "4"));
    let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["alice", "bob"]);
}

#[tokio::test]
async fn test_users_partial_result_on_page_failure() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("page[number]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
            vec![user_record("1", "alice", "2020-01-05T00:00:00+00:00")],
            50,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("page[number]", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config(&server, &temp_dir);
    let (users, events) = crawl_users(&config, None).await;

    // a failed page ends the walk; everything before it stands
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "alice");
    assert_eq!(events.last(), Some(&CrawlEvent::UsersDone { collected: 1 }));
}

#[tokio::test]
async fn test_users_record_without_join_time_is_skipped() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("page[number]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
            vec![
                json!({ "id": "1", "attributes": { "username": "ghost" } }),
                user_record("2", "bob", "2021-03-09T00:00:00+00:00"),
            ],
            2,
        )))
        .mount(&server)
        .await;

    let config = test_config(&server, &temp_dir);
    let (users, _) = crawl_users(&config, None).await;

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "bob");
}

#[tokio::test]
async fn test_cookie_is_passed_through_verbatim() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(header("cookie", "flarum_session=abc; token=xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
            vec![user_record("1", "alice", "2020-01-05T00:00:00+00:00")],
            1,
        )))
        .mount(&server)
        .await;

    let config = test_config(&server, &temp_dir);
    let (users, _) =
        crawl_users(&config, Some("flarum_session=abc; token=xyz".to_string())).await;

    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn test_posts_all_scope_builds_entities_with_defaults() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/api/discussions"))
        .and(query_param("page[number]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
            vec![
                discussion_record("10", Some("Hello world"), Some("1")),
                discussion_record("11", None, None),
                json!({ "id": "12", "attributes": {} }),
            ],
            3,
        )))
        .mount(&server)
        .await;

    let config = test_config(&server, &temp_dir);
    let (posts, events) = crawl_posts(&config, PostScope::All).await;

    assert_eq!(posts.len(), 3);
    assert_eq!(posts[0].title, "Hello world");
    assert_eq!(posts[0].author_id.as_deref(), Some("1"));
    assert_eq!(
        posts[0].created_at,
        chrono::NaiveDate::from_ymd_opt(2023, 6, 1)
    );
    assert_eq!(posts[0].comment_count, 1);

    assert_eq!(posts[1].title, "Untitled");
    assert_eq!(posts[1].author_id, None);

    // record with no attributes at all still maps, with every default
    assert_eq!(posts[2].title, "Untitled");
    assert_eq!(posts[2].created_at, None);
    assert_eq!(posts[2].comment_count, 0);

    assert_eq!(events.last(), Some(&CrawlEvent::PostsDone { collected: 3 }));
}

#[tokio::test]
async fn test_posts_author_scope_filters_by_author_param() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/api/discussions"))
        .and(query_param("filter[author]", "7"))
        .and(query_param("page[number]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
            vec![discussion_record("20", Some("Mine"), Some("7"))],
            1,
        )))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server, &temp_dir);
    let (posts, _) = crawl_posts(&config, PostScope::ByAuthor("7".to_string())).await;

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "20");
    assert_eq!(posts[0].author_id.as_deref(), Some("7"));
}

#[tokio::test]
async fn test_posts_missing_total_still_crawls() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/api/discussions"))
        .and(query_param("page[number]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [discussion_record("30", Some("No meta"), None)],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/discussions"))
        .and(query_param("page[number]", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let config = test_config(&server, &temp_dir);
    let (posts, events) = crawl_posts(&config, PostScope::All).await;

    assert_eq!(posts.len(), 1);
    assert!(events.contains(&CrawlEvent::Posts(Progress {
        collected: 1,
        total: None,
    })));
}
