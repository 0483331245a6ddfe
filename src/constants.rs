//! Shared constants used across the application.

/// User agent string sent with every forum and avatar request.
pub const CRAWLER_USER_AGENT: &str = "forum-census/0.1";

/// Avatar fetched when a member has none configured, and the fallback value
/// handed to callers when a download fails.
pub const DEFAULT_AVATAR_URL: &str = "https://d.feiliupan.com/t/103549985525600256/user.png";

/// Title shown for discussions the server returned without one.
pub const UNTITLED_TITLE: &str = "Untitled";
