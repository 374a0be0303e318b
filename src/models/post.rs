use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;
use std::collections::HashSet;

/// A feed post joined with its author's username
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Post {
    pub id: i64,
    pub user_profile_fk: i64,
    pub author: String,
    pub text: String,
    pub num_upvotes: i32,
    pub num_downvotes: i32,
    pub date_created: DateTime<Utc>,
    pub date_last_updated: DateTime<Utc>,
}

/// A comment joined with its author's username
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_fk: i64,
    pub user_profile_fk: i64,
    pub author: String,
    pub text: String,
    pub date_created: DateTime<Utc>,
}

/// Direction of a vote on a post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Up,
    Down,
}

impl VoteKind {
    pub fn opposite(self) -> Self {
        match self {
            VoteKind::Up => VoteKind::Down,
            VoteKind::Down => VoteKind::Up,
        }
    }

    /// Bridge table holding votes of this kind
    pub(crate) fn table(self) -> &'static str {
        match self {
            VoteKind::Up => "post_user_upvotes",
            VoteKind::Down => "post_user_downvotes",
        }
    }

    /// Counter column on `posts` mirroring the bridge table
    pub(crate) fn counter(self) -> &'static str {
        match self {
            VoteKind::Up => "num_upvotes",
            VoteKind::Down => "num_downvotes",
        }
    }
}

/// What a toggle did to the viewer's vote on a post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    /// A new vote was recorded
    Cast,
    /// The same vote existed and was withdrawn
    Withdrawn,
    /// A vote the other way existed and was flipped
    Switched,
}

/// The viewer's own vote on a single post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteState {
    pub upvoted: bool,
    pub downvoted: bool,
}

/// Which posts a feed shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedScope {
    #[default]
    All,
    /// The viewer and the users they follow
    Following,
}

impl FeedScope {
    /// Lenient parse of the `scope` query value; unknown values mean `All`
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("following") => FeedScope::Following,
            _ => FeedScope::All,
        }
    }
}

/// Pairs each post with the viewer's vote state, preserving post order
///
/// `upvoted` and `downvoted` are the ids of posts the viewer voted on.
pub fn vote_dictionary(
    posts: Vec<Post>,
    upvoted: &[i64],
    downvoted: &[i64],
) -> Vec<(Post, VoteState)> {
    let up: HashSet<i64> = upvoted.iter().copied().collect();
    let down: HashSet<i64> = downvoted.iter().copied().collect();

    posts
        .into_iter()
        .map(|post| {
            let state = VoteState {
                upvoted: up.contains(&post.id),
                downvoted: down.contains(&post.id),
            };
            (post, state)
        })
        .collect()
}
