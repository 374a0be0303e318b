use std::collections::HashMap;

use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{vote_dictionary, Comment, FeedScope, Post, VoteChange, VoteKind, VoteState},
};

/// A post ready for display: the viewer's vote plus its comments
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub post: Post,
    pub vote: VoteState,
    pub comments: Vec<Comment>,
}

const POST_COLUMNS: &str = r#"
    p.id, p.user_profile_fk, u.username AS author, p.text,
    p.num_upvotes, p.num_downvotes, p.date_created, p.date_last_updated
"#;

/// Posts for the feed, newest first
///
/// Authors with `private_profile` on only appear to themselves and to
/// their followers.
pub async fn list_posts(pool: &PgPool, scope: FeedScope, viewer: i64) -> AppResult<Vec<Post>> {
    let posts = match scope {
        FeedScope::All => {
            sqlx::query_as::<_, Post>(&format!(
                "SELECT {} FROM posts p JOIN users u ON u.id = p.user_profile_fk \
                 LEFT JOIN settings s ON s.user_profile_fk = p.user_profile_fk \
                 WHERE p.user_profile_fk = $1 \
                    OR NOT COALESCE(s.private_profile, FALSE) \
                    OR EXISTS (SELECT 1 FROM followed_users f \
                               WHERE f.user_from = $1 AND f.user_to = p.user_profile_fk) \
                 ORDER BY p.date_created DESC, p.id DESC",
                POST_COLUMNS
            ))
            .bind(viewer)
            .fetch_all(pool)
            .await?
        }
        FeedScope::Following => {
            sqlx::query_as::<_, Post>(&format!(
                "SELECT {} FROM posts p JOIN users u ON u.id = p.user_profile_fk \
                 WHERE p.user_profile_fk = $1 \
                    OR p.user_profile_fk IN (SELECT user_to FROM followed_users WHERE user_from = $1) \
                 ORDER BY p.date_created DESC, p.id DESC",
                POST_COLUMNS
            ))
            .bind(viewer)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(posts)
}

/// Posts written by one profile, most recently updated first
pub async fn posts_by_profile(pool: &PgPool, user_id: i64) -> AppResult<Vec<Post>> {
    let posts = sqlx::query_as::<_, Post>(&format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.user_profile_fk \
         WHERE p.user_profile_fk = $1 \
         ORDER BY p.date_last_updated DESC, p.id DESC",
        POST_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(posts)
}

pub async fn comments_for_posts(pool: &PgPool, post_ids: &[i64]) -> AppResult<Vec<Comment>> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }

    let comments = sqlx::query_as::<_, Comment>(
        r#"
        SELECT c.id, c.post_fk, c.user_profile_fk, u.username AS author, c.text, c.date_created
        FROM comments c
        JOIN users u ON u.id = c.user_profile_fk
        WHERE c.post_fk = ANY($1)
        ORDER BY c.date_created, c.id
        "#,
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}

/// Ids of the posts `viewer` upvoted and downvoted, in that order
pub async fn viewer_votes(pool: &PgPool, viewer: i64) -> AppResult<(Vec<i64>, Vec<i64>)> {
    let upvoted: Vec<i64> =
        sqlx::query_scalar("SELECT post_to FROM post_user_upvotes WHERE user_from = $1")
            .bind(viewer)
            .fetch_all(pool)
            .await?;
    let downvoted: Vec<i64> =
        sqlx::query_scalar("SELECT post_to FROM post_user_downvotes WHERE user_from = $1")
            .bind(viewer)
            .fetch_all(pool)
            .await?;
    Ok((upvoted, downvoted))
}

/// Groups comments under their post, keeping comment order
pub fn group_comments(comments: Vec<Comment>) -> HashMap<i64, Vec<Comment>> {
    let mut grouped: HashMap<i64, Vec<Comment>> = HashMap::new();
    for comment in comments {
        grouped.entry(comment.post_fk).or_default().push(comment);
    }
    grouped
}

/// Joins posts, the viewer's votes and comments into feed entries
pub fn assemble_feed(
    posts: Vec<Post>,
    upvoted: &[i64],
    downvoted: &[i64],
    comments: Vec<Comment>,
) -> Vec<FeedEntry> {
    let mut grouped = group_comments(comments);
    vote_dictionary(posts, upvoted, downvoted)
        .into_iter()
        .map(|(post, vote)| FeedEntry {
            comments: grouped.remove(&post.id).unwrap_or_default(),
            post,
            vote,
        })
        .collect()
}

/// Loads votes and comments for `posts` as seen by `viewer`
pub async fn annotate(pool: &PgPool, viewer: i64, posts: Vec<Post>) -> AppResult<Vec<FeedEntry>> {
    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let comments = comments_for_posts(pool, &ids).await?;
    let (upvoted, downvoted) = viewer_votes(pool, viewer).await?;
    Ok(assemble_feed(posts, &upvoted, &downvoted, comments))
}

pub async fn create_post(pool: &PgPool, author: i64, text: &str) -> AppResult<i64> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO posts (user_profile_fk, text) VALUES ($1, $2) RETURNING id",
    )
    .bind(author)
    .bind(text)
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id = author, post_id = id, "Created post");
    Ok(id)
}

async fn post_exists(pool: &PgPool, post_id: i64) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
        .bind(post_id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

pub async fn create_comment(pool: &PgPool, author: i64, post_id: i64, text: &str) -> AppResult<i64> {
    if !post_exists(pool, post_id).await? {
        return Err(AppError::NotFound(format!("Post {} does not exist", post_id)));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO comments (post_fk, user_profile_fk, text) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(post_id)
    .bind(author)
    .bind(text)
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id = author, post_id = post_id, comment_id = id, "Created comment");
    Ok(id)
}

/// Toggles `viewer`'s vote of `kind` on a post
///
/// The same vote again withdraws it; a vote the other way is flipped. The
/// post's counters are recounted from the bridge tables inside the same
/// transaction.
pub async fn toggle_vote(
    pool: &PgPool,
    viewer: i64,
    post_id: i64,
    kind: VoteKind,
) -> AppResult<VoteChange> {
    let mut tx = pool.begin().await?;

    // Row lock serializes concurrent votes on the same post.
    let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;
    if locked.is_none() {
        return Err(AppError::NotFound(format!("Post {} does not exist", post_id)));
    }

    let withdrawn = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_from = $1 AND post_to = $2",
        kind.table()
    ))
    .bind(viewer)
    .bind(post_id)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        > 0;

    let change = if withdrawn {
        VoteChange::Withdrawn
    } else {
        let switched = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_from = $1 AND post_to = $2",
            kind.opposite().table()
        ))
        .bind(viewer)
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        sqlx::query(&format!(
            "INSERT INTO {} (user_from, post_to) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.table()
        ))
        .bind(viewer)
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        if switched {
            VoteChange::Switched
        } else {
            VoteChange::Cast
        }
    };

    for counted in [VoteKind::Up, VoteKind::Down] {
        sqlx::query(&format!(
            "UPDATE posts SET {counter} = (SELECT COUNT(*) FROM {table} WHERE post_to = $1) WHERE id = $1",
            counter = counted.counter(),
            table = counted.table(),
        ))
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        user_id = viewer,
        post_id = post_id,
        kind = ?kind,
        change = ?change,
        "Toggled vote"
    );
    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{profiles, test_support};
    use chrono::{Duration, Utc};

    fn post(id: i64) -> Post {
        Post {
            id,
            user_profile_fk: 1,
            author: "peng".to_string(),
            text: format!("post {}", id),
            num_upvotes: 0,
            num_downvotes: 0,
            date_created: Utc::now(),
            date_last_updated: Utc::now(),
        }
    }

    fn comment(id: i64, post_fk: i64, minutes: i64) -> Comment {
        Comment {
            id,
            post_fk,
            user_profile_fk: 2,
            author: "gentoo".to_string(),
            text: format!("comment {}", id),
            date_created: Utc::now() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_group_comments_keeps_order_per_post() {
        let grouped = group_comments(vec![comment(1, 10, 0), comment(2, 11, 1), comment(3, 10, 2)]);
        let ids: Vec<i64> = grouped[&10].iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(grouped[&11].len(), 1);
    }

    #[test]
    fn test_assemble_feed() {
        let entries = assemble_feed(
            vec![post(11), post(10), post(9)],
            &[10],
            &[9],
            vec![comment(1, 10, 0), comment(2, 10, 1)],
        );

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].post.id, 11);
        assert!(entries[0].comments.is_empty());
        assert_eq!(entries[0].vote, VoteState::default());

        assert!(entries[1].vote.upvoted);
        assert_eq!(entries[1].comments.len(), 2);

        assert!(entries[2].vote.downvoted);
        assert!(!entries[2].vote.upvoted);
    }

    #[tokio::test]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn test_toggle_vote_keeps_counters_in_step() {
        let pool = test_support::pool().await;
        let user_id = test_support::users(&pool, 1).await[0];
        let post_id = create_post(&pool, user_id, "hello").await.unwrap();

        let counts = |pool: PgPool| async move {
            sqlx::query_as::<_, (i32, i32)>("SELECT num_upvotes, num_downvotes FROM posts WHERE id = $1")
                .bind(post_id)
                .fetch_one(&pool)
                .await
                .unwrap()
        };

        assert_eq!(toggle_vote(&pool, user_id, post_id, VoteKind::Up).await.unwrap(), VoteChange::Cast);
        assert_eq!(counts(pool.clone()).await, (1, 0));

        assert_eq!(toggle_vote(&pool, user_id, post_id, VoteKind::Down).await.unwrap(), VoteChange::Switched);
        assert_eq!(counts(pool.clone()).await, (0, 1));

        assert_eq!(toggle_vote(&pool, user_id, post_id, VoteKind::Down).await.unwrap(), VoteChange::Withdrawn);
        assert_eq!(counts(pool.clone()).await, (0, 0));

        let missing = toggle_vote(&pool, user_id, -1, VoteKind::Up).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    fn ids(posts: &[Post]) -> Vec<i64> {
        posts.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn test_private_authors_are_left_out_of_strangers_feed() {
        let pool = test_support::pool().await;
        let users = test_support::users(&pool, 3).await;
        let (author, follower, stranger) = (users[0], users[1], users[2]);

        test_support::make_profile_private(&pool, author).await;
        let secret = create_post(&pool, author, "secret").await.unwrap();
        profiles::follow(&pool, follower, author).await.unwrap();

        let seen = ids(&list_posts(&pool, FeedScope::All, stranger).await.unwrap());
        assert!(!seen.contains(&secret));

        let seen = ids(&list_posts(&pool, FeedScope::All, follower).await.unwrap());
        assert!(seen.contains(&secret));

        let seen = ids(&list_posts(&pool, FeedScope::All, author).await.unwrap());
        assert!(seen.contains(&secret));
    }

    #[tokio::test]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn test_following_scope_is_viewer_plus_followed() {
        let pool = test_support::pool().await;
        let users = test_support::users(&pool, 3).await;
        let (viewer, followed, other) = (users[0], users[1], users[2]);

        profiles::follow(&pool, viewer, followed).await.unwrap();
        let own = create_post(&pool, viewer, "mine").await.unwrap();
        let theirs = create_post(&pool, followed, "theirs").await.unwrap();
        let unrelated = create_post(&pool, other, "elsewhere").await.unwrap();

        let seen = ids(&list_posts(&pool, FeedScope::Following, viewer).await.unwrap());
        assert_eq!(seen, vec![theirs, own]);

        let all = ids(&list_posts(&pool, FeedScope::All, viewer).await.unwrap());
        assert!(all.contains(&unrelated));
    }

    #[tokio::test]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn test_comment_on_missing_post_is_not_found() {
        let pool = test_support::pool().await;
        let author = test_support::users(&pool, 1).await[0];

        let result = create_comment(&pool, author, -1, "hello?").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
