use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Account row: credentials and name fields
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Public profile of a user. Shares its primary key with [`User`].
#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub user_id: i64,
    pub birthdate: NaiveDate,
    pub description: String,
    pub likes: String,
    pub dislikes: String,
    pub profilepic: Option<String>,
    pub num_followers: i32,
    pub num_following: i32,
    pub date_created: DateTime<Utc>,
    pub date_last_updated: DateTime<Utc>,
    pub spotify_user_id: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub scope: Option<String>,
    pub linked_to_spotify: bool,
}

/// Stored Spotify credentials of a linked profile
#[derive(Debug, Clone, PartialEq)]
pub struct SpotifyLink {
    pub spotify_user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl UserProfile {
    /// Returns the Spotify credentials if the profile is fully linked
    pub fn spotify_link(&self) -> Option<SpotifyLink> {
        if !self.linked_to_spotify {
            return None;
        }
        Some(SpotifyLink {
            spotify_user_id: self.spotify_user_id.clone()?,
            access_token: self.access_token.clone()?,
            refresh_token: self.refresh_token.clone()?,
            expires_at: self.expires_at?,
        })
    }
}

/// A user and profile joined for display in lists and headers
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProfileSummary {
    pub user_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profilepic: Option<String>,
    pub num_followers: i32,
    pub num_following: i32,
}

/// Full profile page header: account names plus profile fields
#[derive(Debug, Clone, FromRow)]
pub struct ProfileDetails {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub birthdate: NaiveDate,
    pub description: String,
    pub likes: String,
    pub dislikes: String,
    pub profilepic: Option<String>,
    pub num_followers: i32,
    pub num_following: i32,
    pub linked_to_spotify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            user_id: 1,
            birthdate: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            description: String::new(),
            likes: String::new(),
            dislikes: String::new(),
            profilepic: None,
            num_followers: 0,
            num_following: 0,
            date_created: Utc::now(),
            date_last_updated: Utc::now(),
            spotify_user_id: Some("spotty".to_string()),
            access_token: Some("access".to_string()),
            refresh_token: Some("refresh".to_string()),
            expires_at: Some(1_700_000_000),
            scope: Some("playlist-modify-public".to_string()),
            linked_to_spotify: true,
        }
    }

    #[test]
    fn test_spotify_link_when_linked() {
        let link = profile().spotify_link().unwrap();
        assert_eq!(link.spotify_user_id, "spotty");
        assert_eq!(link.expires_at, 1_700_000_000);
    }

    #[test]
    fn test_spotify_link_requires_flag() {
        let mut p = profile();
        p.linked_to_spotify = false;
        assert!(p.spotify_link().is_none());
    }

    #[test]
    fn test_spotify_link_requires_all_credentials() {
        let mut p = profile();
        p.refresh_token = None;
        assert!(p.spotify_link().is_none());
    }
}
