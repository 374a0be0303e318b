use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A user-owned collection of Spotify tracks
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Playlist {
    pub id: i64,
    pub user_profile_fk: i64,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub is_private: bool,
    /// Whether a remote copy exists on Spotify
    pub is_imported: bool,
    pub spotify_playlist_id: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_last_updated: DateTime<Utc>,
}

impl Playlist {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_profile_fk == user_id
    }

    /// Visible to someone other than the owner.
    ///
    /// `owner_hides_playlists` is the owner's `private_playlists` setting,
    /// which hides every playlist regardless of the per-playlist flag.
    pub fn is_visible_to_others(&self, owner_hides_playlists: bool) -> bool {
        !self.is_private && !owner_hides_playlists
    }

    /// Remote playlist id, present only once the playlist was exported
    pub fn remote_id(&self) -> Option<&str> {
        if self.is_imported {
            self.spotify_playlist_id.as_deref()
        } else {
            None
        }
    }
}

/// Bridge row placing one track on one playlist. Duplicates are allowed,
/// each with its own id.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SongOnPlaylist {
    pub id: i64,
    pub playlist_from: i64,
    pub spotify_id: String,
    pub date_added: DateTime<Utc>,
}

/// Normalises a stored track identifier to a `spotify:track:` URI
pub fn track_uri(spotify_id: &str) -> String {
    let id = spotify_id.trim();
    if id.starts_with("spotify:") {
        id.to_string()
    } else {
        format!("spotify:track:{}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist() -> Playlist {
        Playlist {
            id: 7,
            user_profile_fk: 1,
            name: "Road trip".to_string(),
            description: String::new(),
            image: None,
            is_private: false,
            is_imported: false,
            spotify_playlist_id: None,
            date_created: Utc::now(),
            date_last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_track_uri() {
        assert_eq!(track_uri("4uLU6hMCjMI75M1A2tKUQC"), "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(
            track_uri("spotify:track:4uLU6hMCjMI75M1A2tKUQC"),
            "spotify:track:4uLU6hMCjMI75M1A2tKUQC"
        );
        assert_eq!(track_uri("  abc "), "spotify:track:abc");
    }

    #[test]
    fn test_visibility() {
        let mut p = playlist();
        assert!(p.is_visible_to_others(false));
        assert!(!p.is_visible_to_others(true));
        p.is_private = true;
        assert!(!p.is_visible_to_others(false));
    }

    #[test]
    fn test_remote_id_requires_import_flag() {
        let mut p = playlist();
        p.spotify_playlist_id = Some("remote".to_string());
        assert_eq!(p.remote_id(), None);
        p.is_imported = true;
        assert_eq!(p.remote_id(), Some("remote"));
        assert!(p.is_owned_by(1));
        assert!(!p.is_owned_by(2));
    }
}
