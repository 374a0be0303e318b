use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One-to-one preference record per profile
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Settings {
    pub user_profile_fk: i64,
    pub private_profile: bool,
    pub private_playlists: bool,
    pub light_mode: bool,
    pub explicit_music: bool,
    pub live_music: bool,
}

impl Settings {
    /// Settings a freshly signed-up profile starts with: every flag off
    pub fn defaults_for(user_profile_fk: i64) -> Self {
        Self {
            user_profile_fk,
            ..Default::default()
        }
    }
}
