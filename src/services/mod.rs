pub mod accounts;
pub mod feed;
pub mod password;
pub mod playlists;
pub mod profiles;
pub mod settings;
pub mod spotify;

#[cfg(test)]
pub(crate) mod test_support;

pub use feed::FeedEntry;
pub use spotify::{SpotifyApi, SpotifyClient};
