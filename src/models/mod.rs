pub mod forms;
pub mod playlist;
pub mod post;
pub mod settings;
pub mod user;

pub use playlist::{track_uri, Playlist, SongOnPlaylist};
pub use post::{vote_dictionary, Comment, FeedScope, Post, VoteChange, VoteKind, VoteState};
pub use settings::Settings;
pub use user::{ProfileDetails, ProfileSummary, SpotifyLink, User, UserProfile};
