//! Page templates and the display-ready structs they render.
//!
//! Every page extends `base.html`, which reads the shared [`NavContext`].
//! Optional and date fields are pre-formatted here so templates only
//! print strings, numbers and booleans.

use askama::Template;
use axum::response::Html;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    middleware::Flash,
    models::{
        forms::{SignUpForm, UpdateProfileForm},
        Comment, Playlist, ProfileDetails, ProfileSummary, Settings, SongOnPlaylist,
    },
    services::FeedEntry,
};

/// Renders a template into an HTML response body
pub fn render<T: Template>(template: &T) -> AppResult<Html<String>> {
    Ok(Html(template.render()?))
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M").to_string()
}

/// Navigation bar state shared by every page
#[derive(Debug, Clone, Default)]
pub struct NavContext {
    pub logged_in: bool,
    pub user_id: i64,
    pub username: String,
    pub flashes: Vec<Flash>,
    pub light_mode: bool,
}

impl NavContext {
    pub fn anonymous(flashes: Vec<Flash>) -> Self {
        Self {
            flashes,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommentView {
    pub author: String,
    pub author_id: i64,
    pub text: String,
    pub created: String,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            created: timestamp(&comment.date_created),
            author: comment.author,
            author_id: comment.user_profile_fk,
            text: comment.text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostView {
    pub id: i64,
    pub author: String,
    pub author_id: i64,
    pub text: String,
    pub num_upvotes: i32,
    pub num_downvotes: i32,
    pub created: String,
    pub upvoted: bool,
    pub downvoted: bool,
    pub comments: Vec<CommentView>,
}

impl From<FeedEntry> for PostView {
    fn from(entry: FeedEntry) -> Self {
        let FeedEntry {
            post,
            vote,
            comments,
        } = entry;
        Self {
            id: post.id,
            created: timestamp(&post.date_created),
            author: post.author,
            author_id: post.user_profile_fk,
            text: post.text,
            num_upvotes: post.num_upvotes,
            num_downvotes: post.num_downvotes,
            upvoted: vote.upvoted,
            downvoted: vote.downvoted,
            comments: comments.into_iter().map(CommentView::from).collect(),
        }
    }
}

pub fn post_views(entries: Vec<FeedEntry>) -> Vec<PostView> {
    entries.into_iter().map(PostView::from).collect()
}

/// A row in any list of users
#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub profilepic: String,
    pub num_followers: i32,
    pub num_following: i32,
    /// Whether the viewer follows this user
    pub followed: bool,
}

impl UserRow {
    pub fn new(summary: ProfileSummary, followed: bool) -> Self {
        Self {
            full_name: format!("{} {}", summary.first_name, summary.last_name)
                .trim()
                .to_string(),
            user_id: summary.user_id,
            username: summary.username,
            profilepic: summary.profilepic.unwrap_or_default(),
            num_followers: summary.num_followers,
            num_following: summary.num_following,
            followed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileView {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub birthdate: String,
    pub description: String,
    pub likes: String,
    pub dislikes: String,
    pub profilepic: String,
    pub num_followers: i32,
    pub num_following: i32,
    pub linked_to_spotify: bool,
}

impl From<ProfileDetails> for ProfileView {
    fn from(details: ProfileDetails) -> Self {
        Self {
            full_name: format!("{} {}", details.first_name, details.last_name)
                .trim()
                .to_string(),
            birthdate: details.birthdate.format("%Y-%m-%d").to_string(),
            user_id: details.user_id,
            username: details.username,
            email: details.email,
            description: details.description,
            likes: details.likes,
            dislikes: details.dislikes,
            profilepic: details.profilepic.unwrap_or_default(),
            num_followers: details.num_followers,
            num_following: details.num_following,
            linked_to_spotify: details.linked_to_spotify,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaylistView {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub image: String,
    pub is_private: bool,
    pub is_imported: bool,
    pub updated: String,
}

impl From<Playlist> for PlaylistView {
    fn from(playlist: Playlist) -> Self {
        Self {
            id: playlist.id,
            owner_id: playlist.user_profile_fk,
            updated: timestamp(&playlist.date_last_updated),
            name: playlist.name,
            description: playlist.description,
            image: playlist.image.unwrap_or_default(),
            is_private: playlist.is_private,
            is_imported: playlist.is_imported,
        }
    }
}

pub fn playlist_views(playlists: Vec<Playlist>) -> Vec<PlaylistView> {
    playlists.into_iter().map(PlaylistView::from).collect()
}

/// One `(song_on_playlist_id, spotify_id)` entry of a playlist
#[derive(Debug, Clone)]
pub struct SongView {
    pub id: i64,
    pub spotify_id: String,
    pub open_url: String,
}

impl From<SongOnPlaylist> for SongView {
    fn from(song: SongOnPlaylist) -> Self {
        let bare = song
            .spotify_id
            .trim()
            .rsplit(':')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            id: song.id,
            open_url: format!("https://open.spotify.com/track/{}", bare),
            spotify_id: song.spotify_id,
        }
    }
}

pub fn song_views(songs: Vec<SongOnPlaylist>) -> Vec<SongView> {
    songs.into_iter().map(SongView::from).collect()
}

/// Values echoed back into the sign-up and profile forms
#[derive(Debug, Clone, Default)]
pub struct ProfileValues {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birthdate: String,
    pub description: String,
    pub likes: String,
    pub dislikes: String,
    pub profilepic: String,
}

fn value(field: &Option<String>) -> String {
    field.clone().unwrap_or_default()
}

impl From<&SignUpForm> for ProfileValues {
    fn from(form: &SignUpForm) -> Self {
        Self {
            username: value(&form.username),
            first_name: value(&form.first_name),
            last_name: value(&form.last_name),
            email: value(&form.email),
            birthdate: value(&form.birthdate),
            description: value(&form.description),
            likes: value(&form.likes),
            dislikes: value(&form.dislikes),
            profilepic: value(&form.profilepic),
        }
    }
}

impl From<&UpdateProfileForm> for ProfileValues {
    fn from(form: &UpdateProfileForm) -> Self {
        Self {
            username: String::new(),
            first_name: value(&form.first_name),
            last_name: value(&form.last_name),
            email: value(&form.email),
            birthdate: value(&form.birthdate),
            description: value(&form.description),
            likes: value(&form.likes),
            dislikes: value(&form.dislikes),
            profilepic: value(&form.profilepic),
        }
    }
}

impl ProfileValues {
    /// Form values prefilled from the stored profile
    pub fn from_details(details: &ProfileDetails) -> Self {
        Self {
            username: details.username.clone(),
            first_name: details.first_name.clone(),
            last_name: details.last_name.clone(),
            email: details.email.clone(),
            birthdate: details.birthdate.format("%Y-%m-%d").to_string(),
            description: details.description.clone(),
            likes: details.likes.clone(),
            dislikes: details.dislikes.clone(),
            profilepic: details.profilepic.clone().unwrap_or_default(),
        }
    }
}

// Pages

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub nav: NavContext,
    pub errors: Vec<String>,
    pub username: String,
}

#[derive(Template)]
#[template(path = "sign_up.html")]
pub struct SignUpTemplate {
    pub nav: NavContext,
    pub errors: Vec<String>,
    pub values: ProfileValues,
}

#[derive(Template)]
#[template(path = "feed.html")]
pub struct FeedTemplate {
    pub nav: NavContext,
    pub following_only: bool,
    pub posts: Vec<PostView>,
    /// Where vote buttons send the browser back to
    pub next: String,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub nav: NavContext,
    pub profile: ProfileView,
    pub is_own: bool,
    pub is_following: bool,
    pub posts_hidden: bool,
    pub posts: Vec<PostView>,
    pub follower_list: Vec<UserRow>,
    pub next: String,
}

#[derive(Template)]
#[template(path = "update_profile.html")]
pub struct UpdateProfileTemplate {
    pub nav: NavContext,
    pub errors: Vec<String>,
    pub values: ProfileValues,
}

/// Following, followers and the directory of all users
#[derive(Template)]
#[template(path = "user_list.html")]
pub struct UserListTemplate {
    pub nav: NavContext,
    pub heading: String,
    pub empty_message: String,
    pub users: Vec<UserRow>,
}

#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub nav: NavContext,
    pub settings: Settings,
}

#[derive(Template)]
#[template(path = "playlists.html")]
pub struct PlaylistsTemplate {
    pub nav: NavContext,
    /// Path each playlist card links to, completed by the playlist id
    pub link_prefix: String,
    pub playlists: Vec<PlaylistView>,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "other_playlists.html")]
pub struct OtherPlaylistsTemplate {
    pub nav: NavContext,
    pub link_prefix: String,
    pub owner: UserRow,
    pub playlists: Vec<PlaylistView>,
}

#[derive(Template)]
#[template(path = "single_playlist.html")]
pub struct SinglePlaylistTemplate {
    pub nav: NavContext,
    pub playlist: PlaylistView,
    pub songs: Vec<SongView>,
    pub linked_to_spotify: bool,
}

#[derive(Template)]
#[template(path = "other_single_playlist.html")]
pub struct OtherSinglePlaylistTemplate {
    pub nav: NavContext,
    pub owner: UserRow,
    pub playlist: PlaylistView,
    pub songs: Vec<SongView>,
}

#[derive(Template)]
#[template(path = "addsong_popup.html")]
pub struct AddSongTemplate {
    pub nav: NavContext,
    pub track_id: String,
    pub playlists: Vec<PlaylistView>,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "editplaylist_popup.html")]
pub struct EditPlaylistTemplate {
    pub nav: NavContext,
    pub playlist: PlaylistView,
    /// Name of the privacy checkbox, tied to the current privacy
    pub privacy_field: String,
    pub errors: Vec<String>,
}
