//! HTML form payloads and their validation.
//!
//! Every field is optional at the deserialization layer so a half-filled
//! form reaches validation and comes back with readable errors instead of
//! an extractor rejection.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::Settings;

pub const USERNAME_MAX: usize = 150;
pub const FIRST_NAME_MAX: usize = 50;
pub const LAST_NAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 254;
pub const PASSWORD_MIN: usize = 8;
pub const POST_MAX: usize = 500;
pub const COMMENT_MAX: usize = 300;
pub const PLAYLIST_NAME_MAX: usize = 100;
pub const PLAYLIST_DESCRIPTION_MAX: usize = 500;
pub const URL_MAX: usize = 500;
pub const TRACK_ID_MAX: usize = 100;

/// Field-level validation errors, in the order they were found
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    errors: Vec<(&'static str, String)>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|(f, _)| *f == field)
    }

    /// Human-readable messages for display above a form
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|(_, m)| m.clone()).collect()
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Treats missing and blank values alike
fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Checkbox semantics: absent, empty or "false" is off, anything else is on
pub fn checkbox(value: &Option<String>) -> bool {
    match value.as_deref() {
        None => false,
        Some(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "" | "false"),
    }
}

/// Whether the form's `next` target is a path on this site
pub fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= USERNAME_MAX
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn valid_email(email: &str) -> bool {
    if email.len() > EMAIL_MAX || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn valid_url(url: &str) -> bool {
    url.len() <= URL_MAX && (url.starts_with("http://") || url.starts_with("https://"))
}

fn check_len(
    errors: &mut FormErrors,
    field: &'static str,
    label: &str,
    value: &str,
    max: usize,
) {
    if value.chars().count() > max {
        errors.add(field, format!("{} must be at most {} characters.", label, max));
    }
}

fn parse_birthdate(errors: &mut FormErrors, value: &Option<String>) -> Option<NaiveDate> {
    let Some(raw) = non_empty(value) else {
        errors.add("birthdate", "Birthdate is required.");
        return None;
    };
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(date) if date > Utc::now().date_naive() => {
            errors.add("birthdate", "Birthdate cannot be in the future.");
            None
        }
        Ok(date) => Some(date),
        Err(_) => {
            errors.add("birthdate", "Enter a valid date (YYYY-MM-DD).");
            None
        }
    }
}

/// Profile fields shared by sign-up and profile editing
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileFields {
    pub birthdate: NaiveDate,
    pub description: String,
    pub likes: String,
    pub dislikes: String,
    pub profilepic: Option<String>,
}

fn validate_profile_fields(
    errors: &mut FormErrors,
    birthdate: &Option<String>,
    description: &Option<String>,
    likes: &Option<String>,
    dislikes: &Option<String>,
    profilepic: &Option<String>,
) -> Option<ProfileFields> {
    let birthdate = parse_birthdate(errors, birthdate);
    let profilepic = non_empty(profilepic);
    if let Some(url) = &profilepic {
        if !valid_url(url) {
            errors.add("profilepic", "Profile picture must be an http(s) URL.");
        }
    }

    Some(ProfileFields {
        birthdate: birthdate?,
        description: non_empty(description).unwrap_or_default(),
        likes: non_empty(likes).unwrap_or_default(),
        dislikes: non_empty(dislikes).unwrap_or_default(),
        profilepic,
    })
}

/// Combined sign-up form: account fields plus the initial profile
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignUpForm {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
    pub birthdate: Option<String>,
    pub description: Option<String>,
    pub likes: Option<String>,
    pub dislikes: Option<String>,
    pub profilepic: Option<String>,
}

/// A validated sign-up
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub profile: ProfileFields,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<NewAccount, FormErrors> {
        let mut errors = FormErrors::default();

        let username = non_empty(&self.username).unwrap_or_default();
        if !valid_username(&username) {
            errors.add(
                "username",
                "Username must be 1-150 characters: letters, digits and @/./+/-/_ only.",
            );
        }

        let first_name = non_empty(&self.first_name).unwrap_or_default();
        if first_name.is_empty() {
            errors.add("first_name", "First name is required.");
        }
        check_len(&mut errors, "first_name", "First name", &first_name, FIRST_NAME_MAX);

        let last_name = non_empty(&self.last_name).unwrap_or_default();
        if last_name.is_empty() {
            errors.add("last_name", "Last name is required.");
        }
        check_len(&mut errors, "last_name", "Last name", &last_name, LAST_NAME_MAX);

        let email = non_empty(&self.email).unwrap_or_default();
        if !valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }

        // Passwords are not trimmed.
        let password = self.password1.clone().unwrap_or_default();
        let confirmation = self.password2.clone().unwrap_or_default();
        if password != confirmation {
            errors.add("password2", "The two password fields didn't match.");
        }
        if password.chars().count() < PASSWORD_MIN {
            errors.add(
                "password1",
                format!("Password must contain at least {} characters.", PASSWORD_MIN),
            );
        }
        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            errors.add("password1", "Password can't be entirely numeric.");
        }
        if !username.is_empty() && password.eq_ignore_ascii_case(&username) {
            errors.add("password1", "Password is too similar to the username.");
        }

        let profile = validate_profile_fields(
            &mut errors,
            &self.birthdate,
            &self.description,
            &self.likes,
            &self.dislikes,
            &self.profilepic,
        );

        match profile {
            Some(profile) if errors.is_empty() => Ok(NewAccount {
                username,
                first_name,
                last_name,
                email,
                password,
                profile,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::default();
        let username = non_empty(&self.username).unwrap_or_default();
        let password = self.password.clone().unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            errors.add("username", "Please enter a username and password.");
        }
        errors.into_result((username, password))
    }
}

/// Edit form for the account names and the profile
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<String>,
    pub description: Option<String>,
    pub likes: Option<String>,
    pub dislikes: Option<String>,
    pub profilepic: Option<String>,
}

/// A validated profile edit
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub profile: ProfileFields,
}

impl UpdateProfileForm {
    pub fn validate(&self) -> Result<ProfileUpdate, FormErrors> {
        let mut errors = FormErrors::default();

        let first_name = non_empty(&self.first_name).unwrap_or_default();
        check_len(&mut errors, "first_name", "First name", &first_name, FIRST_NAME_MAX);
        let last_name = non_empty(&self.last_name).unwrap_or_default();
        check_len(&mut errors, "last_name", "Last name", &last_name, LAST_NAME_MAX);

        let email = non_empty(&self.email).unwrap_or_default();
        if !email.is_empty() && !valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }

        let profile = validate_profile_fields(
            &mut errors,
            &self.birthdate,
            &self.description,
            &self.likes,
            &self.dislikes,
            &self.profilepic,
        );

        match profile {
            Some(profile) if errors.is_empty() => Ok(ProfileUpdate {
                first_name,
                last_name,
                email,
                profile,
            }),
            _ => Err(errors),
        }
    }
}

fn validate_text(
    value: &Option<String>,
    field: &'static str,
    label: &str,
    max: usize,
) -> Result<String, FormErrors> {
    let mut errors = FormErrors::default();
    let text = non_empty(value).unwrap_or_default();
    if text.is_empty() {
        errors.add(field, format!("{} cannot be empty.", label));
    }
    check_len(&mut errors, field, label, &text, max);
    errors.into_result(text)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub text: Option<String>,
}

impl PostForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        validate_text(&self.text, "text", "Post", POST_MAX)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: Option<String>,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        validate_text(&self.text, "text", "Comment", COMMENT_MAX)
    }
}

/// Vote buttons post back where they came from
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VoteForm {
    pub next: Option<String>,
}

impl VoteForm {
    pub fn redirect_target(&self) -> String {
        non_empty(&self.next)
            .filter(|next| is_local_path(next))
            .unwrap_or_else(|| "/feed/".to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsForm {
    pub private_profile: Option<String>,
    pub private_playlists: Option<String>,
    pub light_mode: Option<String>,
    pub explicit_music: Option<String>,
    pub live_music: Option<String>,
}

impl SettingsForm {
    pub fn into_settings(&self, user_profile_fk: i64) -> Settings {
        Settings {
            user_profile_fk,
            private_profile: checkbox(&self.private_profile),
            private_playlists: checkbox(&self.private_playlists),
            light_mode: checkbox(&self.light_mode),
            explicit_music: checkbox(&self.explicit_music),
            live_music: checkbox(&self.live_music),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaylistForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_private: Option<String>,
}

/// A validated new playlist
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlaylist {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub is_private: bool,
}

impl PlaylistForm {
    pub fn validate(&self) -> Result<NewPlaylist, FormErrors> {
        let mut errors = FormErrors::default();

        let name = non_empty(&self.name).unwrap_or_default();
        if name.is_empty() {
            errors.add("name", "Playlist name is required.");
        }
        check_len(&mut errors, "name", "Playlist name", &name, PLAYLIST_NAME_MAX);

        let description = non_empty(&self.description).unwrap_or_default();
        check_len(
            &mut errors,
            "description",
            "Description",
            &description,
            PLAYLIST_DESCRIPTION_MAX,
        );

        let image = non_empty(&self.image);
        if let Some(url) = &image {
            if !valid_url(url) {
                errors.add("image", "Image must be an http(s) URL.");
            }
        }

        errors.into_result(NewPlaylist {
            name,
            description,
            image,
            is_private: checkbox(&self.is_private),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddSongForm {
    pub track_id: Option<String>,
    pub playlist_id: Option<String>,
}

/// Parses a numeric id field; blank or garbled values count as missing
fn parse_id(value: &Option<String>) -> Option<i64> {
    non_empty(value).and_then(|v| v.parse().ok())
}

impl AddSongForm {
    /// Returns `(playlist_id, track_id)`
    pub fn validate(&self) -> Result<(i64, String), FormErrors> {
        let mut errors = FormErrors::default();
        let track_id = non_empty(&self.track_id).unwrap_or_default();
        if track_id.is_empty() {
            errors.add("track_id", "Choose a track to add.");
        }
        check_len(&mut errors, "track_id", "Track id", &track_id, TRACK_ID_MAX);
        let playlist_id = parse_id(&self.playlist_id);
        if playlist_id.is_none() {
            errors.add("playlist_id", "Choose a playlist.");
        }
        errors.into_result((playlist_id.unwrap_or_default(), track_id))
    }
}

/// Edit popup payload. The privacy checkbox is named after the current
/// state: `is_private_t` when the playlist is private, `is_private_f`
/// when it is public.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EditPlaylistForm {
    pub playlist_id: Option<String>,
    pub new_name: Option<String>,
    pub new_description: Option<String>,
    pub img: Option<String>,
    pub is_private_t: Option<String>,
    pub is_private_f: Option<String>,
}

/// A validated playlist edit. `None` fields keep their stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEdit {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_private: bool,
}

impl EditPlaylistForm {
    pub fn playlist_id(&self) -> Option<i64> {
        parse_id(&self.playlist_id)
    }

    /// Privacy the user asked for, given the playlist's current privacy
    pub fn requested_privacy(&self, currently_private: bool) -> bool {
        if currently_private {
            checkbox(&self.is_private_t)
        } else {
            checkbox(&self.is_private_f)
        }
    }

    /// `Ok(None)` when no new name was sent, which leaves the playlist untouched
    pub fn validate(&self, currently_private: bool) -> Result<Option<PlaylistEdit>, FormErrors> {
        let Some(name) = self.new_name.as_deref().map(str::trim) else {
            return Ok(None);
        };

        let mut errors = FormErrors::default();
        if name.is_empty() {
            errors.add("new_name", "Playlist name cannot be empty.");
        }
        check_len(&mut errors, "new_name", "Playlist name", name, PLAYLIST_NAME_MAX);

        let description = self.new_description.as_deref().map(|d| d.trim().to_string());
        if let Some(d) = &description {
            check_len(
                &mut errors,
                "new_description",
                "Description",
                d,
                PLAYLIST_DESCRIPTION_MAX,
            );
        }

        let image = non_empty(&self.img);
        if let Some(url) = &image {
            if !valid_url(url) {
                errors.add("img", "Image must be an http(s) URL.");
            }
        }

        errors.into_result(Some(PlaylistEdit {
            name: name.to_string(),
            description,
            image,
            is_private: self.requested_privacy(currently_private),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn signup() -> SignUpForm {
        SignUpForm {
            username: s("pengu"),
            first_name: s("Peng"),
            last_name: s("Uin"),
            email: s("peng@example.com"),
            password1: s("icefloe-42"),
            password2: s("icefloe-42"),
            birthdate: s("2001-02-03"),
            description: s("  hi  "),
            likes: None,
            dislikes: s(""),
            profilepic: None,
        }
    }

    #[test]
    fn test_signup_valid() {
        let account = signup().validate().unwrap();
        assert_eq!(account.username, "pengu");
        assert_eq!(account.profile.description, "hi");
        assert_eq!(account.profile.dislikes, "");
        assert_eq!(
            account.profile.birthdate,
            NaiveDate::from_ymd_opt(2001, 2, 3).unwrap()
        );
    }

    #[test]
    fn test_signup_password_rules() {
        let mut form = signup();
        form.password2 = s("different-1");
        assert!(form.validate().unwrap_err().has("password2"));

        let mut form = signup();
        form.password1 = s("12345678");
        form.password2 = s("12345678");
        assert!(form.validate().unwrap_err().has("password1"));

        let mut form = signup();
        form.password1 = s("short");
        form.password2 = s("short");
        assert!(form.validate().unwrap_err().has("password1"));
    }

    #[test]
    fn test_signup_collects_every_error() {
        let errors = SignUpForm::default().validate().unwrap_err();
        for field in ["username", "first_name", "last_name", "email", "password1", "birthdate"] {
            assert!(errors.has(field), "missing error for {}", field);
        }
    }

    #[test]
    fn test_signup_rejects_bad_username_and_email() {
        let mut form = signup();
        form.username = s("has space");
        form.email = s("not-an-email");
        let errors = form.validate().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("email"));
    }

    #[test]
    fn test_signup_rejects_future_birthdate() {
        let mut form = signup();
        form.birthdate = s("2999-01-01");
        assert!(form.validate().unwrap_err().has("birthdate"));
    }

    #[test]
    fn test_update_profile_allows_blank_names_and_email() {
        let form = UpdateProfileForm {
            birthdate: s("1999-12-31"),
            email: s(""),
            ..Default::default()
        };
        let update = form.validate().unwrap();
        assert_eq!(update.email, "");
        assert_eq!(update.first_name, "");
    }

    #[test]
    fn test_update_profile_rejects_non_http_picture() {
        let form = UpdateProfileForm {
            birthdate: s("1999-12-31"),
            profilepic: s("javascript:alert(1)"),
            ..Default::default()
        };
        assert!(form.validate().unwrap_err().has("profilepic"));
    }

    #[test]
    fn test_post_and_comment_limits() {
        assert_eq!(PostForm { text: s("  hello ") }.validate().unwrap(), "hello");
        assert!(PostForm { text: s("   ") }.validate().is_err());
        assert!(PostForm { text: Some("x".repeat(POST_MAX + 1)) }.validate().is_err());
        assert!(CommentForm { text: Some("x".repeat(COMMENT_MAX)) }.validate().is_ok());
        assert!(CommentForm { text: Some("x".repeat(COMMENT_MAX + 1)) }.validate().is_err());
    }

    #[test]
    fn test_checkbox() {
        assert!(checkbox(&s("on")));
        assert!(checkbox(&s("True")));
        assert!(!checkbox(&None));
        assert!(!checkbox(&s("")));
        assert!(!checkbox(&s("false")));
    }

    #[test]
    fn test_settings_form_maps_checkboxes() {
        let form = SettingsForm {
            private_profile: s("on"),
            light_mode: s("on"),
            ..Default::default()
        };
        let settings = form.into_settings(4);
        assert_eq!(settings.user_profile_fk, 4);
        assert!(settings.private_profile);
        assert!(settings.light_mode);
        assert!(!settings.private_playlists);
        assert!(!settings.explicit_music);
        assert!(!settings.live_music);
    }

    #[test]
    fn test_vote_form_redirect_target() {
        assert_eq!(VoteForm { next: s("/user/profile/3") }.redirect_target(), "/user/profile/3");
        assert_eq!(VoteForm { next: s("https://evil.test/") }.redirect_target(), "/feed/");
        assert_eq!(VoteForm { next: s("//evil.test/") }.redirect_target(), "/feed/");
        assert_eq!(VoteForm { next: None }.redirect_target(), "/feed/");
    }

    #[test]
    fn test_playlist_form() {
        let form = PlaylistForm {
            name: s("Focus"),
            description: None,
            image: s(""),
            is_private: s("on"),
        };
        let playlist = form.validate().unwrap();
        assert_eq!(playlist.name, "Focus");
        assert_eq!(playlist.image, None);
        assert!(playlist.is_private);

        assert!(PlaylistForm::default().validate().unwrap_err().has("name"));
    }

    #[test]
    fn test_add_song_form() {
        let form = AddSongForm {
            track_id: s("4uLU6hMCjMI75M1A2tKUQC"),
            playlist_id: s("9"),
        };
        assert_eq!(form.validate().unwrap(), (9, "4uLU6hMCjMI75M1A2tKUQC".to_string()));

        let errors = AddSongForm::default().validate().unwrap_err();
        assert!(errors.has("track_id"));
        assert!(errors.has("playlist_id"));

        let garbled = AddSongForm {
            track_id: s("abc"),
            playlist_id: s("nine"),
        };
        assert!(garbled.validate().unwrap_err().has("playlist_id"));
    }

    async fn extract<T: serde::de::DeserializeOwned>(body: &'static str) -> T {
        use axum::{
            body::Body,
            extract::{Form, FromRequest},
            http::{header::CONTENT_TYPE, Request},
        };

        let request = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        let Form(form) = Form::<T>::from_request(request, &()).await.unwrap();
        form
    }

    #[tokio::test]
    async fn test_blank_playlist_id_reaches_validation() {
        let form: AddSongForm = extract("track_id=abc&playlist_id=").await;
        let errors = form.validate().unwrap_err();
        assert!(errors.has("playlist_id"));
        assert!(!errors.has("track_id"));

        let form: EditPlaylistForm = extract("playlist_id=&new_name=Renamed").await;
        assert_eq!(form.playlist_id(), None);

        let form: EditPlaylistForm = extract("playlist_id=12&new_name=Renamed").await;
        assert_eq!(form.playlist_id(), Some(12));
    }

    #[test]
    fn test_edit_playlist_privacy_checkbox_follows_current_state() {
        let form = EditPlaylistForm {
            playlist_id: s("1"),
            new_name: s("Renamed"),
            is_private_t: s("on"),
            ..Default::default()
        };
        // Currently private and the "t" box still ticked: stays private.
        assert!(form.requested_privacy(true));
        // Currently public: only the "f" box counts, which is absent.
        assert!(!form.requested_privacy(false));

        let edit = form.validate(true).unwrap().unwrap();
        assert_eq!(edit.name, "Renamed");
        assert_eq!(edit.description, None);
        assert!(edit.is_private);
    }

    #[test]
    fn test_edit_playlist_without_name_is_a_no_op() {
        let form = EditPlaylistForm {
            playlist_id: s("1"),
            new_description: s("ignored"),
            ..Default::default()
        };
        assert_eq!(form.validate(false).unwrap(), None);
    }

    #[test]
    fn test_edit_playlist_rejects_blank_name() {
        let form = EditPlaylistForm {
            playlist_id: s("1"),
            new_name: s("  "),
            ..Default::default()
        };
        assert!(form.validate(false).unwrap_err().has("new_name"));
    }

    #[test]
    fn test_login_form() {
        let form = LoginForm {
            username: s(" pengu "),
            password: s("pw"),
        };
        assert_eq!(form.validate().unwrap(), ("pengu".to_string(), "pw".to_string()));
        assert!(LoginForm::default().validate().is_err());
    }
}
