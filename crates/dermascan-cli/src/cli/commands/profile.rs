//! Profile command handlers.

use anyhow::{Context, Result};
use dermascan_core::api::{PasswordChange, ProfileUpdate};
use dermascan_core::images::{ImageUpload, normalize_input_path};
use dermascan_core::validation;

use super::{print_json, require_login, settle, value_or_prompt};
use crate::cli::App;
use crate::view;

/// Fields given on the command line; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct ProfileEdits {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileEdits {
    fn apply(self, update: &mut ProfileUpdate) -> Result<()> {
        if let Some(username) = self.username {
            let username = username.trim();
            if username.is_empty() {
                return Err(validation::ValidationError::MissingField("username").into());
            }
            update.username = username.to_string();
        }
        if let Some(email) = self.email {
            update.email = validation::email(&email)?;
        }
        if let Some(first_name) = self.first_name {
            update.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = self.last_name {
            update.last_name = last_name.trim().to_string();
        }
        if let Some(avatar) = self.avatar {
            let path = normalize_input_path(&avatar);
            let image = ImageUpload::from_path(&path)
                .with_context(|| format!("read avatar {}", path.display()))?;
            update.avatar = Some(image.to_data_url());
        }
        Ok(())
    }
}

async fn load_profile(app: &mut App) -> Result<()> {
    let outcome = app.store.fetch_profile().await;
    settle(app, outcome)
}

fn print_profile(app: &App) -> Result<()> {
    let Some(user) = &app.store.state().auth.user else {
        return Ok(());
    };
    if app.json {
        print_json(user)
    } else {
        println!("{}", view::profile(user));
        Ok(())
    }
}

pub async fn show(app: &mut App) -> Result<()> {
    require_login(app)?;
    load_profile(app).await?;
    print_profile(app)
}

pub async fn update(app: &mut App, edits: ProfileEdits) -> Result<()> {
    require_login(app)?;

    // untouched fields are resent as the server has them
    load_profile(app).await?;
    let mut update = app
        .store
        .state()
        .auth
        .user
        .as_ref()
        .map(ProfileUpdate::from_profile)
        .unwrap_or_default();
    edits.apply(&mut update)?;

    let outcome = app.store.update_profile(&update).await;
    settle(app, outcome)?;
    print_profile(app)
}

pub async fn password(
    app: &mut App,
    current: Option<String>,
    new: Option<String>,
    confirm: Option<String>,
) -> Result<()> {
    require_login(app)?;

    let current_password = value_or_prompt(current, "Current password")?;
    let new_password = value_or_prompt(new, "New password")?;
    let confirm = value_or_prompt(confirm, "Confirm new password")?;
    validation::new_password(&new_password, &confirm)?;

    let change = PasswordChange {
        current_password,
        new_password,
    };
    let outcome = app.store.update_password(&change).await;
    settle(app, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> ProfileUpdate {
        ProfileUpdate {
            username: "dr.house".into(),
            email: "house@ppth.example".into(),
            first_name: "Gregory".into(),
            last_name: "House".into(),
            avatar: None,
        }
    }

    #[test]
    fn test_edits_keep_untouched_fields() {
        let mut update = current();
        ProfileEdits {
            first_name: Some(" Greg ".into()),
            ..ProfileEdits::default()
        }
        .apply(&mut update)
        .unwrap();
        assert_eq!(update.first_name, "Greg");
        assert_eq!(update.username, "dr.house");
        assert_eq!(update.email, "house@ppth.example");
    }

    #[test]
    fn test_edits_reject_bad_email() {
        let mut update = current();
        let err = ProfileEdits {
            email: Some("not-an-email".into()),
            ..ProfileEdits::default()
        }
        .apply(&mut update)
        .unwrap_err();
        assert!(err.to_string().contains("not a valid email"));
    }

    #[test]
    fn test_avatar_becomes_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("me.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").unwrap();

        let mut update = current();
        ProfileEdits {
            avatar: Some(path.to_string_lossy().into_owned()),
            ..ProfileEdits::default()
        }
        .apply(&mut update)
        .unwrap();
        assert!(
            update
                .avatar
                .as_deref()
                .unwrap()
                .starts_with("data:image/png;base64,")
        );
    }
}
