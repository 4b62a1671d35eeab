//! Auth command handlers.

use anyhow::Result;
use dermascan_core::api::{Credentials, NewAccount};
use dermascan_core::validation;
use tracing::debug;

use super::{prompt, settle, value_or_prompt};
use crate::cli::App;
use crate::view;

pub async fn login(app: &mut App, username: &str, password: Option<String>) -> Result<()> {
    if let Some(existing) = app.store.state().auth.token.as_deref() {
        eprintln!(
            "Replacing the saved session (token: {})",
            view::mask_token(existing)
        );
    }

    let credentials = Credentials {
        username: username.trim().to_string(),
        password: value_or_prompt(password, "Password")?,
    };
    let outcome = app.store.login(&credentials).await;
    settle(app, outcome)?;

    if let Some(user) = &app.store.state().auth.user {
        println!("Signed in as {}", user.username);
    } else {
        println!("Signed in as {}", credentials.username);
    }
    Ok(())
}

pub fn logout(app: &mut App) -> Result<()> {
    let signed_in = app.store.state().auth.is_authenticated();
    // still clears the file, which may be unreadable rather than empty
    let outcome = app.store.logout();
    if !signed_in {
        app.store.drain_notices();
        outcome?;
        println!("Not signed in.");
        return Ok(());
    }
    settle(app, outcome)
}

pub async fn register(
    app: &mut App,
    username: &str,
    email: &str,
    password: Option<String>,
    confirm: Option<String>,
) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        return Err(validation::ValidationError::MissingField("username").into());
    }
    let email = validation::email(email)?;
    let (password, confirm) = match password.filter(|p| !p.is_empty()) {
        Some(p) => {
            let confirm = confirm.unwrap_or_else(|| p.clone());
            (p, confirm)
        }
        None => {
            let first = prompt("Password")?;
            let confirm = value_or_prompt(confirm, "Confirm password")?;
            (first, confirm)
        }
    };
    validation::new_password(&password, &confirm)?;

    let account = NewAccount {
        username: username.to_string(),
        email,
        password,
    };
    debug!(?account, "registering");
    let outcome = app.store.register(&account).await;
    settle(app, outcome)
}

pub fn status(app: &App) {
    println!("API:      {}", app.store.base_url());
    println!("Session:  {}", app.store.session_path().display());
    match app.store.state().auth.token.as_deref() {
        Some(token) => println!("Signed in (token: {})", view::mask_token(token)),
        None => println!("Not signed in."),
    }
}
