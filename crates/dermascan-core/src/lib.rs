//! Core dermascan library (API client, state, session, config).

pub mod api;
pub mod config;
pub mod guard;
pub mod images;
pub mod logging;
pub mod session;
pub mod state;
pub mod store;
pub mod validation;
