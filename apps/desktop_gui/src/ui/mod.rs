//! UI layer for the desktop app: shell, activity list, sign-up form, banner.

pub mod app;

pub use app::ActivityDeskApp;
