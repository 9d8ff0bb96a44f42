//! Client library for the Lingo language-exchange API: typed HTTP access,
//! session handling, and the client-side state machines behind the pages
//! (windowed lists, the onboarding wizard, optimistic mutations).

#[macro_use]
pub mod logging;

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod matching;
pub mod notifications;
pub mod optimistic;
pub mod reactions;
pub mod reply_tree;
pub mod server_config;
pub mod session;
pub mod storage;
pub mod views;
pub mod windowing;
pub mod wizard;

#[cfg(test)]
pub(crate) mod testing;
