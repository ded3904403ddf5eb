//! Contacts manager with a chat assistant: REST gateway, mutation and chat
//! coordinators, a persisted chat session and the list view model.
//!
//! The GTK front end lives in the binary behind the `gui` feature.

pub mod api;
pub mod app;
pub mod chat;
pub mod config;
pub mod contacts;
pub mod error;
pub mod notify;
pub mod query;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;
