//! Terminal presentation layer

pub mod chat;
pub mod history;
pub mod setup;
pub mod ui;
