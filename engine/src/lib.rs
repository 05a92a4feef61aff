//! Hosting of line-protocol chess engines behind a single-slot mailbox, and
//! the turn controller which plays a game against them.

pub mod builtin;
pub mod comm;
pub mod controller;
pub mod frontend;
pub mod host;
pub mod info;
pub mod options;
pub mod rules;
pub mod score;
pub mod session;
pub mod uci;
