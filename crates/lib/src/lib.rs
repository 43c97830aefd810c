//! Botin core library: single-turn responder that stores inbound attachments or answers
//! menu commands with canned images, plus the gateway that hosts it.

pub mod activity;
pub mod attachments;
pub mod config;
pub mod gateway;
pub mod init;
pub mod menu;
pub mod reply;
pub mod router;
