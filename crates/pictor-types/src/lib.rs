//! Wire types shared by the HTTP handlers and their clients.

pub mod api;
