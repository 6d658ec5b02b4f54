//! Blog API Middleware

pub mod auth;
pub mod view_counter;
