//! Token secrets, derived credentials, and refresh records.

pub mod derived;
pub mod record;
pub mod secret;
