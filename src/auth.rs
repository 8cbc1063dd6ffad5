//! Credential and profile models carried through the delegation chain.

pub mod profile;
pub mod token;

pub use profile::*;
pub use token::{derived::*, record::*, secret::*};
