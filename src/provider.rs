//! Provider-facing descriptor covering every endpoint, relying party, and contract value the
//! delegation chain depends on.
//!
//! `descriptor` exposes validated metadata (`ProviderDescriptor`) defaulting to the Xbox Live
//! and Halo Waypoint production values; tests and staging deployments override individual
//! endpoints through the builder.

pub mod descriptor;

pub use descriptor::*;
