//! Trait abstractions for external collaborators.

pub mod transport;
