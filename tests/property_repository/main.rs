//! Property repository integration tests
//!
//! Exercises the full stack (entity codec, branches, repository and the
//! in-memory backend) through the listing branches in `common`.

#[path = "../common/mod.rs"]
mod common;

mod expiry;
mod lifecycle;
mod sorted;
