//! Testing utilities for code built on the backend contract
//!
//! - **Scripted backend**: records every backend call and injects failures
//!   or refused expirations at chosen operations and keys, for exercising
//!   partial multi-key updates and AND-ed expiry results
//!
//! # Example
//!
//! ```
//! use keybranch_storage::testing::{BackendOp, ScriptedBackend};
//!
//! let backend = ScriptedBackend::new();
//! backend.fail_on(BackendOp::SetAdd, "grouped:Location");
//! backend.refuse_expire("Property:sorted:Price");
//! ```

mod scripted;

pub use scripted::{BackendOp, ScriptedBackend};
