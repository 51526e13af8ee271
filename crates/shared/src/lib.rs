//! Wire types exchanged with the Support Auditor backend.

pub mod domain;
pub mod error;
pub mod protocol;
