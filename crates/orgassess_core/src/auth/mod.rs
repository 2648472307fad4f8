//! Authorization contracts.
//!
//! Permission strings (`<action>_<resource>`) and the capability-check port
//! used by the session manager for ownership checks.

pub mod capability;
pub mod policy;
