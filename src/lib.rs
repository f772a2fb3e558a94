//! rcatrack: closed-loop root cause analysis tracking
//!
//! Ingests RCA documents as plain text, extracts their Root Cause and Long
//! Term Solutions, turns each solution into a tracked remedial action and
//! flags new incidents that resemble a documented RCA.

pub mod cli;
pub mod core;
pub mod entities;
