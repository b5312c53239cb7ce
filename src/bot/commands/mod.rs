//! Discord command implementations organized by cog.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Guild administration commands
pub mod admin;

/// General utility commands
pub mod general;

/// Test cog, exercises the data store
pub mod testc;
