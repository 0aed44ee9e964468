//! Shared protocol definitions for the Palaver wire format.

pub mod codec;
pub mod domain;
pub mod event;
