//! Command vocabulary and wire encoding shared by the control client and its tools.

pub mod domain;
pub mod error;
pub mod protocol;
