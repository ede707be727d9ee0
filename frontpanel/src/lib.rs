//! Host-side vocabulary of the Opal Kelly FrontPanel SDK: the error codes its calls return and
//! models of the two clock synthesizers found on XEM boards.
//!
//! With the `sdk` feature the raw C bindings to `libokFrontPanel` are available in [`sys`].

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
pub mod pll;
#[cfg(feature = "sdk")]
pub mod sys;

pub use error::{
    check_status,
    check_transfer,
    Error,
    ErrorCode,
};
