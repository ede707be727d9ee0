//! # okfpga
//!
//! Drive a design on an Opal Kelly FrontPanel board by name. A comma-delimited register map
//! names every wire, trigger and pipe of the design; [`OpalKelly`] programs the FPGA and then
//! reads and writes those endpoints by name, and configures the board's clock synthesizer.
//!
//! The board is reached through a [`transport::Transport`]. The in-memory
//! [`transport::mock::Mock`] is always available; the `sdk` feature adds
//! `transport::frontpanel::FrontPanel`, which links against the vendor's `libokFrontPanel`.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod core;
pub mod device;
pub mod pll;
pub mod prelude;
pub mod transport;

pub use device::{
    Error,
    OpalKelly,
};
