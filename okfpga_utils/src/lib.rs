//! # okfpga utilities
//!
//! File formats used when bringing up an Opal Kelly FrontPanel design: the comma-delimited
//! register map that names every endpoint, and the bitstream that programs the FPGA.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bitstream;
pub mod register_map;
