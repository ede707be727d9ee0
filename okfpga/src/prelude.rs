//! Prelude (helpful reexports) for this package

pub use crate::{
    core::RegisterValue,
    device::{
        Error,
        OpalKelly,
    },
    pll::{
        Pll,
        PllControl,
        PllValue,
    },
    transport::{
        mock::Mock,
        Transport,
    },
};
#[cfg(feature = "sdk")]
pub use crate::transport::frontpanel::FrontPanel;
pub use okfpga_utils::{
    bitstream::read_bitstream,
    register_map::{
        read_register_map,
        Layout,
    },
};
