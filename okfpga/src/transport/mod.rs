//! Defines the capability surface every FrontPanel transport must implement

#[cfg(feature = "sdk")]
pub mod frontpanel;
pub mod mock;

use ::frontpanel::{
    pll::{
        Pll22150,
        Pll22393,
    },
    ErrorCode,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    FrontPanel(#[from] ::frontpanel::Error),
    #[error("No device with serial `{0}` is attached")]
    NoDevice(String),
    #[error("The device has no {0} clock synthesizer")]
    NoPll(&'static str),
    #[error("Transfer of {0} bytes is too long for the SDK")]
    TooLong(usize),
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Error::FrontPanel(code.into())
    }
}

pub type TransportResult<T> = Result<T, Error>;

/// What the device reports about itself
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// User-assignable device identifier
    pub device_id: String,
    pub serial: String,
    /// Board model, e.g. `XEM3010`
    pub product_name: String,
    pub device_major_version: u32,
    pub device_minor_version: u32,
}

/// The trait that is implemented for FrontPanel transport mechanisms. Apart from
/// [`Transport::open_by_serial`], the methods *assume* that the device is already open.
///
/// Wire-ins are buffered on the host: [`Transport::set_wire_in_value`] edits the buffer and
/// [`Transport::update_wire_ins`] sends it. Wire-outs work the other way around.
pub trait Transport {
    /// Open the device with serial number `serial`, or the first one found if it is empty
    fn open_by_serial(&mut self, serial: &str) -> TransportResult<()>;

    fn device_info(&mut self) -> TransportResult<DeviceInfo>;

    /// The user-assignable device identifier
    fn device_id(&mut self) -> TransportResult<String>;

    /// Program the FPGA with the contents of a bitstream file
    fn configure_fpga(&mut self, bitstream: &[u8]) -> TransportResult<()>;

    /// Read the live configuration of a CY22393
    fn pll22393_configuration(&mut self) -> TransportResult<Pll22393>;

    fn set_pll22393_configuration(&mut self, pll: &Pll22393) -> TransportResult<()>;

    /// Store a CY22393 configuration in the EEPROM copy loaded at power up
    fn set_eeprom_pll22393_configuration(&mut self, pll: &Pll22393) -> TransportResult<()>;

    /// Read the live configuration of a CY22150
    fn pll22150_configuration(&mut self) -> TransportResult<Pll22150>;

    fn set_pll22150_configuration(&mut self, pll: &Pll22150) -> TransportResult<()>;

    /// Store a CY22150 configuration in the EEPROM copy loaded at power up
    fn set_eeprom_pll22150_configuration(&mut self, pll: &Pll22150) -> TransportResult<()>;

    /// Update the bits of the host-side wire-in buffer at `addr` selected by `mask`
    fn set_wire_in_value(&mut self, addr: u32, value: u32, mask: u32) -> TransportResult<()>;

    /// Send every buffered wire-in to the device
    fn update_wire_ins(&mut self) -> TransportResult<()>;

    /// Latch every wire-out from the device into the host-side buffer
    fn update_wire_outs(&mut self) -> TransportResult<()>;

    /// Value of wire-out `addr` as of the last [`Transport::update_wire_outs`]
    fn wire_out_value(&mut self, addr: u32) -> TransportResult<u32>;

    fn activate_trigger_in(&mut self, addr: u32, bit: u32) -> TransportResult<()>;

    /// Fill `data` from pipe-out `addr` in one transfer, returning the number of bytes read
    fn read_from_pipe_out(&mut self, addr: u32, data: &mut [u8]) -> TransportResult<usize>;

    /// Fill `data` from block-throttled pipe-out `addr` in blocks of `block_size` bytes,
    /// returning the number of bytes read
    fn read_from_block_pipe_out(
        &mut self,
        addr: u32,
        block_size: usize,
        data: &mut [u8],
    ) -> TransportResult<usize>;
}
