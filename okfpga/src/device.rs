//! The [`OpalKelly`] board: named wires, triggers and pipes, plus clock control

use crate::{
    core::{
        InvalidValue,
        RegisterValue,
    },
    pll::{
        Pll,
        PllControl,
        PllSnapshot,
        PllValue,
    },
    transport::{
        self,
        DeviceInfo,
        Transport,
    },
};
use frontpanel::{
    pll::{
        self as pll_model,
        ClockSource22393,
        Pll22150,
        Pll22393,
        P_RANGE,
        Q_RANGE,
    },
    ErrorCode,
};
use okfpga_utils::{
    bitstream::{
        self,
        read_bitstream,
        Bitstream,
    },
    register_map::{
        self,
        read_register_map,
        Direction,
        Kind,
        Layout,
        RegisterEntry,
        RegisterMap,
    },
};
use std::path::Path;
use thiserror::Error;
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Configuration(String),
    #[error(transparent)]
    Bitstream(#[from] bitstream::Error),
    #[error("The device has no programmable PLL")]
    NoPll,
    #[error("{operation} is not supported on the {chip}")]
    Unsupported {
        operation: &'static str,
        chip: &'static str,
    },
    #[error("Register name `{0}` not found")]
    UnknownRegister(String),
    #[error("Unknown PLL parameter `{0}`")]
    UnknownPllParameter(String),
    #[error("Register `{name}` is a {direction} {kind} and cannot be used by {operation}")]
    DirectionMismatch {
        name: String,
        direction: Direction,
        kind: Kind,
        operation: &'static str,
    },
    #[error("Opal Kelly error {0}")]
    Hardware(ErrorCode),
    #[error("Opal Kelly error {0} is not a known FrontPanel error code")]
    UnknownHardwareCode(i64),
    #[error("Value {value} exceeds the maximum value {max} of register `{name}`")]
    ValueTooLarge { name: String, value: u128, max: u64 },
    #[error("Clock divider must be between 0 and 127, got {0}")]
    DividerOutOfRange(i64),
    #[error(transparent)]
    InvalidValue(#[from] InvalidValue),
    #[error("{0} is not implemented yet")]
    NotImplemented(&'static str),
    #[error(transparent)]
    RegisterMap(#[from] register_map::Error),
    #[error(transparent)]
    Transport(transport::Error),
}

impl From<transport::Error> for Error {
    fn from(err: transport::Error) -> Self {
        match err {
            transport::Error::FrontPanel(frontpanel::Error::Code(code)) => Error::Hardware(code),
            transport::Error::FrontPanel(frontpanel::Error::Unknown(code)) => {
                Error::UnknownHardwareCode(code)
            }
            err => Error::Transport(err),
        }
    }
}

impl From<pll_model::Error> for Error {
    fn from(err: pll_model::Error) -> Self {
        Error::Configuration(err.to_string())
    }
}

impl Error {
    /// Diagnostics report a request that was skipped without touching the device. Everything
    /// else is fatal.
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            Error::UnknownRegister(_)
                | Error::DirectionMismatch { .. }
                | Error::ValueTooLarge { .. }
                | Error::NotImplemented(_)
        )
    }
}

fn diagnostic(err: Error) -> Error {
    warn!("{err}");
    err
}

/// Room for `data_length` 16-bit words
fn pipe_buffer(data_length: usize) -> Result<Vec<u8>, Error> {
    let len = data_length
        .checked_mul(2)
        .ok_or(Error::Transport(transport::Error::TooLong(data_length)))?;
    Ok(vec![0; len])
}

fn lookup<'a>(
    registers: &'a RegisterMap,
    name: &str,
    direction: Direction,
    kind: Kind,
    operation: &'static str,
) -> Result<&'a RegisterEntry, Error> {
    let entry = registers
        .get(name)
        .ok_or_else(|| diagnostic(Error::UnknownRegister(name.to_owned())))?;
    if entry.is(direction, kind) {
        Ok(entry)
    } else {
        Err(diagnostic(Error::DirectionMismatch {
            name: name.to_owned(),
            direction: entry.direction,
            kind: entry.kind,
            operation,
        }))
    }
}

/// A programmed Opal Kelly board together with the register map of its design.
///
/// Every endpoint of the design is addressed by the name given in the register map. Requests
/// that name an unknown register, or one of the wrong direction or kind, are skipped and
/// reported as diagnostics (see [`Error::is_diagnostic`]).
#[derive(Debug)]
pub struct OpalKelly<T> {
    transport: T,
    info: DeviceInfo,
    device_name: String,
    pll: Option<Pll>,
    pll_info: PllSnapshot,
    registers: RegisterMap,
}

impl<T> OpalKelly<T>
where
    T: Transport,
{
    /// Open the first attached board, program it with `bitstream` and load the register map at
    /// `registers`
    /// # Errors
    /// Returns an error if either file can't be read, the device can't be opened, or the FPGA
    /// does not accept the bitstream
    pub fn new<B, R>(transport: T, bitstream: B, registers: R) -> Result<Self, Error>
    where
        B: AsRef<Path>,
        R: AsRef<Path>,
    {
        Self::with_serial(transport, "", bitstream, registers)
    }

    /// Same as [`OpalKelly::new`], but opens the board with serial number `serial`
    /// # Errors
    /// Returns an error if either file can't be read, the device can't be opened, or the FPGA
    /// does not accept the bitstream
    pub fn with_serial<B, R>(
        transport: T,
        serial: &str,
        bitstream: B,
        registers: R,
    ) -> Result<Self, Error>
    where
        B: AsRef<Path>,
        R: AsRef<Path>,
    {
        let bitstream = read_bitstream(bitstream)?;
        let registers = read_register_map(registers, Layout::Standard)?;
        Self::connect(transport, serial, &bitstream, registers)
    }

    /// Open the first attached board with an already loaded bitstream and register map
    /// # Errors
    /// Returns an error if the device can't be opened or the FPGA does not accept the bitstream
    pub fn from_parts(
        transport: T,
        bitstream: &Bitstream,
        registers: RegisterMap,
    ) -> Result<Self, Error> {
        Self::connect(transport, "", bitstream, registers)
    }

    fn connect(
        mut transport: T,
        serial: &str,
        bitstream: &Bitstream,
        registers: RegisterMap,
    ) -> Result<Self, Error> {
        transport.open_by_serial(serial)?;
        let info = transport.device_info()?;
        debug!(?info, "Opened device");

        let pll = Pll::detect(&mut transport)?;
        let pll_info = match &pll {
            Some(pll) => {
                info!("Found a {} clock synthesizer", pll.name());
                pll.snapshot()
            }
            None => {
                warn!(
                    "No programmable PLL found on the {}, clock control is unavailable",
                    info.product_name
                );
                PllSnapshot::new()
            }
        };

        if let Some(header) = &bitstream.header {
            info!(
                "Bitstream {} for {} built {} {}",
                header.design, header.part, header.date, header.time
            );
        }
        info!(
            "Uploading {:?} ({} bytes, md5 {})",
            bitstream.filename,
            bitstream.data.len(),
            bitstream.md5_string()
        );
        transport
            .configure_fpga(&bitstream.data)
            .map_err(|e| Error::Configuration(format!("Wrong bit file selected: {e}")))?;

        let device_name = transport.device_id()?;
        info!("You are using: {device_name}");

        Ok(Self {
            transport,
            info,
            device_name,
            pll,
            pll_info,
            registers,
        })
    }

    /// Replace the register map with the one at `path`
    /// # Errors
    /// Returns an error if the file can't be read or parsed, in which case the current map is
    /// kept
    pub fn reload_registers<P>(&mut self, path: P, layout: Layout) -> Result<(), Error>
    where
        P: AsRef<Path>,
    {
        self.registers = read_register_map(path, layout)?;
        Ok(())
    }

    /// Write `value` to the wire register `name`. Only the bits of the register's field
    /// change; the rest of the endpoint keeps its value.
    /// # Errors
    /// Returns a diagnostic if the register is unknown, is not a `FromPC` wire, or `value`
    /// does not fit in its width. Returns a fatal error for negative or malformed values and on
    /// transport failures.
    pub fn set_register<V>(&mut self, name: &str, value: V) -> Result<(), Error>
    where
        V: Into<RegisterValue>,
    {
        let value = value.into().resolve()?;
        let entry = lookup(
            &self.registers,
            name,
            Direction::FromPc,
            Kind::Wire,
            "set_register",
        )?;
        let raw = u32::try_from(value)
            .ok()
            .filter(|&v| u64::from(v) <= entry.max_value())
            .ok_or_else(|| {
                diagnostic(Error::ValueTooLarge {
                    name: name.to_owned(),
                    value,
                    max: entry.max_value(),
                })
            })?;
        debug!(
            "Wire-in {:#04x} <- {:#x} (mask {:#010x})",
            entry.address,
            raw << entry.bit_offset,
            entry.mask()
        );
        self.transport
            .set_wire_in_value(entry.address, raw << entry.bit_offset, entry.mask())?;
        self.transport.update_wire_ins()?;
        Ok(())
    }

    /// Read the whole 32-bit endpoint behind the wire register `name`, unshifted and unmasked
    /// # Errors
    /// Returns a diagnostic if the register is unknown or is not a `ToPC` wire, or a fatal
    /// error on transport failures
    pub fn get_register(&mut self, name: &str) -> Result<u32, Error> {
        let entry = lookup(
            &self.registers,
            name,
            Direction::ToPc,
            Kind::Wire,
            "get_register",
        )?;
        self.transport.update_wire_outs()?;
        Ok(self.transport.wire_out_value(entry.address)?)
    }

    /// Read only the field of the wire register `name`, shifted down to bit zero
    /// # Errors
    /// Same as [`OpalKelly::get_register`]
    pub fn get_register_field(&mut self, name: &str) -> Result<u32, Error> {
        let entry = lookup(
            &self.registers,
            name,
            Direction::ToPc,
            Kind::Wire,
            "get_register_field",
        )?;
        self.transport.update_wire_outs()?;
        let raw = self.transport.wire_out_value(entry.address)?;
        Ok(entry.extract(raw))
    }

    /// # Errors
    /// Always returns the [`Error::NotImplemented`] diagnostic
    pub fn set_block_pipe(&mut self, name: &str, data: &[u8]) -> Result<(), Error> {
        debug!("Dropping {} bytes for pipe `{name}`", data.len());
        Err(diagnostic(Error::NotImplemented("set_block_pipe")))
    }

    /// Read `2 * data_length` bytes (`data_length` 16-bit words) from the block-throttled
    /// pipe `name`, in blocks of `block_size` bytes
    /// # Errors
    /// Returns a diagnostic if the pipe is unknown or is not a `ToPC` pipe, or a fatal error
    /// carrying the FrontPanel error code if the transfer fails
    pub fn get_block_pipe(
        &mut self,
        name: &str,
        data_length: usize,
        block_size: usize,
    ) -> Result<Vec<u8>, Error> {
        let entry = lookup(
            &self.registers,
            name,
            Direction::ToPc,
            Kind::BtPipe,
            "get_block_pipe",
        )?;
        let mut buf = pipe_buffer(data_length)?;
        let read = self
            .transport
            .read_from_block_pipe_out(entry.address, block_size, &mut buf)?;
        debug!("Read {read} bytes from pipe `{name}`");
        Ok(buf)
    }

    /// Read `2 * data_length` bytes from the pipe `name` in a single transfer. This does not
    /// wait for the design to signal that data is ready.
    /// # Errors
    /// Same as [`OpalKelly::get_block_pipe`]
    pub fn get_pipe(&mut self, name: &str, data_length: usize) -> Result<Vec<u8>, Error> {
        let entry = lookup(
            &self.registers,
            name,
            Direction::ToPc,
            Kind::BtPipe,
            "get_pipe",
        )?;
        let mut buf = pipe_buffer(data_length)?;
        let read = self.transport.read_from_pipe_out(entry.address, &mut buf)?;
        debug!("Read {read} bytes from pipe `{name}`");
        Ok(buf)
    }

    /// Fire the trigger `name`
    /// # Errors
    /// Returns a diagnostic if the trigger is unknown or is not a `FromPC` trigger, or a fatal
    /// error on transport failures
    pub fn set_trigger(&mut self, name: &str) -> Result<(), Error> {
        let entry = lookup(
            &self.registers,
            name,
            Direction::FromPc,
            Kind::Trigger,
            "set_trigger",
        )?;
        Ok(self
            .transport
            .activate_trigger_in(entry.address, entry.bit_offset)?)
    }

    /// # Errors
    /// Always returns the [`Error::NotImplemented`] diagnostic
    pub fn get_trigger(&mut self, name: &str) -> Result<bool, Error> {
        debug!("Not checking trigger `{name}`");
        Err(diagnostic(Error::NotImplemented("get_trigger")))
    }

    /// Set the dividers and enable of PLL `number`, then store the configuration in the
    /// running chip and its EEPROM. On a CY22150 this sets the single VCO, so `number` must be
    /// 0 and `enable` must be true.
    /// # Errors
    /// Returns an error if `p` is outside 6..=2053 or `q` outside 2..=257 (before touching the
    /// device), if the board has no such PLL, or on transport failures
    pub fn set_pll(&mut self, number: usize, p: u32, q: u32, enable: bool) -> Result<(), Error> {
        if !P_RANGE.contains(&p) {
            return Err(Error::Configuration(format!(
                "PLL P parameter must be between 6 and 2053, got {p}"
            )));
        }
        if !Q_RANGE.contains(&q) {
            return Err(Error::Configuration(format!(
                "PLL Q parameter must be between 2 and 257, got {q}"
            )));
        }
        // Edits land in the model only once the device has accepted them
        let mut pll = self.pll.clone().ok_or(Error::NoPll)?;
        match &mut pll {
            Pll::Pll22393(config) => config.set_pll_parameters(number, p, q, enable)?,
            Pll::Pll22150(config) => {
                if number != 0 || !enable {
                    return Err(Error::Unsupported {
                        operation: "Setting anything but an enabled PLL 0",
                        chip: Pll22150::NAME,
                    });
                }
                config.set_vco_parameters(p, q)?;
            }
        }
        pll.push(&mut self.transport)?;
        self.pll = Some(pll);
        self.update_pll()
    }

    /// Route SYSCLK`number` (1 to 5) from `source` through `divider`, then store the
    /// configuration in the running chip and its EEPROM. SYSCLK5 is hardwired to `PLL0-0`;
    /// any other source for it is ignored with a warning.
    /// # Errors
    /// Returns an error if `divider` is outside 0..=127, `source` is not one of `REF`,
    /// `PLL0-0`, `PLL0-180`, `PLL1-0`, `PLL1-180`, `PLL2-0` or `PLL2-180`, the board has no
    /// CY22393, or on transport failures
    pub fn set_sys_clk(
        &mut self,
        number: usize,
        source: &str,
        divider: i64,
        enable: bool,
    ) -> Result<(), Error> {
        let divider = u32::try_from(divider)
            .ok()
            .filter(|&d| d <= Pll22393::MAX_DIVIDER)
            .ok_or(Error::DividerOutOfRange(divider))?;
        let source: ClockSource22393 = source.parse().map_err(|_| {
            let names: Vec<_> = ClockSource22393::ALL.iter().map(ToString::to_string).collect();
            Error::Configuration(format!(
                "Clock source must be one of {}, got `{source}`",
                names.join(", ")
            ))
        })?;
        if !(1..=Pll22393::OUTPUTS).contains(&number) {
            return Err(Error::Configuration(format!(
                "SYSCLK number must be between 1 and {}, got {number}",
                Pll22393::OUTPUTS
            )));
        }
        let mut config = match &self.pll {
            Some(Pll::Pll22393(config)) => config.clone(),
            Some(Pll::Pll22150(_)) => {
                return Err(Error::Unsupported {
                    operation: "set_sys_clk",
                    chip: Pll22150::NAME,
                })
            }
            None => return Err(Error::NoPll),
        };
        let output = number - 1;
        if output == Pll22393::FIXED_OUTPUT {
            if source != Pll22393::FIXED_SOURCE {
                warn!(
                    "Ignoring the clock source, SYSCLK{number} is fixed to {}",
                    Pll22393::FIXED_SOURCE
                );
            }
        } else {
            config.set_output_source(output, source)?;
        }
        config.set_output_divider(output, divider)?;
        config.set_output_enable(output, enable)?;
        config.push(&mut self.transport)?;
        self.pll = Some(Pll::Pll22393(config));
        self.update_pll()
    }

    /// Re-read the PLL from the device and return the parameter `name`, e.g.
    /// `"PLL0 Frequency"` or `"SYSCLK2 Divider"`
    /// # Errors
    /// Returns an error if the board has no PLL, the parameter does not exist, or on transport
    /// failures
    pub fn get_pll(&mut self, name: &str) -> Result<PllValue, Error> {
        self.update_pll()?;
        self.pll_info
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownPllParameter(name.to_owned()))
    }

    fn update_pll(&mut self) -> Result<(), Error> {
        let pll = self.pll.as_mut().ok_or(Error::NoPll)?;
        pll.refresh(&mut self.transport)?;
        self.pll_info = pll.snapshot();
        Ok(())
    }
}

impl<T> OpalKelly<T> {
    /// The user-assignable device identifier, as read after programming
    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    #[must_use]
    pub fn registers(&self) -> &RegisterMap {
        &self.registers
    }

    #[must_use]
    pub fn register(&self, name: &str) -> Option<&RegisterEntry> {
        self.registers.get(name)
    }

    /// The clock synthesizer found at construction, as of the last refresh
    #[must_use]
    pub fn pll_variant(&self) -> Option<&Pll> {
        self.pll.as_ref()
    }

    /// PLL parameters as of the last refresh, without touching the device
    #[must_use]
    pub fn pll_snapshot(&self) -> &PllSnapshot {
        &self.pll_info
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give up the board, handing back the transport
    pub fn into_transport(self) -> T {
        self.transport
    }
}
