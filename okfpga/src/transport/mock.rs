//! Mock transport implementations used in testing the interface

use super::{
    DeviceInfo,
    Error,
    Transport,
    TransportResult,
};
use ::frontpanel::{
    check_transfer,
    pll::{
        Pll22150,
        Pll22393,
    },
    ErrorCode,
};
use std::collections::{
    HashMap,
    VecDeque,
};

/// Every call a [`Mock`] has served, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    OpenBySerial(String),
    DeviceInfo,
    DeviceId,
    ConfigureFpga(usize),
    Pll22393Configuration,
    SetPll22393Configuration(Pll22393),
    SetEepromPll22393Configuration(Pll22393),
    Pll22150Configuration,
    SetPll22150Configuration(Pll22150),
    SetEepromPll22150Configuration(Pll22150),
    SetWireInValue { addr: u32, value: u32, mask: u32 },
    UpdateWireIns,
    UpdateWireOuts,
    WireOutValue(u32),
    ActivateTriggerIn { addr: u32, bit: u32 },
    ReadFromPipeOut { addr: u32, len: usize },
    ReadFromBlockPipeOut { addr: u32, block_size: usize, len: usize },
}

/// Which clock synthesizer the mocked board carries
#[derive(Debug, Clone, PartialEq)]
enum Synth {
    None,
    Pll22393 { live: Pll22393, eeprom: Pll22393 },
    Pll22150 { live: Pll22150, eeprom: Pll22150 },
}

/// A board that mocks wires, triggers, pipes and the clock synthesizer, useful for testing
#[derive(Debug)]
pub struct Mock {
    info: DeviceInfo,
    open: bool,
    synth: Synth,
    bitstream: Option<Vec<u8>>,
    bitstream_status: Option<ErrorCode>,
    pll_status: Option<ErrorCode>,
    /// Host-side wire-in buffer
    wire_in_buffer: HashMap<u32, u32>,
    /// Wire-ins as last sent to the fabric
    wire_ins: HashMap<u32, u32>,
    /// Wire-outs as driven by the fabric
    wire_outs: HashMap<u32, u32>,
    /// Host-side wire-out buffer
    wire_out_buffer: HashMap<u32, u32>,
    loopback: Option<u32>,
    triggers: Vec<(u32, u32)>,
    pipes: HashMap<u32, VecDeque<u8>>,
    transfer_codes: VecDeque<i64>,
    calls: Vec<Call>,
}

impl Default for Mock {
    fn default() -> Self {
        Self::new()
    }
}

impl Mock {
    /// A board with a CY22393 in its default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_synth(Synth::Pll22393 {
            live: Pll22393::default(),
            eeprom: Pll22393::default(),
        })
    }

    /// A board with a CY22150 in its default configuration
    #[must_use]
    pub fn with_pll22150() -> Self {
        Self::with_synth(Synth::Pll22150 {
            live: Pll22150::default(),
            eeprom: Pll22150::default(),
        })
    }

    /// A board without a programmable clock synthesizer
    #[must_use]
    pub fn without_pll() -> Self {
        Self::with_synth(Synth::None)
    }

    fn with_synth(synth: Synth) -> Self {
        Self {
            info: DeviceInfo {
                device_id: "Mock XEM".to_owned(),
                serial: "0000000000".to_owned(),
                product_name: "XEM3010".to_owned(),
                device_major_version: 1,
                device_minor_version: 0,
            },
            open: false,
            synth,
            bitstream: None,
            bitstream_status: None,
            pll_status: None,
            wire_in_buffer: HashMap::new(),
            wire_ins: HashMap::new(),
            wire_outs: HashMap::new(),
            wire_out_buffer: HashMap::new(),
            loopback: None,
            triggers: vec![],
            pipes: HashMap::new(),
            transfer_codes: VecDeque::new(),
            calls: vec![],
        }
    }

    /// Drive wire-out `addr + offset` from wire-in `addr` whenever wire-ins are updated, like a
    /// design that echoes its inputs
    #[must_use]
    pub fn with_loopback(mut self, offset: u32) -> Self {
        self.loopback = Some(offset);
        self
    }

    /// Set the device identifier the board reports
    #[must_use]
    pub fn with_device_id(mut self, device_id: &str) -> Self {
        self.info.device_id = device_id.to_owned();
        self
    }

    /// Make the next bitstream upload fail with `code`
    pub fn reject_bitstream(&mut self, code: ErrorCode) {
        self.bitstream_status = Some(code);
    }

    /// Make the next clock synthesizer read or write fail with `code`
    pub fn fail_next_pll_access(&mut self, code: ErrorCode) {
        self.pll_status = Some(code);
    }

    /// Drive wire-out `addr` from the fabric side
    pub fn set_wire_out(&mut self, addr: u32, value: u32) {
        self.wire_outs.insert(addr, value);
    }

    /// The value of wire-in `addr` as last sent to the fabric
    #[must_use]
    pub fn wire_in(&self, addr: u32) -> u32 {
        self.wire_ins.get(&addr).copied().unwrap_or_default()
    }

    /// Queue bytes for the fabric to send on pipe-out `addr`
    pub fn push_pipe_data(&mut self, addr: u32, data: &[u8]) {
        self.pipes.entry(addr).or_default().extend(data);
    }

    /// Make the next pipe transfer return the raw SDK code `code`
    pub fn fail_next_transfer(&mut self, code: i64) {
        self.transfer_codes.push_back(code);
    }

    /// Triggers fired so far, as `(addr, bit)`
    #[must_use]
    pub fn triggers(&self) -> &[(u32, u32)] {
        &self.triggers
    }

    #[must_use]
    pub fn bitstream(&self) -> Option<&[u8]> {
        self.bitstream.as_deref()
    }

    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Live and EEPROM copies of the CY22393 configuration, if fitted
    #[must_use]
    pub fn pll22393(&self) -> Option<(&Pll22393, &Pll22393)> {
        match &self.synth {
            Synth::Pll22393 { live, eeprom } => Some((live, eeprom)),
            _ => None,
        }
    }

    /// Live and EEPROM copies of the CY22150 configuration, if fitted
    #[must_use]
    pub fn pll22150(&self) -> Option<(&Pll22150, &Pll22150)> {
        match &self.synth {
            Synth::Pll22150 { live, eeprom } => Some((live, eeprom)),
            _ => None,
        }
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(ErrorCode::DeviceNotOpen.into())
        }
    }

    fn pll_access(&mut self) -> TransportResult<()> {
        self.ensure_open()?;
        match self.pll_status.take() {
            Some(code) => Err(code.into()),
            None => Ok(()),
        }
    }

    fn transfer(&mut self, addr: u32, data: &mut [u8]) -> TransportResult<usize> {
        self.ensure_open()?;
        if let Some(code) = self.transfer_codes.pop_front() {
            return Ok(check_transfer(code)?);
        }
        let queue = self.pipes.entry(addr).or_default();
        for byte in data.iter_mut() {
            *byte = queue.pop_front().unwrap_or_default();
        }
        Ok(data.len())
    }
}

impl Transport for Mock {
    fn open_by_serial(&mut self, serial: &str) -> TransportResult<()> {
        self.calls.push(Call::OpenBySerial(serial.to_owned()));
        if !serial.is_empty() && serial != self.info.serial {
            return Err(Error::NoDevice(serial.to_owned()));
        }
        self.open = true;
        Ok(())
    }

    fn device_info(&mut self) -> TransportResult<DeviceInfo> {
        self.calls.push(Call::DeviceInfo);
        self.ensure_open()?;
        Ok(self.info.clone())
    }

    fn device_id(&mut self) -> TransportResult<String> {
        self.calls.push(Call::DeviceId);
        self.ensure_open()?;
        Ok(self.info.device_id.clone())
    }

    fn configure_fpga(&mut self, bitstream: &[u8]) -> TransportResult<()> {
        self.calls.push(Call::ConfigureFpga(bitstream.len()));
        self.ensure_open()?;
        if let Some(code) = self.bitstream_status.take() {
            return Err(code.into());
        }
        if bitstream.is_empty() {
            return Err(ErrorCode::InvalidBitstream.into());
        }
        self.bitstream = Some(bitstream.to_vec());
        // Reconfiguration resets the fabric
        self.wire_ins.clear();
        self.wire_outs.clear();
        self.triggers.clear();
        self.pipes.clear();
        Ok(())
    }

    fn pll22393_configuration(&mut self) -> TransportResult<Pll22393> {
        self.calls.push(Call::Pll22393Configuration);
        self.pll_access()?;
        match &self.synth {
            Synth::Pll22393 { live, .. } => Ok(live.clone()),
            _ => Err(Error::NoPll("PLL22393")),
        }
    }

    fn set_pll22393_configuration(&mut self, pll: &Pll22393) -> TransportResult<()> {
        self.calls.push(Call::SetPll22393Configuration(pll.clone()));
        self.pll_access()?;
        match &mut self.synth {
            Synth::Pll22393 { live, .. } => {
                *live = pll.clone();
                Ok(())
            }
            _ => Err(Error::NoPll("PLL22393")),
        }
    }

    fn set_eeprom_pll22393_configuration(&mut self, pll: &Pll22393) -> TransportResult<()> {
        self.calls
            .push(Call::SetEepromPll22393Configuration(pll.clone()));
        self.pll_access()?;
        match &mut self.synth {
            Synth::Pll22393 { eeprom, .. } => {
                *eeprom = pll.clone();
                Ok(())
            }
            _ => Err(Error::NoPll("PLL22393")),
        }
    }

    fn pll22150_configuration(&mut self) -> TransportResult<Pll22150> {
        self.calls.push(Call::Pll22150Configuration);
        self.pll_access()?;
        match &self.synth {
            Synth::Pll22150 { live, .. } => Ok(live.clone()),
            _ => Err(Error::NoPll("PLL22150")),
        }
    }

    fn set_pll22150_configuration(&mut self, pll: &Pll22150) -> TransportResult<()> {
        self.calls.push(Call::SetPll22150Configuration(pll.clone()));
        self.pll_access()?;
        match &mut self.synth {
            Synth::Pll22150 { live, .. } => {
                *live = pll.clone();
                Ok(())
            }
            _ => Err(Error::NoPll("PLL22150")),
        }
    }

    fn set_eeprom_pll22150_configuration(&mut self, pll: &Pll22150) -> TransportResult<()> {
        self.calls
            .push(Call::SetEepromPll22150Configuration(pll.clone()));
        self.pll_access()?;
        match &mut self.synth {
            Synth::Pll22150 { eeprom, .. } => {
                *eeprom = pll.clone();
                Ok(())
            }
            _ => Err(Error::NoPll("PLL22150")),
        }
    }

    fn set_wire_in_value(&mut self, addr: u32, value: u32, mask: u32) -> TransportResult<()> {
        self.calls.push(Call::SetWireInValue { addr, value, mask });
        self.ensure_open()?;
        let word = self.wire_in_buffer.entry(addr).or_default();
        *word = (*word & !mask) | (value & mask);
        Ok(())
    }

    fn update_wire_ins(&mut self) -> TransportResult<()> {
        self.calls.push(Call::UpdateWireIns);
        self.ensure_open()?;
        for (&addr, &value) in &self.wire_in_buffer {
            self.wire_ins.insert(addr, value);
            if let Some(offset) = self.loopback {
                self.wire_outs.insert(addr + offset, value);
            }
        }
        Ok(())
    }

    fn update_wire_outs(&mut self) -> TransportResult<()> {
        self.calls.push(Call::UpdateWireOuts);
        self.ensure_open()?;
        self.wire_out_buffer = self.wire_outs.clone();
        Ok(())
    }

    fn wire_out_value(&mut self, addr: u32) -> TransportResult<u32> {
        self.calls.push(Call::WireOutValue(addr));
        self.ensure_open()?;
        Ok(self.wire_out_buffer.get(&addr).copied().unwrap_or_default())
    }

    fn activate_trigger_in(&mut self, addr: u32, bit: u32) -> TransportResult<()> {
        self.calls.push(Call::ActivateTriggerIn { addr, bit });
        self.ensure_open()?;
        self.triggers.push((addr, bit));
        Ok(())
    }

    fn read_from_pipe_out(&mut self, addr: u32, data: &mut [u8]) -> TransportResult<usize> {
        self.calls.push(Call::ReadFromPipeOut {
            addr,
            len: data.len(),
        });
        self.transfer(addr, data)
    }

    fn read_from_block_pipe_out(
        &mut self,
        addr: u32,
        block_size: usize,
        data: &mut [u8],
    ) -> TransportResult<usize> {
        self.calls.push(Call::ReadFromBlockPipeOut {
            addr,
            block_size,
            len: data.len(),
        });
        if block_size == 0 || data.len() % block_size != 0 {
            self.ensure_open()?;
            return Err(ErrorCode::InvalidBlockSize.into());
        }
        self.transfer(addr, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_mock() -> Mock {
        let mut transport = Mock::new();
        transport.open_by_serial("").unwrap();
        transport
    }

    #[test]
    fn test_not_open() {
        let mut transport = Mock::new();
        assert!(matches!(
            transport.update_wire_ins(),
            Err(Error::FrontPanel(::frontpanel::Error::Code(
                ErrorCode::DeviceNotOpen
            )))
        ));
    }

    #[test]
    fn test_open_by_serial() {
        let mut transport = Mock::new();
        assert!(matches!(
            transport.open_by_serial("1234"),
            Err(Error::NoDevice(serial)) if serial == "1234"
        ));
        transport.open_by_serial("0000000000").unwrap();
        assert_eq!(transport.device_id().unwrap(), "Mock XEM");
    }

    #[test]
    fn test_masked_wire_ins() {
        let mut transport = open_mock();
        transport.set_wire_in_value(0x00, 0xFFFF_FFFF, 0x0000_00F0).unwrap();
        transport.set_wire_in_value(0x00, 0x0000_0003, 0x0000_0003).unwrap();
        // Nothing reaches the fabric until the update
        assert_eq!(transport.wire_in(0x00), 0);
        transport.update_wire_ins().unwrap();
        assert_eq!(transport.wire_in(0x00), 0xF3);
        transport.set_wire_in_value(0x00, 0x0000_0000, 0x0000_0030).unwrap();
        transport.update_wire_ins().unwrap();
        assert_eq!(transport.wire_in(0x00), 0xC3);
    }

    #[test]
    fn test_wire_outs_latch() {
        let mut transport = open_mock();
        transport.set_wire_out(0x20, 42);
        assert_eq!(transport.wire_out_value(0x20).unwrap(), 0);
        transport.update_wire_outs().unwrap();
        assert_eq!(transport.wire_out_value(0x20).unwrap(), 42);
    }

    #[test]
    fn test_loopback() {
        let mut transport = open_mock().with_loopback(0x20);
        transport.set_wire_in_value(0x01, 7, u32::MAX).unwrap();
        transport.update_wire_ins().unwrap();
        transport.update_wire_outs().unwrap();
        assert_eq!(transport.wire_out_value(0x21).unwrap(), 7);
    }

    #[test]
    fn test_pipes() {
        let mut transport = open_mock();
        transport.push_pipe_data(0xA0, &[1, 2, 3]);
        let mut buf = [0xFF; 4];
        assert_eq!(transport.read_from_pipe_out(0xA0, &mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 0]);
        transport.fail_next_transfer(-2);
        assert!(matches!(
            transport.read_from_pipe_out(0xA0, &mut buf),
            Err(Error::FrontPanel(::frontpanel::Error::Code(ErrorCode::Timeout)))
        ));
        assert!(matches!(
            transport.read_from_block_pipe_out(0xA0, 3, &mut buf),
            Err(Error::FrontPanel(::frontpanel::Error::Code(
                ErrorCode::InvalidBlockSize
            )))
        ));
        assert_eq!(
            transport.read_from_block_pipe_out(0xA0, 2, &mut buf).unwrap(),
            4
        );
    }

    #[test]
    fn test_configure_resets_fabric() {
        let mut transport = open_mock();
        transport.set_wire_out(0x20, 1);
        transport.activate_trigger_in(0x40, 0).unwrap();
        transport.configure_fpga(&[1, 2, 3]).unwrap();
        assert_eq!(transport.bitstream(), Some(&[1u8, 2, 3][..]));
        assert!(transport.triggers().is_empty());
        transport.update_wire_outs().unwrap();
        assert_eq!(transport.wire_out_value(0x20).unwrap(), 0);
        transport.reject_bitstream(ErrorCode::DoneNotHigh);
        assert!(transport.configure_fpga(&[1]).is_err());
        assert!(transport.configure_fpga(&[]).is_err());
    }

    #[test]
    fn test_synths() {
        let mut transport = open_mock();
        assert!(transport.pll22393_configuration().is_ok());
        assert!(matches!(
            transport.pll22150_configuration(),
            Err(Error::NoPll("PLL22150"))
        ));
        let mut pll = Pll22393::default();
        pll.set_output_divider(0, 8).unwrap();
        transport.set_eeprom_pll22393_configuration(&pll).unwrap();
        let (live, eeprom) = transport.pll22393().unwrap();
        assert_eq!(live, &Pll22393::default());
        assert_eq!(eeprom, &pll);
        transport.fail_next_pll_access(ErrorCode::CommunicationError);
        assert!(matches!(
            transport.pll22393_configuration(),
            Err(Error::FrontPanel(::frontpanel::Error::Code(
                ErrorCode::CommunicationError
            )))
        ));
        assert!(transport.pll22393_configuration().is_ok());
    }
}
