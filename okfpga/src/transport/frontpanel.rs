//! Transport over the vendor's `libokFrontPanel`

use super::{
    DeviceInfo,
    Error,
    Transport,
    TransportResult,
};
use ::frontpanel::{
    check_status,
    check_transfer,
    pll::{
        ClockSource22150,
        ClockSource22393,
        DividerSource,
        Pll22150,
        Pll22393,
    },
    sys,
    ErrorCode,
};
use num_traits::{
    FromPrimitive,
    ToPrimitive,
};
use std::{
    ffi::{
        CStr,
        CString,
    },
    os::raw::{
        c_char,
        c_int,
        c_long,
    },
};
use tracing::debug;

/// A device attached through the FrontPanel SDK. The handle is released on drop.
#[derive(Debug)]
pub struct FrontPanel {
    handle: sys::okFrontPanel_HANDLE,
}

// The SDK handle is not tied to the thread that created it
unsafe impl Send for FrontPanel {}

impl FrontPanel {
    /// Construct an SDK handle. No device is opened until [`Transport::open_by_serial`].
    /// # Errors
    /// Returns an error if the SDK could not allocate a handle
    pub fn new() -> TransportResult<Self> {
        let handle = unsafe { sys::okFrontPanel_Construct() };
        if handle.is_null() {
            return Err(ErrorCode::Failed.into());
        }
        Ok(Self { handle })
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if unsafe { sys::okFrontPanel_IsOpen(self.handle) } == 0 {
            Err(ErrorCode::DeviceNotOpen.into())
        } else {
            Ok(())
        }
    }

    fn read_string(
        &self,
        len: usize,
        f: unsafe extern "C" fn(sys::okFrontPanel_HANDLE, *mut c_char),
    ) -> String {
        let mut buf: Vec<c_char> = vec![0; len + 1];
        unsafe {
            f(self.handle, buf.as_mut_ptr());
            CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
        }
    }
}

impl Drop for FrontPanel {
    fn drop(&mut self) {
        debug!("Releasing FrontPanel handle");
        unsafe { sys::okFrontPanel_Destruct(self.handle) }
    }
}

fn endpoint(addr: u32) -> TransportResult<c_int> {
    c_int::try_from(addr).map_err(|_| ErrorCode::InvalidEndpoint.into())
}

fn length(len: usize) -> TransportResult<c_long> {
    c_long::try_from(len).map_err(|_| Error::TooLong(len))
}

/// Only a board without the chip answers `UnsupportedFeature` to a configuration read
fn chip_status(code: c_int, chip: &'static str) -> TransportResult<()> {
    match check_status(code) {
        Err(::frontpanel::Error::Code(ErrorCode::UnsupportedFeature)) => Err(Error::NoPll(chip)),
        status => Ok(status?),
    }
}

fn int(v: u32) -> c_int {
    c_int::try_from(v).unwrap_or(c_int::MAX)
}

fn uint(v: c_int) -> u32 {
    u32::try_from(v).unwrap_or_default()
}

fn bool_arg(b: bool) -> sys::Bool {
    sys::Bool::from(b)
}

/// Owns a vendor CY22393 configuration object for the duration of one call
struct Handle22393 {
    raw: sys::okPLL22393_HANDLE,
}

/// Owns a vendor CY22150 configuration object for the duration of one call
struct Handle22150 {
    raw: sys::okPLL22150_HANDLE,
}

impl Handle22393 {
    fn new() -> TransportResult<Self> {
        let raw = unsafe { sys::okPLL22393_Construct() };
        if raw.is_null() {
            return Err(ErrorCode::Failed.into());
        }
        Ok(Self { raw })
    }

    fn load(pll: &Pll22393) -> TransportResult<Self> {
        let handle = Self::new()?;
        unsafe {
            sys::okPLL22393_SetReference(handle.raw, pll.reference);
            for (n, params) in (0..).zip(pll.plls.iter()) {
                let ok = sys::okPLL22393_SetPLLParameters(
                    handle.raw,
                    n,
                    int(params.p),
                    int(params.q),
                    bool_arg(params.enabled),
                );
                if ok == 0 {
                    return Err(ErrorCode::InvalidParameter.into());
                }
            }
            for (n, out) in (0..).zip(pll.outputs.iter()) {
                sys::okPLL22393_SetOutputSource(
                    handle.raw,
                    n,
                    out.source.to_i32().unwrap_or_default(),
                );
                sys::okPLL22393_SetOutputDivider(handle.raw, n, int(out.divider));
                sys::okPLL22393_SetOutputEnable(handle.raw, n, bool_arg(out.enabled));
            }
        }
        Ok(handle)
    }

    fn store(&self) -> TransportResult<Pll22393> {
        let mut pll = Pll22393::default();
        unsafe {
            pll.reference = sys::okPLL22393_GetReference(self.raw);
            for (n, params) in (0..).zip(pll.plls.iter_mut()) {
                params.p = uint(sys::okPLL22393_GetPLLP(self.raw, n));
                params.q = uint(sys::okPLL22393_GetPLLQ(self.raw, n));
                params.enabled = sys::okPLL22393_IsPLLEnabled(self.raw, n) != 0;
            }
            for (n, out) in (0..).zip(pll.outputs.iter_mut()) {
                let source = sys::okPLL22393_GetOutputSource(self.raw, n);
                out.source = ClockSource22393::from_i32(source)
                    .ok_or(::frontpanel::Error::Unknown(i64::from(source)))?;
                out.divider = uint(sys::okPLL22393_GetOutputDivider(self.raw, n));
                out.enabled = sys::okPLL22393_IsOutputEnabled(self.raw, n) != 0;
            }
        }
        Ok(pll)
    }
}

impl Handle22150 {
    fn new() -> TransportResult<Self> {
        let raw = unsafe { sys::okPLL22150_Construct() };
        if raw.is_null() {
            return Err(ErrorCode::Failed.into());
        }
        Ok(Self { raw })
    }

    fn load(pll: &Pll22150) -> TransportResult<Self> {
        let handle = Self::new()?;
        unsafe {
            sys::okPLL22150_SetReference(
                handle.raw,
                pll.reference,
                bool_arg(pll.external_oscillator),
            );
            if sys::okPLL22150_SetVCOParameters(handle.raw, int(pll.vco_p), int(pll.vco_q)) == 0 {
                return Err(ErrorCode::InvalidParameter.into());
            }
            sys::okPLL22150_SetDiv1(
                handle.raw,
                pll.div1.source.to_i32().unwrap_or_default(),
                int(pll.div1.n),
            );
            sys::okPLL22150_SetDiv2(
                handle.raw,
                pll.div2.source.to_i32().unwrap_or_default(),
                int(pll.div2.n),
            );
            for (n, out) in (0..).zip(pll.outputs.iter()) {
                sys::okPLL22150_SetOutputSource(
                    handle.raw,
                    n,
                    out.source.to_i32().unwrap_or_default(),
                );
                sys::okPLL22150_SetOutputEnable(handle.raw, n, bool_arg(out.enabled));
            }
        }
        Ok(handle)
    }

    fn store(&self) -> TransportResult<Pll22150> {
        let unknown = |v: c_int| ::frontpanel::Error::Unknown(i64::from(v));
        let mut pll = Pll22150::default();
        unsafe {
            pll.reference = sys::okPLL22150_GetReference(self.raw);
            pll.vco_p = uint(sys::okPLL22150_GetVCOP(self.raw));
            pll.vco_q = uint(sys::okPLL22150_GetVCOQ(self.raw));
            let src = sys::okPLL22150_GetDiv1Source(self.raw);
            pll.div1.source = DividerSource::from_i32(src).ok_or_else(|| unknown(src))?;
            pll.div1.n = uint(sys::okPLL22150_GetDiv1Divider(self.raw));
            let src = sys::okPLL22150_GetDiv2Source(self.raw);
            pll.div2.source = DividerSource::from_i32(src).ok_or_else(|| unknown(src))?;
            pll.div2.n = uint(sys::okPLL22150_GetDiv2Divider(self.raw));
            for (n, out) in (0..).zip(pll.outputs.iter_mut()) {
                let src = sys::okPLL22150_GetOutputSource(self.raw, n);
                out.source = ClockSource22150::from_i32(src).ok_or_else(|| unknown(src))?;
                out.enabled = sys::okPLL22150_IsOutputEnabled(self.raw, n) != 0;
            }
        }
        Ok(pll)
    }
}

impl Drop for Handle22393 {
    fn drop(&mut self) {
        unsafe { sys::okPLL22393_Destruct(self.raw) }
    }
}

impl Drop for Handle22150 {
    fn drop(&mut self) {
        unsafe { sys::okPLL22150_Destruct(self.raw) }
    }
}

impl Transport for FrontPanel {
    fn open_by_serial(&mut self, serial: &str) -> TransportResult<()> {
        let c_serial = CString::new(serial).map_err(|_| Error::NoDevice(serial.to_owned()))?;
        let code = unsafe { sys::okFrontPanel_OpenBySerial(self.handle, c_serial.as_ptr()) };
        match check_status(code) {
            Ok(()) => Ok(()),
            Err(::frontpanel::Error::Code(ErrorCode::DeviceNotOpen | ErrorCode::Failed)) => {
                Err(Error::NoDevice(serial.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn device_info(&mut self) -> TransportResult<DeviceInfo> {
        self.ensure_open()?;
        let model = unsafe { sys::okFrontPanel_GetBoardModel(self.handle) };
        let mut buf: Vec<c_char> = vec![0; sys::OK_MAX_BOARD_MODEL_STRING_LENGTH + 1];
        let product_name = unsafe {
            sys::okFrontPanel_GetBoardModelString(self.handle, model, buf.as_mut_ptr());
            CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
        };
        Ok(DeviceInfo {
            device_id: self.read_string(
                sys::OK_MAX_DEVICEID_LENGTH,
                sys::okFrontPanel_GetDeviceID,
            ),
            serial: self.read_string(
                sys::OK_MAX_SERIALNUMBER_LENGTH,
                sys::okFrontPanel_GetSerialNumber,
            ),
            product_name,
            device_major_version: uint(unsafe {
                sys::okFrontPanel_GetDeviceMajorVersion(self.handle)
            }),
            device_minor_version: uint(unsafe {
                sys::okFrontPanel_GetDeviceMinorVersion(self.handle)
            }),
        })
    }

    fn device_id(&mut self) -> TransportResult<String> {
        self.ensure_open()?;
        Ok(self.read_string(
            sys::OK_MAX_DEVICEID_LENGTH,
            sys::okFrontPanel_GetDeviceID,
        ))
    }

    fn configure_fpga(&mut self, bitstream: &[u8]) -> TransportResult<()> {
        let code = unsafe {
            sys::okFrontPanel_ConfigureFPGAFromMemory(
                self.handle,
                bitstream.as_ptr(),
                bitstream.len(),
            )
        };
        Ok(check_status(code)?)
    }

    fn pll22393_configuration(&mut self) -> TransportResult<Pll22393> {
        let pll = Handle22393::new()?;
        let code = unsafe { sys::okFrontPanel_GetPLL22393Configuration(self.handle, pll.raw) };
        chip_status(code, "PLL22393")?;
        pll.store()
    }

    fn set_pll22393_configuration(&mut self, pll: &Pll22393) -> TransportResult<()> {
        let handle = Handle22393::load(pll)?;
        let code = unsafe { sys::okFrontPanel_SetPLL22393Configuration(self.handle, handle.raw) };
        Ok(check_status(code)?)
    }

    fn set_eeprom_pll22393_configuration(&mut self, pll: &Pll22393) -> TransportResult<()> {
        let handle = Handle22393::load(pll)?;
        let code =
            unsafe { sys::okFrontPanel_SetEepromPLL22393Configuration(self.handle, handle.raw) };
        Ok(check_status(code)?)
    }

    fn pll22150_configuration(&mut self) -> TransportResult<Pll22150> {
        let pll = Handle22150::new()?;
        let code = unsafe { sys::okFrontPanel_GetPLL22150Configuration(self.handle, pll.raw) };
        chip_status(code, "PLL22150")?;
        pll.store()
    }

    fn set_pll22150_configuration(&mut self, pll: &Pll22150) -> TransportResult<()> {
        let handle = Handle22150::load(pll)?;
        let code = unsafe { sys::okFrontPanel_SetPLL22150Configuration(self.handle, handle.raw) };
        Ok(check_status(code)?)
    }

    fn set_eeprom_pll22150_configuration(&mut self, pll: &Pll22150) -> TransportResult<()> {
        let handle = Handle22150::load(pll)?;
        let code =
            unsafe { sys::okFrontPanel_SetEepromPLL22150Configuration(self.handle, handle.raw) };
        Ok(check_status(code)?)
    }

    fn set_wire_in_value(&mut self, addr: u32, value: u32, mask: u32) -> TransportResult<()> {
        let code =
            unsafe { sys::okFrontPanel_SetWireInValue(self.handle, endpoint(addr)?, value, mask) };
        Ok(check_status(code)?)
    }

    fn update_wire_ins(&mut self) -> TransportResult<()> {
        Ok(check_status(unsafe { sys::okFrontPanel_UpdateWireIns(self.handle) })?)
    }

    fn update_wire_outs(&mut self) -> TransportResult<()> {
        Ok(check_status(unsafe { sys::okFrontPanel_UpdateWireOuts(self.handle) })?)
    }

    fn wire_out_value(&mut self, addr: u32) -> TransportResult<u32> {
        self.ensure_open()?;
        Ok(unsafe { sys::okFrontPanel_GetWireOutValue(self.handle, endpoint(addr)?) })
    }

    fn activate_trigger_in(&mut self, addr: u32, bit: u32) -> TransportResult<()> {
        let code = unsafe {
            sys::okFrontPanel_ActivateTriggerIn(self.handle, endpoint(addr)?, int(bit))
        };
        Ok(check_status(code)?)
    }

    fn read_from_pipe_out(&mut self, addr: u32, data: &mut [u8]) -> TransportResult<usize> {
        let ret = unsafe {
            sys::okFrontPanel_ReadFromPipeOut(
                self.handle,
                endpoint(addr)?,
                length(data.len())?,
                data.as_mut_ptr(),
            )
        };
        Ok(check_transfer(i64::from(ret))?)
    }

    fn read_from_block_pipe_out(
        &mut self,
        addr: u32,
        block_size: usize,
        data: &mut [u8],
    ) -> TransportResult<usize> {
        let block_size =
            c_int::try_from(block_size).map_err(|_| Error::from(ErrorCode::InvalidBlockSize))?;
        let ret = unsafe {
            sys::okFrontPanel_ReadFromBlockPipeOut(
                self.handle,
                endpoint(addr)?,
                block_size,
                length(data.len())?,
                data.as_mut_ptr(),
            )
        };
        Ok(check_transfer(i64::from(ret))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chip_status() {
        assert!(chip_status(0, "PLL22393").is_ok());
        assert!(matches!(
            chip_status(-15, "PLL22393"),
            Err(Error::NoPll("PLL22393"))
        ));
        assert!(matches!(
            chip_status(-5, "PLL22150"),
            Err(Error::FrontPanel(::frontpanel::Error::Code(
                ErrorCode::CommunicationError
            )))
        ));
        assert!(matches!(
            chip_status(-1, "PLL22150"),
            Err(Error::FrontPanel(::frontpanel::Error::Code(ErrorCode::Failed)))
        ));
    }
}
