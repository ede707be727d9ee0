//! Raw bindings to the C interface of `libokFrontPanel` (`okFrontPanelDLL.h`).
//!
//! Only the calls needed for wires, triggers, pipes, FPGA configuration and the two PLL
//! configuration objects are declared.
#![allow(non_camel_case_types, non_snake_case)]

use std::os::raw::{
    c_char,
    c_double,
    c_int,
    c_long,
    c_uchar,
    c_void,
};

pub type okFrontPanel_HANDLE = *mut c_void;
pub type okPLL22393_HANDLE = *mut c_void;
pub type okPLL22150_HANDLE = *mut c_void;
pub type ok_ErrorCode = c_int;
pub type ok_ClockSource_22393 = c_int;
pub type ok_ClockSource_22150 = c_int;
pub type ok_DividerSource = c_int;
pub type ok_BoardModel = c_int;
pub type Bool = c_int;

pub const OK_MAX_DEVICEID_LENGTH: usize = 33;
pub const OK_MAX_SERIALNUMBER_LENGTH: usize = 11;
pub const OK_MAX_BOARD_MODEL_STRING_LENGTH: usize = 128;

#[link(name = "okFrontPanel")]
extern "C" {
    pub fn okFrontPanel_Construct() -> okFrontPanel_HANDLE;
    pub fn okFrontPanel_Destruct(hnd: okFrontPanel_HANDLE);
    pub fn okFrontPanel_OpenBySerial(
        hnd: okFrontPanel_HANDLE,
        serial: *const c_char,
    ) -> ok_ErrorCode;
    pub fn okFrontPanel_IsOpen(hnd: okFrontPanel_HANDLE) -> Bool;
    pub fn okFrontPanel_GetDeviceID(hnd: okFrontPanel_HANDLE, buf: *mut c_char);
    pub fn okFrontPanel_GetSerialNumber(hnd: okFrontPanel_HANDLE, buf: *mut c_char);
    pub fn okFrontPanel_GetBoardModel(hnd: okFrontPanel_HANDLE) -> ok_BoardModel;
    pub fn okFrontPanel_GetBoardModelString(
        hnd: okFrontPanel_HANDLE,
        m: ok_BoardModel,
        buf: *mut c_char,
    );
    pub fn okFrontPanel_GetDeviceMajorVersion(hnd: okFrontPanel_HANDLE) -> c_int;
    pub fn okFrontPanel_GetDeviceMinorVersion(hnd: okFrontPanel_HANDLE) -> c_int;

    pub fn okFrontPanel_ConfigureFPGAFromMemory(
        hnd: okFrontPanel_HANDLE,
        data: *const c_uchar,
        length: usize,
    ) -> ok_ErrorCode;

    pub fn okFrontPanel_GetPLL22393Configuration(
        hnd: okFrontPanel_HANDLE,
        pll: okPLL22393_HANDLE,
    ) -> ok_ErrorCode;
    pub fn okFrontPanel_SetPLL22393Configuration(
        hnd: okFrontPanel_HANDLE,
        pll: okPLL22393_HANDLE,
    ) -> ok_ErrorCode;
    pub fn okFrontPanel_SetEepromPLL22393Configuration(
        hnd: okFrontPanel_HANDLE,
        pll: okPLL22393_HANDLE,
    ) -> ok_ErrorCode;
    pub fn okFrontPanel_GetPLL22150Configuration(
        hnd: okFrontPanel_HANDLE,
        pll: okPLL22150_HANDLE,
    ) -> ok_ErrorCode;
    pub fn okFrontPanel_SetPLL22150Configuration(
        hnd: okFrontPanel_HANDLE,
        pll: okPLL22150_HANDLE,
    ) -> ok_ErrorCode;
    pub fn okFrontPanel_SetEepromPLL22150Configuration(
        hnd: okFrontPanel_HANDLE,
        pll: okPLL22150_HANDLE,
    ) -> ok_ErrorCode;

    pub fn okFrontPanel_SetWireInValue(
        hnd: okFrontPanel_HANDLE,
        ep: c_int,
        val: u32,
        mask: u32,
    ) -> ok_ErrorCode;
    pub fn okFrontPanel_UpdateWireIns(hnd: okFrontPanel_HANDLE) -> ok_ErrorCode;
    pub fn okFrontPanel_UpdateWireOuts(hnd: okFrontPanel_HANDLE) -> ok_ErrorCode;
    pub fn okFrontPanel_GetWireOutValue(hnd: okFrontPanel_HANDLE, ep: c_int) -> u32;
    pub fn okFrontPanel_ActivateTriggerIn(
        hnd: okFrontPanel_HANDLE,
        ep: c_int,
        bit: c_int,
    ) -> ok_ErrorCode;
    pub fn okFrontPanel_ReadFromPipeOut(
        hnd: okFrontPanel_HANDLE,
        ep: c_int,
        length: c_long,
        data: *mut c_uchar,
    ) -> c_long;
    pub fn okFrontPanel_ReadFromBlockPipeOut(
        hnd: okFrontPanel_HANDLE,
        ep: c_int,
        block_size: c_int,
        length: c_long,
        data: *mut c_uchar,
    ) -> c_long;

    pub fn okPLL22393_Construct() -> okPLL22393_HANDLE;
    pub fn okPLL22393_Destruct(pll: okPLL22393_HANDLE);
    pub fn okPLL22393_SetReference(pll: okPLL22393_HANDLE, freq: c_double);
    pub fn okPLL22393_GetReference(pll: okPLL22393_HANDLE) -> c_double;
    pub fn okPLL22393_SetPLLParameters(
        pll: okPLL22393_HANDLE,
        n: c_int,
        p: c_int,
        q: c_int,
        enable: Bool,
    ) -> Bool;
    pub fn okPLL22393_GetPLLP(pll: okPLL22393_HANDLE, n: c_int) -> c_int;
    pub fn okPLL22393_GetPLLQ(pll: okPLL22393_HANDLE, n: c_int) -> c_int;
    pub fn okPLL22393_IsPLLEnabled(pll: okPLL22393_HANDLE, n: c_int) -> Bool;
    pub fn okPLL22393_SetOutputSource(
        pll: okPLL22393_HANDLE,
        n: c_int,
        clksrc: ok_ClockSource_22393,
    );
    pub fn okPLL22393_SetOutputDivider(pll: okPLL22393_HANDLE, n: c_int, div: c_int);
    pub fn okPLL22393_SetOutputEnable(pll: okPLL22393_HANDLE, n: c_int, enable: Bool);
    pub fn okPLL22393_GetOutputSource(pll: okPLL22393_HANDLE, n: c_int) -> ok_ClockSource_22393;
    pub fn okPLL22393_GetOutputDivider(pll: okPLL22393_HANDLE, n: c_int) -> c_int;
    pub fn okPLL22393_IsOutputEnabled(pll: okPLL22393_HANDLE, n: c_int) -> Bool;

    pub fn okPLL22150_Construct() -> okPLL22150_HANDLE;
    pub fn okPLL22150_Destruct(pll: okPLL22150_HANDLE);
    pub fn okPLL22150_SetReference(pll: okPLL22150_HANDLE, freq: c_double, extosc: Bool);
    pub fn okPLL22150_GetReference(pll: okPLL22150_HANDLE) -> c_double;
    pub fn okPLL22150_SetVCOParameters(pll: okPLL22150_HANDLE, p: c_int, q: c_int) -> Bool;
    pub fn okPLL22150_GetVCOP(pll: okPLL22150_HANDLE) -> c_int;
    pub fn okPLL22150_GetVCOQ(pll: okPLL22150_HANDLE) -> c_int;
    pub fn okPLL22150_SetDiv1(pll: okPLL22150_HANDLE, divsrc: ok_DividerSource, n: c_int);
    pub fn okPLL22150_SetDiv2(pll: okPLL22150_HANDLE, divsrc: ok_DividerSource, n: c_int);
    pub fn okPLL22150_GetDiv1Source(pll: okPLL22150_HANDLE) -> ok_DividerSource;
    pub fn okPLL22150_GetDiv2Source(pll: okPLL22150_HANDLE) -> ok_DividerSource;
    pub fn okPLL22150_GetDiv1Divider(pll: okPLL22150_HANDLE) -> c_int;
    pub fn okPLL22150_GetDiv2Divider(pll: okPLL22150_HANDLE) -> c_int;
    pub fn okPLL22150_SetOutputSource(
        pll: okPLL22150_HANDLE,
        output: c_int,
        clksrc: ok_ClockSource_22150,
    );
    pub fn okPLL22150_SetOutputEnable(pll: okPLL22150_HANDLE, output: c_int, enable: Bool);
    pub fn okPLL22150_GetOutputSource(
        pll: okPLL22150_HANDLE,
        output: c_int,
    ) -> ok_ClockSource_22150;
    pub fn okPLL22150_IsOutputEnabled(pll: okPLL22150_HANDLE, output: c_int) -> Bool;
}
