//! The `ok_ErrorCode` table

use num_derive::{
    FromPrimitive,
    ToPrimitive,
};
use num_traits::FromPrimitive;

/// Every status a FrontPanel call can report
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum ErrorCode {
    #[error("NoError")]
    NoError = 0,
    #[error("Failed")]
    Failed = -1,
    #[error("Timeout")]
    Timeout = -2,
    #[error("DoneNotHigh")]
    DoneNotHigh = -3,
    #[error("TransferError")]
    TransferError = -4,
    #[error("CommunicationError")]
    CommunicationError = -5,
    #[error("InvalidBitstream")]
    InvalidBitstream = -6,
    #[error("FileError")]
    FileError = -7,
    #[error("DeviceNotOpen")]
    DeviceNotOpen = -8,
    #[error("InvalidEndpoint")]
    InvalidEndpoint = -9,
    #[error("InvalidBlockSize")]
    InvalidBlockSize = -10,
    #[error("I2CRestrictedAddress")]
    I2CRestrictedAddress = -11,
    #[error("I2CBitError")]
    I2CBitError = -12,
    #[error("I2CNack")]
    I2CNack = -13,
    #[error("I2CUnknownStatus")]
    I2CUnknownStatus = -14,
    #[error("UnsupportedFeature")]
    UnsupportedFeature = -15,
    #[error("FIFOUnderflow")]
    FifoUnderflow = -16,
    #[error("FIFOOverflow")]
    FifoOverflow = -17,
    #[error("DataAlignmentError")]
    DataAlignmentError = -18,
    #[error("InvalidResetProfile")]
    InvalidResetProfile = -19,
    #[error("InvalidParameter")]
    InvalidParameter = -20,
}

/// Errors reported by the SDK
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Opal Kelly error {0}")]
    Code(ErrorCode),
    #[error("Opal Kelly error {0} is not a known FrontPanel error code")]
    Unknown(i64),
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Error::Code(code)
    }
}

fn negative(ret: i64) -> Error {
    ErrorCode::from_i64(ret).map_or(Error::Unknown(ret), Error::Code)
}

/// Interpret the return value of a pipe transfer: the byte count on success, a negative
/// `ok_ErrorCode` on failure
/// # Errors
/// Returns the named error for negative return values
pub fn check_transfer(ret: i64) -> Result<usize, Error> {
    if ret < 0 {
        Err(negative(ret))
    } else {
        usize::try_from(ret).map_err(|_| Error::Unknown(ret))
    }
}

/// Interpret an `ok_ErrorCode` returned by a configuration or wire call
/// # Errors
/// Returns the named error for anything but `NoError`
pub fn check_status(code: i32) -> Result<(), Error> {
    match code {
        0 => Ok(()),
        c => Err(negative(i64::from(c))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paste::paste;

    macro_rules! test_code {
        ($code:ident, $v:literal) => {
            paste! {
                #[test]
                fn [<test_code_ $code:snake>]() {
                    let err = check_transfer($v).unwrap_err();
                    assert_eq!(err, Error::Code(ErrorCode::$code));
                    assert_eq!(err.to_string(), concat!("Opal Kelly error ", stringify!($code)));
                }
            }
        };
    }

    #[test]
    fn test_success() {
        assert_eq!(check_transfer(0).unwrap(), 0);
        assert_eq!(check_transfer(4096).unwrap(), 4096);
        assert!(check_status(0).is_ok());
    }

    #[test]
    fn test_unknown() {
        assert_eq!(check_transfer(-21).unwrap_err(), Error::Unknown(-21));
        assert_eq!(check_status(-99).unwrap_err(), Error::Unknown(-99));
    }

    #[test]
    fn test_status() {
        assert_eq!(
            check_status(-6).unwrap_err(),
            Error::Code(ErrorCode::InvalidBitstream)
        );
    }

    test_code!(Failed, -1);
    test_code!(Timeout, -2);
    test_code!(DoneNotHigh, -3);
    test_code!(TransferError, -4);
    test_code!(InvalidEndpoint, -9);
    test_code!(InvalidBlockSize, -10);
    test_code!(UnsupportedFeature, -15);
    test_code!(InvalidParameter, -20);
}
