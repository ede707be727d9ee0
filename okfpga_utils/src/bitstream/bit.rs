//! Parser for the header Xilinx tools put in front of `.bit` configuration data
use nom::{
    bytes::complete::tag,
    combinator::map_res,
    multi::length_data,
    number::complete::{
        be_u16,
        be_u32,
    },
    sequence::preceded,
    IResult,
};
use std::str::{
    from_utf8,
    Utf8Error,
};

const PREAMBLE: [u8; 13] = [
    0x00, 0x09, 0x0F, 0xF0, 0x0F, 0xF0, 0x0F, 0xF0, 0x0F, 0xF0, 0x00, 0x00, 0x01,
];

/// The descriptive fields of a `.bit` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitHeader {
    /// Design name, usually followed by the tool options
    pub design: String,
    /// Target part, e.g. `7a75tfgg484`
    pub part: String,
    pub date: String,
    pub time: String,
    /// Length in bytes of the configuration data following the header
    pub length: u32,
}

fn nul_terminated(input: &[u8]) -> Result<&str, Utf8Error> {
    from_utf8(input.strip_suffix(&[0u8]).unwrap_or(input))
}

fn field<'a>(key: &'static str) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], &'a str> {
    preceded(tag(key), map_res(length_data(be_u16), nul_terminated))
}

/// Parse the header, returning the configuration data as the remaining input
pub(crate) fn bit_header(input: &[u8]) -> IResult<&[u8], BitHeader> {
    let (remaining, _) = tag(&PREAMBLE[..])(input)?;
    let (remaining, design) = field("a")(remaining)?;
    let (remaining, part) = field("b")(remaining)?;
    let (remaining, date) = field("c")(remaining)?;
    let (remaining, time) = field("d")(remaining)?;
    let (remaining, length) = preceded(tag("e"), be_u32)(remaining)?;
    Ok((
        remaining,
        BitHeader {
            design: design.to_owned(),
            part: part.to_owned(),
            date: date.to_owned(),
            time: time.to_owned(),
            length,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_field(buf: &mut Vec<u8>, key: u8, value: &str) {
        buf.push(key);
        let len = u16::try_from(value.len() + 1).unwrap();
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(value.as_bytes());
        buf.push(0);
    }

    #[test]
    fn test_bit_header() {
        let mut input = PREAMBLE.to_vec();
        push_field(&mut input, b'a', "top;UserID=0XFFFFFFFF");
        push_field(&mut input, b'b', "6slx45fgg484");
        push_field(&mut input, b'c', "2024/03/01");
        push_field(&mut input, b'd', "12:34:56");
        input.push(b'e');
        input.extend_from_slice(&4u32.to_be_bytes());
        input.extend_from_slice(&[0xAA, 0x99, 0x55, 0x66]);

        let (remaining, header) = bit_header(&input).unwrap();
        assert_eq!(remaining, [0xAA, 0x99, 0x55, 0x66]);
        assert_eq!(
            header,
            BitHeader {
                design: "top;UserID=0XFFFFFFFF".to_owned(),
                part: "6slx45fgg484".to_owned(),
                date: "2024/03/01".to_owned(),
                time: "12:34:56".to_owned(),
                length: 4,
            }
        );
    }

    #[test]
    fn test_not_a_bit_file() {
        assert!(bit_header(&[0xFF, 0xFF, 0xFF, 0xFF, 0xAA, 0x99, 0x55, 0x66]).is_err());
    }
}
