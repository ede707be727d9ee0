//! This module contains the logic for parsing the comma-delimited register map files that name
//! every endpoint of a FrontPanel design.
//!
//! Each non-empty row describes one endpoint. With the [`Layout::Standard`] layout the columns are
//!
//! | column | meaning |
//! |---|---|
//! | 0 | comment marker (a field starting with `#` comments out the row) |
//! | 1 | direction, `FromPC` or `ToPC` |
//! | 2 | kind, `Wire`, `Trigger` or `BTPipe` |
//! | 3 | register name |
//! | 4 | endpoint address in hex, without a `0x` prefix |
//! | 5 | width in bits |
//! | 6..=8 | free-form descriptive fields |
//! | 9 | bit offset |
//!
//! Files written for the older tooling put the address before the name and carry one more
//! descriptive field, see [`Layout::Legacy`].
use kstring::KString;
use nom::{
    branch::alt,
    bytes::complete::{
        is_not,
        tag,
        take_till,
    },
    character::complete::char,
    combinator::{
        eof,
        map,
        value,
    },
    multi::{
        fold_many0,
        separated_list1,
    },
    sequence::{
        delimited,
        terminated,
    },
    IResult,
};
use std::{
    collections::HashMap,
    fmt::Display,
    ops::Range,
    path::Path,
    str::FromStr,
};
use thiserror::Error;

/// Wire-in and wire-out endpoints are 32 bits wide
pub const WIRE_BITS: u32 = 32;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Line {line}: parsing failed to match the grammar")]
    ParseMatch { line: usize },
    #[error("Line {line}: expected at least {expected} columns, found {found}")]
    MissingColumns {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Line {line}: unknown direction `{token}`")]
    Direction { line: usize, token: String },
    #[error("Line {line}: unknown endpoint kind `{token}`")]
    Kind { line: usize, token: String },
    #[error("Line {line}: invalid integer `{token}` in column {column}")]
    Integer {
        line: usize,
        column: usize,
        token: String,
        source: std::num::ParseIntError,
    },
    #[error("Line {line}: a {width} bit field at offset {offset} does not fit in a 32 bit wire")]
    Width {
        line: usize,
        width: u32,
        offset: u32,
    },
    #[error("Line {line}: trigger bit {bit} is outside the 32 bit trigger endpoint")]
    TriggerBit { line: usize, bit: u32 },
    #[error("Register `{0}` is declared more than once")]
    Duplicate(KString),
}

/// The transfer direction of an endpoint, as seen from the host
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Host to FPGA
    FromPc,
    /// FPGA to host
    ToPc,
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FromPC" => Ok(Direction::FromPc),
            "ToPC" => Ok(Direction::ToPc),
            _ => Err(()),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Direction::FromPc => "FromPC",
                Direction::ToPc => "ToPC",
            }
        )
    }
}

/// The kind of FrontPanel endpoint a register is mapped to
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Wire-in or wire-out scalar
    Wire,
    /// Edge triggered signal line
    Trigger,
    /// Block-throttled pipe
    BtPipe,
}

impl FromStr for Kind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Wire" => Ok(Kind::Wire),
            "Trigger" => Ok(Kind::Trigger),
            "BTPipe" => Ok(Kind::BtPipe),
            _ => Err(()),
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Kind::Wire => "Wire",
                Kind::Trigger => "Trigger",
                Kind::BtPipe => "BTPipe",
            }
        )
    }
}

/// One named endpoint (or sub-field of an endpoint) of the design
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterEntry {
    pub direction: Direction,
    pub kind: Kind,
    /// Endpoint address
    pub address: u32,
    /// Name used to look the register up
    pub name: KString,
    /// Width of the field in bits
    pub width: u32,
    /// Descriptive columns, kept as written
    pub passthrough: Vec<String>,
    /// Position of the field's least significant bit. For triggers this is the trigger bit.
    pub bit_offset: u32,
}

impl RegisterEntry {
    /// The largest value that fits in this field
    #[must_use]
    pub fn max_value(&self) -> u64 {
        (1u64 << self.width) - 1
    }

    /// The bits of the endpoint covered by this field
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn mask(&self) -> u32 {
        (self.max_value() << self.bit_offset) as u32
    }

    /// Pull this field out of the raw endpoint value
    #[must_use]
    pub fn extract(&self, raw: u32) -> u32 {
        (raw & self.mask()) >> self.bit_offset
    }

    /// Does this entry describe the given kind of endpoint
    #[must_use]
    pub fn is(&self, direction: Direction, kind: Kind) -> bool {
        self.direction == direction && self.kind == kind
    }
}

/// Column arrangement of a register map file
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Layout {
    /// Name in column 3, hex address in column 4, bit offset in column 9
    #[default]
    Standard,
    /// Hex address in column 3, name in column 4, four descriptive columns and the bit
    /// offset in column 10
    Legacy,
}

struct Columns {
    direction: usize,
    kind: usize,
    name: usize,
    address: usize,
    width: usize,
    passthrough: Range<usize>,
    bit_offset: usize,
}

impl Layout {
    fn columns(self) -> Columns {
        match self {
            Layout::Standard => Columns {
                direction: 1,
                kind: 2,
                name: 3,
                address: 4,
                width: 5,
                passthrough: 6..9,
                bit_offset: 9,
            },
            Layout::Legacy => Columns {
                direction: 1,
                kind: 2,
                address: 3,
                name: 4,
                width: 5,
                passthrough: 6..10,
                bit_offset: 10,
            },
        }
    }
}

/// The register map of a design, in file order with a name index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterMap {
    entries: Vec<RegisterEntry>,
    index: HashMap<KString, usize>,
}

impl RegisterMap {
    /// Build a map from already constructed entries
    /// # Errors
    /// Returns an error if two entries share a name
    pub fn from_entries<I>(entries: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = RegisterEntry>,
    {
        let mut map = Self::default();
        for entry in entries {
            map.push(entry)?;
        }
        Ok(map)
    }

    fn push(&mut self, entry: RegisterEntry) -> Result<(), Error> {
        if self.index.contains_key(&entry.name) {
            return Err(Error::Duplicate(entry.name));
        }
        self.index.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Parse the contents of a register map file
    /// # Errors
    /// Returns an error on malformed rows or duplicate names
    pub fn parse(input: &str, layout: Layout) -> Result<Self, Error> {
        let mut map = Self::default();
        for (idx, line) in input.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 1;
            let (_, fields) = row(line).map_err(|_| Error::ParseMatch { line: line_no })?;
            // Spreadsheet exports pad the file with rows of bare delimiters
            if fields.iter().all(String::is_empty) {
                continue;
            }
            if fields[0].starts_with('#') {
                continue;
            }
            map.push(entry(&fields, layout, line_no)?)?;
        }
        Ok(map)
    }

    /// Look up a register by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisterEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Iterate over the registers in file order
    pub fn iter(&self) -> std::slice::Iter<'_, RegisterEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromStr for RegisterMap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, Layout::Standard)
    }
}

impl<'a> IntoIterator for &'a RegisterMap {
    type Item = &'a RegisterEntry;
    type IntoIter = std::slice::Iter<'a, RegisterEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn quoted_field(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((is_not("\""), value("\"", tag("\"\"")))),
            String::new,
            |mut acc: String, s: &str| {
                acc.push_str(s);
                acc
            },
        ),
        char('"'),
    )(input)
}

fn bare_field(input: &str) -> IResult<&str, String> {
    map(take_till(|c| c == ',' || c == '"'), |s: &str| {
        s.trim().to_owned()
    })(input)
}

fn row(input: &str) -> IResult<&str, Vec<String>> {
    terminated(
        separated_list1(char(','), alt((quoted_field, bare_field))),
        eof,
    )(input)
}

fn integer(fields: &[String], column: usize, radix: u32, line: usize) -> Result<u32, Error> {
    let token = &fields[column];
    u32::from_str_radix(token, radix).map_err(|source| Error::Integer {
        line,
        column,
        token: token.clone(),
        source,
    })
}

fn entry(fields: &[String], layout: Layout, line: usize) -> Result<RegisterEntry, Error> {
    let cols = layout.columns();
    if fields.len() <= cols.bit_offset {
        return Err(Error::MissingColumns {
            line,
            expected: cols.bit_offset + 1,
            found: fields.len(),
        });
    }
    let direction = fields[cols.direction]
        .parse()
        .map_err(|()| Error::Direction {
            line,
            token: fields[cols.direction].clone(),
        })?;
    let kind = fields[cols.kind].parse().map_err(|()| Error::Kind {
        line,
        token: fields[cols.kind].clone(),
    })?;
    let address = integer(fields, cols.address, 16, line)?;
    let width = integer(fields, cols.width, 10, line)?;
    let bit_offset = integer(fields, cols.bit_offset, 10, line)?;
    match kind {
        Kind::Wire
            if width == 0
                || width
                    .checked_add(bit_offset)
                    .map_or(true, |end| end > WIRE_BITS) =>
        {
            return Err(Error::Width {
                line,
                width,
                offset: bit_offset,
            });
        }
        Kind::Trigger if bit_offset >= WIRE_BITS => {
            return Err(Error::TriggerBit {
                line,
                bit: bit_offset,
            });
        }
        _ => {}
    }
    Ok(RegisterEntry {
        direction,
        kind,
        address,
        name: KString::from_ref(&fields[cols.name]),
        width,
        passthrough: fields[cols.passthrough].to_vec(),
        bit_offset,
    })
}

/// Reads a register map file
/// # Errors
/// Returns an error on IO failures or invalid register map files
pub fn read_register_map<T>(filename: T, layout: Layout) -> Result<RegisterMap, Error>
where
    T: AsRef<Path>,
{
    let contents = std::fs::read_to_string(filename)?;
    RegisterMap::parse(&contents, layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = "\
#,Direction,Type,Name,Address,Width,Description,Unit,Default,Offset
,FromPC,Wire,gain,00,4,ADC gain,dB,0,4
,FromPC,Wire,mode,00,2,\"Mode, see manual\",,0,0
,ToPC,Wire,status,20,16,Status word,,,0
,FromPC,Trigger,start,40,1,Start acquisition,,,3
,ToPC,BTPipe,samples,a0,16,ADC samples,,,0
";

    #[test]
    fn test_row() {
        let (remaining, fields) = row("a, b ,\"c,\"\"d\"\"\",").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(fields, vec!["a", "b", "c,\"d\"", ""]);
    }

    #[test]
    fn test_row_unterminated_quote() {
        assert!(row("a,\"bc").is_err());
    }

    #[test]
    fn test_parse_standard() {
        let map: RegisterMap = MAP.parse().unwrap();
        assert_eq!(map.len(), 5);
        let gain = map.get("gain").unwrap();
        assert_eq!(
            *gain,
            RegisterEntry {
                direction: Direction::FromPc,
                kind: Kind::Wire,
                address: 0,
                name: "gain".into(),
                width: 4,
                passthrough: vec!["ADC gain".into(), "dB".into(), "0".into()],
                bit_offset: 4,
            }
        );
        assert_eq!(map.get("mode").unwrap().passthrough[0], "Mode, see manual");
        assert_eq!(map.get("samples").unwrap().address, 0xA0);
        assert_eq!(map.get("start").unwrap().kind, Kind::Trigger);
        // File order is kept
        let names: Vec<_> = map.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["gain", "mode", "status", "start", "samples"]);
    }

    #[test]
    fn test_parse_legacy() {
        let input = ",ToPC,Wire,21,counter,32,a,b,c,d,0\n";
        let map = RegisterMap::parse(input, Layout::Legacy).unwrap();
        let counter = map.get("counter").unwrap();
        assert_eq!(counter.address, 0x21);
        assert_eq!(counter.passthrough.len(), 4);
        assert_eq!(counter.bit_offset, 0);
    }

    #[test]
    fn test_comments_and_blank_rows() {
        let input = "\n#,FromPC,Wire,skipped,00,1,,,,0\n# a note\n,,,,,,,,,\n   \n\
                     ,FromPC,Wire,kept,01,1,,,,0\n";
        let map: RegisterMap = input.parse().unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.get("skipped").is_none());
        assert!(map.get("kept").is_some());
    }

    #[test]
    fn test_duplicate_names() {
        let input = ",FromPC,Wire,x,00,1,,,,0\n,FromPC,Wire,x,01,1,,,,0\n";
        assert!(matches!(
            input.parse::<RegisterMap>(),
            Err(Error::Duplicate(name)) if name.as_str() == "x"
        ));
    }

    #[test]
    fn test_bad_rows() {
        assert!(matches!(
            ",FromPC,Wire,x,00,1\n".parse::<RegisterMap>(),
            Err(Error::MissingColumns {
                line: 1,
                expected: 10,
                found: 6
            })
        ));
        assert!(matches!(
            ",Sideways,Wire,x,00,1,,,,0\n".parse::<RegisterMap>(),
            Err(Error::Direction { line: 1, .. })
        ));
        assert!(matches!(
            ",FromPC,Bus,x,00,1,,,,0\n".parse::<RegisterMap>(),
            Err(Error::Kind { line: 1, .. })
        ));
        assert!(matches!(
            "\n,FromPC,Wire,x,zz,1,,,,0\n".parse::<RegisterMap>(),
            Err(Error::Integer {
                line: 2,
                column: 4,
                ..
            })
        ));
        assert!(matches!(
            ",FromPC,Wire,x,00,8,,,,28\n".parse::<RegisterMap>(),
            Err(Error::Width {
                width: 8,
                offset: 28,
                ..
            })
        ));
        assert!(matches!(
            ",FromPC,Wire,x,00,4294967295,,,,1\n".parse::<RegisterMap>(),
            Err(Error::Width {
                width: 4_294_967_295,
                offset: 1,
                ..
            })
        ));
        assert!(matches!(
            ",FromPC,Trigger,t,40,1,,,,32\n".parse::<RegisterMap>(),
            Err(Error::TriggerBit { bit: 32, .. })
        ));
    }

    #[test]
    fn test_masks() {
        let map: RegisterMap = MAP.parse().unwrap();
        let gain = map.get("gain").unwrap();
        assert_eq!(gain.max_value(), 0xF);
        assert_eq!(gain.mask(), 0xF0);
        assert_eq!(gain.extract(0xABCD), 0xC);
        let full = RegisterEntry {
            width: 32,
            bit_offset: 0,
            ..gain.clone()
        };
        assert_eq!(full.mask(), u32::MAX);
        assert_eq!(full.max_value(), u64::from(u32::MAX));
    }
}
