//! The clock synthesizer fitted to the board, and the flat parameter snapshot built from it

use crate::transport::{
    Error as TransportError,
    Transport,
    TransportResult,
};
use frontpanel::pll::{
    Pll22150,
    Pll22393,
};
use kstring::KString;
use num_traits::ToPrimitive;
use std::{
    collections::HashMap,
    fmt::Display,
};

/// One entry of a [`PllSnapshot`]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PllValue {
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl PllValue {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PllValue::Float(v) => Some(*v),
            #[allow(clippy::cast_precision_loss)]
            PllValue::Int(v) => Some(*v as f64),
            PllValue::Bool(_) => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PllValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PllValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl Display for PllValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PllValue::Float(v) => write!(f, "{v}"),
            PllValue::Int(v) => write!(f, "{v}"),
            PllValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Parameter name (`"PLL0 Frequency"`, `"SYSCLK3 Source"`, ...) to value
pub type PllSnapshot = HashMap<KString, PllValue>;

fn put(snapshot: &mut PllSnapshot, name: String, value: PllValue) {
    snapshot.insert(KString::from_string(name), value);
}

/// Shared capabilities of the clock synthesizer models
pub trait PllControl: Sized {
    /// Chip name as reported in logs and errors
    const NAME: &'static str;

    /// Read the live configuration from the device
    /// # Errors
    /// Returns an error if the device does not carry this chip or the transfer fails
    fn fetch<T: Transport>(transport: &mut T) -> TransportResult<Self>;

    /// Write this configuration to the running chip and to the EEPROM copy loaded at power up
    /// # Errors
    /// Returns an error on transport failures
    fn push<T: Transport>(&self, transport: &mut T) -> TransportResult<()>;

    fn snapshot(&self) -> PllSnapshot;
}

impl PllControl for Pll22393 {
    const NAME: &'static str = "PLL22393";

    fn fetch<T: Transport>(transport: &mut T) -> TransportResult<Self> {
        transport.pll22393_configuration()
    }

    fn push<T: Transport>(&self, transport: &mut T) -> TransportResult<()> {
        transport.set_pll22393_configuration(self)?;
        transport.set_eeprom_pll22393_configuration(self)
    }

    fn snapshot(&self) -> PllSnapshot {
        let mut snap = PllSnapshot::new();
        put(
            &mut snap,
            "Crystal Frequency".to_owned(),
            PllValue::Float(self.reference),
        );
        for (n, pll) in self.plls.iter().enumerate() {
            put(
                &mut snap,
                format!("PLL{n} Frequency"),
                PllValue::Float(self.pll_frequency(n).unwrap_or_default()),
            );
            put(&mut snap, format!("PLL{n} P"), PllValue::Int(pll.p.into()));
            put(&mut snap, format!("PLL{n} Q"), PllValue::Int(pll.q.into()));
            put(&mut snap, format!("PLL{n} Enable"), PllValue::Bool(pll.enabled));
        }
        for (n, out) in self.outputs.iter().enumerate() {
            let clk = n + 1;
            put(
                &mut snap,
                format!("SYSCLK{clk} Frequency"),
                PllValue::Float(self.output_frequency(n).unwrap_or_default()),
            );
            put(
                &mut snap,
                format!("SYSCLK{clk} Source"),
                PllValue::Int(out.source.to_i64().unwrap_or_default()),
            );
            put(
                &mut snap,
                format!("SYSCLK{clk} Divider"),
                PllValue::Int(out.divider.into()),
            );
            put(
                &mut snap,
                format!("SYSCLK{clk} Enable"),
                PllValue::Bool(out.enabled),
            );
        }
        snap
    }
}

impl PllControl for Pll22150 {
    const NAME: &'static str = "PLL22150";

    fn fetch<T: Transport>(transport: &mut T) -> TransportResult<Self> {
        transport.pll22150_configuration()
    }

    fn push<T: Transport>(&self, transport: &mut T) -> TransportResult<()> {
        transport.set_pll22150_configuration(self)?;
        transport.set_eeprom_pll22150_configuration(self)
    }

    fn snapshot(&self) -> PllSnapshot {
        let mut snap = PllSnapshot::new();
        let vco = self.vco_frequency();
        put(
            &mut snap,
            "Crystal Frequency".to_owned(),
            PllValue::Float(self.reference),
        );
        // The single VCO is also listed under the PLL0 names used for the CY22393
        for prefix in ["VCO", "PLL0"] {
            put(&mut snap, format!("{prefix} Frequency"), PllValue::Float(vco));
            put(&mut snap, format!("{prefix} P"), PllValue::Int(self.vco_p.into()));
            put(&mut snap, format!("{prefix} Q"), PllValue::Int(self.vco_q.into()));
        }
        put(&mut snap, "PLL0 Enable".to_owned(), PllValue::Bool(true));
        for (name, div) in [("DIV1", self.div1), ("DIV2", self.div2)] {
            put(
                &mut snap,
                format!("{name} Source"),
                PllValue::Int(div.source.to_i64().unwrap_or_default()),
            );
            put(&mut snap, format!("{name} Divider"), PllValue::Int(div.n.into()));
        }
        for (n, out) in self.outputs.iter().enumerate() {
            let clk = n + 1;
            put(
                &mut snap,
                format!("SYSCLK{clk} Frequency"),
                PllValue::Float(self.output_frequency(n).unwrap_or_default()),
            );
            put(
                &mut snap,
                format!("SYSCLK{clk} Source"),
                PllValue::Int(out.source.to_i64().unwrap_or_default()),
            );
            put(
                &mut snap,
                format!("SYSCLK{clk} Enable"),
                PllValue::Bool(out.enabled),
            );
        }
        snap
    }
}

/// The clock synthesizer a board carries
#[derive(Debug, Clone, PartialEq)]
pub enum Pll {
    Pll22150(Pll22150),
    Pll22393(Pll22393),
}

fn detect_one<P: PllControl, T: Transport>(transport: &mut T) -> TransportResult<Option<P>> {
    match P::fetch(transport) {
        Ok(pll) => Ok(Some(pll)),
        Err(TransportError::NoPll(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl Pll {
    /// Ask the device for a CY22150, then a CY22393, returning whichever answers first
    /// # Errors
    /// Returns an error on transport failures other than the chip being absent
    pub fn detect<T: Transport>(transport: &mut T) -> TransportResult<Option<Self>> {
        if let Some(pll) = detect_one::<Pll22150, _>(transport)? {
            return Ok(Some(Pll::Pll22150(pll)));
        }
        Ok(detect_one::<Pll22393, _>(transport)?.map(Pll::Pll22393))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Pll::Pll22150(_) => Pll22150::NAME,
            Pll::Pll22393(_) => Pll22393::NAME,
        }
    }

    /// Re-read the configuration of the same chip from the device
    /// # Errors
    /// Returns an error on transport failures
    pub fn refresh<T: Transport>(&mut self, transport: &mut T) -> TransportResult<()> {
        match self {
            Pll::Pll22150(pll) => *pll = Pll22150::fetch(transport)?,
            Pll::Pll22393(pll) => *pll = Pll22393::fetch(transport)?,
        }
        Ok(())
    }

    /// # Errors
    /// Returns an error on transport failures
    pub fn push<T: Transport>(&self, transport: &mut T) -> TransportResult<()> {
        match self {
            Pll::Pll22150(pll) => pll.push(transport),
            Pll::Pll22393(pll) => pll.push(transport),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> PllSnapshot {
        match self {
            Pll::Pll22150(pll) => pll.snapshot(),
            Pll::Pll22393(pll) => pll.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::Mock;
    use frontpanel::ErrorCode;
    use paste::paste;

    macro_rules! test_key {
        ($name:ident, $pll:ident, $key:literal, $value:expr) => {
            paste! {
                #[test]
                fn [<test_ $name>]() {
                    let snap = <$pll>::default().snapshot();
                    assert_eq!(snap.get($key), Some(&$value));
                }
            }
        };
    }

    test_key!(pll22393_crystal, Pll22393, "Crystal Frequency", PllValue::Float(48.0));
    test_key!(pll22393_pll0_frequency, Pll22393, "PLL0 Frequency", PllValue::Float(400.0));
    test_key!(pll22393_pll0_p, Pll22393, "PLL0 P", PllValue::Int(400));
    test_key!(pll22393_pll1_enable, Pll22393, "PLL1 Enable", PllValue::Bool(false));
    test_key!(pll22393_sysclk1_frequency, Pll22393, "SYSCLK1 Frequency", PllValue::Float(100.0));
    test_key!(pll22393_sysclk1_source, Pll22393, "SYSCLK1 Source", PllValue::Int(2));
    test_key!(pll22393_sysclk5_enable, Pll22393, "SYSCLK5 Enable", PllValue::Bool(false));
    test_key!(pll22150_vco_frequency, Pll22150, "VCO Frequency", PllValue::Float(400.0));
    test_key!(pll22150_pll0_q, Pll22150, "PLL0 Q", PllValue::Int(48));
    test_key!(pll22150_div1_divider, Pll22150, "DIV1 Divider", PllValue::Int(8));
    test_key!(pll22150_sysclk1_frequency, Pll22150, "SYSCLK1 Frequency", PllValue::Float(50.0));
    test_key!(pll22150_sysclk6_enable, Pll22150, "SYSCLK6 Enable", PllValue::Bool(false));

    #[test]
    fn test_snapshot_sizes() {
        assert_eq!(Pll22393::default().snapshot().len(), 1 + 3 * 4 + 5 * 4);
        assert_eq!(Pll22150::default().snapshot().len(), 1 + 7 + 2 * 2 + 6 * 3);
    }

    #[test]
    fn test_detect() {
        let mut transport = Mock::new();
        transport.open_by_serial("").unwrap();
        let pll = Pll::detect(&mut transport).unwrap().unwrap();
        assert_eq!(pll.name(), "PLL22393");

        let mut transport = Mock::with_pll22150();
        transport.open_by_serial("").unwrap();
        let pll = Pll::detect(&mut transport).unwrap().unwrap();
        assert_eq!(pll.name(), "PLL22150");

        let mut transport = Mock::without_pll();
        transport.open_by_serial("").unwrap();
        assert!(Pll::detect(&mut transport).unwrap().is_none());
    }

    #[test]
    fn test_detect_read_failure() {
        let mut transport = Mock::new();
        transport.open_by_serial("").unwrap();
        transport.fail_next_pll_access(ErrorCode::CommunicationError);
        assert!(matches!(
            Pll::detect(&mut transport),
            Err(TransportError::FrontPanel(frontpanel::Error::Code(
                ErrorCode::CommunicationError
            )))
        ));
    }

    #[test]
    fn test_push_refresh() {
        let mut transport = Mock::new();
        transport.open_by_serial("").unwrap();
        let mut config = Pll22393::default();
        config.set_output_divider(1, 9).unwrap();
        Pll::Pll22393(config.clone()).push(&mut transport).unwrap();
        let (live, eeprom) = transport.pll22393().unwrap();
        assert_eq!(live, &config);
        assert_eq!(eeprom, &config);
        let mut pll = Pll::Pll22393(Pll22393::default());
        pll.refresh(&mut transport).unwrap();
        assert_eq!(pll, Pll::Pll22393(config));
    }
}
