//! Host-side models of the two clock synthesizers found on XEM boards.
//!
//! The SDK keeps a configuration object on the host, fills it from the device, lets the caller
//! edit it and then pushes it back (to the running PLL, or to the EEPROM copy loaded at power
//! up). These types play the same role. Frequencies are in MHz.

use num_derive::{
    FromPrimitive,
    ToPrimitive,
};
use std::{
    fmt::Display,
    str::FromStr,
};

/// Crystal fitted to XEM boards
pub const DEFAULT_REFERENCE: f64 = 48.0;

const PLLS_22393: usize = 3;
const OUTPUTS_22393: usize = 5;
const OUTPUTS_22150: usize = 6;

/// Valid VCO / PLL feedback divider range
pub const P_RANGE: std::ops::RangeInclusive<u32> = 6..=2053;
/// Valid VCO / PLL reference divider range
pub const Q_RANGE: std::ops::RangeInclusive<u32> = 2..=257;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("There is no PLL {0}")]
    Pll(usize),
    #[error("There is no clock output {0}")]
    Output(usize),
    #[error("P must be between 6 and 2053, got {0}")]
    P(u32),
    #[error("Q must be between 2 and 257, got {0}")]
    Q(u32),
    #[error("Divider must be between {min} and {max}, got {got}")]
    Divider { min: u32, max: u32, got: u32 },
    #[error("Clock output {0} has a fixed source")]
    FixedSource(usize),
    #[error("Unknown clock source `{0}`")]
    Source(String),
}

fn check_pq(p: u32, q: u32) -> Result<(), Error> {
    if !P_RANGE.contains(&p) {
        return Err(Error::P(p));
    }
    if !Q_RANGE.contains(&q) {
        return Err(Error::Q(q));
    }
    Ok(())
}

/// Output sources of the CY22393
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum ClockSource22393 {
    Ref = 0,
    Pll0_0 = 2,
    Pll0_180 = 3,
    Pll1_0 = 4,
    Pll1_180 = 5,
    Pll2_0 = 6,
    Pll2_180 = 7,
}

impl ClockSource22393 {
    /// Every source, in the order the SDK numbers them
    pub const ALL: [ClockSource22393; 7] = [
        ClockSource22393::Ref,
        ClockSource22393::Pll0_0,
        ClockSource22393::Pll0_180,
        ClockSource22393::Pll1_0,
        ClockSource22393::Pll1_180,
        ClockSource22393::Pll2_0,
        ClockSource22393::Pll2_180,
    ];

    /// The PLL this source is derived from, `None` for the reference
    #[must_use]
    pub fn pll(self) -> Option<usize> {
        match self {
            ClockSource22393::Ref => None,
            ClockSource22393::Pll0_0 | ClockSource22393::Pll0_180 => Some(0),
            ClockSource22393::Pll1_0 | ClockSource22393::Pll1_180 => Some(1),
            ClockSource22393::Pll2_0 | ClockSource22393::Pll2_180 => Some(2),
        }
    }
}

impl FromStr for ClockSource22393 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "REF" => ClockSource22393::Ref,
            "PLL0-0" => ClockSource22393::Pll0_0,
            "PLL0-180" => ClockSource22393::Pll0_180,
            "PLL1-0" => ClockSource22393::Pll1_0,
            "PLL1-180" => ClockSource22393::Pll1_180,
            "PLL2-0" => ClockSource22393::Pll2_0,
            "PLL2-180" => ClockSource22393::Pll2_180,
            _ => return Err(Error::Source(s.to_owned())),
        })
    }
}

impl Display for ClockSource22393 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ClockSource22393::Ref => "REF",
                ClockSource22393::Pll0_0 => "PLL0-0",
                ClockSource22393::Pll0_180 => "PLL0-180",
                ClockSource22393::Pll1_0 => "PLL1-0",
                ClockSource22393::Pll1_180 => "PLL1-180",
                ClockSource22393::Pll2_0 => "PLL2-0",
                ClockSource22393::Pll2_180 => "PLL2-180",
            }
        )
    }
}

/// Settings of one of the CY22393's PLLs
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PllParameters {
    pub p: u32,
    pub q: u32,
    pub enabled: bool,
}

/// Settings of one of the CY22393's clock outputs
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Output22393 {
    pub source: ClockSource22393,
    /// Zero turns the output off
    pub divider: u32,
    pub enabled: bool,
}

/// Configuration of a Cypress CY22393: three PLLs feeding five outputs (SYSCLK1-5)
#[derive(Debug, Clone, PartialEq)]
pub struct Pll22393 {
    pub reference: f64,
    pub plls: [PllParameters; PLLS_22393],
    pub outputs: [Output22393; OUTPUTS_22393],
}

impl Default for Pll22393 {
    fn default() -> Self {
        let off = Output22393 {
            source: ClockSource22393::Ref,
            divider: 1,
            enabled: false,
        };
        let mut outputs = [off; Self::OUTPUTS];
        outputs[0] = Output22393 {
            source: ClockSource22393::Pll0_0,
            divider: 4,
            enabled: true,
        };
        outputs[Self::FIXED_OUTPUT].source = Self::FIXED_SOURCE;
        Self {
            reference: DEFAULT_REFERENCE,
            plls: [
                PllParameters {
                    p: 400,
                    q: 48,
                    enabled: true,
                },
                PllParameters {
                    p: 400,
                    q: 48,
                    enabled: false,
                },
                PllParameters {
                    p: 400,
                    q: 48,
                    enabled: false,
                },
            ],
            outputs,
        }
    }
}

impl Pll22393 {
    pub const PLLS: usize = PLLS_22393;
    pub const OUTPUTS: usize = OUTPUTS_22393;
    /// Index of the output wired straight to PLL0 (SYSCLK5)
    pub const FIXED_OUTPUT: usize = 4;
    pub const FIXED_SOURCE: ClockSource22393 = ClockSource22393::Pll0_0;
    pub const MAX_DIVIDER: u32 = 127;

    /// Sets the divider pair and enable of PLL `n`
    /// # Errors
    /// Returns an error on out of range arguments
    pub fn set_pll_parameters(
        &mut self,
        n: usize,
        p: u32,
        q: u32,
        enable: bool,
    ) -> Result<(), Error> {
        check_pq(p, q)?;
        let pll = self.plls.get_mut(n).ok_or(Error::Pll(n))?;
        *pll = PllParameters {
            p,
            q,
            enabled: enable,
        };
        Ok(())
    }

    fn output_mut(&mut self, n: usize) -> Result<&mut Output22393, Error> {
        self.outputs.get_mut(n).ok_or(Error::Output(n))
    }

    /// Routes output `n` from `source`
    /// # Errors
    /// Returns an error for unknown outputs or an attempt to move SYSCLK5
    pub fn set_output_source(&mut self, n: usize, source: ClockSource22393) -> Result<(), Error> {
        if n == Self::FIXED_OUTPUT && source != Self::FIXED_SOURCE {
            return Err(Error::FixedSource(n));
        }
        self.output_mut(n)?.source = source;
        Ok(())
    }

    /// # Errors
    /// Returns an error for unknown outputs or dividers above 127
    pub fn set_output_divider(&mut self, n: usize, divider: u32) -> Result<(), Error> {
        if divider > Self::MAX_DIVIDER {
            return Err(Error::Divider {
                min: 0,
                max: Self::MAX_DIVIDER,
                got: divider,
            });
        }
        self.output_mut(n)?.divider = divider;
        Ok(())
    }

    /// # Errors
    /// Returns an error for unknown outputs
    pub fn set_output_enable(&mut self, n: usize, enable: bool) -> Result<(), Error> {
        self.output_mut(n)?.enabled = enable;
        Ok(())
    }

    /// Frequency of PLL `n`, regardless of whether it is enabled
    #[must_use]
    pub fn pll_frequency(&self, n: usize) -> Option<f64> {
        self.plls
            .get(n)
            .map(|pll| self.reference * f64::from(pll.p) / f64::from(pll.q))
    }

    #[must_use]
    pub fn source_frequency(&self, source: ClockSource22393) -> f64 {
        match source.pll() {
            None => self.reference,
            Some(n) if self.plls[n].enabled => self.pll_frequency(n).unwrap_or_default(),
            Some(_) => 0.0,
        }
    }

    /// Frequency at output `n`, zero when disabled
    #[must_use]
    pub fn output_frequency(&self, n: usize) -> Option<f64> {
        self.outputs.get(n).map(|out| {
            if out.enabled && out.divider > 0 {
                self.source_frequency(out.source) / f64::from(out.divider)
            } else {
                0.0
            }
        })
    }
}

/// Inputs to the CY22150's two post dividers
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum DividerSource {
    Ref = 0,
    Vco = 1,
}

/// Output sources of the CY22150
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum ClockSource22150 {
    Ref = 0,
    Div1ByN = 1,
    Div1By2 = 2,
    Div1By3 = 3,
    Div2ByN = 4,
    Div2By2 = 5,
    Div2By4 = 6,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Divider22150 {
    pub source: DividerSource,
    pub n: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Output22150 {
    pub source: ClockSource22150,
    pub enabled: bool,
}

/// Configuration of a Cypress CY22150: one VCO, two dividers and six outputs
#[derive(Debug, Clone, PartialEq)]
pub struct Pll22150 {
    pub reference: f64,
    /// The reference is an external oscillator rather than the crystal
    pub external_oscillator: bool,
    pub vco_p: u32,
    pub vco_q: u32,
    pub div1: Divider22150,
    pub div2: Divider22150,
    pub outputs: [Output22150; OUTPUTS_22150],
}

impl Default for Pll22150 {
    fn default() -> Self {
        let off = Output22150 {
            source: ClockSource22150::Ref,
            enabled: false,
        };
        let mut outputs = [off; Self::OUTPUTS];
        outputs[0] = Output22150 {
            source: ClockSource22150::Div1ByN,
            enabled: true,
        };
        Self {
            reference: DEFAULT_REFERENCE,
            external_oscillator: false,
            vco_p: 400,
            vco_q: 48,
            div1: Divider22150 {
                source: DividerSource::Vco,
                n: 8,
            },
            div2: Divider22150 {
                source: DividerSource::Vco,
                n: 8,
            },
            outputs,
        }
    }
}

impl Pll22150 {
    pub const OUTPUTS: usize = OUTPUTS_22150;
    pub const DIVIDER_RANGE: std::ops::RangeInclusive<u32> = 4..=127;

    /// # Errors
    /// Returns an error on out of range arguments
    pub fn set_vco_parameters(&mut self, p: u32, q: u32) -> Result<(), Error> {
        check_pq(p, q)?;
        self.vco_p = p;
        self.vco_q = q;
        Ok(())
    }

    fn divider(source: DividerSource, n: u32) -> Result<Divider22150, Error> {
        if !Self::DIVIDER_RANGE.contains(&n) {
            return Err(Error::Divider {
                min: *Self::DIVIDER_RANGE.start(),
                max: *Self::DIVIDER_RANGE.end(),
                got: n,
            });
        }
        Ok(Divider22150 { source, n })
    }

    /// # Errors
    /// Returns an error when `n` is outside 4..=127
    pub fn set_div1(&mut self, source: DividerSource, n: u32) -> Result<(), Error> {
        self.div1 = Self::divider(source, n)?;
        Ok(())
    }

    /// # Errors
    /// Returns an error when `n` is outside 4..=127
    pub fn set_div2(&mut self, source: DividerSource, n: u32) -> Result<(), Error> {
        self.div2 = Self::divider(source, n)?;
        Ok(())
    }

    /// # Errors
    /// Returns an error for unknown outputs
    pub fn set_output_source(&mut self, n: usize, source: ClockSource22150) -> Result<(), Error> {
        self.outputs.get_mut(n).ok_or(Error::Output(n))?.source = source;
        Ok(())
    }

    /// # Errors
    /// Returns an error for unknown outputs
    pub fn set_output_enable(&mut self, n: usize, enable: bool) -> Result<(), Error> {
        self.outputs.get_mut(n).ok_or(Error::Output(n))?.enabled = enable;
        Ok(())
    }

    #[must_use]
    pub fn vco_frequency(&self) -> f64 {
        self.reference * f64::from(self.vco_p) / f64::from(self.vco_q)
    }

    fn divider_input(&self, div: Divider22150) -> f64 {
        match div.source {
            DividerSource::Ref => self.reference,
            DividerSource::Vco => self.vco_frequency(),
        }
    }

    /// Frequency at output `n`, zero when disabled
    #[must_use]
    pub fn output_frequency(&self, n: usize) -> Option<f64> {
        self.outputs.get(n).map(|out| {
            if !out.enabled {
                return 0.0;
            }
            let div1 = self.divider_input(self.div1);
            let div2 = self.divider_input(self.div2);
            match out.source {
                ClockSource22150::Ref => self.reference,
                ClockSource22150::Div1ByN => div1 / f64::from(self.div1.n),
                ClockSource22150::Div1By2 => div1 / 2.0,
                ClockSource22150::Div1By3 => div1 / 3.0,
                ClockSource22150::Div2ByN => div2 / f64::from(self.div2.n),
                ClockSource22150::Div2By2 => div2 / 2.0,
                ClockSource22150::Div2By4 => div2 / 4.0,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_22393_frequencies() {
        let mut pll = Pll22393::default();
        assert_eq!(pll.pll_frequency(0), Some(400.0));
        assert_eq!(pll.output_frequency(0), Some(100.0));
        pll.set_pll_parameters(1, 300, 48, true).unwrap();
        pll.set_output_source(1, ClockSource22393::Pll1_180).unwrap();
        pll.set_output_divider(1, 3).unwrap();
        pll.set_output_enable(1, true).unwrap();
        assert_eq!(pll.output_frequency(1), Some(100.0));
        // Disabled PLLs feed nothing
        pll.set_pll_parameters(1, 300, 48, false).unwrap();
        assert_eq!(pll.output_frequency(1), Some(0.0));
        pll.set_output_divider(0, 0).unwrap();
        assert_eq!(pll.output_frequency(0), Some(0.0));
        assert_eq!(pll.pll_frequency(3), None);
    }

    #[test]
    fn test_22393_bounds() {
        let mut pll = Pll22393::default();
        assert_eq!(pll.set_pll_parameters(0, 5, 48, true), Err(Error::P(5)));
        assert_eq!(pll.set_pll_parameters(0, 2054, 48, true), Err(Error::P(2054)));
        assert_eq!(pll.set_pll_parameters(0, 400, 1, true), Err(Error::Q(1)));
        assert_eq!(pll.set_pll_parameters(0, 400, 258, true), Err(Error::Q(258)));
        assert!(pll.set_pll_parameters(0, 6, 2, true).is_ok());
        assert!(pll.set_pll_parameters(0, 2053, 257, true).is_ok());
        assert_eq!(pll.set_pll_parameters(3, 400, 48, true), Err(Error::Pll(3)));
        assert_eq!(
            pll.set_output_source(4, ClockSource22393::Pll1_0),
            Err(Error::FixedSource(4))
        );
        assert!(pll.set_output_source(4, ClockSource22393::Pll0_0).is_ok());
        assert!(matches!(
            pll.set_output_divider(0, 128),
            Err(Error::Divider { got: 128, .. })
        ));
        assert_eq!(pll.set_output_enable(5, true), Err(Error::Output(5)));
    }

    #[test]
    fn test_source_names() {
        for source in ClockSource22393::ALL {
            assert_eq!(source.to_string().parse::<ClockSource22393>(), Ok(source));
        }
        assert_eq!(
            "PLL3-0".parse::<ClockSource22393>(),
            Err(Error::Source("PLL3-0".to_owned()))
        );
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_22150_frequencies() {
        let mut pll = Pll22150::default();
        assert_eq!(pll.vco_frequency(), 400.0);
        assert_eq!(pll.output_frequency(0), Some(50.0));
        pll.set_div2(DividerSource::Ref, 4).unwrap();
        pll.set_output_source(2, ClockSource22150::Div2By4).unwrap();
        pll.set_output_enable(2, true).unwrap();
        assert_eq!(pll.output_frequency(2), Some(12.0));
        assert_eq!(pll.output_frequency(1), Some(0.0));
        assert!(matches!(
            pll.set_div1(DividerSource::Vco, 3),
            Err(Error::Divider { got: 3, .. })
        ));
        assert_eq!(pll.set_vco_parameters(400, 300), Err(Error::Q(300)));
        assert_eq!(pll.output_frequency(6), None);
    }
}
