//! LNB local-oscillator profiles and intermediate-frequency computation.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LnbError {
    #[error("empty LNB specification")]
    Empty,
    #[error("unknown LNB type '{0}'")]
    UnknownType(String),
    #[error("invalid LNB frequency '{0}'")]
    BadFrequency(String),
    #[error("too many LNB frequencies in '{0}'")]
    TooManyFields(String),
}

/// Local-oscillator frequencies and band-switch threshold, all in kHz.
/// A zero `high_lo` or `switch_threshold` describes a single-band LNB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LnbProfile {
    pub low_lo: u32,
    pub high_lo: u32,
    pub switch_threshold: u32,
}

/// Band and IF the frontend has to be tuned to for one downlink frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandSelection {
    pub high_band: bool,
    pub intermediate_frequency: u32,
}

struct KnownLnb {
    name: &'static str,
    description: &'static str,
    low_mhz: u32,
    high_mhz: u32,
    switch_mhz: u32,
}

const KNOWN_LNBS: &[KnownLnb] = &[
    KnownLnb {
        name: "UNIVERSAL",
        description: "Europe, 10800-11800 and 11600-12700 MHz, LO 9750/10600 MHz",
        low_mhz: 9750,
        high_mhz: 10600,
        switch_mhz: 11700,
    },
    KnownLnb {
        name: "DBS",
        description: "Expressvu, North America, 12200-12700 MHz, LO 11250 MHz",
        low_mhz: 11250,
        high_mhz: 0,
        switch_mhz: 0,
    },
    KnownLnb {
        name: "STANDARD",
        description: "10945-11450 MHz, LO 10000 MHz",
        low_mhz: 10000,
        high_mhz: 0,
        switch_mhz: 0,
    },
    KnownLnb {
        name: "ENHANCED",
        description: "Astra, 10700-11700 MHz, LO 9750 MHz",
        low_mhz: 9750,
        high_mhz: 0,
        switch_mhz: 0,
    },
    KnownLnb {
        name: "C-BAND",
        description: "Big dish, 3700-4200 MHz, LO 5150 MHz",
        low_mhz: 5150,
        high_mhz: 0,
        switch_mhz: 0,
    },
];

impl LnbProfile {
    /// Build a profile from MHz values as found in LNB tables.
    pub fn from_mhz(low: u32, high: u32, switch: u32) -> Self {
        LnbProfile {
            low_lo: low * 1000,
            high_lo: high * 1000,
            switch_threshold: switch * 1000,
        }
    }

    pub fn universal() -> Self {
        let u = &KNOWN_LNBS[0];
        LnbProfile::from_mhz(u.low_mhz, u.high_mhz, u.switch_mhz)
    }

    /// Built-in profile names with a one-line description each.
    pub fn known() -> impl Iterator<Item = (&'static str, &'static str)> {
        KNOWN_LNBS.iter().map(|l| (l.name, l.description))
    }

    pub fn is_high_band(&self, frequency: u32) -> bool {
        self.switch_threshold > 0 && self.high_lo > 0 && frequency >= self.switch_threshold
    }

    pub fn select(&self, frequency: u32) -> BandSelection {
        let high_band = self.is_high_band(frequency);
        let intermediate_frequency = if high_band {
            frequency.abs_diff(self.high_lo)
        } else {
            // C-band LNBs mix down from below the LO; the spectrum is mirrored
            // but the IF distance is the same either way
            frequency.abs_diff(self.low_lo)
        };
        BandSelection {
            high_band,
            intermediate_frequency,
        }
    }
}

impl Default for LnbProfile {
    fn default() -> Self {
        LnbProfile::universal()
    }
}

impl fmt::Display for LnbProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LO {} kHz", self.low_lo)?;
        if self.high_lo > 0 {
            write!(f, " / {} kHz", self.high_lo)?;
        }
        if self.switch_threshold > 0 {
            write!(f, ", switch at {} kHz", self.switch_threshold)?;
        }
        Ok(())
    }
}

fn parse_mhz(s: &str) -> Result<u32, LnbError> {
    s.trim()
        .parse::<u32>()
        .ok()
        .filter(|v| *v > 0 && *v < u32::MAX / 1000)
        .ok_or_else(|| LnbError::BadFrequency(s.trim().to_string()))
}

/// Accepts a built-in name (case-insensitive) or `low[,high[,switch]]` in MHz.
impl FromStr for LnbProfile {
    type Err = LnbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LnbError::Empty);
        }

        if s.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return KNOWN_LNBS
                .iter()
                .find(|l| l.name.eq_ignore_ascii_case(s))
                .map(|l| LnbProfile::from_mhz(l.low_mhz, l.high_mhz, l.switch_mhz))
                .ok_or_else(|| LnbError::UnknownType(s.to_string()));
        }

        let fields: Vec<&str> = s.split(',').collect();
        if fields.len() > 3 {
            return Err(LnbError::TooManyFields(s.to_string()));
        }

        let low = parse_mhz(fields[0])?;
        let high = fields.get(1).map(|f| parse_mhz(f)).transpose()?.unwrap_or(0);
        let switch = fields.get(2).map(|f| parse_mhz(f)).transpose()?.unwrap_or(0);
        Ok(LnbProfile::from_mhz(low, high, switch))
    }
}
