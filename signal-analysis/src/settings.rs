use lumparser_common::{Real, SampleIndex, Time};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use strum::{Display as StrumDisplay, EnumIter, EnumString};
use thiserror::Error;

pub const DEFAULT_STARTING_POINT: SampleIndex = 0;
pub const DEFAULT_THRESHOLD: Real = 0.3;
pub const DEFAULT_BACKGROUND_BOUNDS: (Time, Time) = (0.0, 10.0);

/// Named background windows. Those starting with `peak` are relative to the first onset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum BackgroundPreset {
    StartShort,
    StartLong,
    PeakShort,
    PeakLong,
}

impl BackgroundPreset {
    /// The `(left, right)` window given the time of the first onset.
    pub fn window(&self, first_onset: Time) -> (Time, Time) {
        match self {
            BackgroundPreset::StartShort => (0.0, 10.0),
            BackgroundPreset::StartLong => (0.0, 100.0),
            BackgroundPreset::PeakShort => (first_onset - 10.0, first_onset),
            BackgroundPreset::PeakLong => (first_onset - 100.0, first_onset),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("'{0}' is neither a background preset nor a 'left,right' pair of times")]
pub struct BoundsParseError(pub String);

/// Where the ambient light level of a trace is measured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackgroundBounds {
    Preset(BackgroundPreset),
    Explicit { left: Time, right: Time },
}

impl Default for BackgroundBounds {
    fn default() -> Self {
        let (left, right) = DEFAULT_BACKGROUND_BOUNDS;
        BackgroundBounds::Explicit { left, right }
    }
}

impl FromStr for BackgroundBounds {
    type Err = BoundsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(preset) = BackgroundPreset::from_str(s) {
            return Ok(BackgroundBounds::Preset(preset));
        }
        let vals: Vec<_> = s.split(',').map(str::trim).collect();
        match vals.as_slice() {
            [left, right] => {
                let left = Time::from_str(left).map_err(|_| BoundsParseError(s.to_owned()))?;
                let right = Time::from_str(right).map_err(|_| BoundsParseError(s.to_owned()))?;
                if left.is_finite() && right.is_finite() {
                    Ok(BackgroundBounds::Explicit { left, right })
                } else {
                    Err(BoundsParseError(s.to_owned()))
                }
            }
            _ => Err(BoundsParseError(s.to_owned())),
        }
    }
}

impl TryFrom<String> for BackgroundBounds {
    type Error = BoundsParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackgroundBounds> for String {
    fn from(value: BackgroundBounds) -> Self {
        value.to_string()
    }
}

impl Display for BackgroundBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackgroundBounds::Preset(preset) => write!(f, "{preset}"),
            BackgroundBounds::Explicit { left, right } => write!(f, "{left},{right}"),
        }
    }
}

/// Parameters controlling how signals are extracted from a time drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ParseSettings {
    /// Onsets are only accepted at sample indices after this one.
    pub starting_point: SampleIndex,
    /// Minimum rise above the local average, in RLU.
    pub threshold: Real,
    pub background: BackgroundBounds,
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            starting_point: DEFAULT_STARTING_POINT,
            threshold: DEFAULT_THRESHOLD,
            background: BackgroundBounds::default(),
        }
    }
}
