use crate::{datatype::Trace, settings::BackgroundBounds};
use lumparser_common::{Intensity, Time};
use thiserror::Error;
use tracing::{debug, instrument};

/// Number of final samples whose mean caps the background estimate.
pub const TAIL_LENGTH: usize = 100;

#[derive(Debug, Error, PartialEq)]
pub enum BackgroundError {
    #[error("background boundary at {right} seconds overlaps with peak at {onset} seconds")]
    Overlap { right: Time, onset: Time },
    #[error("no samples between {left} and {right} seconds")]
    EmptyWindow { left: Time, right: Time },
    #[error("{left},{right} not recognised as background boundaries")]
    InvalidBounds { left: Time, right: Time },
}

/// Which computation produced a [Background] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundSource {
    /// Mean of the samples within the background window.
    Window,
    /// Mean of the last samples of the trace, which was lower than the window mean.
    TailAverage,
    /// The window could not be evaluated, the value is zero.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Background {
    pub value: Intensity,
    pub window: Option<(Time, Time)>,
    pub source: BackgroundSource,
}

impl Background {
    pub fn unavailable() -> Self {
        Self {
            value: 0.0,
            window: None,
            source: BackgroundSource::Unavailable,
        }
    }

    fn resolve_window(
        bounds: &BackgroundBounds,
        first_onset: Time,
    ) -> Result<(Time, Time), BackgroundError> {
        match *bounds {
            BackgroundBounds::Preset(preset) => Ok(preset.window(first_onset)),
            BackgroundBounds::Explicit { left, right } => {
                if !(left.is_finite() && right.is_finite()) {
                    Err(BackgroundError::InvalidBounds { left, right })
                } else if right > first_onset {
                    Err(BackgroundError::Overlap {
                        right,
                        onset: first_onset,
                    })
                } else if right < left {
                    Ok((right, left))
                } else {
                    Ok((left, right))
                }
            }
        }
    }

    /// Estimates the ambient light level of `trace`.
    ///
    /// The mean over the window given by `bounds` is lowered to the mean of the
    /// final [TAIL_LENGTH] samples if the latter is smaller, so that corrected
    /// signals do not dip below zero at their end.
    #[instrument(skip(trace, bounds), fields(trace = trace.name(), bounds = %bounds))]
    pub fn estimate(
        trace: &Trace,
        first_onset: Time,
        bounds: &BackgroundBounds,
    ) -> Result<Self, BackgroundError> {
        let (left, right) = Self::resolve_window(bounds, first_onset)?;
        let window_mean = trace
            .window_mean(left, right)
            .ok_or(BackgroundError::EmptyWindow { left, right })?;

        let background = match trace.tail_mean(TAIL_LENGTH) {
            Some(tail_mean) if tail_mean < window_mean => {
                debug!(window_mean, tail_mean, "Background lowered to tail average");
                Self {
                    value: tail_mean,
                    window: Some((left, right)),
                    source: BackgroundSource::TailAverage,
                }
            }
            _ => Self {
                value: window_mean,
                window: Some((left, right)),
                source: BackgroundSource::Window,
            },
        };
        Ok(background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BackgroundPreset;
    use assert_approx_eq::assert_approx_eq;
    use lumparser_common::Real;

    /// One sample per second: value 2 up to t = 50, 10 up to t = 150, then 3.
    fn make_trace() -> Trace {
        Trace::new(
            "test.td",
            (0..300).map(|i| {
                let value = match i {
                    0..=50 => 2.0,
                    51..=150 => 10.0,
                    _ => 3.0,
                };
                (i as Real, value)
            }),
        )
        .unwrap()
    }

    #[test]
    fn explicit_window() {
        let bounds = BackgroundBounds::Explicit {
            left: 0.0,
            right: 10.0,
        };
        let background = Background::estimate(&make_trace(), 51.0, &bounds).unwrap();
        assert_approx_eq!(background.value, 2.0);
        assert_eq!(background.source, BackgroundSource::Window);
        assert_eq!(background.window, Some((0.0, 10.0)));
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        let bounds = BackgroundBounds::Explicit {
            left: 10.0,
            right: 0.0,
        };
        let background = Background::estimate(&make_trace(), 51.0, &bounds).unwrap();
        assert_eq!(background.window, Some((0.0, 10.0)));
    }

    #[test]
    fn overlap_with_first_onset() {
        let bounds = BackgroundBounds::Explicit {
            left: 5.0,
            right: 20.0,
        };
        assert_eq!(
            Background::estimate(&make_trace(), 10.0, &bounds),
            Err(BackgroundError::Overlap {
                right: 20.0,
                onset: 10.0
            })
        );
    }

    #[test]
    fn empty_window() {
        let bounds = BackgroundBounds::Explicit {
            left: 3.2,
            right: 3.8,
        };
        assert!(matches!(
            Background::estimate(&make_trace(), 51.0, &bounds),
            Err(BackgroundError::EmptyWindow { .. })
        ));
    }

    #[test]
    fn tail_lowers_estimate() {
        // window over the plateau at 10, tail is at 3
        let bounds = BackgroundBounds::Preset(BackgroundPreset::PeakShort);
        let background = Background::estimate(&make_trace(), 150.0, &bounds).unwrap();
        assert_approx_eq!(background.value, 3.0);
        assert_eq!(background.source, BackgroundSource::TailAverage);
    }

    #[test]
    fn preset_start_long() {
        let bounds = BackgroundBounds::Preset(BackgroundPreset::StartLong);
        let background = Background::estimate(&make_trace(), 51.0, &bounds).unwrap();
        // t in (0, 100]: 50 samples at 2 and 50 at 10, tail is lower
        assert_approx_eq!(background.value, 3.0);
        assert_eq!(background.window, Some((0.0, 100.0)));
    }

    #[test]
    fn short_trace_tail_is_whole_trace() {
        let make_short = |early: Real, late: Real| {
            Trace::new(
                "short.td",
                (0..40).map(|i| (i as Real, if i <= 10 { early } else { late })),
            )
            .unwrap()
        };
        let bounds = BackgroundBounds::Explicit {
            left: 0.0,
            right: 10.0,
        };

        // 11 samples at 5 and 29 at 1, fewer than TAIL_LENGTH in all
        let background = Background::estimate(&make_short(5.0, 1.0), 20.0, &bounds).unwrap();
        assert_eq!(background.source, BackgroundSource::TailAverage);
        assert_approx_eq!(background.value, 84.0 / 40.0);
        assert_eq!(background.window, Some((0.0, 10.0)));

        let background = Background::estimate(&make_short(1.0, 5.0), 20.0, &bounds).unwrap();
        assert_eq!(background.source, BackgroundSource::Window);
        assert_approx_eq!(background.value, 1.0);
    }
}
