use crate::{
    datatype::{Sample, TracePoint, get_highest},
    fitting::FitResult,
    formats::format_general,
};
use lumparser_common::{Intensity, Time};
use strum::{Display, EnumIter, EnumString};

/// Cumulative integral of `points` by the left-rectangle rule, starting from `(0, 0)`.
///
/// Applying this to an already integrated sequence integrates it a second time.
pub fn integrate<P: TracePoint>(points: &[P]) -> Vec<Sample> {
    points
        .iter()
        .scan((0.0, 0.0), |(prev_time, prev_value), point| {
            let time = point.get_time();
            let value = *prev_value + (time - *prev_time) * point.get_value();
            *prev_time = time;
            *prev_value = value;
            Some(Sample::new(time, value))
        })
        .collect()
}

/// The forms in which the data of a signal can be read or exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Datatype {
    Normal,
    Integrated,
    Fit,
}

/// One flash cut from a time drive, corrected for background.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    name: String,
    filename: String,
    start: Time,
    samples: Vec<Sample>,
    integrated_samples: Vec<Sample>,
    peak_time: Time,
    peak_height: Intensity,
    total_integral: Intensity,
    fit: Option<FitResult>,
}

impl Signal {
    /// Creates a signal from samples in trace time, shifting them so the first is at zero.
    pub fn new(name: impl Into<String>, filename: impl Into<String>, samples: Vec<Sample>) -> Self {
        let start = samples.first().map(|s| s.time).unwrap_or_default();
        let shifted = samples
            .into_iter()
            .map(|s| Sample::new(s.time - start, s.value))
            .collect();
        Self::with_start(name, filename, start, shifted)
    }

    /// Creates a signal from samples which are already relative to `start`.
    pub fn with_start(
        name: impl Into<String>,
        filename: impl Into<String>,
        start: Time,
        samples: Vec<Sample>,
    ) -> Self {
        let (peak_time, peak_height) = get_highest(&samples);
        let integrated_samples = integrate(&samples);
        let (_, total_integral) = get_highest(&integrated_samples);
        Self {
            name: name.into(),
            filename: filename.into(),
            start,
            samples,
            integrated_samples,
            peak_time,
            peak_height,
            total_integral,
            fit: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn start(&self) -> Time {
        self.start
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn integrated_samples(&self) -> &[Sample] {
        &self.integrated_samples
    }

    pub fn peak_time(&self) -> Time {
        self.peak_time
    }

    pub fn peak_height(&self) -> Intensity {
        self.peak_height
    }

    pub fn total_integral(&self) -> Intensity {
        self.total_integral
    }

    pub fn fit(&self) -> Option<&FitResult> {
        self.fit.as_ref()
    }

    pub(crate) fn set_fit(&mut self, fit: FitResult) -> &FitResult {
        self.fit.insert(fit)
    }

    pub fn clear_fit(&mut self) {
        self.fit = None;
    }

    /// The samples of the requested form, `None` for [Datatype::Fit] if the signal has no fit.
    pub fn data(&self, datatype: Datatype) -> Option<&[Sample]> {
        match datatype {
            Datatype::Normal => Some(&self.samples),
            Datatype::Integrated => Some(&self.integrated_samples),
            Datatype::Fit => self.fit.as_ref().map(|fit| fit.curve.as_slice()),
        }
    }

    /// A one line summary of the signal.
    pub fn info(&self, datatype: Datatype) -> String {
        match datatype {
            Datatype::Normal => format!(
                "Peak maximum:{} RLU at {:.2} s",
                format_general(self.peak_height),
                self.peak_time
            ),
            Datatype::Integrated => {
                format!("Total integral: {}", format_general(self.total_integral))
            }
            Datatype::Fit => match &self.fit {
                Some(fit) => format!("Fit to {}: p = {}", fit.model, format_general(fit.p_value)),
                None => "Not fitted".to_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use lumparser_common::Real;

    fn make_samples(start: Time, values: &[Real]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(start + i as Real * 0.5, v))
            .collect()
    }

    #[test]
    fn time_shifted_to_zero() {
        let signal = Signal::new("a.td 1", "a.td", make_samples(12.0, &[1.0, 4.0, 2.0]));
        assert_eq!(signal.start(), 12.0);
        assert_eq!(signal.samples()[0].time, 0.0);
        assert_approx_eq!(signal.samples()[2].time, 1.0);
        assert_approx_eq!(signal.peak_time(), 0.5);
        assert_approx_eq!(signal.peak_height(), 4.0);
    }

    #[test]
    fn left_rectangle_rule() {
        let integrated = integrate(&make_samples(0.0, &[1.0, 4.0, 2.0]));
        let values: Vec<_> = integrated.iter().map(|s| s.value).collect();
        // first sample has zero width
        assert_eq!(values, vec![0.0, 2.0, 3.0]);
    }

    #[test]
    fn integral_non_decreasing() {
        let samples = make_samples(0.0, &[0.0, 3.0, 0.5, 0.0, 7.0, 1.0]);
        let integrated = integrate(&samples);
        assert!(integrated.windows(2).all(|w| w[1].value >= w[0].value));
    }

    #[test]
    fn double_integration_differs() {
        let samples = make_samples(0.0, &[1.0, 1.0, 1.0, 1.0]);
        let once = integrate(&samples);
        let twice = integrate(&once);
        assert_ne!(once, twice);
        assert_approx_eq!(once[3].value, 1.5);
        // 0 + 0.5 * (0.5 + 1.0 + 1.5)
        assert_approx_eq!(twice[3].value, 1.5);
        assert_approx_eq!(twice[2].value, 0.75);
    }

    #[test]
    fn total_integral_is_maximum() {
        let signal = Signal::new("s", "f", make_samples(0.0, &[2.0, 2.0, -1.0, -1.0]));
        // integrated: 0, 1, 0.5, 0
        assert_approx_eq!(signal.total_integral(), 1.0);
    }

    #[test]
    fn no_fit_data() {
        let signal = Signal::new("s", "f", make_samples(0.0, &[2.0]));
        assert_eq!(signal.data(Datatype::Fit), None);
        assert_eq!(signal.info(Datatype::Fit), "Not fitted");
        assert_eq!(signal.info(Datatype::Normal), "Peak maximum:2 RLU at 0.00 s");
    }
}
