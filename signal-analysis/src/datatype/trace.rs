use super::{Sample, TracePoint};
use lumparser_common::{Intensity, Real, SampleIndex, Time};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TraceError {
    #[error("Time {time} at sample {index} does not follow previous time {previous}")]
    NonIncreasingTime {
        index: SampleIndex,
        previous: Time,
        time: Time,
    },
    #[error("Non-finite time at sample {0}")]
    NonFiniteTime(SampleIndex),
}

/// The time drive of one source file.
/// Times are strictly increasing, which is checked on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    name: String,
    samples: Vec<Sample>,
}

impl Trace {
    pub fn new<P: TracePoint>(
        name: impl Into<String>,
        points: impl IntoIterator<Item = P>,
    ) -> Result<Self, TraceError> {
        let samples = points
            .into_iter()
            .map(|point| Sample::new(point.get_time(), point.get_value()))
            .collect::<Vec<_>>();

        for (index, sample) in samples.iter().enumerate() {
            if !sample.time.is_finite() {
                return Err(TraceError::NonFiniteTime(index));
            }
        }
        for (index, pair) in samples.windows(2).enumerate() {
            if let [previous, current] = pair {
                if current.time <= previous.time {
                    return Err(TraceError::NonIncreasingTime {
                        index: index + 1,
                        previous: previous.time,
                        time: current.time,
                    });
                }
            }
        }
        Ok(Self {
            name: name.into(),
            samples,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: SampleIndex) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn time_at(&self, index: SampleIndex) -> Option<Time> {
        self.get(index).map(|sample| sample.time)
    }

    pub fn values(&self) -> impl Iterator<Item = Intensity> + '_ {
        self.samples.iter().map(|sample| sample.value)
    }

    /// Mean of the values with `left < time <= right`, or `None` if no sample lies in the window.
    pub fn window_mean(&self, left: Time, right: Time) -> Option<Intensity> {
        let (sum, count) = self
            .samples
            .iter()
            .take_while(|sample| sample.time <= right)
            .filter(|sample| sample.time > left)
            .fold((0.0, 0usize), |(sum, count), sample| {
                (sum + sample.value, count + 1)
            });
        (count > 0).then(|| sum / count as Real)
    }

    /// Mean of the last `length` values (or of all of them if the trace is shorter).
    pub fn tail_mean(&self, length: usize) -> Option<Intensity> {
        let tail = &self.samples[self.samples.len().saturating_sub(length)..];
        (!tail.is_empty()).then(|| tail.iter().map(|s| s.value).sum::<Real>() / tail.len() as Real)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn reject_repeated_time() {
        let result = Trace::new("td", [(0.0, 1.0), (0.1, 1.0), (0.1, 2.0)]);
        assert_eq!(
            result,
            Err(TraceError::NonIncreasingTime {
                index: 2,
                previous: 0.1,
                time: 0.1
            })
        );
    }

    #[test]
    fn reject_nan_time() {
        let result = Trace::new("td", [(0.0, 1.0), (Real::NAN, 1.0)]);
        assert_eq!(result, Err(TraceError::NonFiniteTime(1)));
    }

    #[test]
    fn window_excludes_left_edge() {
        let trace = Trace::new("td", (0..10).map(|i| (i as Real, i as Real))).unwrap();
        // samples at t = 3, 4, 5
        assert_approx_eq!(trace.window_mean(2.0, 5.0).unwrap(), 4.0);
        assert_eq!(trace.window_mean(2.2, 2.8), None);
    }

    #[test]
    fn tail_of_short_trace() {
        let trace = Trace::new("td", [(0.0, 2.0), (1.0, 4.0)]).unwrap();
        assert_approx_eq!(trace.tail_mean(100).unwrap(), 3.0);
        assert_approx_eq!(trace.tail_mean(1).unwrap(), 4.0);
    }
}
