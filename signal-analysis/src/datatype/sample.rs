use lumparser_common::{Intensity, Real, Time};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result};

/// An abstraction of the types that hold a single point of a time drive.
/// To implement TracePoint a type must contain a time and a value.
pub trait TracePoint {
    /// Returns the time of the data point.
    fn get_time(&self) -> Time;

    /// Returns the value of the data point.
    fn get_value(&self) -> Intensity;
}

/// One (time, value) measurement.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: Time,
    pub value: Intensity,
}

impl Sample {
    pub fn new(time: Time, value: Intensity) -> Self {
        Self { time, value }
    }
}

impl TracePoint for Sample {
    fn get_time(&self) -> Time {
        self.time
    }

    fn get_value(&self) -> Intensity {
        self.value
    }
}

/// The first element is the time and the second the value.
impl TracePoint for (Real, Real) {
    fn get_time(&self) -> Time {
        self.0
    }

    fn get_value(&self) -> Intensity {
        self.1
    }
}

impl From<(Real, Real)> for Sample {
    fn from((time, value): (Real, Real)) -> Self {
        Self { time, value }
    }
}

impl Display for Sample {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{0},{1}", self.time, self.value)
    }
}

/// Splits the points into a list of times and a list of values, in matching order.
pub fn get_xy<P: TracePoint>(points: &[P]) -> (Vec<Time>, Vec<Intensity>) {
    points
        .iter()
        .map(|point| (point.get_time(), point.get_value()))
        .unzip()
}

/// Time and value of the point with the highest value.
///
/// The search starts from `(0, 0)` and ties resolve to the later point, so
/// data that never rises above zero reports `(0, 0)`.
pub fn get_highest<P: TracePoint>(points: &[P]) -> (Time, Intensity) {
    points
        .iter()
        .fold((0.0, 0.0), |(highest_time, highest_value), point| {
            if point.get_value() >= highest_value {
                (point.get_time(), point.get_value())
            } else {
                (highest_time, highest_value)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Vec<Sample> {
        vec![
            Sample::new(0.0, 1.0),
            Sample::new(0.1, 5.0),
            Sample::new(0.2, 4.0),
        ]
    }

    #[test]
    fn highest_point() {
        assert_eq!(get_highest(&points()), (0.1, 5.0));
    }

    #[test]
    fn split_into_columns() {
        assert_eq!(
            get_xy(&points()),
            (vec![0.0, 0.1, 0.2], vec![1.0, 5.0, 4.0])
        );
    }

    #[test]
    fn highest_of_tuples_prefers_later_tie() {
        let data = [(0.0, 2.0), (1.0, 3.0), (2.0, 3.0), (3.0, 1.0)];
        assert_eq!(get_highest(&data), (2.0, 3.0));
    }

    #[test]
    fn highest_of_negative_data() {
        let data = [(0.0, -2.0), (1.0, -1.0)];
        assert_eq!(get_highest(&data), (0.0, 0.0));
    }

    #[test]
    fn zero_data() {
        let data: [Sample; 0] = [];
        assert_eq!(get_xy(&data), (vec![], vec![]));
        assert_eq!(get_highest(&data), (0.0, 0.0));
    }
}
