use crate::{
    datatype::Trace,
    window::{LocalAverage, Window},
};
use lumparser_common::{Intensity, Real, SampleIndex};
use tracing::{debug, instrument};

/// Number of recent values the local average is taken over.
pub const LOCAL_WINDOW: usize = 10;
/// Number of values a rise must stay above the local average for, and the
/// minimum distance between two onsets.
pub const ONSET_SEPARATION: usize = 100;

/// Finds the indices at which a flash begins.
///
/// An onset is a value exceeding the average of the most recent values by more than
/// `threshold`, which does not fall back below that average within the following
/// [ONSET_SEPARATION] samples.
#[derive(Default, Debug, Clone)]
pub struct OnsetDetector {
    pub starting_point: SampleIndex,
    pub threshold: Real,
}

impl OnsetDetector {
    pub fn new(starting_point: SampleIndex, threshold: Real) -> Self {
        Self {
            starting_point,
            threshold,
        }
    }

    fn is_sustained(values: &[Intensity], index: SampleIndex, average: Intensity) -> bool {
        let end = (index + ONSET_SEPARATION).min(values.len());
        values
            .get(index..end)
            .is_none_or(|ahead| ahead.iter().all(|&value| value >= average))
    }

    #[instrument(skip_all, fields(trace = trace.name()))]
    pub fn detect(&self, trace: &Trace) -> Vec<SampleIndex> {
        let values: Vec<Intensity> = trace.values().collect();
        let mut window = LocalAverage::new(LOCAL_WINDOW);
        let mut onsets = Vec::new();

        let mut index = 0;
        while let Some(&value) = values.get(index) {
            if window.push(value) {
                if let Some(average) = window.output() {
                    if index > self.starting_point
                        && value > average + self.threshold
                        && Self::is_sustained(&values, index, average)
                    {
                        debug!(index, average, "Onset found");
                        onsets.push(index);
                        window.reset();
                        index += ONSET_SEPARATION;
                        continue;
                    }
                }
            }
            index += 1;
        }
        onsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn make_trace(values: &[Real]) -> Trace {
        Trace::new(
            "test",
            values.iter().enumerate().map(|(i, &v)| (i as Real * 0.1, v)),
        )
        .unwrap()
    }

    fn steps(levels: &[(usize, Real)]) -> Vec<Real> {
        levels
            .iter()
            .flat_map(|&(length, value)| std::iter::repeat_n(value, length))
            .collect()
    }

    #[test]
    fn zero_data() {
        let trace = make_trace(&[]);
        assert!(OnsetDetector::new(0, 0.3).detect(&trace).is_empty());
    }

    #[test]
    fn flat_trace() {
        let trace = make_trace(&[1.0; 500]);
        assert!(OnsetDetector::new(0, 0.3).detect(&trace).is_empty());
    }

    #[test]
    fn single_step() {
        let trace = make_trace(&steps(&[(200, 1.0), (150, 5.0), (250, 1.0)]));
        assert_eq!(OnsetDetector::new(0, 0.3).detect(&trace), vec![200]);
    }

    #[test]
    fn two_flashes() {
        let trace = make_trace(&steps(&[(200, 1.0), (150, 5.0), (50, 1.0), (200, 9.0)]));
        let onsets = OnsetDetector::new(0, 0.3).detect(&trace);
        assert_eq!(onsets, vec![200, 400]);
    }

    #[test]
    fn starting_point_skips_early_flash() {
        let trace = make_trace(&steps(&[(200, 1.0), (150, 5.0), (50, 1.0), (200, 9.0)]));
        let onsets = OnsetDetector::new(250, 0.3).detect(&trace);
        assert_eq!(onsets, vec![400]);
    }

    #[test]
    fn short_spike_rejected() {
        let trace = make_trace(&steps(&[(100, 1.0), (1, 5.0), (300, 1.0)]));
        assert!(OnsetDetector::new(0, 0.3).detect(&trace).is_empty());
    }

    #[test]
    fn rise_below_threshold() {
        let trace = make_trace(&steps(&[(100, 1.0), (300, 1.2)]));
        assert!(OnsetDetector::new(0, 0.3).detect(&trace).is_empty());
    }

    #[test]
    fn rise_near_end_accepted() {
        let trace = make_trace(&steps(&[(200, 1.0), (5, 5.0)]));
        assert_eq!(OnsetDetector::new(0, 0.3).detect(&trace), vec![200]);
    }

    #[test]
    fn noisy_trace_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(42);
        let values: Vec<Real> = (0..1000)
            .map(|i| {
                let level = if (300..700).contains(&i) { 10.0 } else { 1.0 };
                level + rng.random_range(0.0..0.1)
            })
            .collect();
        let trace = make_trace(&values);
        let detector = OnsetDetector::new(0, 0.3);
        let onsets = detector.detect(&trace);
        assert_eq!(onsets, vec![300]);
        assert_eq!(onsets, detector.detect(&trace));
    }

    /// Baseline noise with flashes of random height and length at random times.
    fn random_trace(rng: &mut StdRng, length: usize) -> Vec<Real> {
        let mut values = Vec::with_capacity(length);
        while values.len() < length {
            let quiet: usize = rng.random_range(1..150);
            let flash: usize = rng.random_range(1..250);
            let height = rng.random_range(0.0..20.0);
            values.extend((0..quiet).map(|_| 1.0 + rng.random_range(0.0..0.5)));
            values.extend((0..flash).map(|i| {
                1.0 + height * (-0.02 * i as Real).exp() + rng.random_range(0.0..0.5)
            }));
        }
        values.truncate(length);
        values
    }

    #[test]
    fn onsets_separated_and_after_starting_point() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let values = random_trace(&mut rng, 2000);
            let trace = make_trace(&values);
            let starting_point = rng.random_range(0..1000);
            let threshold = rng.random_range(0.0..2.0);
            let onsets = OnsetDetector::new(starting_point, threshold).detect(&trace);

            assert!(onsets.iter().all(|&onset| onset >= starting_point));
            assert!(onsets.iter().all(|&onset| onset < values.len()));
            assert!(
                onsets
                    .windows(2)
                    .all(|pair| pair[1] - pair[0] >= ONSET_SEPARATION),
                "{onsets:?}"
            );
        }
    }
}
