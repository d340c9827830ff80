use super::Window;
use lumparser_common::{Intensity, Real};
use std::collections::VecDeque;

/// Mean of the most recent `size` values, including the one just pushed.
///
/// The window only reports itself ready once more than `size` values have been pushed
/// since the last reset, so that the newest value always has `size` predecessors.
#[derive(Default, Clone)]
pub(crate) struct LocalAverage {
    size: usize,
    pushed: usize,
    values: VecDeque<Intensity>,
}

impl LocalAverage {
    pub(crate) fn new(size: usize) -> Self {
        LocalAverage {
            size,
            values: VecDeque::with_capacity(size + 1),
            ..Default::default()
        }
    }

    fn is_ready(&self) -> bool {
        self.pushed > self.size
    }
}

impl Window for LocalAverage {
    type InputType = Intensity;
    type OutputType = Intensity;

    fn push(&mut self, value: Intensity) -> bool {
        self.values.push_back(value);
        if self.values.len() > self.size {
            self.values.pop_front();
        }
        self.pushed += 1;
        self.is_ready()
    }

    fn output(&self) -> Option<Intensity> {
        (self.is_ready() && !self.values.is_empty())
            .then(|| self.values.iter().sum::<Real>() / self.values.len() as Real)
    }

    fn reset(&mut self) {
        self.values.clear();
        self.pushed = 0;
    }
}
