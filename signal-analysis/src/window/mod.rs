pub(crate) mod local_average;

pub(crate) use local_average::LocalAverage;

/// A sliding window over a stream of values.
pub(crate) trait Window: Clone {
    type InputType: Copy;
    type OutputType;

    /// Pushes a value into the window, returning `true` once the window can produce an output.
    fn push(&mut self, value: Self::InputType) -> bool;
    fn output(&self) -> Option<Self::OutputType>;
    /// Empties the window, it must be refilled before producing output again.
    fn reset(&mut self);
}
