use crate::{
    Diagnostic,
    background::Background,
    datatype::{Sample, Trace},
    detectors::OnsetDetector,
    settings::ParseSettings,
    signal::Signal,
};
use lumparser_common::SampleIndex;
use tracing::{info, instrument, warn};

/// Cuts `trace` at each onset into background corrected signals.
///
/// Each signal runs up to the next onset, the last one to the end of the trace.
pub fn segment(trace: &Trace, onsets: &[SampleIndex], background: &Background) -> Vec<Signal> {
    let ends = onsets
        .iter()
        .skip(1)
        .copied()
        .chain(std::iter::once(trace.len()));
    onsets
        .iter()
        .zip(ends)
        .enumerate()
        .filter_map(|(k, (&begin, end))| {
            let samples = trace
                .samples()
                .get(begin..end)?
                .iter()
                .map(|s| Sample::new(s.time, s.value - background.value))
                .collect();
            Some(Signal::new(
                format!("{} {}", trace.name(), k + 1),
                trace.name(),
                samples,
            ))
        })
        .collect()
}

/// The outcome of running the whole extraction on one trace.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Absent when no onsets were found.
    pub background: Option<Background>,
    pub signals: Vec<Signal>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Detects onsets, estimates the background and segments `trace` into signals.
#[instrument(skip_all, fields(trace = trace.name()))]
pub fn extract_signals(trace: &Trace, settings: &ParseSettings) -> Extraction {
    let onsets = OnsetDetector::new(settings.starting_point, settings.threshold).detect(trace);
    let Some(first_onset) = onsets.first().and_then(|&index| trace.time_at(index)) else {
        let diagnostic = Diagnostic::NoSignalsFound {
            trace: trace.name().to_owned(),
        };
        warn!("{diagnostic}");
        return Extraction {
            diagnostics: vec![diagnostic],
            ..Default::default()
        };
    };

    let mut diagnostics = Vec::new();
    let background = Background::estimate(trace, first_onset, &settings.background)
        .unwrap_or_else(|e| {
            let diagnostic = Diagnostic::BackgroundUnavailable {
                trace: trace.name().to_owned(),
                reason: e.to_string(),
            };
            warn!("{diagnostic}");
            diagnostics.push(diagnostic);
            Background::unavailable()
        });

    let signals = segment(trace, &onsets, &background);
    info!(
        signals = signals.len(),
        background = background.value,
        "Signals extracted"
    );
    Extraction {
        background: Some(background),
        signals,
        diagnostics,
    }
}
