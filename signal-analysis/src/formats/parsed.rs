//! The saved signal group format.
//!
//! ```text
//! <group filename>
//! NOTES <number of note lines>
//! <notes>
//! SIGNAL
//! name=<name>
//! filename=<source time drive>
//! start=<onset time>
//! ...
//! DATA
//! <time>,<value>
//! END
//! ```
//! with one `SIGNAL` to `END` block per signal. A bare `NOTES` line, without
//! a count, takes every line up to the first `SIGNAL` as notes.
use super::{FormatError, FormatResult};
use crate::{
    datatype::Sample,
    fitting::{FitError, FitRequest, FitResult},
    group::SignalGroup,
    signal::Signal,
};
use lumparser_common::Real;
use std::{
    collections::HashMap,
    io::{BufRead, Write},
    str::FromStr,
};
use tracing::debug;

const NOTES: &str = "NOTES";
const SIGNAL: &str = "SIGNAL";
const DATA: &str = "DATA";
const END: &str = "END";

const NAME: &str = "name";
const FILENAME: &str = "filename";
const START: &str = "start";
const PEAK_TIME: &str = "peak_time";
const PEAK_HEIGHT: &str = "peak_height";
const TOTAL_INTEGRAL: &str = "total_integral";
const FIT_MODEL: &str = "fit_model";
const FIT_FORMULA: &str = "fit_formula";
const FIT_PARAMETERS: &str = "fit_parameters";
const FIT_ESTIMATES: &str = "fit_estimates";
const FIT_STD_ERRORS: &str = "fit_std_errors";
const FIT_P: &str = "fit_p";

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn write_signal<W: Write>(writer: &mut W, signal: &Signal) -> std::io::Result<()> {
    writeln!(writer, "{SIGNAL}")?;
    writeln!(writer, "{NAME}={}", signal.name())?;
    writeln!(writer, "{FILENAME}={}", signal.filename())?;
    writeln!(writer, "{START}={}", signal.start())?;
    writeln!(writer, "{PEAK_TIME}={}", signal.peak_time())?;
    writeln!(writer, "{PEAK_HEIGHT}={}", signal.peak_height())?;
    writeln!(writer, "{TOTAL_INTEGRAL}={}", signal.total_integral())?;
    if let Some(fit) = signal.fit() {
        writeln!(writer, "{FIT_MODEL}={}", fit.model)?;
        writeln!(writer, "{FIT_FORMULA}={}", fit.formula)?;
        writeln!(writer, "{FIT_PARAMETERS}={}", fit.parameters.join(","))?;
        writeln!(writer, "{FIT_ESTIMATES}={}", join(&fit.estimates))?;
        writeln!(writer, "{FIT_STD_ERRORS}={}", join(&fit.std_errors))?;
        writeln!(writer, "{FIT_P}={}", fit.p_value)?;
    }
    writeln!(writer, "{DATA}")?;
    for sample in signal.samples() {
        writeln!(writer, "{sample}")?;
    }
    writeln!(writer, "{END}")
}

pub fn write_group<W: Write>(group: &SignalGroup, mut writer: W) -> FormatResult<()> {
    writeln!(writer, "{}", group.filename())?;
    let notes: Vec<&str> = match group.notes() {
        "" => Vec::new(),
        notes => notes.split('\n').collect(),
    };
    writeln!(writer, "{NOTES} {}", notes.len())?;
    for line in notes {
        writeln!(writer, "{line}")?;
    }
    for signal in group.iter() {
        write_signal(&mut writer, signal)?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_number(key: &'static str, value: &str, line: usize) -> FormatResult<Real> {
    Real::from_str(value.trim()).map_err(|_| FormatError::InvalidValue {
        line,
        key,
        value: value.to_owned(),
    })
}

/// The `key=value` lines and samples of one signal block.
#[derive(Default)]
struct SignalBlock {
    first_line: usize,
    info: HashMap<String, String>,
    samples: Vec<Sample>,
}

impl SignalBlock {
    fn text(&self, key: &'static str, line: usize) -> FormatResult<&str> {
        self.info
            .get(key)
            .map(String::as_str)
            .ok_or(FormatError::MissingKey { line, key })
    }

    fn number(&self, key: &'static str, line: usize) -> FormatResult<Option<Real>> {
        self.info
            .get(key)
            .map(|value| parse_number(key, value, line))
            .transpose()
    }

    fn numbers(&self, key: &'static str, line: usize) -> FormatResult<Vec<Real>> {
        match self.info.get(key).map(|v| v.trim()) {
            None | Some("") => Ok(Vec::new()),
            Some(values) => values
                .split(',')
                .map(|value| parse_number(key, value, line))
                .collect(),
        }
    }

    fn restore_fit(&self, signal: &Signal, line: usize) -> FormatResult<Option<FitResult>> {
        let Some(model) = self.info.get(FIT_MODEL) else {
            return Ok(None);
        };
        let parameters: Vec<String> = self
            .text(FIT_PARAMETERS, line)?
            .split(',')
            .map(|p| p.trim().to_owned())
            .collect();
        let estimates = self.numbers(FIT_ESTIMATES, line)?;
        if estimates.len() != parameters.len() {
            return Err(FitError::ParameterCount {
                expected: parameters.len(),
                found: estimates.len(),
            }
            .into());
        }
        let request = FitRequest {
            model: model.clone(),
            initial: String::new(),
            formula: self.info.get(FIT_FORMULA).cloned().unwrap_or_default(),
            parameters: parameters.join(","),
        };
        let function = request.resolve_model()?;
        Ok(Some(FitResult {
            model: model.clone(),
            formula: function.formula().to_owned(),
            curve: function.curve(signal.integrated_samples(), &estimates),
            parameters,
            estimates,
            std_errors: self.numbers(FIT_STD_ERRORS, line)?,
            covariance: None,
            p_value: self.number(FIT_P, line)?.unwrap_or(Real::NAN),
        }))
    }

    fn into_signal(mut self, line: usize) -> FormatResult<Signal> {
        let name = self.text(NAME, line)?.to_owned();
        let filename = self.text(FILENAME, line)?.to_owned();
        let start = self.number(START, line)?.unwrap_or_default();
        let mut signal =
            Signal::with_start(name, filename, start, std::mem::take(&mut self.samples));
        if let Some(fit) = self.restore_fit(&signal, line)? {
            signal.set_fit(fit);
        }
        Ok(signal)
    }
}

enum Section {
    Header,
    /// Notes with the number of lines still to come, if the header gave one.
    Notes(Option<usize>),
    /// After the end of a signal block.
    Between,
    Info(SignalBlock),
    Data(SignalBlock),
}

pub fn read_group<R: BufRead>(reader: R) -> FormatResult<SignalGroup> {
    let mut lines = reader.lines();
    let filename = lines.next().ok_or(FormatError::MissingFilename)??;
    let mut notes = Vec::<String>::new();
    let mut signals = Vec::new();
    let mut section = Section::Header;

    for (index, line) in lines.enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        // the filename is line 1
        let number = index + 2;
        let unexpected = || FormatError::UnexpectedLine {
            line: number,
            text: line.to_owned(),
        };
        section = match section {
            Section::Notes(Some(remaining)) => {
                notes.push(line.to_owned());
                match remaining - 1 {
                    0 => Section::Between,
                    remaining => Section::Notes(Some(remaining)),
                }
            }
            Section::Header | Section::Notes(None) | Section::Between
                if line.starts_with(SIGNAL) =>
            {
                Section::Info(SignalBlock {
                    first_line: number,
                    ..Default::default()
                })
            }
            Section::Header => match line.strip_prefix(NOTES).map(str::trim) {
                Some("") => Section::Notes(None),
                Some(count) => match count.parse::<usize>().map_err(|_| unexpected())? {
                    0 => Section::Between,
                    count => Section::Notes(Some(count)),
                },
                None => return Err(unexpected()),
            },
            Section::Notes(None) => {
                notes.push(line.to_owned());
                Section::Notes(None)
            }
            Section::Between if line.trim().is_empty() => Section::Between,
            Section::Between => return Err(unexpected()),
            Section::Info(block) if line.starts_with(DATA) => Section::Data(block),
            Section::Info(mut block) => {
                let (key, value) = line.split_once('=').ok_or_else(unexpected)?;
                block.info.insert(key.to_owned(), value.to_owned());
                Section::Info(block)
            }
            Section::Data(block) if line.starts_with(END) => {
                signals.push(block.into_signal(number)?);
                Section::Between
            }
            Section::Data(mut block) => {
                let sample = line
                    .split_once(',')
                    .and_then(|(t, v)| {
                        Some(Sample::new(
                            Real::from_str(t.trim()).ok()?,
                            Real::from_str(v.trim()).ok()?,
                        ))
                    })
                    .ok_or_else(|| FormatError::InvalidData {
                        line: number,
                        text: line.to_owned(),
                    })?;
                block.samples.push(sample);
                Section::Data(block)
            }
        };
    }
    match section {
        Section::Info(block) | Section::Data(block) => {
            return Err(FormatError::UnterminatedSignal {
                line: block.first_line,
            });
        }
        Section::Notes(Some(remaining)) => {
            return Err(FormatError::TruncatedNotes(notes.len() + remaining));
        }
        _ => {}
    }
    debug!(filename = %filename, signals = signals.len(), "Signal group read");
    let mut group = SignalGroup::new(&filename, &notes.join("\n"));
    group.add(signals)?;
    Ok(group)
}
