use crate::{
    fitting::{CurveFitEngine, FitError, FitRequest, FitResult},
    formats::{
        FormatResult,
        csv_export::{self, ExportSelection},
        parsed,
    },
    signal::Signal,
};
use lumparser_common::SIGNAL_GROUP_EXTENSION;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("No signal named '{0}'")]
    NotFound(String),
    #[error("A signal named '{0}' already exists")]
    DuplicateName(String),
    #[error("Index {index} out of range for {len} signals")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Signal '{signal}' could not be fitted: {source}")]
    Fit { signal: String, source: FitError },
}

pub type GroupResult<T> = Result<T, GroupError>;

/// An ordered collection of uniquely named signals, possibly from several time drives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalGroup {
    filename: String,
    notes: String,
    signals: Vec<Signal>,
}

impl SignalGroup {
    pub fn new(filename: &str, notes: &str) -> Self {
        Self {
            filename: filename.to_owned(),
            notes: notes.to_owned(),
            signals: Vec::new(),
        }
    }

    pub fn from_signals(
        signals: impl IntoIterator<Item = Signal>,
        filename: &str,
        notes: &str,
    ) -> GroupResult<Self> {
        let mut group = Self::new(filename, notes);
        group.add(signals)?;
        Ok(group)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Sets the filename, appending the signal group extension if it is missing.
    pub fn set_filename(&mut self, filename: &str) {
        let extension = format!(".{SIGNAL_GROUP_EXTENSION}");
        self.filename = if filename.ends_with(&extension) {
            filename.to_owned()
        } else {
            format!("{filename}{extension}")
        };
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.notes = notes.to_owned();
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(Signal::name)
    }

    fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    /// Appends signals in order. Nothing is added if any name is already taken.
    pub fn add(&mut self, signals: impl IntoIterator<Item = Signal>) -> GroupResult<()> {
        let signals: Vec<Signal> = signals.into_iter().collect();
        for (index, signal) in signals.iter().enumerate() {
            let repeated = signals
                .get(..index)
                .is_some_and(|prior| prior.iter().any(|s| s.name() == signal.name()));
            if repeated || self.contains(signal.name()) {
                return Err(GroupError::DuplicateName(signal.name().to_owned()));
            }
        }
        self.signals.extend(signals);
        Ok(())
    }

    pub fn index_of(&self, name: &str) -> GroupResult<usize> {
        self.names()
            .position(|n| n == name)
            .ok_or_else(|| GroupError::NotFound(name.to_owned()))
    }

    fn check_index(&self, index: usize) -> GroupResult<usize> {
        if index < self.signals.len() {
            Ok(index)
        } else {
            Err(GroupError::IndexOutOfRange {
                index,
                len: self.signals.len(),
            })
        }
    }

    pub fn get(&self, name: &str) -> GroupResult<&Signal> {
        self.index_of(name).and_then(|index| self.get_at(index))
    }

    pub fn get_at(&self, index: usize) -> GroupResult<&Signal> {
        self.signals.get(index).ok_or(GroupError::IndexOutOfRange {
            index,
            len: self.signals.len(),
        })
    }

    pub fn rename(&mut self, old_name: &str, new_name: &str) -> GroupResult<()> {
        let index = self.index_of(old_name)?;
        if old_name != new_name && self.contains(new_name) {
            return Err(GroupError::DuplicateName(new_name.to_owned()));
        }
        if let Some(signal) = self.signals.get_mut(index) {
            signal.set_name(new_name);
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> GroupResult<Signal> {
        let index = self.index_of(name)?;
        Ok(self.signals.remove(index))
    }

    pub fn remove_at(&mut self, index: usize) -> GroupResult<Signal> {
        let index = self.check_index(index)?;
        Ok(self.signals.remove(index))
    }

    /// Moves each signal, in the order given, one place towards the front.
    /// A signal already at the front stays there.
    pub fn move_up(&mut self, names: &[&str]) -> GroupResult<()> {
        for name in names {
            let index = self.index_of(name)?;
            self.move_up_at(&[index])?;
        }
        Ok(())
    }

    /// Moves each signal, in the order given, one place towards the back.
    /// A signal already at the back stays there.
    pub fn move_down(&mut self, names: &[&str]) -> GroupResult<()> {
        for name in names {
            let index = self.index_of(name)?;
            self.move_down_at(&[index])?;
        }
        Ok(())
    }

    pub fn move_up_at(&mut self, indices: &[usize]) -> GroupResult<()> {
        for &index in indices {
            let index = self.check_index(index)?;
            if index > 0 {
                self.signals.swap(index - 1, index);
            }
        }
        Ok(())
    }

    pub fn move_down_at(&mut self, indices: &[usize]) -> GroupResult<()> {
        for &index in indices {
            let index = self.check_index(index)?;
            if index + 1 < self.signals.len() {
                self.signals.swap(index, index + 1);
            }
        }
        Ok(())
    }

    /// Fits the named signal, storing the result with it.
    pub fn fit_signal(
        &mut self,
        name: &str,
        request: &FitRequest,
        engine: &CurveFitEngine,
    ) -> GroupResult<&FitResult> {
        let index = self.index_of(name)?;
        let len = self.signals.len();
        let signal = self
            .signals
            .get_mut(index)
            .ok_or(GroupError::IndexOutOfRange { index, len })?;
        engine
            .fit_signal(signal, request)
            .map_err(|source| GroupError::Fit {
                signal: name.to_owned(),
                source,
            })
    }

    /// Fits every signal, returning the failures. Failed signals keep any previous fit.
    #[instrument(skip_all, fields(group = %self.filename, model = %request.model))]
    pub fn fit_all(&mut self, request: &FitRequest, engine: &CurveFitEngine) -> Vec<GroupError> {
        let failures: Vec<_> = self
            .signals
            .iter_mut()
            .filter_map(|signal| {
                engine.fit_signal(signal, request).err().map(|source| {
                    let error = GroupError::Fit {
                        signal: signal.name().to_owned(),
                        source,
                    };
                    warn!("{error}");
                    error
                })
            })
            .collect();
        info!(
            fitted = self.signals.len() - failures.len(),
            failed = failures.len(),
            "Group fitted"
        );
        failures
    }

    pub fn write<W: Write>(&self, writer: W) -> FormatResult<()> {
        parsed::write_group(self, writer)
    }

    /// Saves the group into `directory` under its filename, returning the path written.
    #[instrument(skip_all, fields(group = %self.filename))]
    pub fn save(&self, directory: &Path) -> FormatResult<PathBuf> {
        let path = directory.join(&self.filename);
        self.write(BufWriter::new(File::create(&path)?))?;
        info!(path = %path.display(), signals = self.len(), "Signal group saved");
        Ok(path)
    }

    pub fn load(path: &Path) -> FormatResult<Self> {
        parsed::read_group(BufReader::new(File::open(path)?))
    }

    pub fn signals_to_csv<W: Write>(&self, selection: ExportSelection, writer: W) -> FormatResult<()> {
        csv_export::signals_to_csv(&self.signals, selection, writer)
    }

    pub fn parameters_to_csv<W: Write>(&self, writer: W) -> FormatResult<()> {
        csv_export::parameters_to_csv(&self.signals, writer)
    }
}
