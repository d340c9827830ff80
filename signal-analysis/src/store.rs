use crate::{
    Diagnostic,
    background::Background,
    datatype::Trace,
    formats::{FormatResult, timedrive},
    segmentation::{Extraction, extract_signals},
    settings::ParseSettings,
    signal::Signal,
};
use std::{collections::BTreeMap, path::Path};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("No time drive named '{0}' is loaded")]
    UnknownTrace(String),
}

#[derive(Debug, Clone)]
struct Entry {
    trace: Trace,
    settings: ParseSettings,
    /// Cleared whenever `settings` changes.
    extraction: Option<Extraction>,
}

/// Loaded time drives, each with its own parse settings and extracted signals.
#[derive(Debug, Clone, Default)]
pub struct TraceStore {
    default_settings: ParseSettings,
    entries: BTreeMap<String, Entry>,
}

impl TraceStore {
    pub fn new(default_settings: ParseSettings) -> Self {
        Self {
            default_settings,
            entries: BTreeMap::new(),
        }
    }

    pub fn default_settings(&self) -> &ParseSettings {
        &self.default_settings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Adds `trace` with the default settings, replacing any trace of the same name.
    pub fn insert(&mut self, trace: Trace) -> Option<Trace> {
        let entry = Entry {
            settings: self.default_settings.clone(),
            trace,
            extraction: None,
        };
        self.entries
            .insert(entry.trace.name().to_owned(), entry)
            .map(|previous| previous.trace)
    }

    /// Reads a time drive file and adds it under its file name, which is returned.
    pub fn load(&mut self, path: &Path) -> FormatResult<String> {
        let trace = timedrive::load_time_drive(path)?;
        let name = trace.name().to_owned();
        self.insert(trace);
        Ok(name)
    }

    pub fn remove(&mut self, name: &str) -> Result<Trace, StoreError> {
        self.entries
            .remove(name)
            .map(|entry| entry.trace)
            .ok_or_else(|| StoreError::UnknownTrace(name.to_owned()))
    }

    fn entry(&self, name: &str) -> Result<&Entry, StoreError> {
        self.entries
            .get(name)
            .ok_or_else(|| StoreError::UnknownTrace(name.to_owned()))
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut Entry, StoreError> {
        self.entries
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownTrace(name.to_owned()))
    }

    pub fn trace(&self, name: &str) -> Result<&Trace, StoreError> {
        self.entry(name).map(|entry| &entry.trace)
    }

    pub fn settings(&self, name: &str) -> Result<&ParseSettings, StoreError> {
        self.entry(name).map(|entry| &entry.settings)
    }

    pub fn set_settings(&mut self, name: &str, settings: ParseSettings) -> Result<(), StoreError> {
        let entry = self.entry_mut(name)?;
        if entry.settings != settings {
            entry.settings = settings;
            entry.extraction = None;
        }
        Ok(())
    }

    /// Makes `settings` the default and applies it to every loaded trace.
    pub fn apply_all(&mut self, settings: ParseSettings) {
        for entry in self.entries.values_mut() {
            if entry.settings != settings {
                entry.settings = settings.clone();
                entry.extraction = None;
            }
        }
        self.default_settings = settings;
    }

    /// Extracts the signals of the named trace with its current settings.
    ///
    /// The result is kept until the settings change, later calls return it without
    /// extracting again. The diagnostics raised are returned.
    #[instrument(skip(self))]
    pub fn update_signals(&mut self, name: &str) -> Result<&[Diagnostic], StoreError> {
        let entry = self.entry_mut(name)?;
        if entry.extraction.is_some() {
            debug!("Signals already current");
        } else {
            let extraction = extract_signals(&entry.trace, &entry.settings);
            info!(
                signals = extraction.signals.len(),
                diagnostics = extraction.diagnostics.len(),
                "Trace updated"
            );
            entry.extraction = Some(extraction);
        }
        Ok(entry
            .extraction
            .as_ref()
            .map(|extraction| extraction.diagnostics.as_slice())
            .unwrap_or_default())
    }

    /// Runs [Self::update_signals] on every trace, returning all diagnostics.
    pub fn update_all(&mut self) -> Vec<Diagnostic> {
        let names: Vec<String> = self.entries.keys().cloned().collect();
        names
            .iter()
            .filter_map(|name| self.update_signals(name).ok().map(<[_]>::to_vec))
            .flatten()
            .collect()
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|entry| entry.extraction.is_some())
    }

    /// Background of the last extraction, `None` if there is none or no onsets were found.
    pub fn background(&self, name: &str) -> Option<&Background> {
        self.entries
            .get(name)?
            .extraction
            .as_ref()?
            .background
            .as_ref()
    }

    /// Signals of the last extraction, `None` if the trace has not been updated since loading
    /// or since its settings changed.
    pub fn signals(&self, name: &str) -> Option<&[Signal]> {
        self.entries
            .get(name)?
            .extraction
            .as_ref()
            .map(|extraction| extraction.signals.as_slice())
    }

    /// Signals of every current trace, in name order.
    pub fn all_signals(&self) -> impl Iterator<Item = &Signal> {
        self.entries
            .values()
            .filter_map(|entry| entry.extraction.as_ref())
            .flat_map(|extraction| extraction.signals.iter())
    }
}
