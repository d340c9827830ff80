use anyhow::{Context, bail};
use clap::Parser;
use lumparser_common::{Real, SampleIndex};
use serde::Deserialize;
use signal_analysis::{
    BackgroundBounds, BuiltinModel, Datatype, ExportSelection, FitRequest, ParseSettings,
    expression::CUSTOM_MODEL_NAME,
};
use std::{collections::HashMap, fs::File, io::BufReader, path::PathBuf, str::FromStr};

/// Contents of a settings file, e.g.
/// ```json
/// {
///     "defaults": { "threshold": 0.5, "background": "peak_short" },
///     "files": { "flash.td": { "starting-point": 400, "background": "0,20" } }
/// }
/// ```
/// Fields missing from an entry take their usual default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SettingsFile {
    pub(crate) defaults: ParseSettings,
    pub(crate) files: HashMap<String, ParseSettings>,
}

impl SettingsFile {
    pub(crate) fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Cannot open settings file {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Cannot read settings file {}", path.display()))
    }
}

#[derive(Debug, Clone, Default, Parser)]
pub(crate) struct ExtractionParameters {
    /// Onsets are only accepted after this sample index
    #[clap(long)]
    pub(crate) starting_point: Option<SampleIndex>,

    /// Minimum rise above the local average for an onset, in RLU
    #[clap(long)]
    pub(crate) threshold: Option<Real>,

    /// Background window as 'left,right' in seconds, or one of start_short, start_long,
    /// peak_short and peak_long
    #[clap(long)]
    pub(crate) background: Option<BackgroundBounds>,

    /// JSON file of default settings and per file overrides. Per file entries take
    /// precedence over the command line, which takes precedence over the defaults block
    #[clap(long)]
    pub(crate) settings_file: Option<PathBuf>,
}

impl ExtractionParameters {
    /// Overrides the fields of `settings` given on the command line.
    pub(crate) fn apply(&self, settings: ParseSettings) -> ParseSettings {
        ParseSettings {
            starting_point: self.starting_point.unwrap_or(settings.starting_point),
            threshold: self.threshold.unwrap_or(settings.threshold),
            background: self.background.unwrap_or(settings.background),
        }
    }

    pub(crate) fn settings_file(&self) -> anyhow::Result<SettingsFile> {
        self.settings_file
            .as_deref()
            .map(SettingsFile::load)
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct ParseParameters {
    /// A time drive file, or a directory whose time drive files are all parsed
    pub(crate) input: PathBuf,

    /// Directory the signal group is saved to, defaults to that of the input
    #[clap(long)]
    pub(crate) output_dir: Option<PathBuf>,

    /// Filename of the signal group, defaults to the name of the input
    #[clap(long)]
    pub(crate) group_name: Option<String>,

    /// Notes saved with the signal group
    #[clap(long, default_value = "")]
    pub(crate) notes: String,

    #[clap(flatten)]
    pub(crate) extraction: ExtractionParameters,

    /// Also export the signals to this CSV file
    #[clap(long)]
    pub(crate) csv: Option<PathBuf>,

    /// Comma separated forms of the signals exported: normal, integrated or fit
    #[clap(long, value_delimiter = ',', default_value = "normal")]
    pub(crate) csv_data: Vec<Datatype>,
}

impl ParseParameters {
    pub(crate) fn export_selection(&self) -> ExportSelection {
        self.csv_data.iter().copied().collect()
    }
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct FitParameters {
    /// A saved signal group
    pub(crate) group: PathBuf,

    /// Name of a catalog model, or 'Other' for a formula given by --formula
    #[clap(long, default_value = "Exponential")]
    pub(crate) model: String,

    /// Formula in x of a custom model
    #[clap(long)]
    pub(crate) formula: Option<String>,

    /// Comma separated parameter names of a custom model
    #[clap(long)]
    pub(crate) parameters: Option<String>,

    /// Comma separated initial estimates, in which P stands for the peak height and
    /// I for the total integral. Defaults to those of the catalog model
    #[clap(long)]
    pub(crate) initial: Option<String>,

    /// Directory the fitted group is saved to, defaults to that of the input
    #[clap(long)]
    pub(crate) output_dir: Option<PathBuf>,

    /// Also export the fitted parameters to this CSV file
    #[clap(long)]
    pub(crate) parameters_csv: Option<PathBuf>,

    /// Maximum number of optimizer iterations per parameter
    #[clap(long, default_value = "200")]
    pub(crate) patience: usize,
}

impl FitParameters {
    pub(crate) fn request(&self) -> anyhow::Result<FitRequest> {
        if self.model == CUSTOM_MODEL_NAME {
            let (Some(formula), Some(parameters)) = (&self.formula, &self.parameters) else {
                bail!("A custom model needs both --formula and --parameters");
            };
            let Some(initial) = &self.initial else {
                bail!("A custom model needs initial estimates from --initial");
            };
            Ok(FitRequest::custom(formula, parameters, initial))
        } else {
            let model = BuiltinModel::from_str(&self.model).with_context(|| {
                format!("'{}' is not a catalog model, see the models command", self.model)
            })?;
            let request = FitRequest::builtin(model);
            Ok(match &self.initial {
                Some(initial) => request.with_initial(initial),
                None => request,
            })
        }
    }
}
