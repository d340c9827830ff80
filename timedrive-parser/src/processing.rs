use crate::parameters::{FitParameters, ParseParameters};
use anyhow::{Context, bail};
use glob::MatchOptions;
use lumparser_common::TIME_DRIVE_EXTENSION;
use signal_analysis::{
    BuiltinModel, CurveFitEngine, SignalGroup, TraceStore, expression::CUSTOM_MODEL_NAME,
};
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// The time drive files named by `input`, either the file itself or every
/// time drive in the directory, matched case insensitively and sorted by path.
pub(crate) fn find_time_drives(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_owned()]);
    }
    let pattern = input.join(format!("*.{TIME_DRIVE_EXTENSION}"));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let paths = glob::glob_with(&pattern.to_string_lossy(), options)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(paths)
}

/// Directory the output of `input` goes to when none is given.
fn default_output_dir(input: &Path) -> PathBuf {
    if input.is_dir() {
        input.to_owned()
    } else {
        input.parent().map(Path::to_owned).unwrap_or_default()
    }
}

fn default_group_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "signals".to_owned())
}

#[instrument(skip_all, fields(input = %parameters.input.display()))]
pub(crate) fn parse(parameters: &ParseParameters) -> anyhow::Result<()> {
    let settings_file = parameters.extraction.settings_file()?;
    let mut store = TraceStore::new(parameters.extraction.apply(settings_file.defaults));

    let paths = find_time_drives(&parameters.input)?;
    if paths.is_empty() {
        bail!("No time drive files found in {}", parameters.input.display());
    }
    for path in &paths {
        let name = store
            .load(path)
            .with_context(|| format!("Cannot load time drive {}", path.display()))?;
        if let Some(settings) = settings_file.files.get(&name) {
            store.set_settings(&name, settings.clone())?;
        }
        // Diagnostics are logged as they are raised.
        store.update_signals(&name)?;
    }

    let mut group = SignalGroup::new("", &parameters.notes);
    group.set_filename(
        &parameters
            .group_name
            .clone()
            .unwrap_or_else(|| default_group_name(&parameters.input)),
    );
    group.add(store.all_signals().cloned())?;
    if group.is_empty() {
        warn!("No signals were extracted");
    }

    let output_dir = parameters
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&parameters.input));
    let path = group.save(&output_dir)?;
    info!(
        traces = store.len(),
        signals = group.len(),
        path = %path.display(),
        "Parsing complete"
    );

    if let Some(csv) = &parameters.csv {
        group.signals_to_csv(
            parameters.export_selection(),
            BufWriter::new(File::create(csv)?),
        )?;
        info!(path = %csv.display(), "Signals exported");
    }
    Ok(())
}

#[instrument(skip_all, fields(group = %parameters.group.display(), model = %parameters.model))]
pub(crate) fn fit(parameters: &FitParameters) -> anyhow::Result<()> {
    let request = parameters.request()?;
    let mut group = SignalGroup::load(&parameters.group)
        .with_context(|| format!("Cannot load signal group {}", parameters.group.display()))?;
    let engine = CurveFitEngine::new().with_patience(parameters.patience);

    let failures = group.fit_all(&request, &engine);

    let output_dir = parameters
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&parameters.group));
    let path = group.save(&output_dir)?;
    info!(path = %path.display(), "Fitted group saved");

    if let Some(csv) = &parameters.parameters_csv {
        group.parameters_to_csv(BufWriter::new(File::create(csv)?))?;
        info!(path = %csv.display(), "Parameters exported");
    }
    if !failures.is_empty() {
        warn!(
            failed = failures.len(),
            signals = group.len(),
            "Not every signal could be fitted"
        );
    }
    Ok(())
}

pub(crate) fn list_models() {
    for model in BuiltinModel::catalog() {
        println!("{model}");
        println!("    formula: {}", model.formula());
        println!("    parameters: {}", model.parameters().join(", "));
        println!("    initial: {}", model.default_initializer());
    }
    println!("{CUSTOM_MODEL_NAME}");
    println!("    formula: given by --formula, with parameters named by --parameters");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn single_file_input() {
        let input = Path::new("drives/flash.td");
        assert_eq!(find_time_drives(input).unwrap(), vec![input.to_owned()]);
        assert_eq!(default_output_dir(input), PathBuf::from("drives"));
        assert_eq!(default_group_name(input), "flash");
    }

    #[test]
    fn directory_input() {
        let directory = env::temp_dir().join("timedrive-parser-directory-input");
        fs::create_dir_all(&directory).unwrap();
        for name in ["b.td", "A.TD", "notes.txt"] {
            fs::write(directory.join(name), "#DATA\n").unwrap();
        }
        let names: Vec<_> = find_time_drives(&directory)
            .unwrap()
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        fs::remove_dir_all(&directory).unwrap();
        assert_eq!(names, vec!["A.TD", "b.td"]);
    }
}
