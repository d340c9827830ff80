use super::{FormatError, FormatResult, format_general};
use crate::signal::{Datatype, Signal};
use csv::WriterBuilder;
use std::io::Write;
use tracing::debug;

/// Which forms of each signal are written to a CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSelection {
    pub normal: bool,
    pub integrated: bool,
    pub fit: bool,
}

impl Default for ExportSelection {
    fn default() -> Self {
        Self {
            normal: true,
            integrated: false,
            fit: false,
        }
    }
}

impl ExportSelection {
    pub fn datatypes(&self) -> impl Iterator<Item = Datatype> {
        [
            (self.normal, Datatype::Normal),
            (self.integrated, Datatype::Integrated),
            (self.fit, Datatype::Fit),
        ]
        .into_iter()
        .filter_map(|(selected, datatype)| selected.then_some(datatype))
    }
}

/// Selects exactly the given datatypes.
impl FromIterator<Datatype> for ExportSelection {
    fn from_iter<T: IntoIterator<Item = Datatype>>(iter: T) -> Self {
        iter.into_iter().fold(
            Self {
                normal: false,
                integrated: false,
                fit: false,
            },
            |selection, datatype| match datatype {
                Datatype::Normal => Self {
                    normal: true,
                    ..selection
                },
                Datatype::Integrated => Self {
                    integrated: true,
                    ..selection
                },
                Datatype::Fit => Self {
                    fit: true,
                    ..selection
                },
            },
        )
    }
}

/// The four header rows above the two columns of one signal.
fn header(signal: &Signal, datatype: Datatype) -> [[String; 4]; 2] {
    let (info_label, info_value, title) = match datatype {
        Datatype::Normal => (
            "Peak height [RLU]:",
            format_general(signal.peak_height()),
            "Light signal[RLU]",
        ),
        Datatype::Integrated => (
            "Total integral [RLU*s]:",
            format_general(signal.total_integral()),
            "Integrated light signal[RLU]",
        ),
        Datatype::Fit => ("", String::new(), "Fit of integrated light signal[RLU]"),
    };
    [
        [
            signal.name().to_owned(),
            "Start at [s]:".to_owned(),
            info_label.to_owned(),
            "Time[s]".to_owned(),
        ],
        [
            String::new(),
            format_general(signal.start()),
            info_value,
            title.to_owned(),
        ],
    ]
}

/// Writes the selected data of each signal as side by side pairs of columns.
///
/// Shorter columns are padded with empty cells. Signals without a fit are left
/// out of the fit columns.
pub fn signals_to_csv<'a, W: Write>(
    signals: impl IntoIterator<Item = &'a Signal>,
    selection: ExportSelection,
    writer: W,
) -> FormatResult<()> {
    if selection.datatypes().next().is_none() {
        return Err(FormatError::NothingSelected);
    }
    let mut columns: Vec<Vec<String>> = Vec::new();
    for signal in signals {
        for datatype in selection.datatypes() {
            let Some(data) = signal.data(datatype) else {
                debug!(signal = signal.name(), %datatype, "No data to export");
                continue;
            };
            let [time_header, value_header] = header(signal, datatype);
            let times = data.iter().map(|s| s.time.to_string());
            let values = data.iter().map(|s| s.value.to_string());
            columns.push(time_header.into_iter().chain(times).collect());
            columns.push(value_header.into_iter().chain(values).collect());
        }
    }

    let rows = columns.iter().map(Vec::len).max().unwrap_or_default();
    let mut writer = WriterBuilder::new().from_writer(writer);
    for row in 0..rows {
        writer.write_record(
            columns
                .iter()
                .map(|column| column.get(row).map(String::as_str).unwrap_or_default()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one row per fitted signal with its parameter estimates and p-value.
///
/// The column titles are the parameter names of the first fitted signal.
pub fn parameters_to_csv<'a, W: Write>(
    signals: impl IntoIterator<Item = &'a Signal>,
    writer: W,
) -> FormatResult<()> {
    let fitted: Vec<_> = signals
        .into_iter()
        .filter_map(|signal| Some((signal, signal.fit()?)))
        .collect();

    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);
    let titles = fitted
        .first()
        .map(|(_, fit)| fit.named_values().map(|(name, _)| name.to_owned()).collect())
        .unwrap_or_else(Vec::new);
    writer.write_record(["name".to_owned(), "filename".to_owned()].into_iter().chain(titles))?;
    for (signal, fit) in fitted {
        let values = fit.named_values().map(|(_, value)| value.to_string());
        writer.write_record(
            [signal.name().to_owned(), signal.filename().to_owned()]
                .into_iter()
                .chain(values),
        )?;
    }
    writer.flush()?;
    Ok(())
}
