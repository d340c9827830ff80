use super::FormatResult;
use crate::datatype::{Sample, Trace};
use lumparser_common::Real;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    str::FromStr,
};
use tracing::{debug, instrument};

/// Marks the line after which samples begin.
pub const DATA_MARKER: &str = "#DATA";

fn parse_sample(line: &str) -> Option<Sample> {
    let mut fields = line.split_whitespace();
    let time = Real::from_str(fields.next()?).ok()?;
    let value = Real::from_str(fields.next()?).ok()?;
    fields.next().is_none().then_some(Sample::new(time, value))
}

/// Reads a time drive, in which samples are whitespace separated `time value`
/// lines following a [DATA_MARKER] line. Lines which do not hold exactly two
/// numbers are skipped.
pub fn read_time_drive<R: BufRead>(name: &str, reader: R) -> FormatResult<Trace> {
    let mut recording = false;
    let mut skipped = 0usize;
    let mut samples = Vec::new();
    for line in reader.split(b'\n') {
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        if line.starts_with(DATA_MARKER) {
            recording = true;
        } else if recording {
            match parse_sample(&line) {
                Some(sample) => samples.push(sample),
                None => skipped += 1,
            }
        }
    }
    if skipped > 0 {
        debug!(name, skipped, "Skipped malformed lines");
    }
    Ok(Trace::new(name, samples)?)
}

/// Loads a time drive file, naming the trace after the file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_time_drive(path: &Path) -> FormatResult<Trace> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let reader = BufReader::new(File::open(path)?);
    let trace = read_time_drive(&name, reader)?;
    debug!(samples = trace.len(), "Time drive loaded");
    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{datatype::TraceError, formats::FormatError};

    const TIME_DRIVE: &str = "\
Instrument header
0.0 999
#DATA
0.1   2.001
0.2   2.030
not a number
0.3\t3.502

0.4 1.0 extra
0.5 -1e-1
";

    #[test]
    fn read_after_marker() {
        let trace = read_time_drive("a.td", TIME_DRIVE.as_bytes()).unwrap();
        assert_eq!(trace.name(), "a.td");
        assert_eq!(
            trace.samples(),
            &[
                Sample::new(0.1, 2.001),
                Sample::new(0.2, 2.030),
                Sample::new(0.3, 3.502),
                Sample::new(0.5, -0.1),
            ]
        );
    }

    #[test]
    fn no_marker_gives_empty_trace() {
        let trace = read_time_drive("b.td", "0.1 1\n0.2 2\n".as_bytes()).unwrap();
        assert!(trace.is_empty());
    }

    #[test]
    fn invalid_utf8_skipped() {
        let bytes: &[u8] = b"#DATA\n0.1 1\n\xff\xfe\n0.2 2\n";
        let trace = read_time_drive("c.td", bytes).unwrap();
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn decreasing_time_rejected() {
        let result = read_time_drive("d.td", "#DATA\n0.2 1\n0.1 1\n".as_bytes());
        assert!(matches!(
            result,
            Err(FormatError::Trace(TraceError::NonIncreasingTime { index: 1, .. }))
        ));
    }

    #[test]
    fn windows_line_endings() {
        let trace = read_time_drive("e.td", "#DATA\r\n0.1 1\r\n0.2 2\r\n".as_bytes()).unwrap();
        assert_eq!(trace.len(), 2);
    }
}
