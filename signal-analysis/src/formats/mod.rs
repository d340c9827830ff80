//! Text formats read and written by the library.
pub mod csv_export;
pub mod parsed;
pub mod timedrive;

use crate::{datatype::TraceError, fitting::FitError, group::GroupError};
use lumparser_common::Real;
use thiserror::Error;

pub type FormatResult<T> = Result<T, FormatError>;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Trace Error: {0}")]
    Trace(#[from] TraceError),
    #[error("Saved fit could not be restored: {0}")]
    Fit(#[from] FitError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("Signal group file is empty")]
    MissingFilename,
    #[error("Line {line}: unexpected '{text}'")]
    UnexpectedLine { line: usize, text: String },
    #[error("Line {line}: '{text}' is not a pair of numbers")]
    InvalidData { line: usize, text: String },
    #[error("Signal ending at line {line} has '{key}={value}' which is not a number")]
    InvalidValue {
        line: usize,
        key: &'static str,
        value: String,
    },
    #[error("Signal group file ends before its {0} note lines")]
    TruncatedNotes(usize),
    #[error("Signal ending at line {line} has no '{key}'")]
    MissingKey { line: usize, key: &'static str },
    #[error("Signal starting at line {line} has no END")]
    UnterminatedSignal { line: usize },
    #[error("Nothing selected to export")]
    NothingSelected,
}

/// Formats a number the way C's `%.6g` does.
pub fn format_general(value: Real) -> String {
    const PRECISION: i32 = 6;

    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }

    // The exponent after rounding to the precision decides the notation.
    let digits = (PRECISION - 1) as usize;
    let scientific = format!("{value:.digits$e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or_default();

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_owned()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_format() {
        assert_eq!(format_general(0.0), "0");
        assert_eq!(format_general(12.0), "12");
        assert_eq!(format_general(3.14159265), "3.14159");
        assert_eq!(format_general(-0.5), "-0.5");
        assert_eq!(format_general(123456.7), "123457");
        assert_eq!(format_general(1234567.0), "1.23457e+06");
        assert_eq!(format_general(0.0001), "0.0001");
        assert_eq!(format_general(0.00001234), "1.234e-05");
        assert_eq!(format_general(999999.5), "1e+06");
        assert_eq!(format_general(Real::NAN), "nan");
    }
}
