//! Loading raw generator output.
//!
//! Two plain-text formats, both headerless:
//!
//! - **Samples**: floating-point draws separated by whitespace, canonically
//!   one per line.
//! - **PDF evaluations**: one `x,pdf,ln_pdf` row per line, `x` strictly
//!   increasing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One row of a PDF-evaluation file.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PdfRow {
    /// Evaluation point.
    pub x: f64,
    /// Density reported by the generator.
    pub pdf: f64,
    /// Log-density reported by the generator.
    pub ln_pdf: f64,
}

fn open(path: &Path) -> Result<BufReader<File>> {
    match File::open(path) {
        Ok(f) => Ok(BufReader::new(f)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::MissingInput {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Read every draw from a sample file.
///
/// # Errors
///
/// - [`Error::MissingInput`] if the file does not exist.
/// - [`Error::Malformed`] on the first token that is not a number (NaN
///   included).
/// - [`Error::EmptySamples`] if the file holds no values.
pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    parse_samples(open(path)?, path)
}

/// Parse sample draws from any buffered reader; `path` is only used in errors.
///
/// # Errors
///
/// Same as [`load_samples`], minus the missing-file case.
pub fn parse_samples(reader: impl BufRead, path: &Path) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(path, e))?;
        for token in line.split_whitespace() {
            let v: f64 = token.parse().map_err(|_| Error::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: format!("'{token}' is not a number"),
            })?;
            if v.is_nan() {
                return Err(Error::Malformed {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: "NaN draw".into(),
                });
            }
            values.push(v);
        }
    }
    if values.is_empty() {
        return Err(Error::EmptySamples {
            path: path.to_path_buf(),
        });
    }
    Ok(values)
}

/// Read every row from a PDF-evaluation file.
///
/// # Errors
///
/// - [`Error::MissingInput`] if the file does not exist.
/// - [`Error::Malformed`] if a row does not have exactly three numeric
///   columns or its evaluation point is not finite.
/// - [`Error::Unsorted`] if evaluation points are not strictly increasing.
/// - [`Error::EmptySamples`] if the file holds no rows.
pub fn load_pdf_evaluations(path: impl AsRef<Path>) -> Result<Vec<PdfRow>> {
    let path = path.as_ref();
    parse_pdf_evaluations(open(path)?, path)
}

/// Parse PDF-evaluation rows from any buffered reader.
///
/// # Errors
///
/// Same as [`load_pdf_evaluations`], minus the missing-file case.
pub fn parse_pdf_evaluations(reader: impl BufRead, path: &Path) -> Result<Vec<PdfRow>> {
    let malformed = |line: usize, reason: String| Error::Malformed {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut rows: Vec<PdfRow> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(path, e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lineno = idx + 1;

        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() != 3 {
            return Err(malformed(
                lineno,
                format!("expected 3 comma-separated columns, found {}", cells.len()),
            ));
        }
        let mut parsed = [0.0_f64; 3];
        for (slot, cell) in parsed.iter_mut().zip(&cells) {
            *slot = cell
                .parse()
                .map_err(|_| malformed(lineno, format!("'{cell}' is not a number")))?;
        }
        let [x, pdf, ln_pdf] = parsed;
        if !x.is_finite() {
            return Err(malformed(lineno, "evaluation point must be finite".into()));
        }
        if let Some(prev) = rows.last() {
            if x <= prev.x {
                return Err(Error::Unsorted {
                    path: path.to_path_buf(),
                    line: lineno,
                });
            }
        }
        rows.push(PdfRow { x, pdf, ln_pdf });
    }
    if rows.is_empty() {
        return Err(Error::EmptySamples {
            path: path.to_path_buf(),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;

    use super::*;

    fn p() -> PathBuf {
        PathBuf::from("mem")
    }

    #[test]
    fn samples_one_per_line_and_whitespace() {
        let v = parse_samples(Cursor::new("1.5\n-2\n\n3e-1 4.25\t5\n"), &p()).unwrap();
        assert_eq!(v, vec![1.5, -2.0, 0.3, 4.25, 5.0]);
    }

    #[test]
    fn samples_reject_non_numeric() {
        let err = parse_samples(Cursor::new("1.0\n2.0\nabc\n"), &p()).unwrap_err();
        assert!(matches!(err, Error::Malformed { line: 3, .. }));
    }

    #[test]
    fn samples_reject_nan() {
        assert!(matches!(
            parse_samples(Cursor::new("NaN\n"), &p()),
            Err(Error::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn samples_reject_empty() {
        assert!(matches!(
            parse_samples(Cursor::new("\n  \n"), &p()),
            Err(Error::EmptySamples { .. })
        ));
    }

    #[test]
    fn pdf_rows_parse() {
        let rows = parse_pdf_evaluations(Cursor::new("0,0.5,-0.69\n1, 0.25 , -1.38\n"), &p()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!((rows[1].pdf - 0.25).abs() < f64::EPSILON);
        assert!((rows[1].ln_pdf + 1.38).abs() < f64::EPSILON);
    }

    #[test]
    fn pdf_rows_accept_infinite_log_density() {
        let rows = parse_pdf_evaluations(Cursor::new("-1,0,-inf\n0.5,1,0\n"), &p()).unwrap();
        assert!(rows[0].ln_pdf.is_infinite());
    }

    #[test]
    fn pdf_rows_require_three_columns() {
        // A row whose density and log-density were written without a separator.
        let err = parse_pdf_evaluations(Cursor::new("0,0.5-0.69\n"), &p()).unwrap_err();
        assert!(matches!(err, Error::Malformed { line: 1, .. }));
    }

    #[test]
    fn pdf_rows_require_increasing_x() {
        let err = parse_pdf_evaluations(Cursor::new("0,1,0\n2,1,0\n2,1,0\n"), &p()).unwrap_err();
        assert!(matches!(err, Error::Unsorted { line: 3, .. }));
    }

    #[test]
    fn missing_file_is_missing_input() {
        let path = std::env::temp_dir().join("distcheck_observation_does_not_exist");
        assert!(matches!(
            load_samples(&path),
            Err(Error::MissingInput { .. })
        ));
        assert!(matches!(
            load_pdf_evaluations(&path),
            Err(Error::MissingInput { .. })
        ));
    }
}
