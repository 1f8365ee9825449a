//! Loading of `;`-separated demand and solar profile files.
//!
//! Every file starts with a header row. Series files hold `key;value` rows of
//! which the second column is used; the solar file holds `hour;winter;summer`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::InputError;

const DELIMITER: u8 = b';';

fn open(path: &Path) -> Result<File, InputError> {
    File::open(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_field(path: &Path, line: usize, field: Option<&str>) -> Result<f64, InputError> {
    let raw = field.ok_or_else(|| InputError::Malformed {
        path: path.to_path_buf(),
        line,
        message: "missing column".to_string(),
    })?;
    raw.trim().parse::<f64>().map_err(|e| InputError::Malformed {
        path: path.to_path_buf(),
        line,
        message: format!("\"{}\" is not a number: {e}", raw.trim()),
    })
}

/// Reads rows of `columns` numeric values following the key column.
///
/// `path` is only used to label errors.
fn read_rows<R: Read>(reader: R, path: &Path, columns: usize) -> Result<Vec<Vec<f64>>, InputError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record.position().map_or(0, |p| p.line() as usize);
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let values = (1..=columns)
            .map(|c| parse_field(path, line, record.get(c)))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(values);
    }
    Ok(rows)
}

/// Parses a `key;value` series from `reader`.
///
/// # Errors
///
/// Returns [`InputError::Csv`] for unreadable CSV and
/// [`InputError::Malformed`] for a row without a numeric second column.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use smart_charging_sim::io::profiles::series_from_reader;
///
/// let data = "hour;share\n0;0.25\n1;0.75\n";
/// let series = series_from_reader(data.as_bytes(), Path::new("inline")).unwrap();
/// assert_eq!(series, vec![0.25, 0.75]);
/// ```
pub fn series_from_reader<R: Read>(reader: R, path: &Path) -> Result<Vec<f64>, InputError> {
    Ok(read_rows(reader, path, 1)?
        .into_iter()
        .map(|row| row[0])
        .collect())
}

/// Reads a `key;value` series file.
///
/// # Errors
///
/// Returns [`InputError::Io`] if the file cannot be opened, otherwise see
/// [`series_from_reader`].
pub fn read_series(path: &Path) -> Result<Vec<f64>, InputError> {
    series_from_reader(open(path)?, path)
}

/// Reads the 24-hour arrival profile.
///
/// # Errors
///
/// Fails like [`read_series`] and with [`InputError::Malformed`] unless the
/// file holds exactly 24 rows.
pub fn read_arrival_profile(path: &Path) -> Result<[f64; 24], InputError> {
    let series = read_series(path)?;
    let len = series.len();
    series.try_into().map_err(|_| InputError::Malformed {
        path: path.to_path_buf(),
        line: 0,
        message: format!("expected 24 hourly rows, found {len}"),
    })
}

/// Parses an `hour;winter;summer` solar table from `reader`.
///
/// # Errors
///
/// Returns [`InputError::Malformed`] unless there are exactly 24 numeric rows.
pub fn solar_from_reader<R: Read>(reader: R, path: &Path) -> Result<[[f64; 2]; 24], InputError> {
    let rows = read_rows(reader, path, 2)?;
    if rows.len() != 24 {
        return Err(InputError::Malformed {
            path: path.to_path_buf(),
            line: 0,
            message: format!("expected 24 hourly rows, found {}", rows.len()),
        });
    }
    let mut table = [[0.0; 2]; 24];
    for (slot, row) in table.iter_mut().zip(rows) {
        *slot = [row[0], row[1]];
    }
    Ok(table)
}

/// Reads the solar table file.
///
/// # Errors
///
/// Returns [`InputError::Io`] if the file cannot be opened, otherwise see
/// [`solar_from_reader`].
pub fn read_solar_profile(path: &Path) -> Result<[[f64; 2]; 24], InputError> {
    solar_from_reader(open(path)?, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> &'static Path {
        Path::new("test.csv")
    }

    #[test]
    fn series_skips_header_and_blank_lines() {
        let data = "bin;p\n0;0.1\n\n1; 0.9 \n";
        let series = series_from_reader(data.as_bytes(), p()).unwrap();
        assert_eq!(series, vec![0.1, 0.9]);
    }

    #[test]
    fn series_reports_line_of_bad_value() {
        let data = "bin;p\n0;0.1\n1;abc\n";
        let err = series_from_reader(data.as_bytes(), p()).unwrap_err();
        match err {
            InputError::Malformed { line, message, .. } => {
                assert_eq!(line, 3);
                assert!(message.contains("abc"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn series_rejects_missing_column() {
        let data = "bin;p\n0\n";
        assert!(matches!(
            series_from_reader(data.as_bytes(), p()),
            Err(InputError::Malformed { .. })
        ));
    }

    #[test]
    fn solar_needs_24_rows() {
        let mut data = String::from("hour;winter;summer\n");
        for h in 0..24 {
            data.push_str(&format!("{h};0.{h};0.5\n"));
        }
        let table = solar_from_reader(data.as_bytes(), p()).unwrap();
        assert_eq!(table[0], [0.0, 0.5]);
        assert_eq!(table[3], [0.3, 0.5]);

        let short = "hour;winter;summer\n0;0;0\n";
        assert!(solar_from_reader(short.as_bytes(), p()).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_series(Path::new("/nonexistent/profile.csv")).unwrap_err();
        assert!(matches!(err, InputError::Io { .. }));
    }
}
