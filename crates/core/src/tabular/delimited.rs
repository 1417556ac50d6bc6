//! Header-driven CSV decoding for raw extracts

use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::TabularError;

/// Rows decoded from a CSV extract
#[derive(Debug, Clone)]
pub struct CsvRead<T> {
    /// Successfully decoded rows, in file order
    pub rows: Vec<T>,
    /// Rows that could not be decoded
    pub rejected: usize,
}

/// Decode a CSV extract with a header row into `T`
///
/// Columns are matched by header name; unknown columns are ignored and
/// absent ones decode as `None` when `T` uses `#[serde(default)]`. A row that
/// fails to decode is counted and skipped. Only an unreadable header fails
/// the whole read.
pub fn read_csv<T: DeserializeOwned>(bytes: &[u8]) -> Result<CsvRead<T>, TabularError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| TabularError::CsvHeader(e.to_string()))?
        .clone();
    if headers.is_empty() {
        return Err(TabularError::CsvHeader("no columns".to_string()));
    }
    debug!(columns = headers.len(), "Decoding CSV extract");

    let mut rows = Vec::new();
    let mut rejected = 0usize;

    for (index, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                rejected += 1;
                if rejected <= 10 {
                    warn!(record = index + 1, error = %e, "Skipping undecodable CSV row");
                }
            }
        }
    }

    Ok(CsvRead { rows, rejected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Row {
        id: Option<String>,
        city: Option<String>,
        missing: Option<String>,
    }

    #[test]
    fn test_reads_by_header_and_trims() {
        let data = b"city,id,extra\n  sao paulo ,1,x\nrio,2,y\n";
        let read: CsvRead<Row> = read_csv(data).unwrap();

        assert_eq!(read.rejected, 0);
        assert_eq!(read.rows.len(), 2);
        assert_eq!(read.rows[0].id.as_deref(), Some("1"));
        assert_eq!(read.rows[0].city.as_deref(), Some("sao paulo"));
        assert_eq!(read.rows[0].missing, None);
    }

    #[test]
    fn test_empty_field_is_none() {
        let data = b"id,city\n1,\n";
        let read: CsvRead<Row> = read_csv(data).unwrap();
        assert_eq!(read.rows[0].city, None);
    }

    #[test]
    fn test_bad_row_is_counted_not_fatal() {
        #[derive(Debug, Deserialize)]
        struct Typed {
            #[allow(dead_code)]
            n: i64,
        }
        let data = b"n\n1\nnot-a-number\n3\n";
        let read: CsvRead<Typed> = read_csv(data).unwrap();
        assert_eq!(read.rows.len(), 2);
        assert_eq!(read.rejected, 1);
    }

    #[test]
    fn test_empty_input_is_corrupt() {
        let result: Result<CsvRead<Row>, _> = read_csv(b"");
        assert!(matches!(result, Err(TabularError::CsvHeader(_))));
    }
}
