// 📄 CSV Parser - uploaded meter reading files → candidate readings
//
// Expected header: AccountId,MeterReadingDateTime,MeterReadValue
// Extra trailing columns are tolerated. Values are passed through verbatim;
// deciding whether a value is acceptable is the validator's job.

use crate::error::CsvError;
use crate::reading::{CandidateReading, READING_DATETIME_FORMAT};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// One CSV row as it appears in the file
#[derive(Debug, Deserialize)]
struct ReadingRow {
    #[serde(rename = "AccountId")]
    account_id: i64,

    #[serde(rename = "MeterReadingDateTime")]
    date_time: String,

    #[serde(rename = "MeterReadValue")]
    read_value: String,
}

/// Parse a whole upload. Any malformed row fails the entire file.
pub fn parse_readings<R: Read>(reader: R) -> Result<Vec<CandidateReading>, CsvError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut readings = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row: ReadingRow = record.deserialize(Some(&headers))?;

        let timestamp = NaiveDateTime::parse_from_str(row.date_time.trim(), READING_DATETIME_FORMAT)
            .map_err(|_| CsvError::Timestamp {
                line,
                value: row.date_time.clone(),
            })?;

        readings.push(CandidateReading {
            account_id: row.account_id,
            timestamp,
            raw_value: row.read_value,
        });
    }

    if readings.is_empty() {
        return Err(CsvError::Empty);
    }

    tracing::debug!(count = readings.len(), "parsed readings from csv");
    Ok(readings)
}

pub fn parse_readings_bytes(bytes: &[u8]) -> Result<Vec<CandidateReading>, CsvError> {
    parse_readings(bytes)
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<CandidateReading>, CsvError> {
    let file = std::fs::File::open(csv_path).map_err(csv::Error::from)?;
    parse_readings(file)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_sample_rows() {
        let input = "AccountId,MeterReadingDateTime,MeterReadValue,\n\
                     2344,22/04/2019 09:24,01002,\n\
                     2233,22/04/2019 12:25,00323,\n\
                     8766,22/04/2019 12:25,3440 ,\n";

        let readings = parse_readings(input.as_bytes()).unwrap();

        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].account_id, 2344);
        assert_eq!(
            readings[0].timestamp,
            NaiveDate::from_ymd_opt(2019, 4, 22)
                .unwrap()
                .and_hms_opt(9, 24, 0)
                .unwrap()
        );
        assert_eq!(readings[1].raw_value, "00323");
        // kept verbatim, the validator rejects it later
        assert_eq!(readings[2].raw_value, "3440 ");
    }

    #[test]
    fn test_non_numeric_value_is_not_a_parse_error() {
        let input = "AccountId,MeterReadingDateTime,MeterReadValue\n\
                     1248,26/05/2019 09:24,VOID\n";

        let readings = parse_readings(input.as_bytes()).unwrap();
        assert_eq!(readings[0].raw_value, "VOID");
    }

    #[test]
    fn test_header_only_is_empty() {
        let input = "AccountId,MeterReadingDateTime,MeterReadValue\n";
        assert!(matches!(parse_readings(input.as_bytes()), Err(CsvError::Empty)));
    }

    #[test]
    fn test_empty_file_is_empty() {
        assert!(matches!(parse_readings_bytes(b""), Err(CsvError::Empty)));
    }

    #[test]
    fn test_bad_account_id_fails() {
        let input = "AccountId,MeterReadingDateTime,MeterReadValue\n\
                     abc,22/04/2019 09:24,01002\n";
        assert!(matches!(parse_readings(input.as_bytes()), Err(CsvError::Csv(_))));
    }

    #[test]
    fn test_bad_timestamp_reports_line() {
        let input = "AccountId,MeterReadingDateTime,MeterReadValue\n\
                     2344,22/04/2019 09:24,01002\n\
                     2344,2019-04-22,01002\n";

        match parse_readings(input.as_bytes()) {
            Err(CsvError::Timestamp { line, value }) => {
                assert_eq!(line, 3);
                assert_eq!(value, "2019-04-22");
            }
            other => panic!("expected timestamp error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_column_fails() {
        let input = "AccountId,MeterReadValue\n2344,01002\n";
        assert!(parse_readings(input.as_bytes()).is_err());
    }
}
