use crate::repair::repair_error::RepairError;
use std::fmt::Display;
use std::io::Read;

/// one cell of a GTFS table after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn from_raw(cell: &str) -> FieldValue {
        if cell.is_empty() {
            FieldValue::Missing
        } else {
            FieldValue::Text(cell.to_string())
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Missing => Ok(()),
        }
    }
}

/// an in-memory GTFS table: ordered column names and rows of typed cells.
///
/// normalization happens on read: header names and text cells are
/// whitespace-trimmed, empty cells become [`FieldValue::Missing`], and a
/// column whose non-missing cells all parse as integers is promoted to an
/// integer column. short records are padded with missing values and long
/// records truncated, with the inconsistency recorded on [`FeedTable::ragged`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTable {
    columns: Vec<String>,
    rows: Vec<Vec<FieldValue>>,
    ragged: bool,
}

impl FeedTable {
    pub fn from_reader<R: Read>(member: &str, reader: R) -> Result<FeedTable, RepairError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let columns: Vec<String> = csv_reader
            .headers()
            .map_err(|e| RepairError::TableCodecError {
                table: member.to_string(),
                msg: format!("failed reading header row: {e}"),
            })?
            .iter()
            .map(String::from)
            .collect();

        let width = columns.len();
        let mut rows: Vec<Vec<FieldValue>> = Vec::new();
        let mut ragged = false;
        let mut record = csv::StringRecord::new();
        loop {
            let more = csv_reader
                .read_record(&mut record)
                .map_err(|e| RepairError::TableCodecError {
                    table: member.to_string(),
                    msg: format!("failed reading row {}: {e}", rows.len() + 1),
                })?;
            if !more {
                break;
            }
            if record.len() != width {
                ragged = true;
            }
            let row: Vec<FieldValue> = (0..width)
                .map(|i| FieldValue::from_raw(record.get(i).unwrap_or_default()))
                .collect();
            rows.push(row);
        }

        let mut table = FeedTable {
            columns,
            rows,
            ragged,
        };
        table.promote_integer_columns();
        Ok(table)
    }

    /// serialize back to CSV bytes: header row first, integers written as
    /// integers, missing values as empty cells.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RepairError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&self.columns)
            .map_err(|e| RepairError::OtherError(format!("failed serializing header: {e}")))?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|v| v.to_string()))
                .map_err(|e| RepairError::OtherError(format!("failed serializing row: {e}")))?;
        }
        writer
            .into_inner()
            .map_err(|e| RepairError::OtherError(format!("failed flushing table bytes: {e}")))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// true when the source file carried records whose field count differs
    /// from the header's
    pub fn ragged(&self) -> bool {
        self.ragged
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&FieldValue> {
        let c = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[c])
    }

    /// a new table with the same columns and the given rows. fixer output is
    /// always well-formed, so the ragged marker is cleared.
    pub fn with_rows(&self, rows: Vec<Vec<FieldValue>>) -> FeedTable {
        FeedTable {
            columns: self.columns.clone(),
            rows,
            ragged: false,
        }
    }

    pub fn with_column_renamed(&self, from: &str, to: &str) -> FeedTable {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                if c == from {
                    to.to_string()
                } else {
                    c.clone()
                }
            })
            .collect();
        FeedTable {
            columns,
            rows: self.rows.clone(),
            ragged: self.ragged,
        }
    }

    pub fn with_column_appended(&self, name: &str, fill: FieldValue) -> FeedTable {
        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut row = r.clone();
                row.push(fill.clone());
                row
            })
            .collect();
        FeedTable {
            columns,
            rows,
            ragged: self.ragged,
        }
    }

    fn promote_integer_columns(&mut self) {
        for c in 0..self.columns.len() {
            let mut parsed: Vec<Option<i64>> = Vec::with_capacity(self.rows.len());
            let mut any_value = false;
            let mut all_integers = true;
            for row in &self.rows {
                match &row[c] {
                    FieldValue::Missing => parsed.push(None),
                    FieldValue::Integer(i) => {
                        any_value = true;
                        parsed.push(Some(*i));
                    }
                    FieldValue::Text(s) => match s.parse::<i64>() {
                        Ok(i) => {
                            any_value = true;
                            parsed.push(Some(i));
                        }
                        Err(_) => {
                            all_integers = false;
                            break;
                        }
                    },
                }
            }
            if any_value && all_integers {
                for (row, value) in self.rows.iter_mut().zip(parsed) {
                    if let Some(i) = value {
                        row[c] = FieldValue::Integer(i);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{FeedTable, FieldValue};

    fn read(bytes: &str) -> FeedTable {
        FeedTable::from_reader("test.txt", bytes.as_bytes()).expect("should parse")
    }

    #[test]
    fn test_trims_headers_and_cells() {
        let table = read("stop_id , stop_name\n S1 ,  Main St \n");
        assert_eq!(table.columns(), &["stop_id", "stop_name"]);
        assert_eq!(
            table.value(0, "stop_name"),
            Some(&FieldValue::Text("Main St".to_string()))
        );
    }

    #[test]
    fn test_empty_cells_become_missing() {
        let table = read("a,b\n1,\n");
        assert_eq!(table.value(0, "b"), Some(&FieldValue::Missing));
    }

    #[test]
    fn test_promotes_all_integer_columns() {
        let table = read("stop_id,name\n12,twelve\n7,seven\n");
        assert_eq!(table.value(0, "stop_id"), Some(&FieldValue::Integer(12)));
        assert_eq!(
            table.value(0, "name"),
            Some(&FieldValue::Text("twelve".to_string()))
        );
    }

    #[test]
    fn test_mixed_column_stays_text() {
        let table = read("stop_id\n12\nA13\n");
        assert_eq!(
            table.value(0, "stop_id"),
            Some(&FieldValue::Text("12".to_string()))
        );
    }

    #[test]
    fn test_missing_cells_do_not_block_promotion() {
        let table = read("transfer_type\n2\n\n0\n");
        assert_eq!(
            table.value(0, "transfer_type"),
            Some(&FieldValue::Integer(2))
        );
        assert_eq!(table.value(1, "transfer_type"), Some(&FieldValue::Missing));
    }

    #[test]
    fn test_short_records_are_padded_and_marked_ragged() {
        let table = read("a,b,c\n1,2\n");
        assert!(table.ragged());
        assert_eq!(table.value(0, "c"), Some(&FieldValue::Missing));
    }

    #[test]
    fn test_serializes_integers_without_quotes() {
        let table = read("date,service_id\n20240101,S1\n");
        let bytes = table.to_bytes().expect("should serialize");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(text, "date,service_id\n20240101,S1\n");
    }

    #[test]
    fn test_with_column_appended() {
        let table = read("from_stop_id\nS1\n");
        let appended = table.with_column_appended("transfer_type", FieldValue::Integer(0));
        assert_eq!(appended.columns(), &["from_stop_id", "transfer_type"]);
        assert_eq!(
            appended.value(0, "transfer_type"),
            Some(&FieldValue::Integer(0))
        );
    }
}
