use std::{collections::HashSet, fs, io, path::Path};

use csv::ReaderBuilder;
use thiserror::Error;

/// Columns every sample sheet must carry, with unique values in each.
pub const REQUIRED_COLUMNS: [&str; 2] = ["sample", "barcode"];

#[derive(Debug, Error)]
pub enum SampleSheetError {
    #[error("Column {column} not found in sample sheet {path}")]
    Schema { column: &'static str, path: String },

    #[error("Duplicates found in column {column}")]
    DuplicateKey { column: &'static str },

    #[error("Failed to read sample sheet: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse sample sheet: {0}")]
    Csv(#[from] csv::Error),
}

/// Sample/barcode manifest for one sequencing run. Rows keep their file
/// order, extra columns are carried through untouched.
#[derive(Debug, Clone)]
pub struct SampleSheet {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    sample_idx: usize,
    barcode_idx: usize,
}

struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    fn parse(raw: &str, delimiter: u8) -> Result<Self, SampleSheetError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(raw.as_bytes());
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }
        Ok(RawTable { headers, rows })
    }

    fn missing_required_column(&self) -> Option<&'static str> {
        REQUIRED_COLUMNS
            .into_iter()
            .find(|col| !self.headers.iter().any(|h| h == col))
    }

    fn required_column_count(&self) -> usize {
        REQUIRED_COLUMNS
            .into_iter()
            .filter(|col| self.headers.iter().any(|h| h == col))
            .count()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

impl SampleSheet {
    /// Read a sample sheet, trying tab first and falling back to comma if
    /// the required columns do not show up.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SampleSheetError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;

        let tab = RawTable::parse(&raw, b'\t')?;
        let table = if tab.missing_required_column().is_none() {
            tab
        } else {
            let comma = RawTable::parse(&raw, b',')?;
            if let Some(missing) = comma.missing_required_column() {
                // Blame the delimiter that recognized more of the required
                // columns, so a comma sheet lacking only `barcode` reports
                // barcode rather than the tab parse's missing `sample`.
                let column = if comma.required_column_count() >= tab.required_column_count() {
                    missing
                } else {
                    tab.missing_required_column().unwrap_or(missing)
                };
                return Err(SampleSheetError::Schema {
                    column,
                    path: path.display().to_string(),
                });
            }
            comma
        };

        // Indices exist, missing_required_column just checked them.
        let sample_idx = table.column_index("sample").unwrap_or_default();
        let barcode_idx = table.column_index("barcode").unwrap_or_default();
        let sheet = SampleSheet {
            headers: table.headers,
            rows: table.rows,
            sample_idx,
            barcode_idx,
        };
        sheet.check_unique()?;
        Ok(sheet)
    }

    fn check_unique(&self) -> Result<(), SampleSheetError> {
        for (column, idx) in [("sample", self.sample_idx), ("barcode", self.barcode_idx)] {
            let mut seen = HashSet::new();
            for row in &self.rows {
                let value = row.get(idx).map(String::as_str).unwrap_or_default();
                if !seen.insert(value) {
                    return Err(SampleSheetError::DuplicateKey { column });
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.column_values(self.sample_idx)
    }

    pub fn barcodes(&self) -> impl Iterator<Item = &str> {
        self.column_values(self.barcode_idx)
    }

    fn column_values(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(idx).map(String::as_str).unwrap_or_default())
    }
}

#[cfg(test)]
mod test {
    use assert_fs::{fixture::FileWriteStr, prelude::PathChild, TempDir};
    use pretty_assertions::assert_eq;

    use super::*;

    fn write_sheet(contents: &str) -> (TempDir, std::path::PathBuf) {
        let tmp = TempDir::new().unwrap();
        let file = tmp.child("sample_sheet.tsv");
        file.write_str(contents).unwrap();
        let path = file.path().to_path_buf();
        (tmp, path)
    }

    #[test]
    fn tab_separated_sheet() {
        let (_tmp, path) = write_sheet(
            "# run 17\nsample\tbarcode\textra\ns1\tBC01\tx\ns2\tBC02\ty\ns3\tBC03\tz\n",
        );
        let sheet = SampleSheet::from_path(&path).unwrap();
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.samples().collect::<Vec<_>>(), vec!["s1", "s2", "s3"]);
        assert_eq!(
            sheet.barcodes().collect::<Vec<_>>(),
            vec!["BC01", "BC02", "BC03"]
        );
    }

    #[test]
    fn falls_back_to_comma() {
        let (_tmp, path) = write_sheet("sample,barcode\ns1,BC01\ns2,BC02\n");
        let sheet = SampleSheet::from_path(&path).unwrap();
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.headers(), ["sample", "barcode"]);
    }

    #[test]
    fn missing_barcode_column() {
        let (_tmp, path) = write_sheet("sample\tname\ns1\tfoo\n");
        let err = SampleSheet::from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            SampleSheetError::Schema { column: "barcode", .. }
        ));
    }

    #[test]
    fn missing_barcode_column_in_comma_sheet() {
        // The comma parse sees the `sample` column, so the error must name
        // barcode, not the column missing from the failed tab parse.
        let (_tmp, path) = write_sheet("sample,name\ns1,foo\n");
        let err = SampleSheet::from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            SampleSheetError::Schema { column: "barcode", .. }
        ));
    }

    #[test]
    fn no_required_columns_at_all() {
        let (_tmp, path) = write_sheet("name,lane\nfoo,1\n");
        let err = SampleSheet::from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            SampleSheetError::Schema { column: "sample", .. }
        ));
    }

    #[test]
    fn duplicate_sample_named_in_error() {
        let (_tmp, path) = write_sheet("sample\tbarcode\ns1\tBC01\ns1\tBC02\n");
        let err = SampleSheet::from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            SampleSheetError::DuplicateKey { column: "sample" }
        ));
    }

    #[test]
    fn duplicate_barcode_named_in_error() {
        let (_tmp, path) = write_sheet("sample\tbarcode\ns1\tBC01\ns2\tBC01\n");
        let err = SampleSheet::from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            SampleSheetError::DuplicateKey { column: "barcode" }
        ));
    }
}
