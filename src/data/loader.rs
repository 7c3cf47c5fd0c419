use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::errors::ParquetError;
use thiserror::Error;

use super::model::{RawSalesRow, SalesDataset, REQUIRED_COLUMNS};

/// Date layouts tried against the `Date` column, in priority order.
/// Month-first precedes day-first for ambiguous slash dates, and two-digit
/// years precede four-digit ones so `1/5/19` reads as 2019.
pub const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%m/%d/%y",
    "%d/%m/%y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
];

/// Years below this are treated as a misread short year, not a real date.
const MIN_YEAR: i32 = 100;

/// Everything that can go wrong while turning a file into a [`SalesDataset`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed parquet: {0}")]
    Parquet(#[from] ParquetError),
    #[error("unreadable column data: {0}")]
    Arrow(#[from] ArrowError),
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: column '{column}' is null")]
    NullValue { row: usize, column: String },
    #[error("row {row}: column '{column}' is not a finite number ({value})")]
    NonFinite {
        row: usize,
        column: String,
        value: f64,
    },
    #[error("row {row}: cannot parse date '{value}'")]
    UnparseableDate { row: usize, value: String },
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a sales dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with the fixed column names (recommended)
/// * `.json`    – `[{ "Branch": "A", "Product line": ..., ... }, ...]`,
///   dates as text or epoch milliseconds
/// * `.parquet` – one column per field; dates as text, Date32 or timestamps
pub fn load_file(path: &Path) -> Result<SalesDataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<SalesDataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(open(path)?);

    let headers = reader.headers()?.clone();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|col| !headers.iter().any(|h| h == **col))
    {
        return Err(LoadError::MissingColumn(missing.to_string()));
    }

    let rows = reader
        .deserialize::<RawSalesRow>()
        .collect::<Result<Vec<_>, _>>()?;
    build_dataset(rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient="records")` layout.
/// Dates may be strings or epoch milliseconds.
fn load_json(path: &Path) -> Result<SalesDataset, LoadError> {
    let rows: Vec<RawSalesRow> = serde_json::from_reader(BufReader::new(open(path)?))?;
    build_dataset(rows)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

fn load_parquet(path: &Path) -> Result<SalesDataset, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let offset = rows.len();

        let text = |name: &str| string_column(&batch, name, offset);
        let number = |name: &str| f64_column(&batch, name, offset);

        let branch = text("Branch")?;
        let product_line = text("Product line")?;
        let date = text("Date")?;
        let customer_type = text("Customer type")?;
        let payment = text("Payment")?;
        let unit_price = number("Unit price")?;
        let quantity = number("Quantity")?;
        let tax = number("Tax 5%")?;
        let total = number("Total")?;
        let cogs = number("cogs")?;
        let gross_income = number("gross income")?;
        let rating = number("Rating")?;

        for i in 0..batch.num_rows() {
            rows.push(RawSalesRow {
                branch: branch[i].clone(),
                product_line: product_line[i].clone(),
                date: date[i].clone(),
                customer_type: customer_type[i].clone(),
                payment: payment[i].clone(),
                unit_price: unit_price[i],
                quantity: quantity[i],
                tax: tax[i],
                total: total[i],
                cogs: cogs[i],
                gross_income: gross_income[i],
                rating: rating[i],
            });
        }
    }

    build_dataset(rows)
}

// -- Arrow helpers --

fn column_index(batch: &RecordBatch, name: &str) -> Result<usize, LoadError> {
    batch
        .schema()
        .index_of(name)
        .map_err(|_| LoadError::MissingColumn(name.to_string()))
}

/// Read a column as text, casting from whatever Arrow type it was stored as.
fn string_column(batch: &RecordBatch, name: &str, offset: usize) -> Result<Vec<String>, LoadError> {
    let casted = cast(batch.column(column_index(batch, name)?), &DataType::Utf8)?;
    let values = casted.as_string::<i32>();
    (0..values.len())
        .map(|row| {
            if values.is_null(row) {
                Err(LoadError::NullValue {
                    row: offset + row,
                    column: name.to_string(),
                })
            } else {
                Ok(values.value(row).to_string())
            }
        })
        .collect()
}

/// Read a numeric column as `f64`, accepting any integer or float encoding.
fn f64_column(batch: &RecordBatch, name: &str, offset: usize) -> Result<Vec<f64>, LoadError> {
    let casted = cast(batch.column(column_index(batch, name)?), &DataType::Float64)?;
    let values = casted.as_primitive::<Float64Type>();
    (0..values.len())
        .map(|row| {
            if values.is_null(row) {
                Err(LoadError::NullValue {
                    row: offset + row,
                    column: name.to_string(),
                })
            } else {
                Ok(values.value(row))
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Validation and date parsing
// ---------------------------------------------------------------------------

/// Validate raw rows and resolve their dates into the final dataset.
fn build_dataset(rows: Vec<RawSalesRow>) -> Result<SalesDataset, LoadError> {
    for (row, raw) in rows.iter().enumerate() {
        if let Some((column, value)) = raw.first_non_finite() {
            return Err(LoadError::NonFinite {
                row,
                column: column.to_string(),
                value,
            });
        }
    }

    let dates: Vec<&str> = rows.iter().map(|r| date_part(&r.date)).collect();
    let format = detect_date_format(&dates)?;

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(row, raw)| {
            let date = parse_date(date_part(&raw.date), format).ok_or_else(|| {
                LoadError::UnparseableDate {
                    row,
                    value: raw.date.clone(),
                }
            })?;
            Ok(raw.into_record(date))
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    let dataset = SalesDataset::from_records(records);
    log::debug!(
        "Parsed {} records, date format {format}, {} branches, {} product lines",
        dataset.len(),
        dataset.branches.len(),
        dataset.product_lines.len()
    );
    Ok(dataset)
}

/// Strip a trailing time-of-day (`2019-01-05T00:00:00`, `1/5/2019 13:08`).
fn date_part(value: &str) -> &str {
    let value = value.trim();
    value
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .unwrap_or(value)
}

/// Parse with `format`, rejecting first-century years.
fn parse_date(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, format)
        .ok()
        .filter(|d| d.year() >= MIN_YEAR)
}

/// Pick the first format in [`DATE_FORMATS`] that parses every value.
///
/// When none does, the error names the row where the most successful
/// candidate first failed.
pub fn detect_date_format(values: &[&str]) -> Result<&'static str, LoadError> {
    let mut furthest: Option<usize> = None;

    for format in DATE_FORMATS {
        let first_failure = values
            .iter()
            .position(|v| parse_date(v, format).is_none());
        match first_failure {
            None => return Ok(format),
            Some(row) => furthest = Some(furthest.map_or(row, |f| f.max(row))),
        }
    }

    // An empty column matches the first format above, so `furthest` is set.
    let row = furthest.unwrap_or(0);
    Err(LoadError::UnparseableDate {
        row,
        value: values.get(row).map(|v| v.to_string()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Invoice ID,Branch,City,Customer type,Gender,Product line,Unit price,Quantity,Tax 5%,Total,Date,Time,Payment,cogs,gross margin percentage,gross income,Rating";

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn csv_row(branch: &str, line: &str, total: f64, date: &str, rating: f64) -> String {
        let cogs = total / 1.05;
        let tax = total - cogs;
        format!(
            "750-67-8428,{branch},Yangon,Member,Female,{line},{cogs},1,{tax},{total},{date},13:08,Ewallet,{cogs},4.76,{tax},{rating}"
        )
    }

    #[test]
    fn loads_csv_with_extra_columns_and_us_dates() {
        let dir = tempfile::tempdir().unwrap();
        let body = [
            HEADER.to_string(),
            csv_row("A", "Health and beauty", 548.9715, "1/5/2019", 9.1),
            csv_row("C", "Electronic accessories", 80.22, "3/8/2019", 9.6),
            csv_row("A", "Home and lifestyle", 340.5255, "3/3/2019", 7.4),
        ]
        .join("\n");
        let path = write_file(&dir, "sales.csv", &body);

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.branches, vec!["A", "C"]);
        assert_eq!(ds.records[0].date, NaiveDate::from_ymd_opt(2019, 1, 5).unwrap());
        assert_eq!(ds.records[1].date, NaiveDate::from_ymd_opt(2019, 3, 8).unwrap());
        assert_eq!(ds.records[1].payment, "Ewallet");
        assert!((ds.records[0].total - 548.9715).abs() < 1e-9);
    }

    #[test]
    fn day_first_dates_are_detected_when_month_first_fails() {
        let format = detect_date_format(&["05/01/2019", "25/12/2019"]).unwrap();
        assert_eq!(format, "%d/%m/%Y");
        let format = detect_date_format(&["2024-01-01", "2024-01-02"]).unwrap();
        assert_eq!(format, "%Y-%m-%d");
    }

    #[test]
    fn two_digit_years_read_as_this_century() {
        let format = detect_date_format(&["1/5/19", "3/8/19"]).unwrap();
        assert_eq!(format, "%m/%d/%y");
        assert_eq!(
            parse_date("1/5/19", format),
            NaiveDate::from_ymd_opt(2019, 1, 5)
        );

        let format = detect_date_format(&["05/01/19", "25/12/19"]).unwrap();
        assert_eq!(format, "%d/%m/%y");

        // Four-digit years still fall through to the %Y layouts.
        assert_eq!(detect_date_format(&["1/5/2019"]).unwrap(), "%m/%d/%Y");
    }

    #[test]
    fn first_century_years_are_rejected() {
        assert_eq!(parse_date("0019-01-05", "%Y-%m-%d"), None);
        assert!(matches!(
            detect_date_format(&["19-01-05"]),
            Err(LoadError::UnparseableDate { row: 0, .. })
        ));
    }

    #[test]
    fn unparseable_dates_name_the_row() {
        let err = detect_date_format(&["1/5/2019", "1/6/2019", "not a date"]).unwrap_err();
        match err {
            LoadError::UnparseableDate { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn timestamps_are_truncated_to_dates() {
        assert_eq!(date_part(" 2019-01-05T00:00:00 "), "2019-01-05");
        assert_eq!(date_part("1/5/2019 13:08"), "1/5/2019");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = load_file(Path::new("sales.xlsx")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ext) if ext == "xlsx"));
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "sales.csv", "Branch,Product line,Date\nA,Food,2019-01-01\n");
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(col) if col == "Customer type"));
    }

    #[test]
    fn non_numeric_cell_is_a_csv_error() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{HEADER}\n{}",
            csv_row("A", "Food", 10.0, "1/5/2019", 7.0).replacen(",1,", ",one,", 1)
        );
        let path = write_file(&dir, "sales.csv", &body);
        assert!(matches!(load_file(&path).unwrap_err(), LoadError::Csv(_)));
    }

    #[test]
    fn loads_records_oriented_json() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"[
            {"Branch": "B", "Product line": "Sports and travel", "Date": "2024-01-02",
             "Customer type": "Normal", "Payment": "Cash", "Unit price": 10.0,
             "Quantity": 2, "Tax 5%": 1.0, "Total": 21.0, "cogs": 20.0,
             "gross income": 1.0, "Rating": 6.5}
        ]"#;
        let path = write_file(&dir, "sales.json", json);
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].product_line, "Sports and travel");
        assert_eq!(ds.records[0].quantity, 2.0);
    }

    #[test]
    fn loads_parquet_with_native_column_types() {
        use std::sync::Arc;

        use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
        use arrow::datatypes::{Field, Schema};
        use parquet::arrow::ArrowWriter;

        let text = |name: &str| Field::new(name, DataType::Utf8, false);
        let float = |name: &str| Field::new(name, DataType::Float64, false);
        let schema = Arc::new(Schema::new(vec![
            text("Branch"),
            text("Product line"),
            Field::new("Date", DataType::Date32, false),
            text("Customer type"),
            text("Payment"),
            float("Unit price"),
            Field::new("Quantity", DataType::Int64, false),
            float("Tax 5%"),
            float("Total"),
            float("cogs"),
            float("gross income"),
            float("Rating"),
        ]));
        let strings = |v: [&str; 2]| -> ArrayRef { Arc::new(StringArray::from(v.to_vec())) };
        let floats = |v: [f64; 2]| -> ArrayRef { Arc::new(Float64Array::from(v.to_vec())) };
        let columns: Vec<ArrayRef> = vec![
            strings(["A", "B"]),
            strings(["Food and beverages", "Fashion accessories"]),
            Arc::new(Date32Array::from(vec![17901, 17902])),
            strings(["Member", "Normal"]),
            strings(["Cash", "Credit card"]),
            floats([10.0, 20.0]),
            Arc::new(Int64Array::from(vec![2, 3])),
            floats([1.0, 3.0]),
            floats([21.0, 63.0]),
            floats([20.0, 60.0]),
            floats([1.0, 3.0]),
            floats([8.0, 4.5]),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.parquet");
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records[0].date, NaiveDate::from_ymd_opt(2019, 1, 5).unwrap());
        assert_eq!(ds.records[1].date, NaiveDate::from_ymd_opt(2019, 1, 6).unwrap());
        assert_eq!(ds.records[1].quantity, 3.0);
        assert_eq!(ds.records[1].payment, "Credit card");
    }

    #[test]
    fn loads_pandas_json_with_epoch_millisecond_dates() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"[
            {"Invoice ID": "750-67-8428", "Branch": "A", "Product line": "Health and beauty",
             "Date": 1546646400000, "Customer type": "Member", "Payment": "Ewallet",
             "Unit price": 74.69, "Quantity": 7, "Tax 5%": 26.1415, "Total": 548.9715,
             "cogs": 522.83, "gross income": 26.1415, "Rating": 9.1},
            {"Invoice ID": "226-31-3081", "Branch": "C", "Product line": "Electronic accessories",
             "Date": 1552003200000, "Customer type": "Normal", "Payment": "Cash",
             "Unit price": 15.28, "Quantity": 5, "Tax 5%": 3.82, "Total": 80.22,
             "cogs": 76.4, "gross income": 3.82, "Rating": 9.6}
        ]"#;
        let path = write_file(&dir, "sales.json", json);
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.records[0].date, NaiveDate::from_ymd_opt(2019, 1, 5).unwrap());
        assert_eq!(ds.records[1].date, NaiveDate::from_ymd_opt(2019, 3, 8).unwrap());
    }

    #[test]
    fn csv_nan_is_rejected_at_load_time() {
        let dir = tempfile::tempdir().unwrap();
        let row = csv_row("A", "Food", 10.0, "1/5/2019", 7.0);
        let row = row.replacen(",10,", ",NaN,", 1);
        let path = write_file(&dir, "sales.csv", &format!("{HEADER}\n{row}"));
        match load_file(&path).unwrap_err() {
            LoadError::NonFinite { row, column, value } => {
                assert_eq!(row, 0);
                assert_eq!(column, "Total");
                assert!(value.is_nan());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_csv_yields_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "sales.csv", &format!("{HEADER}\n"));
        let ds = load_file(&path).unwrap();
        assert!(ds.is_empty());
        assert!(ds.branches.is_empty());
    }
}
