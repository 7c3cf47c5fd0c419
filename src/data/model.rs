use std::collections::HashSet;

use chrono::{DateTime, NaiveDate};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// SalesRecord – one row of the source table
// ---------------------------------------------------------------------------

/// A single sales transaction with the columns the dashboard uses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub branch: String,
    pub product_line: String,
    pub date: NaiveDate,
    pub customer_type: String,
    pub payment: String,
    pub unit_price: f64,
    pub quantity: f64,
    /// The `Tax 5%` column.
    pub tax: f64,
    pub total: f64,
    /// Cost of goods sold.
    pub cogs: f64,
    pub gross_income: f64,
    pub rating: f64,
}

/// A row as it comes out of the file, before the date column is parsed.
///
/// Field names follow the source headers; any additional columns in the
/// file (invoice id, city, time, ...) are ignored by the deserializer.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSalesRow {
    #[serde(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "Product line")]
    pub product_line: String,
    #[serde(rename = "Date", deserialize_with = "date_text")]
    pub date: String,
    #[serde(rename = "Customer type")]
    pub customer_type: String,
    #[serde(rename = "Payment")]
    pub payment: String,
    #[serde(rename = "Unit price")]
    pub unit_price: f64,
    #[serde(rename = "Quantity")]
    pub quantity: f64,
    #[serde(rename = "Tax 5%")]
    pub tax: f64,
    #[serde(rename = "Total")]
    pub total: f64,
    #[serde(rename = "cogs")]
    pub cogs: f64,
    #[serde(rename = "gross income")]
    pub gross_income: f64,
    #[serde(rename = "Rating")]
    pub rating: f64,
}

/// A `Date` cell: text, or epoch milliseconds as written by
/// `df.to_json(orient="records")`.
#[derive(Deserialize)]
#[serde(untagged)]
enum DateCell {
    Text(String),
    EpochMillis(i64),
}

/// Normalise a `Date` cell to text; epoch milliseconds become `%Y-%m-%d`.
fn date_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match DateCell::deserialize(deserializer)? {
        DateCell::Text(text) => Ok(text),
        DateCell::EpochMillis(ms) => DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
            .ok_or_else(|| D::Error::custom(format!("epoch milliseconds out of range: {ms}"))),
    }
}

/// Column headers of the fixed input schema, in file order.
pub const REQUIRED_COLUMNS: [&str; 12] = [
    "Branch",
    "Product line",
    "Date",
    "Customer type",
    "Payment",
    "Unit price",
    "Quantity",
    "Tax 5%",
    "Total",
    "cogs",
    "gross income",
    "Rating",
];

/// The numeric columns, paired with their accessor.
pub const NUMERIC_FIELDS: [(&str, fn(&SalesRecord) -> f64); 7] = [
    ("Unit price", |r| r.unit_price),
    ("Quantity", |r| r.quantity),
    ("Tax 5%", |r| r.tax),
    ("Total", |r| r.total),
    ("cogs", |r| r.cogs),
    ("gross income", |r| r.gross_income),
    ("Rating", |r| r.rating),
];

impl RawSalesRow {
    /// Name and value of the first non-finite numeric field, if any.
    pub fn first_non_finite(&self) -> Option<(&'static str, f64)> {
        [
            ("Unit price", self.unit_price),
            ("Quantity", self.quantity),
            ("Tax 5%", self.tax),
            ("Total", self.total),
            ("cogs", self.cogs),
            ("gross income", self.gross_income),
            ("Rating", self.rating),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
    }

    /// Attach the parsed date, producing the final record.
    pub fn into_record(self, date: NaiveDate) -> SalesRecord {
        SalesRecord {
            branch: self.branch,
            product_line: self.product_line,
            date,
            customer_type: self.customer_type,
            payment: self.payment,
            unit_price: self.unit_price,
            quantity: self.quantity,
            tax: self.tax,
            total: self.total,
            cogs: self.cogs,
            gross_income: self.gross_income,
            rating: self.rating,
        }
    }
}

// ---------------------------------------------------------------------------
// SalesDataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset together with the filterable value universes.
#[derive(Debug, Clone)]
pub struct SalesDataset {
    /// All records, in file order.
    pub records: Vec<SalesRecord>,
    /// Distinct branch values, first-seen order.
    pub branches: Vec<String>,
    /// Distinct product lines, first-seen order.
    pub product_lines: Vec<String>,
}

impl SalesDataset {
    /// Build the value universes from the loaded records.
    pub fn from_records(records: Vec<SalesRecord>) -> Self {
        let branches = distinct_in_order(records.iter().map(|r| r.branch.as_str()));
        let product_lines = distinct_in_order(records.iter().map(|r| r.product_line.as_str()));
        SalesDataset {
            records,
            branches,
            product_lines,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest transaction date.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }
}

/// Distinct values preserving the order in which they first appear.
pub fn distinct_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Build a record with the fields the aggregations care about; the
    /// remaining numeric columns are derived so the row stays consistent.
    pub fn record(branch: &str, product_line: &str, date: (i32, u32, u32), total: f64) -> SalesRecord {
        let cogs = total / 1.05;
        SalesRecord {
            branch: branch.to_string(),
            product_line: product_line.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid date"),
            customer_type: "Member".to_string(),
            payment: "Cash".to_string(),
            unit_price: cogs,
            quantity: 1.0,
            tax: total - cogs,
            total,
            cogs,
            gross_income: total - cogs,
            rating: 7.0,
        }
    }

    pub fn dataset(records: Vec<SalesRecord>) -> SalesDataset {
        SalesDataset::from_records(records)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::record;
    use super::*;

    #[test]
    fn universes_keep_first_seen_order() {
        let ds = SalesDataset::from_records(vec![
            record("C", "Health", (2019, 1, 5), 1.0),
            record("A", "Food", (2019, 1, 6), 1.0),
            record("C", "Sports", (2019, 1, 7), 1.0),
        ]);
        assert_eq!(ds.branches, vec!["C", "A"]);
        assert_eq!(ds.product_lines, vec!["Health", "Food", "Sports"]);
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn date_range_spans_records() {
        let ds = SalesDataset::from_records(vec![
            record("A", "Food", (2019, 3, 1), 1.0),
            record("A", "Food", (2019, 1, 1), 1.0),
        ]);
        let (lo, hi) = ds.date_range().unwrap();
        assert_eq!(lo, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
        assert_eq!(hi, NaiveDate::from_ymd_opt(2019, 3, 1).unwrap());
        assert!(SalesDataset::from_records(Vec::new()).date_range().is_none());
    }

    #[test]
    fn non_finite_numbers_are_reported() {
        let row = RawSalesRow {
            branch: "A".into(),
            product_line: "Food".into(),
            date: "2019-01-01".into(),
            customer_type: "Normal".into(),
            payment: "Cash".into(),
            unit_price: 1.0,
            quantity: 1.0,
            tax: 0.05,
            total: f64::NAN,
            cogs: 1.0,
            gross_income: 0.05,
            rating: 5.0,
        };
        assert_eq!(row.first_non_finite().map(|(c, _)| c), Some("Total"));
    }
}
