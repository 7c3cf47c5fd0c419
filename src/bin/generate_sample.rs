//! Writes a deterministic synthetic supermarket sales table as
//! `sample_sales.csv` and `sample_sales.parquet`.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;
use serde::Serialize;

const ROWS: usize = 1000;

const BRANCHES: [(&str, &str); 3] = [("A", "Yangon"), ("B", "Mandalay"), ("C", "Naypyitaw")];
const PRODUCT_LINES: [&str; 6] = [
    "Health and beauty",
    "Electronic accessories",
    "Home and lifestyle",
    "Sports and travel",
    "Food and beverages",
    "Fashion accessories",
];
const CUSTOMER_TYPES: [&str; 2] = ["Member", "Normal"];
const PAYMENTS: [&str; 3] = ["Ewallet", "Cash", "Credit card"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// One output row, headers matching the real dataset.
#[derive(Debug, Serialize)]
struct SampleRow {
    #[serde(rename = "Invoice ID")]
    invoice_id: String,
    #[serde(rename = "Branch")]
    branch: String,
    #[serde(rename = "City")]
    city: String,
    #[serde(rename = "Customer type")]
    customer_type: String,
    #[serde(rename = "Product line")]
    product_line: String,
    #[serde(rename = "Unit price")]
    unit_price: f64,
    #[serde(rename = "Quantity")]
    quantity: i64,
    #[serde(rename = "Tax 5%")]
    tax: f64,
    #[serde(rename = "Total")]
    total: f64,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Payment")]
    payment: String,
    #[serde(rename = "cogs")]
    cogs: f64,
    #[serde(rename = "gross income")]
    gross_income: f64,
    #[serde(rename = "Rating")]
    rating: f64,
}

fn round(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

fn generate(rng: &mut SimpleRng) -> Vec<SampleRow> {
    let first_day = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default();

    (0..ROWS)
        .map(|i| {
            let (branch, city) = *rng.pick(&BRANCHES);
            let unit_price = round(rng.uniform(10.0, 100.0), 2);
            let quantity = 1 + (rng.next_u64() % 10) as i64;
            let cogs = round(unit_price * quantity as f64, 2);
            let tax = round(cogs * 0.05, 4);
            let date = first_day + Duration::days((rng.next_u64() % 89) as i64);

            SampleRow {
                invoice_id: format!("{:03}-{:02}-{:04}", 100 + i % 900, i % 100, i),
                branch: branch.to_string(),
                city: city.to_string(),
                customer_type: rng.pick(&CUSTOMER_TYPES).to_string(),
                product_line: rng.pick(&PRODUCT_LINES).to_string(),
                unit_price,
                quantity,
                tax,
                total: round(cogs + tax, 4),
                // Month-first, like the published dataset
                date: date.format("%-m/%-d/%Y").to_string(),
                payment: rng.pick(&PAYMENTS).to_string(),
                cogs,
                gross_income: tax,
                rating: round(rng.uniform(4.0, 10.0), 1),
            }
        })
        .collect()
}

fn write_csv(rows: &[SampleRow], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[SampleRow], path: &str) -> Result<()> {
    let text = |f: fn(&SampleRow) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let number = |f: fn(&SampleRow) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let quantity: ArrayRef = Arc::new(Int64Array::from(
        rows.iter().map(|r| r.quantity).collect::<Vec<_>>(),
    ));

    let schema = Arc::new(Schema::new(vec![
        Field::new("Invoice ID", DataType::Utf8, false),
        Field::new("Branch", DataType::Utf8, false),
        Field::new("City", DataType::Utf8, false),
        Field::new("Customer type", DataType::Utf8, false),
        Field::new("Product line", DataType::Utf8, false),
        Field::new("Unit price", DataType::Float64, false),
        Field::new("Quantity", DataType::Int64, false),
        Field::new("Tax 5%", DataType::Float64, false),
        Field::new("Total", DataType::Float64, false),
        Field::new("Date", DataType::Utf8, false),
        Field::new("Payment", DataType::Utf8, false),
        Field::new("cogs", DataType::Float64, false),
        Field::new("gross income", DataType::Float64, false),
        Field::new("Rating", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            text(|r| r.invoice_id.as_str()),
            text(|r| r.branch.as_str()),
            text(|r| r.city.as_str()),
            text(|r| r.customer_type.as_str()),
            text(|r| r.product_line.as_str()),
            number(|r| r.unit_price),
            quantity,
            number(|r| r.tax),
            number(|r| r.total),
            text(|r| r.date.as_str()),
            text(|r| r.payment.as_str()),
            number(|r| r.cogs),
            number(|r| r.gross_income),
            number(|r| r.rating),
        ],
    )
    .context("building record batch")?;

    arrow::util::pretty::print_batches(&[batch.slice(0, batch.num_rows().min(5))])
        .context("printing preview")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng);

    write_csv(&rows, "sample_sales.csv")?;
    write_parquet(&rows, "sample_sales.parquet")?;

    println!("Wrote {} sales records to sample_sales.csv and sample_sales.parquet", rows.len());
    Ok(())
}
