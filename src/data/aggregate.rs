use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use super::filter::FilteredView;
use super::model::{SalesRecord, NUMERIC_FIELDS};
use super::stats;

/// Number of equal-width bins in the rating histogram.
pub const RATING_BINS: usize = 20;

/// Points at which the rating density curve is sampled.
pub const DENSITY_POINTS: usize = 200;

// ---------------------------------------------------------------------------
// Result shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// One histogram bar. The last bin includes its upper edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityPoint {
    pub x: f64,
    /// Probability density.
    pub density: f64,
    /// Density scaled to the histogram's count axis.
    pub expected_count: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatingDistribution {
    pub bins: Vec<HistogramBin>,
    pub density: Vec<DensityPoint>,
}

impl RatingDistribution {
    pub fn bin_width(&self) -> Option<f64> {
        self.bins.first().map(|b| b.upper - b.lower)
    }
}

/// Box-plot statistics for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub category: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Smallest value within `q1 - 1.5 * IQR`.
    pub lower_whisker: f64,
    /// Largest value within `q3 + 1.5 * IQR`.
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub cogs: f64,
    pub gross_income: f64,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: usize,
    /// Fraction of all records, in `[0, 1]`.
    pub share: f64,
}

/// Category × category matrix of sums. Absent combinations hold `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PivotTable {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `cells[row][column]`.
    pub cells: Vec<Vec<f64>>,
}

impl PivotTable {
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.rows.iter().position(|v| v == row)?;
        let c = self.columns.iter().position(|v| v == column)?;
        Some(self.cells[r][c])
    }

    pub fn row_total(&self, row: usize) -> f64 {
        self.cells.get(row).map(|r| r.iter().sum()).unwrap_or(0.0)
    }
}

/// Pairwise Pearson correlations. Undefined entries are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub fields: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

/// Headline figures shown above the charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesSummary {
    pub records: usize,
    pub total_sales: f64,
    pub gross_income: f64,
    pub average_rating: Option<f64>,
}

// ---------------------------------------------------------------------------
// Derivations
// ---------------------------------------------------------------------------

/// Sum of `total` per date, oldest first.
pub fn daily_totals(view: &FilteredView) -> Vec<DailyTotal> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in view.iter() {
        *by_date.entry(r.date).or_default() += r.total;
    }
    by_date
        .into_iter()
        .map(|(date, total)| DailyTotal { date, total })
        .collect()
}

/// Sum of `total` per product line, largest first.
///
/// Equal sums keep the order in which their product lines first appear.
pub fn revenue_by_product_line(view: &FilteredView) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = group_in_order(view, |r| &r.product_line)
        .into_iter()
        .map(|(category, records)| CategoryTotal {
            category,
            total: records.iter().map(|r| r.total).sum(),
        })
        .collect();
    // `sort_by` is stable, which gives the first-seen tie-break.
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals
}

/// Equal-width histogram of ratings plus a smoothed density over the same
/// domain.
pub fn rating_distribution(view: &FilteredView, bins: usize) -> RatingDistribution {
    let ratings: Vec<f64> = view.iter().map(|r| r.rating).collect();
    if ratings.is_empty() || bins == 0 {
        return RatingDistribution::default();
    }

    let mut lo = ratings.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = ratings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in &ratings {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    let histogram = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lo + i as f64 * width,
            upper: if i + 1 == bins { hi } else { lo + (i + 1) as f64 * width },
            count,
        })
        .collect();

    let step = (hi - lo) / (DENSITY_POINTS - 1) as f64;
    let grid: Vec<f64> = (0..DENSITY_POINTS).map(|i| lo + i as f64 * step).collect();
    let scale = ratings.len() as f64 * width;
    let density = stats::gaussian_kde(&ratings, &grid)
        .map(|ys| {
            grid.iter()
                .zip(ys)
                .map(|(&x, density)| DensityPoint {
                    x,
                    density,
                    expected_count: density * scale,
                })
                .collect()
        })
        .unwrap_or_default();

    RatingDistribution {
        bins: histogram,
        density,
    }
}

/// Five-number summary with Tukey whiskers of `total` per customer type.
pub fn spend_by_customer_type(view: &FilteredView) -> Vec<BoxSummary> {
    group_in_order(view, |r| &r.customer_type)
        .into_iter()
        .filter_map(|(category, records)| {
            let mut values: Vec<f64> = records.iter().map(|r| r.total).collect();
            values.sort_by(f64::total_cmp);
            box_summary(category, &values)
        })
        .collect()
}

fn box_summary(category: String, sorted: &[f64]) -> Option<BoxSummary> {
    let q1 = stats::quantile_sorted(sorted, 0.25)?;
    let median = stats::quantile_sorted(sorted, 0.5)?;
    let q3 = stats::quantile_sorted(sorted, 0.75)?;
    let iqr = q3 - q1;
    let low_fence = q1 - 1.5 * iqr;
    let high_fence = q3 + 1.5 * iqr;

    let inside = || sorted.iter().copied().filter(|v| (low_fence..=high_fence).contains(v));
    let lower_whisker = inside().next()?;
    let upper_whisker = inside().last()?;
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| !(low_fence..=high_fence).contains(v))
        .collect();

    Some(BoxSummary {
        category,
        min: *sorted.first()?,
        q1,
        median,
        q3,
        max: *sorted.last()?,
        lower_whisker,
        upper_whisker,
        outliers,
    })
}

/// `(cogs, gross income, branch)` for every record, in view order.
pub fn cost_vs_gross_income(view: &FilteredView) -> Vec<ScatterPoint> {
    view.iter()
        .map(|r| ScatterPoint {
            cogs: r.cogs,
            gross_income: r.gross_income,
            branch: r.branch.clone(),
        })
        .collect()
}

/// Share of records per payment method, most frequent first.
///
/// Equal counts keep first-seen order. Empty views give an empty result.
pub fn payment_shares(view: &FilteredView) -> Vec<CategoryShare> {
    let n = view.len() as f64;
    let mut shares: Vec<CategoryShare> = group_in_order(view, |r| &r.payment)
        .into_iter()
        .map(|(category, records)| CategoryShare {
            category,
            count: records.len(),
            share: records.len() as f64 / n,
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

/// Gross income summed per product line (rows) and branch (columns).
///
/// Both axes are sorted; combinations with no sales are filled with zero.
pub fn gross_income_pivot(view: &FilteredView) -> PivotTable {
    let mut sums: HashMap<(&str, &str), f64> = HashMap::new();
    let mut rows = BTreeSet::new();
    let mut columns = BTreeSet::new();
    for r in view.iter() {
        rows.insert(r.product_line.as_str());
        columns.insert(r.branch.as_str());
        *sums
            .entry((r.product_line.as_str(), r.branch.as_str()))
            .or_default() += r.gross_income;
    }

    let cells = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| sums.get(&(*row, *col)).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    PivotTable {
        rows: rows.into_iter().map(str::to_string).collect(),
        columns: columns.into_iter().map(str::to_string).collect(),
        cells,
    }
}

/// Pearson correlation between every pair of numeric columns.
pub fn correlation_matrix(view: &FilteredView) -> CorrelationMatrix {
    let series: Vec<Vec<f64>> = NUMERIC_FIELDS
        .iter()
        .map(|(_, get)| view.iter().map(get).collect())
        .collect();

    let values = series
        .iter()
        .map(|xs| series.iter().map(|ys| stats::pearson(xs, ys)).collect())
        .collect();

    CorrelationMatrix {
        fields: NUMERIC_FIELDS.iter().map(|(name, _)| name.to_string()).collect(),
        values,
    }
}

pub fn sales_summary(view: &FilteredView) -> SalesSummary {
    let ratings: Vec<f64> = view.iter().map(|r| r.rating).collect();
    SalesSummary {
        records: view.len(),
        total_sales: view.iter().map(|r| r.total).sum(),
        gross_income: view.iter().map(|r| r.gross_income).sum(),
        average_rating: stats::mean(&ratings),
    }
}

/// Group records by a text key, keeping groups in first-seen order.
fn group_in_order<'a>(
    view: &FilteredView<'a>,
    key: impl Fn(&'a SalesRecord) -> &'a String,
) -> Vec<(String, Vec<&'a SalesRecord>)> {
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&'a SalesRecord>)> = Vec::new();
    for r in view.iter() {
        let k = key(r);
        let slot = *index.entry(k.as_str()).or_insert_with(|| {
            groups.push((k.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(r);
    }
    groups
}

// ---------------------------------------------------------------------------
// All views for one selection
// ---------------------------------------------------------------------------

/// Everything the dashboard renders for one filtered view.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardViews {
    pub summary: SalesSummary,
    pub daily_totals: Vec<DailyTotal>,
    pub revenue_by_product_line: Vec<CategoryTotal>,
    pub rating_distribution: RatingDistribution,
    pub spend_by_customer_type: Vec<BoxSummary>,
    pub cost_vs_gross_income: Vec<ScatterPoint>,
    pub payment_shares: Vec<CategoryShare>,
    pub correlation: CorrelationMatrix,
    pub gross_income_pivot: PivotTable,
}

impl DashboardViews {
    pub fn compute(view: &FilteredView) -> Self {
        DashboardViews {
            summary: sales_summary(view),
            daily_totals: daily_totals(view),
            revenue_by_product_line: revenue_by_product_line(view),
            rating_distribution: rating_distribution(view, RATING_BINS),
            spend_by_customer_type: spend_by_customer_type(view),
            cost_vs_gross_income: cost_vs_gross_income(view),
            payment_shares: payment_shares(view),
            correlation: correlation_matrix(view),
            gross_income_pivot: gross_income_pivot(view),
        }
    }
}
