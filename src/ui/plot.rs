use std::f64::consts::TAU;
use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, PlotPoint,
    PlotPoints, Points, Polygon, Text,
};

use crate::color::{diverging, generate_palette};
use crate::data::aggregate::DashboardViews;
use crate::state::AppState;

const CHART_HEIGHT: f32 = 280.0;

const REFLECTION: &str = "Filtering by branch and product line makes it easy to see which \
product lines are most profitable, how customer ratings are spread and which payment \
methods customers prefer, which feeds directly into marketing and operations decisions.";

// ---------------------------------------------------------------------------
// Dashboard (central panel)
// ---------------------------------------------------------------------------

/// Render every chart for the current selection in the central panel.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view sales  (File → Open…)");
        });
        return;
    }

    let views = &state.views;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Supermarket Sales Dashboard");
            summary_strip(ui, views);
            if views.summary.records == 0 {
                ui.label(RichText::new("No records match the current filters.").italics());
            }
            ui.separator();

            section(ui, "Total sales over time", |ui| daily_totals_chart(ui, views));
            section(ui, "Revenue by product line", |ui| revenue_chart(ui, views));
            section(ui, "Customer rating distribution", |ui| rating_chart(ui, views));
            section(ui, "Spend by customer type", |ui| spend_chart(ui, views));
            section(ui, "Cost vs. gross income", |ui| scatter_chart(ui, state));
            section(ui, "Payment methods", |ui| payment_chart(ui, views));
            section(ui, "Correlation between numeric columns", |ui| {
                correlation_heatmap(ui, views)
            });
            section(ui, "Gross income by product line and branch", |ui| {
                pivot_chart(ui, state)
            });

            ui.separator();
            ui.label(RichText::new(REFLECTION).italics());
        });
}

fn section(ui: &mut Ui, title: &str, body: impl FnOnce(&mut Ui)) {
    ui.add_space(8.0);
    ui.strong(title);
    body(ui);
}

fn summary_strip(ui: &mut Ui, views: &DashboardViews) {
    let s = &views.summary;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("Records: {}", s.records));
        ui.separator();
        ui.label(format!("Total sales: ${:.2}", s.total_sales));
        ui.separator();
        ui.label(format!("Gross income: ${:.2}", s.gross_income));
        ui.separator();
        match s.average_rating {
            Some(r) => ui.label(format!("Average rating: {r:.2}")),
            None => ui.label("Average rating: –"),
        };
    });
}

// ---------------------------------------------------------------------------
// Axis helpers
// ---------------------------------------------------------------------------

fn date_to_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn date_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    NaiveDate::from_num_days_from_ce_opt(mark.value.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Label integer grid positions with category names.
fn category_axis(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let i = mark.value.round();
        if (mark.value - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

fn daily_totals_chart(ui: &mut Ui, views: &DashboardViews) {
    let points: PlotPoints = views
        .daily_totals
        .iter()
        .map(|d| [date_to_x(d.date), d.total])
        .collect();

    Plot::new("daily_totals")
        .height(CHART_HEIGHT)
        .allow_scroll(false)
        .x_axis_label("Date")
        .y_axis_label("Total ($)")
        .x_axis_formatter(date_axis)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(points).name("Total").width(1.5));
        });
}

fn revenue_chart(ui: &mut Ui, views: &DashboardViews) {
    let revenue = &views.revenue_by_product_line;
    let palette = generate_palette(revenue.len());
    // Largest at the top of a horizontal chart.
    let bars: Vec<Bar> = revenue
        .iter()
        .enumerate()
        .map(|(i, c)| {
            Bar::new((revenue.len() - 1 - i) as f64, c.total)
                .name(&c.category)
                .fill(palette[i])
        })
        .collect();
    let labels: Vec<String> = revenue.iter().rev().map(|c| c.category.clone()).collect();

    Plot::new("revenue_by_product_line")
        .height(CHART_HEIGHT)
        .allow_scroll(false)
        .x_axis_label("Total ($)")
        .y_axis_formatter(category_axis(labels))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal().width(0.7));
        });
}

fn rating_chart(ui: &mut Ui, views: &DashboardViews) {
    let dist = &views.rating_distribution;
    let width = dist.bin_width().unwrap_or(1.0);
    let bars: Vec<Bar> = dist
        .bins
        .iter()
        .map(|b| Bar::new((b.lower + b.upper) / 2.0, b.count as f64).width(width))
        .collect();
    let density: PlotPoints = dist
        .density
        .iter()
        .map(|p| [p.x, p.expected_count])
        .collect();

    Plot::new("rating_distribution")
        .height(CHART_HEIGHT)
        .allow_scroll(false)
        .legend(Legend::default())
        .x_axis_label("Rating")
        .y_axis_label("Count")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("Ratings").color(Color32::LIGHT_BLUE));
            plot_ui.line(Line::new(density).name("Density").color(Color32::DARK_BLUE).width(2.0));
        });
}

fn spend_chart(ui: &mut Ui, views: &DashboardViews) {
    let groups = &views.spend_by_customer_type;
    let palette = generate_palette(groups.len());
    let labels: Vec<String> = groups.iter().map(|g| g.category.clone()).collect();

    Plot::new("spend_by_customer_type")
        .height(CHART_HEIGHT)
        .allow_scroll(false)
        .y_axis_label("Total ($)")
        .x_axis_formatter(category_axis(labels))
        .show(ui, |plot_ui| {
            for (i, g) in groups.iter().enumerate() {
                let spread = BoxSpread::new(g.lower_whisker, g.q1, g.median, g.q3, g.upper_whisker);
                let elem = BoxElem::new(i as f64, spread)
                    .name(&g.category)
                    .box_width(0.5)
                    .whisker_width(0.3);
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&g.category).color(palette[i]));

                if !g.outliers.is_empty() {
                    let outliers: PlotPoints = g.outliers.iter().map(|&v| [i as f64, v]).collect();
                    plot_ui.points(Points::new(outliers).radius(2.5).color(palette[i]));
                }
            }
        });
}

fn scatter_chart(ui: &mut Ui, state: &AppState) {
    let points = &state.views.cost_vs_gross_income;
    let legend = state
        .branch_colors
        .as_ref()
        .map(|cm| cm.legend_entries())
        .unwrap_or_default();

    Plot::new("cost_vs_gross_income")
        .height(CHART_HEIGHT)
        .allow_scroll(false)
        .legend(Legend::default())
        .x_axis_label("cogs")
        .y_axis_label("gross income")
        .show(ui, |plot_ui| {
            for (branch, color) in &legend {
                let series: PlotPoints = points
                    .iter()
                    .filter(|p| &p.branch == branch)
                    .map(|p| [p.cogs, p.gross_income])
                    .collect();
                plot_ui.points(Points::new(series).name(branch).color(*color).radius(2.0));
            }
        });
}

fn payment_chart(ui: &mut Ui, views: &DashboardViews) {
    let shares = &views.payment_shares;
    let palette = generate_palette(shares.len());

    Plot::new("payment_shares")
        .height(CHART_HEIGHT)
        .allow_scroll(false)
        .legend(Legend::default())
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            let mut start = 0.0;
            for (share, color) in shares.iter().zip(&palette) {
                let sweep = share.share * TAU;
                let steps = ((sweep / TAU) * 96.0).ceil().max(1.0) as usize;
                let mut outline = vec![[0.0, 0.0]];
                outline.extend((0..=steps).map(|k| {
                    let a = start + sweep * k as f64 / steps as f64;
                    [a.cos(), a.sin()]
                }));
                plot_ui.polygon(
                    Polygon::new(PlotPoints::new(outline))
                        .name(&share.category)
                        .fill_color(*color)
                        .stroke(egui::Stroke::new(1.0, Color32::WHITE)),
                );

                let mid = start + sweep / 2.0;
                plot_ui.text(Text::new(
                    PlotPoint::new(0.65 * mid.cos(), 0.65 * mid.sin()),
                    RichText::new(format!("{:.1}%", share.share * 100.0)).color(Color32::BLACK),
                ));
                start += sweep;
            }
        });
}

fn correlation_heatmap(ui: &mut Ui, views: &DashboardViews) {
    let corr = &views.correlation;
    let n = corr.fields.len();

    TableBuilder::new(ui)
        .id_salt("correlation_heatmap")
        .vscroll(false)
        .column(Column::auto().at_least(90.0))
        .columns(Column::exact(80.0), n)
        .header(22.0, |mut header| {
            header.col(|ui| {
                ui.label("");
            });
            for field in &corr.fields {
                header.col(|ui| {
                    ui.strong(field);
                });
            }
        })
        .body(|mut body| {
            for (field, row) in corr.fields.iter().zip(&corr.values) {
                body.row(22.0, |mut table_row| {
                    table_row.col(|ui| {
                        ui.strong(field);
                    });
                    for value in row {
                        table_row.col(|ui| match value {
                            Some(v) => {
                                ui.painter().rect_filled(ui.max_rect(), 0.0, diverging(*v));
                                ui.label(RichText::new(format!("{v:.2}")).color(Color32::BLACK));
                            }
                            None => {
                                ui.weak("n/a");
                            }
                        });
                    }
                });
            }
        });
}

fn pivot_chart(ui: &mut Ui, state: &AppState) {
    let pivot = &state.views.gross_income_pivot;

    let mut stacks: Vec<BarChart> = Vec::with_capacity(pivot.columns.len());
    for (j, branch) in pivot.columns.iter().enumerate() {
        let color = state
            .branch_colors
            .as_ref()
            .map(|cm| cm.color_for(branch))
            .unwrap_or(Color32::GRAY);
        let bars: Vec<Bar> = pivot
            .cells
            .iter()
            .enumerate()
            .map(|(i, row)| Bar::new(i as f64, row[j]).name(format!("{} / {branch}", pivot.rows[i])))
            .collect();
        let below: Vec<&BarChart> = stacks.iter().collect();
        let chart = BarChart::new(bars)
            .name(branch)
            .color(color)
            .width(0.6)
            .stack_on(&below);
        stacks.push(chart);
    }

    Plot::new("gross_income_pivot")
        .height(CHART_HEIGHT)
        .allow_scroll(false)
        .legend(Legend::default())
        .y_axis_label("Gross income ($)")
        .x_axis_formatter(category_axis(pivot.rows.clone()))
        .show(ui, |plot_ui| {
            for chart in stacks {
                plot_ui.bar_chart(chart);
            }
        });

    ui.add_space(4.0);
    TableBuilder::new(ui)
        .id_salt("gross_income_pivot_table")
        .striped(true)
        .vscroll(false)
        .column(Column::auto().at_least(160.0))
        .columns(Column::auto().at_least(70.0), pivot.columns.len() + 1)
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("Product line");
            });
            for branch in &pivot.columns {
                header.col(|ui| {
                    ui.strong(branch);
                });
            }
            header.col(|ui| {
                ui.strong("Total");
            });
        })
        .body(|mut body| {
            for (i, line) in pivot.rows.iter().enumerate() {
                body.row(18.0, |mut table_row| {
                    table_row.col(|ui| {
                        ui.label(line);
                    });
                    for value in &pivot.cells[i] {
                        table_row.col(|ui| {
                            ui.label(format!("{value:.2}"));
                        });
                    }
                    table_row.col(|ui| {
                        ui.label(format!("{:.2}", pivot.row_total(i)));
                    });
                });
            }
        });
}
