/*!
 * Report rendering
 *
 * Turns the ByBucket aggregate (metrics mode) or the per-bucket usage (raw
 * mode) into text. Table formats go through `comfy-table`; `tsv`/`csv` are
 * plain joins; JSON is `{"Buckets":[...]}` with keys in alphabetical order.
 */

use crate::core::{Aggregates, BucketRow, BucketUsage};
use crate::error::Result;
use crate::protocol::StorageClass;
use chrono::{DateTime, Utc};
use comfy_table::{presets, Table};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Size unit for byte columns, 1024-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizeUnit {
    B,
    KB,
    #[default]
    MB,
    GB,
    TB,
}

impl SizeUnit {
    pub fn divisor(&self) -> f64 {
        match self {
            SizeUnit::B => 1.0,
            SizeUnit::KB => 1024.0,
            SizeUnit::MB => 1024.0 * 1024.0,
            SizeUnit::GB => 1024.0 * 1024.0 * 1024.0,
            SizeUnit::TB => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeUnit::B => "B",
            SizeUnit::KB => "KB",
            SizeUnit::MB => "MB",
            SizeUnit::GB => "GB",
            SizeUnit::TB => "TB",
        }
    }
}

impl FromStr for SizeUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "B" => Ok(SizeUnit::B),
            "KB" => Ok(SizeUnit::KB),
            "MB" => Ok(SizeUnit::MB),
            "GB" => Ok(SizeUnit::GB),
            "TB" => Ok(SizeUnit::TB),
            _ => Err(format!("unknown unit '{}', expected B|KB|MB|GB|TB", s)),
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a byte count to `unit`: two decimals, trailing zeros and a
/// dangling point removed
pub fn convert_bytes(bytes: f64, unit: SizeUnit) -> String {
    let formatted = format!("{:.2}", bytes / unit.divisor());
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Output format of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Plain,
    Simple,
    Grid,
    Pipe,
    Html,
    Tsv,
    Csv,
    Json,
    JsonPretty,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 9] = [
        ReportFormat::Plain,
        ReportFormat::Simple,
        ReportFormat::Grid,
        ReportFormat::Pipe,
        ReportFormat::Html,
        ReportFormat::Tsv,
        ReportFormat::Csv,
        ReportFormat::Json,
        ReportFormat::JsonPretty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Plain => "plain",
            ReportFormat::Simple => "simple",
            ReportFormat::Grid => "grid",
            ReportFormat::Pipe => "pipe",
            ReportFormat::Html => "html",
            ReportFormat::Tsv => "tsv",
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
            ReportFormat::JsonPretty => "json_pretty",
        }
    }

    /// HTTP content type of the rendered text
    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Html => "text/html; charset=utf-8",
            ReportFormat::Tsv => "text/tab-separated-values; charset=utf-8",
            ReportFormat::Csv => "text/csv; charset=utf-8",
            ReportFormat::Json | ReportFormat::JsonPretty => "application/json",
            _ => "text/plain; charset=utf-8",
        }
    }

    fn is_json(&self) -> bool {
        matches!(self, ReportFormat::Json | ReportFormat::JsonPretty)
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ReportFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ReportFormat::ALL.iter().map(|f| f.as_str()).collect();
                format!("unknown format '{}', expected {}", s, names.join("|"))
            })
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header row and cell rows of a tabular report
struct Grid {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Render the metrics summary
pub fn render_summary(aggregates: &Aggregates, unit: SizeUnit, format: ReportFormat) -> Result<String> {
    if format.is_json() {
        let buckets: Vec<Value> = aggregates.bucket_rows().map(summary_json).collect();
        return to_json(buckets, format);
    }

    let headers = vec![
        "Bucket".to_string(),
        "Region".to_string(),
        "Files".to_string(),
        format!("Total({})", unit),
        format!("STD({})", unit),
        format!("RR({})", unit),
        format!("IA({})", unit),
        "Creation(UTC)".to_string(),
    ];
    let rows = aggregates
        .bucket_rows()
        .map(|row| {
            vec![
                row.bucket.clone(),
                row.region.clone(),
                format_count(row.totals.files),
                convert_bytes(row.totals.bytes, unit),
                convert_bytes(row.totals.bytes_standard, unit),
                convert_bytes(row.totals.bytes_rr, unit),
                convert_bytes(row.totals.bytes_ia, unit),
                format_date(row.creation_date),
            ]
        })
        .collect();

    Ok(render_grid(&Grid { headers, rows }, format))
}

/// Render the raw traversal, one column per storage class present
pub fn render_raw(usage: &[BucketUsage], unit: SizeUnit, format: ReportFormat) -> Result<String> {
    if format.is_json() {
        let buckets = usage.iter().map(raw_json).collect::<Result<Vec<Value>>>()?;
        return to_json(buckets, format);
    }

    let classes: BTreeSet<StorageClass> = usage
        .iter()
        .flat_map(|u| u.storage.keys().cloned())
        .collect();

    let mut headers = vec![
        "Bucket".to_string(),
        "Region".to_string(),
        "Files".to_string(),
        format!("Total({})", unit),
    ];
    headers.extend(classes.iter().map(|c| format!("{}({})", c, unit)));
    headers.push("LastModified(UTC)".to_string());

    let rows = usage
        .iter()
        .map(|entry| {
            let mut row = vec![
                entry.bucket.name.clone(),
                entry.bucket.region.clone(),
                entry.total_files.to_string(),
                convert_bytes(entry.total_size as f64, unit),
            ];
            row.extend(
                classes
                    .iter()
                    .map(|c| convert_bytes(entry.class(c).total_size as f64, unit)),
            );
            row.push(format_date(entry.last_modified));
            row
        })
        .collect();

    Ok(render_grid(&Grid { headers, rows }, format))
}

fn summary_json(row: &BucketRow) -> Value {
    json!({
        "Bucket": row.bucket,
        "Region": row.region,
        "Files": row.totals.files,
        "Bytes": row.totals.bytes,
        "Bytes-ST": row.totals.bytes_standard,
        "Bytes-RR": row.totals.bytes_rr,
        "Bytes-IA": row.totals.bytes_ia,
        "CreationDate": row.creation_date.map(iso_seconds),
    })
}

fn raw_json(entry: &BucketUsage) -> Result<Value> {
    let mut stats = Map::new();
    for (class, class_stats) in &entry.storage {
        stats.insert(class.to_string(), serde_json::to_value(class_stats)?);
    }

    Ok(json!({
        "Name": entry.bucket.name,
        "Region": entry.bucket.region,
        "CreationDate": entry.bucket.creation_date,
        "TotalFiles": entry.total_files,
        "TotalSize": entry.total_size,
        "LastModified": entry.last_modified,
        "StorageStats": stats,
    }))
}

fn to_json(buckets: Vec<Value>, format: ReportFormat) -> Result<String> {
    let document = json!({ "Buckets": buckets });
    let text = if format == ReportFormat::JsonPretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    Ok(text)
}

fn render_grid(grid: &Grid, format: ReportFormat) -> String {
    match format {
        ReportFormat::Tsv => join_rows(grid, "\t"),
        ReportFormat::Csv => join_rows(grid, ","),
        ReportFormat::Html => html_table(grid),
        _ => {
            let preset = match format {
                ReportFormat::Simple => presets::ASCII_HORIZONTAL_ONLY,
                ReportFormat::Grid => presets::ASCII_FULL,
                ReportFormat::Pipe => presets::ASCII_MARKDOWN,
                _ => presets::NOTHING,
            };
            let mut table = Table::new();
            table.load_preset(preset).set_header(grid.headers.clone());
            for row in &grid.rows {
                table.add_row(row.clone());
            }
            table.to_string()
        }
    }
}

fn join_rows(grid: &Grid, sep: &str) -> String {
    let mut lines = vec![grid.headers.join(sep)];
    lines.extend(grid.rows.iter().map(|row| row.join(sep)));
    lines.join("\n")
}

fn html_table(grid: &Grid) -> String {
    let mut html = String::from("<table>\n<thead>\n<tr>");
    for header in &grid.headers {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in &grid.rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Object counts arrive as floats from the metrics API
fn format_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

fn iso_seconds(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(iso_seconds).unwrap_or_else(|| "-".to_string())
}
