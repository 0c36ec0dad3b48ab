//! Query parameters of an analysis request

use crate::error::{ServerError, ServerResult};
use s3_analyser::{ReportFormat, SizeUnit};
use serde::Deserialize;

/// Characters refused in any parameter
const FORBIDDEN: [char; 6] = [';', '|', '&', ' ', '\t', '"'];

/// Raw query string of `GET /`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyseQuery {
    pub token: Option<String>,
    pub unit: Option<String>,
    pub prefix: Option<String>,
    pub conc: Option<String>,
    pub fmt: Option<String>,
    pub pretty: Option<String>,

    /// Present (with any value) for a dry run
    pub echo: Option<String>,
}

/// Validated request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyseParams {
    pub unit: Option<SizeUnit>,
    pub prefix: Option<String>,
    pub concurrency: Option<usize>,
    pub format: ReportFormat,
    pub echo: bool,
}

impl AnalyseQuery {
    /// Format asked for explicitly, by `pretty`, or by the `Accept` header
    pub fn format_name(&self, accept: &str) -> String {
        if let Some(ref fmt) = self.fmt {
            return fmt.clone();
        }
        negotiate_format(self.pretty.as_deref(), accept)
            .as_str()
            .to_string()
    }

    /// Sanitize and parse every parameter
    pub fn validate(&self, accept: &str) -> ServerResult<AnalyseParams> {
        let fmt = self.format_name(accept);

        for value in [self.unit.as_deref(), self.prefix.as_deref(), self.conc.as_deref(), Some(fmt.as_str())]
            .into_iter()
            .flatten()
        {
            if value.contains(FORBIDDEN) {
                return Err(ServerError::BadRequest(format!(
                    "forbidden character in '{}'",
                    value
                )));
            }
        }

        let unit = self
            .unit
            .as_deref()
            .map(str::parse::<SizeUnit>)
            .transpose()
            .map_err(ServerError::BadRequest)?;

        let concurrency = self
            .conc
            .as_deref()
            .map(|c| {
                c.parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ServerError::BadRequest(format!("invalid conc '{}'", c)))
            })
            .transpose()?;

        let format = fmt.parse::<ReportFormat>().map_err(ServerError::BadRequest)?;

        Ok(AnalyseParams {
            unit,
            prefix: self.prefix.clone(),
            concurrency,
            format,
            echo: self.echo.is_some(),
        })
    }
}

/// Pick a format from `pretty` and the `Accept` header; JSON by default
pub fn negotiate_format(pretty: Option<&str>, accept: &str) -> ReportFormat {
    if pretty.is_some_and(|p| !p.is_empty()) {
        ReportFormat::JsonPretty
    } else if accept.contains("json") {
        ReportFormat::Json
    } else if accept.contains("csv") {
        ReportFormat::Csv
    } else if accept.contains("tab-separated-values") {
        ReportFormat::Tsv
    } else if accept.contains("text/plain") {
        ReportFormat::Plain
    } else if accept.contains("html") {
        ReportFormat::Html
    } else {
        ReportFormat::Json
    }
}

impl AnalyseParams {
    /// The CLI invocation equivalent to this request
    pub fn command_line(&self) -> String {
        let mut cmd = format!("s3-analyser --fmt \"{}\"", self.format);
        if let Some(unit) = self.unit {
            cmd.push_str(&format!(" --unit \"{}\"", unit));
        }
        if let Some(ref prefix) = self.prefix {
            cmd.push_str(&format!(" --prefix \"{}\"", prefix));
        }
        if let Some(conc) = self.concurrency {
            cmd.push_str(&format!(" --conc \"{}\"", conc));
        }
        cmd
    }
}
