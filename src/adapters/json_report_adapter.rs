//! JSON report adapter implementing ReportPort.

use std::fs;

use crate::domain::error::StratlabError;
use crate::domain::metrics::PerformanceReport;
use crate::ports::report_port::ReportPort;

/// Serialises a report with the field names of the HTTP response body.
pub fn to_json(report: &PerformanceReport, pretty: bool) -> Result<String, StratlabError> {
    let result = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    result.map_err(|e| StratlabError::Report {
        reason: format!("failed to serialise report: {e}"),
    })
}

/// `{"error": "..."}` body for a run that could not produce a report.
pub fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

pub struct JsonReportAdapter {
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, report: &PerformanceReport, output_path: &str) -> Result<(), StratlabError> {
        let body = to_json(report, self.pretty)?;
        fs::write(output_path, body).map_err(|e| StratlabError::Report {
            reason: format!("failed to write {output_path}: {e}"),
        })
    }
}
