//! Report output.

use crate::domain::error::StratlabError;
use crate::domain::metrics::PerformanceReport;

pub trait ReportPort {
    fn write(&self, report: &PerformanceReport, output_path: &str) -> Result<(), StratlabError>;
}
