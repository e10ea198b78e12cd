//! Report output port trait.

use std::path::Path;

use crate::domain::error::TearsheetError;
use crate::domain::report::TearsheetDocument;

/// Port for writing rendered tear sheets.
pub trait ReportPort {
    fn write(&self, document: &TearsheetDocument, output_path: &Path) -> Result<(), TearsheetError>;
}
