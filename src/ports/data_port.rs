//! Input data port trait.

use std::path::Path;

use crate::domain::error::TearsheetError;
use crate::domain::factors::FactorSet;
use crate::domain::positions::PositionTable;
use crate::domain::series::ReturnSeries;
use crate::domain::turnover::TransactionDay;

pub trait DataPort {
    /// Daily fractional returns, named after the value column.
    fn load_returns(&self, path: &Path) -> Result<ReturnSeries, TearsheetError>;

    fn load_factors(&self, path: &Path) -> Result<FactorSet, TearsheetError>;

    /// Dollar position values per date, `cash` column included.
    fn load_positions(&self, path: &Path) -> Result<PositionTable, TearsheetError>;

    fn load_transactions(&self, path: &Path) -> Result<Vec<TransactionDay>, TearsheetError>;
}
