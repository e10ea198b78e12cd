//! Tear sheet inputs and the rendered document model.
//!
//! The renderer fills a [`TearsheetDocument`] with sections made of SVG
//! figures, tables and text lines. Output adapters serialise the document;
//! none of them compute anything.

use crate::domain::factors::FactorSet;
use crate::domain::positions::PositionTable;
use crate::domain::series::ReturnSeries;
use crate::domain::turnover::TransactionDay;

/// Everything loaded for one report.
#[derive(Debug, Clone)]
pub struct TearsheetInputs {
    pub returns: ReturnSeries,
    pub benchmark: ReturnSeries,
    pub benchmark2: Option<ReturnSeries>,
    pub factors: Option<FactorSet>,
    /// Dollar position values, `cash` column included.
    pub positions: Option<PositionTable>,
    pub transactions: Option<Vec<TransactionDay>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub text: String,
    /// CSS colour for the cell background.
    pub background: Option<String>,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            background: None,
        }
    }

    pub fn shaded(text: impl Into<String>, background: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            background: Some(background.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub caption: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Figure(String),
    Table(Table),
    Text(String),
    /// Highlighted remark, e.g. a data-quality warning.
    Note(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }
}

/// A section that could not be produced, with the error that stopped it.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSection {
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TearsheetDocument {
    pub title: String,
    pub subtitle: String,
    pub sections: Vec<Section>,
    pub skipped: Vec<SkippedSection>,
}

impl TearsheetDocument {
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }

    pub fn is_skipped(&self, title: &str) -> bool {
        self.skipped.iter().any(|s| s.title == title)
    }
}
