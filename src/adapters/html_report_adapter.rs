//! HTML report adapter implementing ReportPort.
//!
//! Serialises a [`TearsheetDocument`] into one self-contained HTML page with
//! inline SVG figures. The page skeleton is a template with `{{PLACEHOLDER}}`
//! markers resolved from the document.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::adapters::svg_report::canvas::escape;
use crate::domain::error::TearsheetError;
use crate::domain::report::{Block, Section, SkippedSection, Table, TearsheetDocument};
use crate::ports::report_port::ReportPort;

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{TITLE}}</title>
<style>
body { font-family: Arial, sans-serif; color: #222; max-width: 960px; margin: 2em auto; }
h1 { margin-bottom: 0.2em; }
.subtitle { color: #666; margin-top: 0; }
section { margin: 2em 0; }
table { border-collapse: collapse; margin: 0.5em 0; font-size: 13px; }
caption { text-align: left; font-weight: bold; padding-bottom: 4px; }
th, td { border: 1px solid #ddd; padding: 3px 8px; text-align: right; }
th:first-child, td:first-child { text-align: left; }
.note { background: #fff4e5; border-left: 4px solid #ff9800; padding: 6px 10px; }
.ts-figure { width: 100%; height: auto; }
.skipped li { color: #a33; }
</style>
</head>
<body>
<h1>{{TITLE}}</h1>
<p class="subtitle">{{SUBTITLE}}</p>
{{SECTIONS}}
{{SKIPPED}}
</body>
</html>
"#;

pub struct HtmlReportAdapter {
    template: String,
}

impl HtmlReportAdapter {
    pub fn new() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Use a custom page skeleton. Markers that are absent are ignored.
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, document: &TearsheetDocument) -> String {
        let sections: String = document.sections.iter().map(render_section).collect();
        self.template
            .replace("{{TITLE}}", &escape(&document.title))
            .replace("{{SUBTITLE}}", &escape(&document.subtitle))
            .replace("{{SECTIONS}}", &sections)
            .replace("{{SKIPPED}}", &render_skipped(&document.skipped))
    }
}

impl Default for HtmlReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn render_section(section: &Section) -> String {
    let mut html = format!("<section>\n<h2>{}</h2>\n", escape(&section.title));
    for block in &section.blocks {
        match block {
            Block::Figure(svg) => {
                html.push_str(svg);
                html.push('\n');
            }
            Block::Table(table) => html.push_str(&render_table(table)),
            Block::Text(text) => html.push_str(&format!("<p>{}</p>\n", escape(text))),
            Block::Note(text) => {
                html.push_str(&format!("<p class=\"note\">{}</p>\n", escape(text)))
            }
        }
    }
    html.push_str("</section>\n");
    html
}

fn render_table(table: &Table) -> String {
    let mut html = String::from("<table>\n");
    if let Some(caption) = &table.caption {
        html.push_str(&format!("<caption>{}</caption>\n", escape(caption)));
    }
    if !table.headers.is_empty() {
        html.push_str("<tr>");
        for h in &table.headers {
            html.push_str(&format!("<th>{}</th>", escape(h)));
        }
        html.push_str("</tr>\n");
    }
    for row in &table.rows {
        html.push_str("<tr>");
        for cell in row {
            match &cell.background {
                Some(bg) => html.push_str(&format!(
                    "<td style=\"background:{}\">{}</td>",
                    escape(bg),
                    escape(&cell.text)
                )),
                None => html.push_str(&format!("<td>{}</td>", escape(&cell.text))),
            }
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
    html
}

fn render_skipped(skipped: &[SkippedSection]) -> String {
    if skipped.is_empty() {
        return String::new();
    }
    let mut html = String::from("<section class=\"skipped\">\n<h2>Skipped sections</h2>\n<ul>\n");
    for s in skipped {
        html.push_str(&format!(
            "<li><strong>{}</strong>: {}</li>\n",
            escape(&s.title),
            escape(&s.reason)
        ));
    }
    html.push_str("</ul>\n</section>\n");
    html
}

impl ReportPort for HtmlReportAdapter {
    fn write(
        &self,
        document: &TearsheetDocument,
        output_path: &Path,
    ) -> Result<(), TearsheetError> {
        let html = self.render(document);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(TearsheetError::Io)?;
        }
        fs::write(output_path, html).map_err(TearsheetError::Io)?;
        info!(path = %output_path.display(), "report written");
        Ok(())
    }
}
