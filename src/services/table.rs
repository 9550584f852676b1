// src/services/table.rs

//! Job table parsing.
//!
//! Turns the rendered `table#jobs` markup into [`RawRow`]s using CSS
//! selectors.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::RawRow;
use crate::utils::{extract_job_id, normalize_whitespace};

/// Selectors for the job table.
#[derive(Debug, Clone)]
pub struct TableSelectors {
    /// Selector for each job row
    pub row_selector: String,

    /// Selector for the cells within a row
    pub cell_selector: String,

    /// Prefix of the info button's element ID
    pub control_id_prefix: String,
}

impl Default for TableSelectors {
    fn default() -> Self {
        Self::for_prefix("info_")
    }
}

impl TableSelectors {
    /// Selectors for the career board with a given control ID prefix.
    pub fn for_prefix(prefix: impl Into<String>) -> Self {
        Self {
            row_selector: "table#jobs tbody tr".to_string(),
            cell_selector: "td".to_string(),
            control_id_prefix: prefix.into(),
        }
    }

    /// Selector for the row-scoped control that carries the job ID.
    pub fn control_selector(&self) -> String {
        format!("button[id^=\"{}\"]", self.control_id_prefix)
    }
}

/// Parser that extracts raw rows from job table HTML.
pub struct TableParser {
    selectors: TableSelectors,
    row_sel: Selector,
    cell_sel: Selector,
    control_sel: Selector,
}

impl TableParser {
    pub fn new(selectors: TableSelectors) -> Result<Self> {
        let row_sel = parse_selector(&selectors.row_selector)?;
        let cell_sel = parse_selector(&selectors.cell_selector)?;
        let control_sel = parse_selector(&selectors.control_selector())?;
        Ok(Self {
            selectors,
            row_sel,
            cell_sel,
            control_sel,
        })
    }

    /// Parse every job row from a document or table fragment.
    ///
    /// Rows without an info control (such as the "no data" placeholder)
    /// are skipped.
    pub fn parse_rows(&self, html: &str) -> Vec<RawRow> {
        let document = Html::parse_document(html);
        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for row in document.select(&self.row_sel) {
            match self.parse_row(&row) {
                Some(raw) => rows.push(raw),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::debug!("Skipped {} table rows without a job control", skipped);
        }
        rows
    }

    fn parse_row(&self, row: &ElementRef) -> Option<RawRow> {
        let control_id = row.select(&self.control_sel).next()?.value().id()?;
        let job_id = extract_job_id(control_id, &self.selectors.control_id_prefix)?;

        let cells = row
            .select(&self.cell_sel)
            .map(|td| normalize_whitespace(&td.text().collect::<String>()))
            .collect();

        Some(RawRow::new(cells, job_id))
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &str) -> String {
        format!(
            r#"<table id="jobs">
                <thead><tr><th>Agency</th><th>Region</th><th>Position</th>
                <th>Item No.</th><th>Posting Date</th><th>Closing Date</th><th></th></tr></thead>
                <tbody>{rows}</tbody>
            </table>"#
        )
    }

    fn job_row(id: &str, agency: &str) -> String {
        format!(
            r#"<tr>
                <td>{agency}</td><td>NCR</td><td> Administrative
                Officer V </td><td>AO5-2025-01</td><td>April 9, 2025</td><td>April 19, 2025</td>
                <td><button id="info_{id}" class="btn">Details</button></td>
            </tr>"#
        )
    }

    fn parser() -> TableParser {
        TableParser::new(TableSelectors::default()).unwrap()
    }

    #[test]
    fn test_parses_rows_in_order() {
        let html = table(&format!(
            "{}{}{}",
            job_row("3", "Agency C"),
            job_row("2", "Agency B"),
            job_row("1", "Agency A")
        ));
        let rows = parser().parse_rows(&html);

        let ids: Vec<&str> = rows.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
        assert_eq!(rows[0].cell(0), "Agency C");
        assert_eq!(rows[0].cell(2), "Administrative Officer V");
        assert_eq!(rows[0].cell(5), "April 19, 2025");
    }

    #[test]
    fn test_skips_placeholder_row() {
        let html = table(
            r#"<tr class="odd"><td valign="top" colspan="7" class="dataTables_empty">No data available in table</td></tr>"#,
        );
        assert!(parser().parse_rows(&html).is_empty());
    }

    #[test]
    fn test_ignores_rows_outside_job_table() {
        let html = format!(
            r#"<table id="other"><tbody>{}</tbody></table>{}"#,
            job_row("99", "Elsewhere"),
            table(&job_row("1", "Agency A"))
        );
        let rows = parser().parse_rows(&html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].job_id, "1");
    }

    #[test]
    fn test_custom_prefix() {
        let html = table(
            r#"<tr><td>A</td><td>B</td><td>C</td><td>D</td><td>E</td><td>F</td>
               <td><button id="job-55">x</button></td></tr>"#,
        );
        let parser = TableParser::new(TableSelectors::for_prefix("job-")).unwrap();
        let rows = parser.parse_rows(&html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].job_id, "55");
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(parse_selector("[[invalid").is_err());
    }
}
