//! Job posting data structures.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Number of descriptive cells a job table row carries.
pub const DESCRIPTIVE_CELLS: usize = 6;

/// A row as read off the rendered job table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Cell texts in column order, whitespace-normalized
    pub cells: Vec<String>,

    /// Identifier taken from the row's info button
    pub job_id: String,
}

impl RawRow {
    pub fn new(cells: Vec<String>, job_id: impl Into<String>) -> Self {
        Self {
            cells,
            job_id: job_id.into(),
        }
    }

    /// Cell text at `index`, or an empty string when the row is short.
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// A job posting scraped from the career board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Posting {
    /// Hiring agency
    pub agency: String,

    /// Region the position is assigned to
    pub region: String,

    /// Position title
    pub position: String,

    /// Plantilla item number
    pub item_no: String,

    /// Date the posting went up
    pub posting_date: String,

    /// Application deadline
    pub closing_date: String,

    /// Stable identifier of the posting on the board
    #[serde(rename = "jobid")]
    pub job_id: String,

    /// Full URL to the posting's detail page
    pub job_link: String,
}

impl Posting {
    /// Build a posting from a raw table row.
    ///
    /// `link_base` is joined verbatim with the row's job ID.
    pub fn from_row(row: &RawRow, link_base: &str) -> Self {
        Self {
            agency: row.cell(0).to_string(),
            region: row.cell(1).to_string(),
            position: row.cell(2).to_string(),
            item_no: row.cell(3).to_string(),
            posting_date: row.cell(4).to_string(),
            closing_date: row.cell(5).to_string(),
            job_id: row.job_id.clone(),
            job_link: job_link(link_base, &row.job_id),
        }
    }

    /// Format posting for display using a template.
    ///
    /// Supported placeholders:
    /// - `{agency}`, `{region}`, `{position}`, `{item_no}`
    /// - `{posting_date}`, `{closing_date}`, `{job_id}`, `{job_link}`
    ///
    /// The template is scanned once; substituted values are never
    /// re-scanned, so braces inside scraped text come through verbatim.
    /// Unknown placeholders are left as written.
    pub fn format(&self, template: &str) -> String {
        self.render(template, None)
    }

    /// Like [`format`](Self::format), with `{index}` bound to `index`.
    pub fn format_numbered(&self, template: &str, index: usize) -> String {
        self.render(template, Some(index))
    }

    fn render(&self, template: &str, index: Option<usize>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let token = tail
                .find('}')
                .and_then(|close| Some((close, self.placeholder(&tail[1..close], index)?)));
            match token {
                Some((close, value)) => {
                    out.push_str(&value);
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn placeholder(&self, name: &str, index: Option<usize>) -> Option<Cow<'_, str>> {
        let value = match name {
            "agency" => &self.agency,
            "region" => &self.region,
            "position" => &self.position,
            "item_no" => &self.item_no,
            "posting_date" => &self.posting_date,
            "closing_date" => &self.closing_date,
            "job_id" => &self.job_id,
            "job_link" => &self.job_link,
            "index" => return index.map(|i| Cow::Owned(i.to_string())),
            _ => return None,
        };
        Some(Cow::Borrowed(value.as_str()))
    }

    /// Whether this posting refers to the same job as `other`.
    pub fn same_job(&self, other: &Posting) -> bool {
        self.job_id == other.job_id
    }
}

/// Detail page URL for a job ID.
pub fn job_link(link_base: &str, job_id: &str) -> String {
    format!("{link_base}{job_id}")
}
