// src/services/page_reader.rs

//! Paginated job table abstraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::RawRow;

/// A rendered, paginated job table.
///
/// Implementations own whatever drives the page (a browser tab in
/// production, a scripted page list in tests). Every method suspends
/// until the table is in a readable state.
#[async_trait]
pub trait PageReader: Send {
    /// Switch the table to its largest page size.
    async fn ensure_full_page_size(&mut self) -> Result<()>;

    /// Rows on the current page, top to bottom.
    async fn current_rows(&mut self) -> Result<Vec<RawRow>>;

    /// Whether the next-page control is present and enabled.
    async fn has_next_page(&mut self) -> Result<bool>;

    /// Move to the next page and wait for its rows to load.
    async fn advance_page(&mut self) -> Result<()>;

    /// Release the underlying page resources.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
