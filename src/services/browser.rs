// src/services/browser.rs

//! Headless Chrome driver for the career board.
//!
//! The board renders its job list client-side (DataTables), so rows only
//! exist after scripts run. [`ChromeTableReader`] drives a real browser
//! tab: it picks the region filter, widens the page size, reads the
//! table markup and pages through it.

use std::path::Path;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{RawRow, ScraperConfig};
use crate::services::PageReader;
use crate::services::table::{TableParser, TableSelectors};
use crate::utils::poll::{PollPolicy, poll_until};

const REGION_SELECT: &str = r#"select[name="region"]"#;
const SORT_BUTTON: &str = r#"button[name="sort_list"]"#;
const LENGTH_SELECT: &str = r#"select[name="jobs_length"]"#;
const TABLE_ROWS: &str = "table#jobs tbody tr";
const NEXT_BUTTON: &str = "#jobs_next";

/// Row count and pagination state of the rendered table.
#[derive(Debug, Deserialize)]
struct TableState {
    rows: usize,
    last: bool,
}

/// [`PageReader`] backed by a Chromium tab.
pub struct ChromeTableReader {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    config: ScraperConfig,
    parser: TableParser,
    poll: PollPolicy,
    closed: bool,
}

impl ChromeTableReader {
    /// Launch Chromium and open the job table, filtered by region.
    ///
    /// The browser is shut down again if any setup step fails.
    pub async fn open(config: &ScraperConfig) -> Result<Self> {
        let mut reader = Self::launch(config).await?;
        if let Err(e) = reader.load_job_table().await {
            let _ = reader.close().await;
            return Err(e);
        }
        Ok(reader)
    }

    /// Launch Chromium with a blank tab, without visiting the board.
    pub async fn launch(config: &ScraperConfig) -> Result<Self> {
        let parser = TableParser::new(TableSelectors::for_prefix(&config.control_id_prefix))?;
        let (mut browser, handler) = launch_browser(config).await?;

        let page = match new_tab(&browser, config).await {
            Ok(page) => page,
            Err(e) => {
                shutdown(&mut browser, &handler).await;
                return Err(e);
            }
        };

        Ok(Self {
            browser,
            handler,
            page,
            config: config.clone(),
            parser,
            poll: config.poll_policy(),
            closed: false,
        })
    }

    /// Navigate to the board and apply the region filter.
    async fn load_job_table(&mut self) -> Result<()> {
        log::info!("Navigating to {}", self.config.career_url);
        self.page.goto(self.config.career_url.as_str()).await?;
        self.page.wait_for_navigation().await?;

        self.wait_for_selector(REGION_SELECT).await?;

        if !self.config.region.is_empty() {
            log::info!("Selecting {} region...", self.config.region);
            let label = serde_json::to_string(&self.config.region)?;
            let picked: bool = self
                .eval(format!(
                    r#"(() => {{
                        const select = document.querySelector('{REGION_SELECT}');
                        if (!select) return false;
                        const option = Array.from(select.options)
                            .find(o => o.label.trim() === {label} || o.text.trim() === {label});
                        if (!option) return false;
                        select.value = option.value;
                        select.dispatchEvent(new Event('change', {{ bubbles: true }}));
                        return true;
                    }})()"#
                ))
                .await?;
            if !picked {
                return Err(AppError::config(format!(
                    "region '{}' is not offered by the board",
                    self.config.region
                )));
            }
        }

        self.page.find_element(SORT_BUTTON).await?.click().await?;
        self.wait_for_selector(TABLE_ROWS).await
    }

    /// Capture a full-page screenshot of a posting's detail page.
    ///
    /// Navigates this reader's tab away from the job table.
    pub async fn screenshot(&self, job_link: &str, output: &Path) -> Result<()> {
        log::info!("Capturing {} to {}", job_link, output.display());
        self.page.goto(job_link).await?;
        self.page.wait_for_navigation().await?;
        tokio::time::sleep(self.config.page_size_settle()).await;

        let params = ScreenshotParams::builder().full_page(true).build();
        self.page.save_screenshot(params, output).await?;
        Ok(())
    }

    /// Evaluate a script expression and deserialize its value.
    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        let value = self.page.evaluate(script).await?.into_value::<T>()?;
        Ok(value)
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        let quoted = serde_json::to_string(selector)?;
        let script = format!("document.querySelector({quoted}) !== null");
        let this = self;
        poll_until(&self.poll, selector, move || this.eval::<bool>(script.clone())).await
    }

    async fn table_state(&self) -> Result<TableState> {
        self.eval(format!(
            r#"(() => {{
                const next = document.querySelector('{NEXT_BUTTON}');
                return {{
                    rows: document.querySelectorAll('{TABLE_ROWS}').length,
                    last: !next || next.classList.contains('disabled'),
                }};
            }})()"#
        ))
        .await
    }

    async fn first_job_control(&self) -> Result<Option<String>> {
        let control = serde_json::to_string(&format!(
            "{} button[id^=\"{}\"]",
            TABLE_ROWS, self.config.control_id_prefix
        ))?;
        self.eval(format!(
            "(() => {{ const b = document.querySelector({control}); return b ? b.id : null; }})()"
        ))
        .await
    }
}

#[async_trait]
impl PageReader for ChromeTableReader {
    async fn ensure_full_page_size(&mut self) -> Result<()> {
        self.wait_for_selector(LENGTH_SELECT).await?;

        let size = serde_json::to_string(&self.config.page_size.to_string())?;
        let changed: bool = self
            .eval(format!(
                r#"(() => {{
                    const select = document.querySelector('{LENGTH_SELECT}');
                    if (select.value === {size}) return false;
                    select.value = {size};
                    select.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    return true;
                }})()"#
            ))
            .await?;

        if !changed {
            return Ok(());
        }

        let page_size = self.config.page_size;
        let this = &*self;
        poll_until(&self.poll, "full page of job rows", move || async move {
            let state = this.table_state().await?;
            Ok(state.rows >= page_size || state.last)
        })
        .await?;

        tokio::time::sleep(self.config.page_size_settle()).await;
        log::info!("Page size set to {}", page_size);
        Ok(())
    }

    async fn current_rows(&mut self) -> Result<Vec<RawRow>> {
        let html: String = self
            .eval(
                "(() => { const t = document.querySelector('table#jobs'); return t ? t.outerHTML : ''; })()"
                    .to_string(),
            )
            .await?;
        let rows = self.parser.parse_rows(&html);
        log::debug!("Read {} rows from current page", rows.len());
        Ok(rows)
    }

    async fn has_next_page(&mut self) -> Result<bool> {
        Ok(!self.table_state().await?.last)
    }

    async fn advance_page(&mut self) -> Result<()> {
        let before = self.first_job_control().await?;

        self.page.find_element(NEXT_BUTTON).await?.click().await?;
        tokio::time::sleep(self.config.next_page_settle()).await;

        let this = &*self;
        let before = &before;
        poll_until(&self.poll, "next page of job rows", move || async move {
            let now = this.first_job_control().await?;
            Ok(now.is_some() && now != *before)
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        shutdown(&mut self.browser, &self.handler).await;
        log::debug!("Browser closed");
        Ok(())
    }
}

async fn launch_browser(config: &ScraperConfig) -> Result<(Browser, JoinHandle<()>)> {
    let mut builder = BrowserConfig::builder();
    if !config.headless {
        builder = builder.with_head();
    }
    let browser_config = builder.build().map_err(AppError::browser)?;

    log::info!(
        "Launching Chromium ({})",
        if config.headless { "headless" } else { "headed" }
    );
    let (browser, mut handler) = Browser::launch(browser_config).await?;

    let handler = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                log::debug!("Browser event error: {}", e);
            }
        }
    });

    Ok((browser, handler))
}

async fn new_tab(browser: &Browser, config: &ScraperConfig) -> Result<Page> {
    let page = browser.new_page("about:blank").await?;
    page.set_user_agent(config.user_agent.clone()).await?;
    Ok(page)
}

async fn shutdown(browser: &mut Browser, handler: &JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        log::warn!("Failed to close browser: {}", e);
    }
    let _ = browser.wait().await;
    handler.abort();
}
