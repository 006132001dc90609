pub mod browser;
pub mod extract;

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use crate::config::ScraperConfig;
use crate::models::ShowRecord;
use browser::{BrowserLauncher, BrowserSession, LaunchError};

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error("scrape cancelled after {pages_scraped} pages")]
    Cancelled { pages_scraped: usize },
}

/// Where a scrape run is. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeState {
    Idle,
    BrowserLaunching,
    PageLoading(u32),
    RowExtracting(u32),
    Done,
    BrowserClosed,
}

/// Cooperative cancellation flag, checked before each page load.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a scrape run.
#[derive(Debug, Default)]
pub struct ScrapeResult {
    /// Shows in page order, then row order.
    pub shows: Vec<ShowRecord>,
    pub pages_scraped: usize,
    /// Pages that failed to load and were skipped.
    pub failed_pages: Vec<u32>,
    /// Rows dropped for missing venue or artists.
    pub rows_skipped: usize,
}

fn transition(state: &mut ScrapeState, next: ScrapeState) {
    log::debug!("Scrape state {:?} -> {:?}", state, next);
    *state = next;
}

/// Scrape the listing pages in `pages` and collect every show row.
///
/// A page that fails to load (including timeouts) is logged and skipped.
/// Launch failure and cancellation end the run; the browser is closed on
/// every path.
pub fn fetch_upcoming_shows<L: BrowserLauncher>(
    launcher: &L,
    config: &ScraperConfig,
    pages: RangeInclusive<u32>,
    cancel: &CancelToken,
) -> Result<ScrapeResult, ScrapeError> {
    let mut state = ScrapeState::Idle;
    transition(&mut state, ScrapeState::BrowserLaunching);
    let mut session = BrowserSession::new(launcher.launch()?);

    let page_count = pages.clone().count();
    let pb = ProgressBar::new(page_count as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let mut result = ScrapeResult::default();

    for (i, page) in pages.enumerate() {
        if cancel.is_cancelled() {
            pb.abandon_with_message("cancelled");
            log::warn!("Scrape cancelled before page {page}");
            // session drops here and closes the browser
            return Err(ScrapeError::Cancelled {
                pages_scraped: result.pages_scraped,
            });
        }

        if i > 0 && config.page_delay_ms > 0 {
            thread::sleep(Duration::from_millis(config.page_delay_ms));
        }

        transition(&mut state, ScrapeState::PageLoading(page));
        let url = config.page_url(page);
        log::info!("Scraping page {page}...");
        pb.set_message(format!("page {page}"));

        let html = match session.goto(&url) {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Skipping page {page}: {e}");
                result.failed_pages.push(page);
                pb.inc(1);
                continue;
            }
        };

        transition(&mut state, ScrapeState::RowExtracting(page));
        let before = result.shows.len();
        for row in extract::extract_shows(&html) {
            match row {
                Ok(show) => result.shows.push(show),
                Err(e) => {
                    log::debug!("Skipping row on page {page}: {e}");
                    result.rows_skipped += 1;
                }
            }
        }
        log::info!("  {} shows on page {page}", result.shows.len() - before);

        result.pages_scraped += 1;
        pb.inc(1);
    }

    transition(&mut state, ScrapeState::Done);
    session.close();
    transition(&mut state, ScrapeState::BrowserClosed);

    pb.finish_with_message(format!("{} shows", result.shows.len()));
    log::info!(
        "Total shows found: {} ({} pages, {} failed, {} rows skipped)",
        result.shows.len(),
        result.pages_scraped,
        result.failed_pages.len(),
        result.rows_skipped
    );
    Ok(result)
}
