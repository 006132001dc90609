use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::models::ShowRecord;

/// Placeholder for rows that carry no usable date/time attribute.
pub const UNKNOWN: &str = "Unknown";

const DATE_DISPLAY: &str = "%-m/%-d/%Y";
const TIME_DISPLAY: &str = "%I:%M %p";

static ROW: LazyLock<Selector> = LazyLock::new(|| selector(".row.vevent"));
static ARTIST_LINK: LazyLock<Selector> = LazyLock::new(|| selector(".bands.summary a"));
static DATETIME: LazyLock<Selector> = LazyLock::new(|| selector(".value-title"));
static VENUE: LazyLock<Selector> = LazyLock::new(|| selector(".fn.org"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("row has no venue element")]
    MissingVenue,
    #[error("row has no unprofiled artist links")]
    NoArtists,
}

/// Extract every show row from a listings page, in document order.
pub fn extract_shows(html: &str) -> Vec<Result<ShowRecord, RowError>> {
    let document = Html::parse_document(html);
    document.select(&ROW).map(extract_row).collect()
}

/// Links the site marks `non-profiled`, or that carry no class at all, name
/// an artist. Links with other classes are cross-links rendered differently.
fn is_artist_link(link: &ElementRef) -> bool {
    let element = link.value();
    element.classes().any(|c| c == "non-profiled")
        || element.attr("class").is_none_or(|c| c.trim().is_empty())
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub fn extract_row(row: ElementRef) -> Result<ShowRecord, RowError> {
    let artists: Vec<String> = row
        .select(&ARTIST_LINK)
        .filter(is_artist_link)
        .map(text_of)
        .filter(|name| !name.is_empty())
        .collect();
    if artists.is_empty() {
        return Err(RowError::NoArtists);
    }

    let datetime = row
        .select(&DATETIME)
        .next()
        .and_then(|el| el.value().attr("title"))
        .unwrap_or_default();
    let (date, time) = render_datetime(datetime);

    let venue = row.select(&VENUE).next().map(text_of).ok_or(RowError::MissingVenue)?;

    Ok(ShowRecord { artists, date, time, venue })
}

/// Render a machine date-time as display date and time strings.
///
/// Offsets are kept: a show at 8pm Eastern renders as 08:00 PM whatever the
/// scraping machine's zone. Blank or unparseable input gives [`UNKNOWN`] for
/// both.
pub fn render_datetime(raw: &str) -> (String, String) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (UNKNOWN.to_string(), UNKNOWN.to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
    {
        return (dt.format(DATE_DISPLAY).to_string(), dt.format(TIME_DISPLAY).to_string());
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return (dt.format(DATE_DISPLAY).to_string(), dt.format(TIME_DISPLAY).to_string());
        }
    }

    log::debug!("Unparseable show datetime {raw:?}");
    (UNKNOWN.to_string(), UNKNOWN.to_string())
}
