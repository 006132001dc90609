pub mod normalize;
pub mod validate;

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::models::{ArtistProfile, ShowRecord};
use normalize::normalize;

/// Normalized names of every artist the user listens to.
#[derive(Debug, Default, Clone)]
pub struct UserArtistSet {
    names: HashSet<String>,
}

impl UserArtistSet {
    /// Union of top and liked artists, normalized.
    pub fn from_profiles(top: &[ArtistProfile], liked: &[ArtistProfile]) -> Self {
        let names = top
            .iter()
            .chain(liked)
            .map(|artist| normalize(&artist.name))
            .collect();
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&normalize(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The show's artists that are in the set, in billing order.
    pub fn matching_artists<'a>(&self, show: &'a ShowRecord) -> Vec<&'a str> {
        show.artists
            .iter()
            .filter(|artist| self.contains(artist))
            .map(String::as_str)
            .collect()
    }

    fn matches(&self, show: &ShowRecord) -> bool {
        show.artists.iter().any(|artist| self.contains(artist))
    }
}

/// Shows featuring at least one of the user's artists, earliest first.
///
/// Invalid raw records are dropped. Pure: the same inputs always give the
/// same output, ordering included.
pub fn find_matches(
    top_artists: &[ArtistProfile],
    shows: &[Value],
    liked_artists: &[ArtistProfile],
) -> Vec<ShowRecord> {
    let user_artists = UserArtistSet::from_profiles(top_artists, liked_artists);
    log::debug!("User artist set has {} names", user_artists.len());

    let mut matched: Vec<ShowRecord> = validate::validate_all(shows)
        .into_iter()
        .filter(|show| {
            let hit = user_artists.matches(show);
            if hit {
                log::debug!("Match: {} at {}", show.artist_line(), show.venue);
            }
            hit
        })
        .collect();

    sort_by_date(&mut matched);
    matched
}

/// Parse the date strings show records carry.
///
/// Covers ISO dates and date-times, RFC 3339, the scraper's `M/D/YYYY`
/// display form, and long/short month names. The `"Unknown"` placeholder
/// (and anything else) yields `None`.
pub fn parse_show_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn compare_dates(a: Option<&NaiveDateTime>, b: Option<&NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Stable insertion sort by parsed date.
///
/// An unparseable date compares equal to everything, which is not a total
/// order, so the standard library sorts are not usable here. Each element
/// only moves left past strictly later dates, so unparseable records stay
/// where they are relative to their sorted neighbours.
fn sort_by_date(shows: &mut Vec<ShowRecord>) {
    let mut keyed: Vec<(Option<NaiveDateTime>, ShowRecord)> = shows
        .drain(..)
        .map(|show| (parse_show_date(&show.date), show))
        .collect();

    for i in 1..keyed.len() {
        let mut j = i;
        while j > 0 && compare_dates(keyed[j - 1].0.as_ref(), keyed[j].0.as_ref()) == Ordering::Greater {
            keyed.swap(j - 1, j);
            j -= 1;
        }
    }

    shows.extend(keyed.into_iter().map(|(_, show)| show));
}
