use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::ShowRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("show record is not an object")]
    NotAnObject,
    #[error("no artist list at any known nesting depth")]
    MissingArtists,
    #[error("artists field is not an array")]
    ArtistsNotArray,
    #[error("artists list is empty")]
    EmptyArtists,
    #[error("artist entry {index} is not a non-empty string")]
    InvalidArtist { index: usize },
}

/// Nesting shapes the listings scraper has produced over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// `{artists, date, time, venue}`
    Flat,
    /// `{name: {artists, ...}}`
    Wrapped,
    /// `{name: {name: {artists, ...}}}`
    DoubleWrapped,
}

/// Find the object carrying the `artists` key, trying shallow shapes first.
fn resolve_shape(obj: &Map<String, Value>) -> Option<(RecordShape, &Map<String, Value>)> {
    if obj.contains_key("artists") {
        return Some((RecordShape::Flat, obj));
    }
    let inner = obj.get("name")?.as_object()?;
    if inner.contains_key("artists") {
        return Some((RecordShape::Wrapped, inner));
    }
    let inner = inner.get("name")?.as_object()?;
    if inner.contains_key("artists") {
        return Some((RecordShape::DoubleWrapped, inner));
    }
    None
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Validate a raw show record and return it in canonical form.
pub fn validate(raw: &Value) -> Result<ShowRecord, ValidationError> {
    validate_with_shape(raw).map(|(_, show)| show)
}

/// Like [`validate`], also reporting which historical shape matched.
pub fn validate_with_shape(raw: &Value) -> Result<(RecordShape, ShowRecord), ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;
    let (shape, record) = resolve_shape(obj).ok_or(ValidationError::MissingArtists)?;

    let entries = record
        .get("artists")
        .and_then(Value::as_array)
        .ok_or(ValidationError::ArtistsNotArray)?;
    if entries.is_empty() {
        return Err(ValidationError::EmptyArtists);
    }

    let mut artists = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match entry.as_str() {
            Some(name) if !name.trim().is_empty() => artists.push(name.to_string()),
            _ => return Err(ValidationError::InvalidArtist { index }),
        }
    }

    Ok((
        shape,
        ShowRecord {
            artists,
            date: string_field(record, "date"),
            time: string_field(record, "time"),
            venue: string_field(record, "venue"),
        },
    ))
}

/// Validate a batch, dropping (and logging) the records that fail.
pub fn validate_all(raw: &[Value]) -> Vec<ShowRecord> {
    raw.iter()
        .enumerate()
        .filter_map(|(i, value)| match validate(value) {
            Ok(show) => Some(show),
            Err(e) => {
                log::debug!("Skipping show record {i}: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat() -> Value {
        json!({
            "artists": ["Japanese Breakfast", "Ginger Root"],
            "date": "3/1/2024",
            "time": "08:00 PM",
            "venue": "Brooklyn Steel"
        })
    }

    #[test]
    fn test_all_shapes_validate_identically() {
        let flat = flat();
        let wrapped = json!({ "name": flat.clone() });
        let double = json!({ "name": { "name": flat.clone() } });

        let (s0, r0) = validate_with_shape(&flat).unwrap();
        let (s1, r1) = validate_with_shape(&wrapped).unwrap();
        let (s2, r2) = validate_with_shape(&double).unwrap();

        assert_eq!(s0, RecordShape::Flat);
        assert_eq!(s1, RecordShape::Wrapped);
        assert_eq!(s2, RecordShape::DoubleWrapped);
        assert_eq!(r0, r1);
        assert_eq!(r1, r2);
        assert_eq!(r0.venue, "Brooklyn Steel");
    }

    #[test]
    fn test_rejects_non_objects() {
        for raw in [json!(null), json!(42), json!("show"), json!([1, 2])] {
            assert_eq!(validate(&raw), Err(ValidationError::NotAnObject));
        }
    }

    #[test]
    fn test_rejects_missing_artists() {
        assert_eq!(validate(&json!({})), Err(ValidationError::MissingArtists));
        assert_eq!(
            validate(&json!({ "name": "not an object" })),
            Err(ValidationError::MissingArtists)
        );
        // Three levels of wrapping was never produced
        assert_eq!(
            validate(&json!({ "name": { "name": { "name": flat() } } })),
            Err(ValidationError::MissingArtists)
        );
    }

    #[test]
    fn test_rejects_non_array_artists() {
        assert_eq!(
            validate(&json!({ "artists": "not-an-array" })),
            Err(ValidationError::ArtistsNotArray)
        );
        assert_eq!(
            validate(&json!({ "name": { "artists": { "0": "x" } } })),
            Err(ValidationError::ArtistsNotArray)
        );
    }

    #[test]
    fn test_shallowest_artists_key_wins() {
        // A bad flat artists field is not rescued by a good nested one
        let raw = json!({ "artists": null, "name": flat() });
        assert_eq!(validate(&raw), Err(ValidationError::ArtistsNotArray));
    }

    #[test]
    fn test_rejects_bad_artist_entries() {
        assert_eq!(validate(&json!({ "artists": [] })), Err(ValidationError::EmptyArtists));
        assert_eq!(
            validate(&json!({ "artists": ["Ok", 7] })),
            Err(ValidationError::InvalidArtist { index: 1 })
        );
        assert_eq!(
            validate(&json!({ "artists": ["   "] })),
            Err(ValidationError::InvalidArtist { index: 0 })
        );
        assert_eq!(
            validate(&json!({ "artists": ["Ok", null] })),
            Err(ValidationError::InvalidArtist { index: 1 })
        );
    }

    #[test]
    fn test_missing_optional_fields_default_empty() {
        let show = validate(&json!({ "artists": ["C"], "date": 20240101 })).unwrap();
        assert_eq!(show.date, "");
        assert_eq!(show.time, "");
        assert_eq!(show.venue, "");
    }

    #[test]
    fn test_unknown_placeholder_is_valid() {
        let raw = json!({ "name": {
            "artists": ["Horsegirl"], "date": "Unknown", "time": "Unknown", "venue": "TV Eye"
        }});
        let show = validate(&raw).unwrap();
        assert_eq!(show.date, "Unknown");
    }

    #[test]
    fn test_validate_all_filters() {
        let raw = vec![json!(null), json!({}), json!({ "artists": "not-an-array" }), flat()];
        let shows = validate_all(&raw);
        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].artists[0], "Japanese Breakfast");
    }
}
