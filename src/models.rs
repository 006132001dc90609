use serde::{Deserialize, Serialize};

/// An artist as reported by the streaming provider.
///
/// Equality and hashing cover every field, so two profiles with the same name
/// but different images count as distinct entries when deduplicating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtistProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ArtistProfile {
    /// Profile with only a name (handy for tests and hand-written lists).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: None,
            genres: Vec::new(),
            url: None,
        }
    }
}

/// Canonical show record. Every raw shape the listings pipeline has ever
/// produced validates down to this flat form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowRecord {
    pub artists: Vec<String>,
    pub date: String,
    pub time: String,
    pub venue: String,
}

impl ShowRecord {
    /// Artist names joined for display.
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_deserialize_partial() {
        let json = r#"{"name": "Radiohead"}"#;
        let p: ArtistProfile = serde_json::from_str(json).unwrap();
        assert_eq!(p, ArtistProfile::named("Radiohead"));
    }

    #[test]
    fn test_profile_deserialize_full() {
        let json = r#"{
            "name": "Boygenius",
            "image": "https://i.scdn.co/image/abc",
            "genres": ["indie rock", "indie folk"],
            "url": "https://open.spotify.com/artist/1"
        }"#;
        let p: ArtistProfile = serde_json::from_str(json).unwrap();
        assert_eq!(p.genres, vec!["indie rock", "indie folk"]);
        assert_eq!(p.image.as_deref(), Some("https://i.scdn.co/image/abc"));
    }

    #[test]
    fn test_show_serializes_flat() {
        let show = ShowRecord {
            artists: vec!["Wednesday".into(), "MJ Lenderman".into()],
            date: "3/1/2024".into(),
            time: "08:00 PM".into(),
            venue: "Bowery Ballroom".into(),
        };
        let value = serde_json::to_value(&show).unwrap();
        assert_eq!(value["artists"][1], "MJ Lenderman");
        assert_eq!(value["venue"], "Bowery Ballroom");
        assert_eq!(show.artist_line(), "Wednesday, MJ Lenderman");
    }
}
