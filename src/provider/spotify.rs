use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::tokens::TokenStore;
use super::{ArtistSource, CallError, ProviderError, TokenRefresher, with_refresh_retry};
use crate::models::ArtistProfile;

/// Saved tracks page size (provider maximum).
const PAGE_SIZE: usize = 50;

/// Stop following `next` links after this many saved-track pages.
const MAX_SAVED_TRACK_PAGES: usize = 40;

#[derive(Debug, Deserialize)]
struct TopArtistsResponse {
    items: Vec<ApiArtist>,
}

#[derive(Debug, Deserialize)]
struct SavedTracksResponse {
    items: Vec<SavedTrackItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SavedTrackItem {
    /// Null for tracks removed from the catalog
    track: Option<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    #[serde(default)]
    artists: Vec<ApiArtist>,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
    #[serde(default)]
    images: Vec<ApiImage>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl From<ApiArtist> for ArtistProfile {
    fn from(artist: ApiArtist) -> Self {
        ArtistProfile {
            name: artist.name,
            image: artist.images.into_iter().next().map(|i| i.url),
            genres: artist.genres,
            url: artist.external_urls.spotify,
        }
    }
}

/// Drop repeated profiles, keeping the first occurrence of each.
pub fn dedup_profiles(profiles: impl IntoIterator<Item = ArtistProfile>) -> Vec<ArtistProfile> {
    let mut seen = HashSet::new();
    profiles
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

fn saved_track_artists(page: SavedTracksResponse) -> impl Iterator<Item = ArtistProfile> {
    page.items
        .into_iter()
        .filter_map(|item| item.track)
        .flat_map(|track| track.artists)
        .map(ArtistProfile::from)
}

/// Web API client for the streaming provider.
pub struct SpotifyClient<S, R> {
    agent: ureq::Agent,
    api_base: String,
    store: S,
    refresher: R,
}

impl<S: TokenStore, R: TokenRefresher> SpotifyClient<S, R> {
    pub fn new(api_base: impl Into<String>, store: S, refresher: R) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();
        Self {
            agent: config.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            store,
            refresher,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, access_token: &str) -> Result<T, CallError> {
        log::debug!("GET {url}");
        let mut response = self
            .agent
            .get(url)
            .header("Authorization", format!("Bearer {access_token}"))
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(401) => CallError::Unauthorized,
                other => {
                    log::warn!("Provider request {url} failed: {other}");
                    CallError::Failed(ProviderError::Upstream(other.to_string()))
                }
            })?;

        response.body_mut().read_json::<T>().map_err(|e| {
            log::warn!("Unexpected provider response from {url}: {e}");
            CallError::Failed(ProviderError::Upstream(format!("bad response from {url}")))
        })
    }
}

impl<S: TokenStore, R: TokenRefresher> ArtistSource for SpotifyClient<S, R> {
    fn top_artists(&self, user_id: &str) -> Result<Vec<ArtistProfile>, ProviderError> {
        let url = format!("{}/me/top/artists?limit={PAGE_SIZE}", self.api_base);
        let response: TopArtistsResponse =
            with_refresh_retry(&self.store, &self.refresher, user_id, |token| self.get_json(&url, token))?;
        Ok(response.items.into_iter().map(ArtistProfile::from).collect())
    }

    fn liked_artists(&self, user_id: &str) -> Result<Vec<ArtistProfile>, ProviderError> {
        let first = format!("{}/me/tracks?limit={PAGE_SIZE}", self.api_base);

        with_refresh_retry(&self.store, &self.refresher, user_id, |token| {
            let mut artists = Vec::new();
            let mut next = Some(first.clone());
            let mut pages = 0;

            while let Some(url) = next.take() {
                if pages >= MAX_SAVED_TRACK_PAGES {
                    log::warn!("Stopped after {pages} saved-track pages for {user_id}");
                    break;
                }
                let page: SavedTracksResponse = self.get_json(&url, token)?;
                next = page.next.clone();
                artists.extend(saved_track_artists(page));
                pages += 1;
            }

            log::debug!("{} artist credits across {pages} saved-track pages", artists.len());
            Ok(dedup_profiles(artists))
        })
    }
}
