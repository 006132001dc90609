pub mod config;
pub mod listings;
pub mod matching;
pub mod models;
pub mod provider;
pub mod snapshot;

/// Application name for XDG paths
pub const APP_NAME: &str = "gigmatch";

/// Environment variable holding a provider access token for CLI runs
pub const ACCESS_TOKEN_ENV: &str = "GIGMATCH_ACCESS_TOKEN";
