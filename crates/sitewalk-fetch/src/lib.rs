mod config;
mod fetcher;

pub use config::FetcherConfig;
pub use fetcher::{fetch_page, parse_page, HttpFetcher};
