pub mod parser;
pub mod report;
pub mod scraper;
pub mod types;

pub use scraper::WebScraper;

/// Territorial-unit index pages of the 2017 parliamentary election all
/// live under this prefix (the ps32 page of the results application).
pub const INDEX_URL_PREFIX: &str = "https://www.volby.cz/pls/ps2017nss/ps32";
