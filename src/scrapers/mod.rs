//! Web page scraping for URL evidence.

mod url;
mod user_agent;

pub use url::{parse_page, UrlScraper};
pub use user_agent::{resolve_user_agent, USER_AGENT};
