//! pagedump: dump the links or visible text of browser-rendered pages
//!
//! Pipeline per page: navigate ([`browser`]), scroll to trigger lazy
//! loading ([`reveal`]), extract ([`extract`]), report ([`report`]).
//!
//! Commands:
//! - links: links of one page, grouped by hostname
//! - text: visible text of several pages, fetched in parallel

pub mod browser;
pub mod dump_links;
pub mod dump_text;
pub mod error;
pub mod extract;
pub mod harvest;
pub mod report;
pub mod reveal;

pub use browser::{settle_budget, BrowserSession, LaunchConfig, Tab, TabSource};
pub use error::PageError;
pub use extract::{clean_text, compose_text, extract_links, LinkRecord};
pub use harvest::{
    harvest_links, harvest_text, harvest_text_all, load, HarvestConfig, LinkPage, PageTextRecord,
};
pub use reveal::{reveal, RevealConfig, RevealSummary};
