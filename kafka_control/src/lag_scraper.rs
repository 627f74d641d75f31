mod group_lags;
mod metrics;
mod scrape_target;
mod scraper;

pub use group_lags::*;
pub use metrics::*;
pub use scrape_target::*;
pub use scraper::*;
