//! Classified-headline access port.

use crate::domain::error::SentitraderError;
use crate::domain::news::NewsItem;

pub trait NewsPort {
    /// All usable headlines: tagged, classified and de-duplicated by title.
    fn fetch_news(&self) -> Result<Vec<NewsItem>, SentitraderError>;
}
