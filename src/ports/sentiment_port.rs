//! External sentiment classifier port.

use crate::domain::error::SentitraderError;
use crate::domain::news::Classification;

/// Opaque headline classifier. One classification per input, same order.
pub trait SentimentPort {
    fn classify(&self, headlines: &[&str]) -> Result<Vec<Classification>, SentitraderError>;
}
