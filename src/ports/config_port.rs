//! Configuration access port.

/// Typed lookups over `[section] key = value` settings.
///
/// Numeric getters fall back to `default` when the key is absent or does
/// not parse; validation of values happens in `domain::config_validation`.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    /// Every key in `section` with its value, sorted by key.
    fn section_entries(&self, section: &str) -> Vec<(String, String)>;
}
