//! Security response headers.
//!
//! # Responsibilities
//! - Compile the configured header map once, at startup/reload
//! - Stamp the set onto every outbound response, overwriting any
//!   backend-supplied value for the same name

use std::collections::BTreeMap;

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};

/// Immutable, precompiled set of response headers.
#[derive(Debug, Clone, Default)]
pub struct SecurityHeaderSet {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaderSet {
    /// Compile a header map from configuration.
    ///
    /// Entries that fail header parsing are skipped with a warning; config
    /// validation normally rejects them before this point.
    pub fn from_config(map: &BTreeMap<String, String>) -> Self {
        let mut headers = Vec::with_capacity(map.len());
        for (name, value) in map {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => headers.push((name, value)),
                _ => {
                    tracing::warn!(header = %name, "skipping unparseable security header");
                }
            }
        }
        Self { headers }
    }

    /// Apply the set to a response header map, overwriting existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(pairs: &[(&str, &str)]) -> SecurityHeaderSet {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SecurityHeaderSet::from_config(&map)
    }

    #[test]
    fn applies_all_headers() {
        let set = set_of(&[("x-frame-options", "DENY"), ("x-content-type-options", "nosniff")]);
        let mut headers = HeaderMap::new();
        set.apply(&mut headers);
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    }

    #[test]
    fn overwrites_existing_values() {
        let set = set_of(&[("x-frame-options", "DENY")]);
        let mut headers = HeaderMap::new();
        headers.insert("x-frame-options", HeaderValue::from_static("ALLOWALL"));

        set.apply(&mut headers);
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert_eq!(headers.get_all("x-frame-options").iter().count(), 1);
    }

    #[test]
    fn unparseable_entries_are_skipped() {
        let set = set_of(&[("bad name", "v"), ("x-ok", "yes")]);
        assert_eq!(set.len(), 1);
    }
}
