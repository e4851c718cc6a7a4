//! Custom header storage.

use std::fmt;

/// Ordered, case-preserving multimap of header names to values.
///
/// Names compare ASCII case-insensitively: `X-Tag` and `x-tag` address the
/// same entry, and the spelling used on first insertion is kept for output.
/// Both the order of names and the order of each name's values follow
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }

    /// Appends a value, keeping any existing values for the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Sets a header value, replacing any existing values.
    ///
    /// A replaced header keeps its original position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1 = vec![value],
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|index| self.entries[index].1.first().map(String::as_str))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.position(name)
            .map(|index| self.entries[index].1.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Checks whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        if let Some(index) = self.position(name) {
            self.entries.remove(index);
        }
    }

    /// Returns the number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no headers are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over every `(name, value)` pair in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Returns an iterator over names with their full value lists.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("X-Mailer", "mailsmith");
        assert_eq!(headers.get("X-Mailer"), Some("mailsmith"));
        assert_eq!(headers.get("x-mailer"), Some("mailsmith")); // Case insensitive
    }

    #[test]
    fn test_headers_case_preserved() {
        let mut headers = Headers::new();
        headers.add("X-Campaign-ID", "a");
        headers.add("x-campaign-id", "b");
        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(pairs, vec![("X-Campaign-ID", "a"), ("X-Campaign-ID", "b")]);
    }

    #[test]
    fn test_headers_set() {
        let mut headers = Headers::new();
        headers.add("X-Tag", "one");
        headers.add("X-Tag", "two");
        assert_eq!(headers.get_all("X-Tag").len(), 2);

        headers.set("X-Tag", "three");
        assert_eq!(headers.get_all("X-Tag"), vec!["three"]);
    }

    #[test]
    fn test_headers_set_keeps_position() {
        let mut headers = Headers::new();
        headers.add("A", "1");
        headers.add("B", "2");
        headers.set("a", "3");
        let names: Vec<_> = headers.entries().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("X-Priority", "1");
        assert!(headers.contains("x-priority"));

        headers.remove("X-PRIORITY");
        assert!(headers.get("X-Priority").is_none());
    }

    #[test]
    fn test_headers_insertion_order() {
        let mut headers = Headers::new();
        headers.add("Zeta", "z");
        headers.add("Alpha", "a");
        assert_eq!(headers.to_string(), "Zeta: z\nAlpha: a\n");
    }
}
