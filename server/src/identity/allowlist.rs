//! Operator-maintained admin allow-list.
//!
//! Stored as a comma-joined string in the settings table; entries may be a
//! numeric identity id, an account name, or a main-character name. Matching
//! trims whitespace but is otherwise exact.

use super::Identity;

/// Ordered list of identifiers granted the admin role unconditionally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowlist {
    entries: Vec<String>,
}

impl AdminAllowlist {
    #[must_use]
    pub fn new(entries: Vec<String>) -> Self {
        let mut list = Self::default();
        for entry in entries {
            list.add(&entry);
        }
        list
    }

    /// Parse the comma-joined persisted form. Empty segments are dropped.
    #[must_use]
    pub fn from_comma_list(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::to_string).collect())
    }

    /// The comma-joined persisted form.
    #[must_use]
    pub fn to_comma_list(&self) -> String {
        self.entries.join(",")
    }

    /// Add an entry if not already present. Returns whether it was added.
    pub fn add(&mut self, entry: &str) -> bool {
        let entry = entry.trim();
        if entry.is_empty() || self.entries.iter().any(|e| e == entry) {
            return false;
        }
        self.entries.push(entry.to_string());
        true
    }

    /// Remove an entry by trimmed string equality. Returns whether anything
    /// was removed.
    pub fn remove(&mut self, entry: &str) -> bool {
        let entry = entry.trim();
        let before = self.entries.len();
        self.entries.retain(|e| e != entry);
        self.entries.len() != before
    }

    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any entry matches the identity's numeric id, account name,
    /// or main-character name.
    #[must_use]
    pub fn matches(&self, identity: &Identity) -> bool {
        let id_str = identity.id.to_string();
        self.entries.iter().any(|entry| {
            if *entry == id_str || *entry == identity.name {
                return true;
            }
            identity
                .main_character
                .as_ref()
                .is_some_and(|main| *entry == main.character_name)
        })
    }
}
