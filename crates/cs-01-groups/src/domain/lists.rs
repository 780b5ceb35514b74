//! Whitelist/blacklist tables of a group.
//!
//! Each group owns four tables, one per (list type, direction) pair. A table
//! maps a resource category (`config`, `bundle`, ...) to its wildcard
//! patterns.

use serde::{Deserialize, Serialize};
use shared_types::EventType;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Which of the two pattern lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Whitelist,
    Blacklist,
}

impl ListType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whitelist => "whitelist",
            Self::Blacklist => "blacklist",
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type CategoryTable = BTreeMap<String, BTreeSet<String>>;

/// The four category tables of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTables {
    inbound_whitelist: CategoryTable,
    inbound_blacklist: CategoryTable,
    outbound_whitelist: CategoryTable,
    outbound_blacklist: CategoryTable,
}

impl FilterTables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, list: ListType, direction: EventType) -> &CategoryTable {
        match (list, direction) {
            (ListType::Whitelist, EventType::Inbound) => &self.inbound_whitelist,
            (ListType::Blacklist, EventType::Inbound) => &self.inbound_blacklist,
            (ListType::Whitelist, EventType::Outbound) => &self.outbound_whitelist,
            (ListType::Blacklist, EventType::Outbound) => &self.outbound_blacklist,
        }
    }

    fn table_mut(&mut self, list: ListType, direction: EventType) -> &mut CategoryTable {
        match (list, direction) {
            (ListType::Whitelist, EventType::Inbound) => &mut self.inbound_whitelist,
            (ListType::Blacklist, EventType::Inbound) => &mut self.inbound_blacklist,
            (ListType::Whitelist, EventType::Outbound) => &mut self.outbound_whitelist,
            (ListType::Blacklist, EventType::Outbound) => &mut self.outbound_blacklist,
        }
    }

    /// Patterns configured for a category, if any.
    #[must_use]
    pub fn patterns(
        &self,
        list: ListType,
        category: &str,
        direction: EventType,
    ) -> Option<&BTreeSet<String>> {
        self.table(list, direction).get(category)
    }

    /// Replace the patterns of a category. An empty set removes the entry.
    pub fn set_patterns<I, S>(&mut self, list: ListType, category: &str, direction: EventType, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: BTreeSet<String> = patterns
            .into_iter()
            .map(Into::into)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        let table = self.table_mut(list, direction);
        if patterns.is_empty() {
            table.remove(category);
        } else {
            table.insert(category.to_string(), patterns);
        }
    }

    /// Add `entry` if absent, remove it if present.
    ///
    /// Returns true when the entry is present afterwards.
    pub fn toggle(&mut self, list: ListType, category: &str, direction: EventType, entry: &str) -> bool {
        let table = self.table_mut(list, direction);
        let patterns = table.entry(category.to_string()).or_default();
        let present = if patterns.remove(entry) {
            false
        } else {
            patterns.insert(entry.to_string());
            true
        };
        if patterns.is_empty() {
            table.remove(category);
        }
        present
    }

    /// Every category mentioned by any of the four tables.
    #[must_use]
    pub fn categories(&self) -> BTreeSet<&str> {
        [
            &self.inbound_whitelist,
            &self.inbound_blacklist,
            &self.outbound_whitelist,
            &self.outbound_blacklist,
        ]
        .into_iter()
        .flat_map(|t| t.keys().map(String::as_str))
        .collect()
    }
}
