//! # Identity Mapping
//!
//! The static table translating code-host login handles to chat-platform
//! user identifiers. Built once at startup from a JSON object table and
//! injected into the bridge at construction; business logic never reads it
//! from the ambient environment. Lookups for an unmapped handle return
//! `None` and the caller skips that one identity rather than failing the
//! surrounding operation.

use std::collections::HashMap;

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;

/// Immutable mapping from code-host login to chat user id.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    map: HashMap<String, String>,
}

impl IdentityMap {
    /// Builds the map from an explicit table.
    pub fn from_table(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    /// Builds the map from a JSON object of `{ "login": "chat user id" }`
    /// pairs, the shape the configuration surface supplies.
    ///
    /// # Examples
    ///
    /// ```
    /// use pr_bridge_core::identity::IdentityMap;
    ///
    /// let map = IdentityMap::from_json(r#"{ "alice": "U123", "bob": "U456" }"#).unwrap();
    /// assert_eq!(map.lookup("alice"), Some("U123"));
    /// assert_eq!(map.lookup("mallory"), None);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let map: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self { map })
    }

    /// Resolves a code-host login to a chat user id, if one is mapped.
    pub fn lookup(&self, login: &str) -> Option<&str> {
        self.map.get(login).map(String::as_str)
    }

    /// The number of mapped identities.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
