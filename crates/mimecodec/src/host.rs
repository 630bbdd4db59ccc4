//! Host name lookup for generated Message-IDs.
//!
//! # Example
//!
//! ```
//! use mimecodec::host::{FixedHostName, HostName};
//!
//! let host = FixedHostName::new("mail.example.com");
//! assert_eq!(host.host_name(), "mail.example.com");
//! ```

/// Source of the host part of a generated `Message-ID`.
///
/// In production, use [`SystemHostName`]. In tests, use [`FixedHostName`]
/// for deterministic ids.
pub trait HostName {
    /// Returns the local host name.
    fn host_name(&self) -> String;
}

/// Host name as reported by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHostName;

impl HostName for SystemHostName {
    fn host_name(&self) -> String {
        let name = gethostname::gethostname().to_string_lossy().into_owned();
        if name.is_empty() {
            "localhost".to_string()
        } else {
            name
        }
    }
}

/// A host name fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedHostName(String);

impl FixedHostName {
    /// Creates a provider that always returns `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl HostName for FixedHostName {
    fn host_name(&self) -> String {
        self.0.clone()
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
    fn test_system_host_name_is_not_empty() {
        assert!(!SystemHostName.host_name().is_empty());
    }
}
