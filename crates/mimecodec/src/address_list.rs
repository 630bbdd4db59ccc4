//! Comma-separated address lists (`To`, `Cc`, `Bcc`).

use std::fmt;
use std::io::Write;
use std::ops::Index;

use crate::address::{Address, detail};
use crate::error::{Error, Result};
use crate::lexer::{Lexer, TokenKind};
use crate::writer::{MimeWriter, WriteValue};

/// Ordered list of addresses with a collection-level read-only flag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddressList {
    addresses: Vec<Address>,
    read_only: bool,
}

impl AddressList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            addresses: Vec::new(),
            read_only: false,
        }
    }

    /// Parses a comma-separated address list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] naming the whole input if any
    /// address fails to parse or a separator other than `,` is found.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, false)
    }

    pub(crate) fn parse_with(text: &str, read_only: bool) -> Result<Self> {
        Self::parse_addresses(text, read_only)
            .map_err(|e| Error::malformed(format!("invalid address '{text}', {}", detail(&e))))
    }

    fn parse_addresses(text: &str, read_only: bool) -> Result<Self> {
        let mut lexer = Lexer::new(text);
        let mut addresses = Vec::new();

        loop {
            addresses.push(Address::parse_next(&mut lexer, read_only)?);

            if lexer.is_eof() {
                break;
            }
            if !lexer.next_token()?.is(TokenKind::Comma) {
                return Err(Error::malformed("data after addresses."));
            }
        }

        Ok(Self {
            addresses,
            read_only,
        })
    }

    /// Returns the number of addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Returns true if the list holds no addresses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Returns the address at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Address> {
        self.addresses.get(index)
    }

    /// Returns the address at `index` for in-place editing.
    ///
    /// Addresses of a frozen list are themselves frozen, so their setters
    /// still fail.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Address> {
        self.addresses.get_mut(index)
    }

    /// Iterates over the addresses in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Address> {
        self.addresses.iter()
    }

    /// Appends an address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn push(&mut self, address: Address) -> Result<()> {
        self.check_writable("add address")?;
        self.addresses.push(address);
        Ok(())
    }

    /// Appends several addresses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn extend(&mut self, addresses: impl IntoIterator<Item = Address>) -> Result<()> {
        self.check_writable("add addresses")?;
        self.addresses.extend(addresses);
        Ok(())
    }

    /// Inserts an address at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only or
    /// `index` is past the end.
    pub fn insert(&mut self, index: usize, address: Address) -> Result<()> {
        self.check_writable("insert address")?;
        if index > self.addresses.len() {
            return Err(Error::invalid(format!("insert index {index} out of range.")));
        }
        self.addresses.insert(index, address);
        Ok(())
    }

    /// Removes and returns the address at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only or
    /// `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Result<Address> {
        self.check_writable("remove address")?;
        if index >= self.addresses.len() {
            return Err(Error::invalid(format!("remove index {index} out of range.")));
        }
        Ok(self.addresses.remove(index))
    }

    /// Keeps only the addresses matching `keep`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn retain(&mut self, keep: impl FnMut(&Address) -> bool) -> Result<()> {
        self.check_writable("remove addresses")?;
        self.addresses.retain(keep);
        Ok(())
    }

    /// Removes all addresses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn clear(&mut self) -> Result<()> {
        self.check_writable("clear addresses")?;
        self.addresses.clear();
        Ok(())
    }

    /// Returns true if the collection can no longer be changed.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Freezes the collection. Existing addresses keep their own flag.
    pub fn set_collection_read_only(&mut self) {
        self.read_only = true;
    }

    fn check_writable(&self, what: &str) -> Result<()> {
        if self.read_only {
            return Err(Error::invalid(format!("not allowed to {what}.")));
        }
        Ok(())
    }
}

impl Index<usize> for AddressList {
    type Output = Address;

    fn index(&self, index: usize) -> &Address {
        &self.addresses[index]
    }
}

impl<'a> IntoIterator for &'a AddressList {
    type Item = &'a Address;
    type IntoIter = std::slice::Iter<'a, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.addresses.iter()
    }
}

impl FromIterator<Address> for AddressList {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
            read_only: false,
        }
    }
}

impl From<Address> for AddressList {
    fn from(address: Address) -> Self {
        Self {
            addresses: vec![address],
            read_only: false,
        }
    }
}

impl WriteValue for AddressList {
    fn has_data(&self) -> bool {
        !self.addresses.is_empty()
    }

    fn write_value<W: Write>(&self, writer: &mut MimeWriter<W>) -> Result<()> {
        for (i, address) in self.addresses.iter().enumerate() {
            if i > 0 {
                writer.write_address_separator()?;
            }
            address.write_value(writer)?;
        }
        Ok(())
    }
}

impl fmt::Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, address) in self.addresses.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{address}")?;
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
    fn test_parse_list() {
        let list = AddressList::parse("John <john@example.com>, jane@example.com,\r\n\t\"Doe, J\" <jd@example.com>")
            .unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].display_name(), Some("John"));
        assert_eq!(list[1].address(), "jane@example.com");
        assert_eq!(list[2].display_name(), Some("Doe, J"));
        assert_eq!(list[2].address(), "jd@example.com");
    }

    #[test]
    fn test_parse_single() {
        let list = AddressList::parse("a@example.com").unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list.is_read_only());
    }

    #[test]
    fn test_parse_bad_separator() {
        let err = AddressList::parse("a@example.com; b@example.com").unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("data after addresses"));
        assert!(err.to_string().contains("a@example.com; b@example.com"));
    }

    #[test]
    fn test_parse_inner_failure_names_whole_input() {
        let err = AddressList::parse("a@example.com, <b@example.com").unwrap_err();
        assert!(err.to_string().contains("'a@example.com, <b@example.com'"));
        assert!(err.to_string().contains("missing '>'"));
    }

    #[test]
    fn test_mutation() {
        let mut list = AddressList::new();
        list.push(Address::new("a@example.com")).unwrap();
        list.insert(0, Address::new("b@example.com")).unwrap();
        list.extend([Address::new("c@example.com")]).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].address(), "b@example.com");

        let removed = list.remove(1).unwrap();
        assert_eq!(removed.address(), "a@example.com");
        list.retain(|a| a.address() != "c@example.com").unwrap();
        assert_eq!(list.len(), 1);
        list.clear().unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_read_only_leaves_list_unchanged() {
        let mut list = AddressList::parse_with("a@example.com, b@example.com", true).unwrap();
        assert!(list.is_read_only());

        assert!(list.push(Address::new("c@example.com")).unwrap_err().is_invalid_operation());
        assert!(list.insert(0, Address::new("c@example.com")).is_err());
        assert!(list.remove(0).is_err());
        assert!(list.retain(|_| false).is_err());
        assert!(list.clear().is_err());
        assert!(list.get_mut(0).unwrap().set_address("x@example.com").is_err());

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].address(), "a@example.com");
    }

    #[test]
    fn test_display() {
        let list: AddressList = [
            Address::with_display_name("a@example.com", "A"),
            Address::new("b@example.com"),
        ]
        .into_iter()
        .collect();
        assert_eq!(list.to_string(), "\"A\" <a@example.com>, <b@example.com>");
    }
}
