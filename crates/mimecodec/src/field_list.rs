//! Ordered header field collections.

use std::borrow::Cow;
use std::io::Write;

use crate::error::{Error, Result};
use crate::field::Field;
use crate::writer::MimeWriter;

/// Ordered list of header fields.
///
/// Order is wire order. Lookups by name ignore ASCII case and return the
/// first match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldList {
    fields: Vec<Field>,
    read_only: bool,
}

impl FieldList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fields: Vec::new(),
            read_only: false,
        }
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over the fields in wire order.
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Returns the first field with this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_named(name))
    }

    /// Returns the first field with this name for editing.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.is_named(name))
    }

    /// Returns true if a field with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the text of the first field with this name.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).and_then(Field::value)
    }

    /// Returns the text of every field with this name, in order.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<Cow<'_, str>> {
        self.fields
            .iter()
            .filter(|f| f.is_named(name))
            .filter_map(Field::value)
            .collect()
    }

    /// Returns the first field with this name, appending an empty one when
    /// there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn entry(&mut self, name: &str) -> Result<&mut Field> {
        self.check_writable("set field")?;

        let index = match self.fields.iter().position(|f| f.is_named(name)) {
            Some(index) => index,
            None => {
                self.fields.push(Field::empty(name));
                self.fields.len() - 1
            }
        };
        Ok(&mut self.fields[index])
    }

    /// Sets the raw value of the named field, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list or field is read-only.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.entry(name)?.set_value(value)
    }

    /// Appends a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn push(&mut self, field: Field) -> Result<()> {
        self.check_writable("add field")?;
        self.fields.push(field);
        Ok(())
    }

    /// Inserts a field at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only or
    /// `index` is past the end.
    pub fn insert(&mut self, index: usize, field: Field) -> Result<()> {
        self.check_writable("insert field")?;
        if index > self.fields.len() {
            return Err(Error::invalid(format!("insert index {index} out of range.")));
        }
        self.fields.insert(index, field);
        Ok(())
    }

    /// Removes the first field with this name and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn remove(&mut self, name: &str) -> Result<Option<Field>> {
        self.check_writable("remove field")?;
        Ok(self
            .fields
            .iter()
            .position(|f| f.is_named(name))
            .map(|index| self.fields.remove(index)))
    }

    /// Removes the field at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only or
    /// `index` is out of range.
    pub fn remove_at(&mut self, index: usize) -> Result<Field> {
        self.check_writable("remove field")?;
        if index >= self.fields.len() {
            return Err(Error::invalid(format!("remove index {index} out of range.")));
        }
        Ok(self.fields.remove(index))
    }

    /// Keeps only the fields matching `keep`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn retain(&mut self, keep: impl FnMut(&Field) -> bool) -> Result<()> {
        self.check_writable("remove field")?;
        self.fields.retain(keep);
        Ok(())
    }

    /// Removes every field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn clear(&mut self) -> Result<()> {
        self.check_writable("clear fields")?;
        self.fields.clear();
        Ok(())
    }

    /// Returns true if the collection can no longer be changed.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Freezes the collection.
    pub fn set_collection_read_only(&mut self) {
        self.read_only = true;
    }

    /// Writes every field in order.
    ///
    /// # Errors
    ///
    /// Propagates writer errors.
    pub fn write_to<W: Write>(&self, writer: &mut MimeWriter<W>) -> Result<()> {
        self.fields.iter().try_for_each(|field| field.write_to(writer))
    }

    fn check_writable(&self, what: &str) -> Result<()> {
        if self.read_only {
            return Err(Error::invalid(format!("not allowed to {what}.")));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FieldList {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl FromIterator<Field> for FieldList {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
            read_only: false,
        }
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

    fn sample() -> FieldList {
        [
            Field::new("Received", "from a"),
            Field::new("Subject", "Hello"),
            Field::new("received", "from b"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let fields = sample();
        assert_eq!(fields.value("SUBJECT").as_deref(), Some("Hello"));
        assert_eq!(fields.get("received").unwrap().value().as_deref(), Some("from a"));
        assert!(fields.contains("subject"));
        assert!(!fields.contains("To"));
    }

    #[test]
    fn test_values_in_order() {
        let fields = sample();
        let values: Vec<_> = fields.values("Received").into_iter().map(Cow::into_owned).collect();
        assert_eq!(values, vec!["from a".to_string(), "from b".to_string()]);
    }

    #[test]
    fn test_entry_creates_once() {
        let mut fields = FieldList::new();
        fields.entry("X-Test").unwrap().set_value("1").unwrap();
        fields.entry("x-test").unwrap().set_value("2").unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.value("X-Test").as_deref(), Some("2"));
    }

    #[test]
    fn test_mutation() {
        let mut fields = sample();
        fields.insert(0, Field::new("Return-Path", "<a@example.com>")).unwrap();
        assert_eq!(fields.iter().next().unwrap().name(), "Return-Path");

        let removed = fields.remove("received").unwrap().unwrap();
        assert_eq!(removed.value().as_deref(), Some("from a"));
        assert_eq!(fields.remove_at(0).unwrap().name(), "Return-Path");

        fields.retain(|f| !f.is_named("Received")).unwrap();
        assert_eq!(fields.len(), 1);
        fields.clear().unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn test_read_only_leaves_list_unchanged() {
        let mut fields = sample();
        fields.set_collection_read_only();

        assert!(fields.push(Field::new("To", "x")).unwrap_err().is_invalid_operation());
        assert!(fields.insert(0, Field::new("To", "x")).is_err());
        assert!(fields.remove("Subject").is_err());
        assert!(fields.remove_at(0).is_err());
        assert!(fields.retain(|_| false).is_err());
        assert!(fields.clear().is_err());
        assert!(fields.entry("Subject").is_err());
        assert!(fields.set("Subject", "x").is_err());

        assert_eq!(fields, {
            let mut expected = sample();
            expected.set_collection_read_only();
            expected
        });
    }

    #[test]
    fn test_write_in_order() {
        let fields = sample();
        let mut writer = MimeWriter::new(Vec::new());
        fields.write_to(&mut writer).unwrap();
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "Received: from a\r\nSubject: Hello\r\nreceived: from b\r\n"
        );
    }
}
