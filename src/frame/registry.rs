//! Label-keyed column registry
//!
//! Columns are discovered while rows stream in: the first time a label name
//! shows up a new string field is created for it. Rows may carry different
//! label sets, so after each row every column is null-extended to the longest
//! one to keep the table aligned.

use super::{Field, FieldType};
use crate::Result;
use std::collections::HashMap;

/// Insertion-ordered mapping from label name to string column
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    max_len: usize,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of registered columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Length of the longest column
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Append a value to the column for `name`, creating it if needed.
    ///
    /// A newly created column is back-filled with nulls up to `row` so the
    /// value lands in the current row. Returns `true` when the column is new.
    pub fn append(&mut self, name: &str, value: impl Into<String>, row: usize) -> Result<bool> {
        let (idx, created) = match self.index.get(name) {
            Some(&idx) => (idx, false),
            None => {
                let mut field = Field::new(name, FieldType::String);
                field.pad_to(row);
                self.fields.push(field);
                let idx = self.fields.len() - 1;
                self.index.insert(name.to_string(), idx);
                (idx, true)
            }
        };

        let field = &mut self.fields[idx];
        field.append(value.into())?;
        self.max_len = self.max_len.max(field.len());
        Ok(created)
    }

    /// Null-extend every column to `n` rows
    pub fn pad_all_to(&mut self, n: usize) {
        for field in &mut self.fields {
            field.pad_to(n);
        }
        self.max_len = self.max_len.max(n);
    }

    /// Null-extend every column to the longest one
    pub fn pad_to_max(&mut self) {
        self.pad_all_to(self.max_len);
    }

    /// Consume the registry, yielding columns in first-seen order
    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_label_is_padded_not_shifted() {
        let mut reg = FieldRegistry::new();
        assert!(reg.append("job", "api", 0).unwrap());
        assert!(reg.append("instance", "a", 0).unwrap());
        reg.pad_to_max();

        assert!(!reg.append("job", "db", 1).unwrap());
        reg.pad_to_max();

        let instance = reg.field("instance").unwrap();
        assert_eq!(instance.strings().unwrap(), &[Some("a".to_string()), None]);
        let job = reg.field("job").unwrap();
        assert_eq!(
            job.strings().unwrap(),
            &[Some("api".to_string()), Some("db".to_string())]
        );
    }

    #[test]
    fn test_late_column_is_backfilled() {
        let mut reg = FieldRegistry::new();
        reg.append("a", "1", 0).unwrap();
        reg.pad_to_max();
        reg.append("a", "2", 1).unwrap();
        reg.append("b", "x", 1).unwrap();
        reg.pad_to_max();

        let fields = reg.into_fields();
        assert_eq!(fields[0].name, "a");
        assert_eq!(fields[1].name, "b");
        assert_eq!(fields[1].strings().unwrap(), &[None, Some("x".to_string())]);
    }

    #[test]
    fn test_pad_all_to() {
        let mut reg = FieldRegistry::new();
        reg.append("a", "1", 0).unwrap();
        reg.pad_all_to(4);
        assert_eq!(reg.field("a").unwrap().len(), 4);
        assert_eq!(reg.max_len(), 4);
    }
}
