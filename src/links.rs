//! Link set extraction and form encoding.

use reqwest::multipart::Form;

use crate::page::LinkField;

/// One submitted link, exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub raw_value: String,
}

/// The ordered links submitted in one run.
///
/// Order follows the form's fields; duplicates and blank entries are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    entries: Vec<LinkEntry>,
}

impl LinkSet {
    /// Reads the form's fields into a link set.
    #[must_use]
    pub fn from_fields(fields: &[LinkField]) -> Self {
        Self {
            entries: fields
                .iter()
                .map(|f| LinkEntry {
                    raw_value: f.value.clone(),
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[LinkEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Form field names and values, `link-1` first.
    pub fn form_fields(&self) -> impl Iterator<Item = (String, &str)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (format!("link-{}", i + 1), e.raw_value.as_str()))
    }

    /// Encodes the set as multipart form data.
    #[must_use]
    pub fn to_form(&self) -> Form {
        self.form_fields()
            .fold(Form::new(), |form, (name, value)| form.text(name, value.to_string()))
    }
}

impl<S: Into<String>> FromIterator<S> for LinkSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|s| LinkEntry { raw_value: s.into() })
                .collect(),
        }
    }
}
