//! Character correction for recognizer output in numeric contexts

use std::collections::BTreeMap;

/// Letter/digit confusions seen on handwritten log sheets. `None` deletes.
const STANDARD: &[(char, Option<char>)] = &[
    ('A', Some('4')),
    ('B', Some('8')),
    ('m', Some('3')),
    ('G', Some('6')),
    ('I', Some('1')),
    ('O', Some('0')),
    ('S', Some('5')),
    ('T', Some('7')),
    ('Z', Some('2')),
    ('l', Some('1')),
    ('M', Some('3')),
    ('g', Some('9')),
    (',', Some('.')),
    ('+', Some('7')),
    ('-', None),
    ('D', None),
];

/// Vertical strokes the recognizer reads instead of a "1"
const STRICT_EXTRA: &[(char, Option<char>)] = &[('/', Some('1')), ('\\', Some('1')), ('|', Some('1'))];

/// Per-character substitution table applied to recognized text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionTable {
    entries: BTreeMap<char, Option<char>>,
}

impl SubstitutionTable {
    /// A table with no substitutions
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn standard() -> Self {
        Self::empty().with_entries(STANDARD)
    }

    /// The standard table plus slash, backslash and pipe mapped to "1"
    pub fn strict() -> Self {
        Self::standard().with_entries(STRICT_EXTRA)
    }

    /// Add or override a substitution; `None` deletes the character
    pub fn with(mut self, from: char, to: Option<char>) -> Self {
        self.entries.insert(from, to);
        self
    }

    fn with_entries(self, entries: &[(char, Option<char>)]) -> Self {
        entries
            .iter()
            .fold(self, |table, &(from, to)| table.with(from, to))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `c` has an entry in the table
    pub fn contains(&self, c: char) -> bool {
        self.entries.contains_key(&c)
    }

    /// Substitute every character of `text`; unknown characters pass through
    pub fn apply(&self, text: &str) -> String {
        text.chars()
            .filter_map(|c| match self.entries.get(&c) {
                Some(replacement) => *replacement,
                None => Some(c),
            })
            .collect()
    }

    /// Apply the table to each string, preserving order
    pub fn apply_all<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        texts.iter().map(|t| self.apply(t.as_ref())).collect()
    }

    /// True when no replacement is itself a key, so `apply` is idempotent
    pub fn is_stable(&self) -> bool {
        self.entries
            .values()
            .flatten()
            .all(|replacement| !self.entries.contains_key(replacement))
    }
}

impl Default for SubstitutionTable {
    fn default() -> Self {
        Self::standard()
    }
}
