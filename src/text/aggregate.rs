use super::parse::{DimensionToken, ParsedLine};
use crate::error::OcrError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::Path;

/// Parsed lines of one row strip, tagged with the strip's 1-based index
#[derive(Debug, Clone, PartialEq)]
pub struct RowResult {
    pub index: usize,
    pub lines: Vec<ParsedLine>,
}

/// Concatenate every token of every line in input order
pub fn aggregate(lines: &[ParsedLine]) -> Vec<DimensionToken> {
    lines.iter().flatten().cloned().collect()
}

/// Restore strip order, then flatten every row's tokens
pub fn aggregate_rows(mut rows: Vec<RowResult>) -> Vec<DimensionToken> {
    rows.sort_by_key(|row| row.index);
    rows.iter().flat_map(|row| aggregate(&row.lines)).collect()
}

/// Flat token list keyed "1", "2", ... in order.
///
/// Serializes as a JSON object whose keys appear in numeric order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResult {
    tokens: Vec<DimensionToken>,
}

impl AggregatedResult {
    pub fn new(tokens: Vec<DimensionToken>) -> Self {
        Self { tokens }
    }

    pub fn from_rows(rows: Vec<RowResult>) -> Self {
        Self::new(aggregate_rows(rows))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[DimensionToken] {
        &self.tokens
    }

    /// Look up a token by its 1-based key
    pub fn get(&self, key: &str) -> Option<&str> {
        let position: usize = key.parse().ok()?;
        self.tokens
            .get(position.checked_sub(1)?)
            .map(String::as_str)
    }

    /// Entries as (key, token) pairs
    pub fn entries(&self) -> impl Iterator<Item = (String, &str)> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(i, token)| ((i + 1).to_string(), token.as_str()))
    }

    pub fn to_json_pretty(&self) -> Result<String, OcrError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| OcrError::Internal(format!("Failed to serialize result: {}", e)))
    }

    /// Persist the mapping as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<(), OcrError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                OcrError::Internal(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, self.to_json_pretty()?).map_err(|e| {
            OcrError::Internal(format!("Failed to write {}: {}", path.display(), e))
        })?;
        tracing::info!("Results written to {}", path.display());
        Ok(())
    }
}

impl Serialize for AggregatedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tokens.len()))?;
        for (key, token) in self.entries() {
            map.serialize_entry(&key, token)?;
        }
        map.end()
    }
}
