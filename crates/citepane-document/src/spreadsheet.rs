//! Spreadsheet document model
//!
//! Row data arrives with the main payload; per-cell formatting is sparse
//! and may be streamed in afterwards by the chunk loader. The formatting
//! map therefore only ever grows: merges are additive and a cell that is
//! already styled is never overwritten by a later chunk.

use crate::id::{DocumentId, SheetName};
use crate::preview::DocumentMetadata;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::str::FromStr;

/// Position of a cell within a sheet (zero-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    /// Row index.
    pub row: u32,
    /// Column index.
    pub column: u32,
}

impl CellRef {
    /// Create a cell reference.
    #[inline]
    #[must_use]
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl std::fmt::Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// Error parsing a `row:column` cell reference key.
#[derive(Debug, thiserror::Error)]
#[error("invalid cell reference: '{0}'")]
pub struct CellRefParseError(String);

impl FromStr for CellRef {
    type Err = CellRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, column) = s
            .split_once(':')
            .ok_or_else(|| CellRefParseError(s.to_string()))?;
        let row = row
            .parse()
            .map_err(|_| CellRefParseError(s.to_string()))?;
        let column = column
            .parse()
            .map_err(|_| CellRefParseError(s.to_string()))?;
        Ok(Self { row, column })
    }
}

/// Border edges carrying a visible line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBorders {
    /// Top edge.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub top: bool,
    /// Bottom edge.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bottom: bool,
    /// Left edge.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub left: bool,
    /// Right edge.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub right: bool,
}

/// Visual style extracted for a single cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellStyle {
    /// Background color as a CSS color string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Font color as a CSS color string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    /// Bold text.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    /// Italic text.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    /// Underlined text.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub underline: bool,
    /// Font size in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// Visible border edges.
    #[serde(default, skip_serializing_if = "CellBorders::is_empty")]
    pub borders: CellBorders,
    /// Hyperlink target, if the cell links out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
    /// Whether this cell anchors a merged range.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub merge_anchor: bool,
}

impl CellBorders {
    fn is_empty(&self) -> bool {
        !(self.top || self.bottom || self.left || self.right)
    }
}

/// Sparse map from cell position to style.
///
/// Serialized as a JSON object keyed by `"row:column"` strings, matching
/// the wire format of the formatting endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattingMap {
    cells: HashMap<CellRef, CellStyle>,
}

impl FormattingMap {
    /// Empty map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Style for a cell, if one was extracted.
    #[inline]
    #[must_use]
    pub fn get(&self, cell: CellRef) -> Option<&CellStyle> {
        self.cells.get(&cell)
    }

    /// Record a style for a cell, replacing any existing style.
    #[inline]
    pub fn insert(&mut self, cell: CellRef, style: CellStyle) {
        self.cells.insert(cell, style);
    }

    /// Number of styled cells.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell carries a style.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Merge `chunk` into this map additively.
    ///
    /// Cells already present keep their existing style; chunks target
    /// disjoint row ranges so collisions are not expected, but the first
    /// writer wins if one occurs. Returns the number of cells added.
    pub fn merge(&mut self, chunk: FormattingMap) -> usize {
        let mut added = 0;
        for (cell, style) in chunk.cells {
            if let std::collections::hash_map::Entry::Vacant(slot) = self.cells.entry(cell) {
                slot.insert(style);
                added += 1;
            }
        }
        added
    }

    /// Iterate over styled cells.
    pub fn iter(&self) -> impl Iterator<Item = (CellRef, &CellStyle)> {
        self.cells.iter().map(|(cell, style)| (*cell, style))
    }
}

impl FromIterator<(CellRef, CellStyle)> for FormattingMap {
    fn from_iter<I: IntoIterator<Item = (CellRef, CellStyle)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl Serialize for FormattingMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (cell, style) in &self.cells {
            map.serialize_entry(&cell.to_string(), style)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FormattingMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = FormattingMap;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map keyed by 'row:column' strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut cells = HashMap::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, style)) = access.next_entry::<String, CellStyle>()? {
                    let cell = key.parse::<CellRef>().map_err(serde::de::Error::custom)?;
                    cells.insert(cell, style);
                }
                Ok(FormattingMap { cells })
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

/// Column descriptor for the grid renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Key into each row's value map.
    pub key: String,
    /// Display name.
    pub name: String,
}

impl Column {
    /// Column whose key and display name coincide.
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            name,
        }
    }
}

/// One sheet of a spreadsheet document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    /// Sheet name (unique within the document).
    pub name: SheetName,
    /// Column descriptors, in display order.
    pub columns: Vec<Column>,
    /// Row values keyed by column key. Only a window of rows may be
    /// present when `has_more` is set.
    pub rows: Vec<HashMap<String, serde_json::Value>>,
    /// Total row count server-side, which may exceed `rows.len()`.
    pub total_row_count: u32,
    /// Whether the server holds more rows than were returned.
    #[serde(default)]
    pub has_more: bool,
    /// Sparse per-cell styles. Grows monotonically while the chunk
    /// loader streams formatting in.
    #[serde(default)]
    pub formatting: FormattingMap,
}

/// Spreadsheet document payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetDocument {
    /// Document id.
    pub id: DocumentId,
    /// Display title.
    pub title: String,
    /// Sheets in workbook order.
    pub sheets: Vec<Sheet>,
    /// Name of the sheet shown on open.
    pub active_sheet: SheetName,
    /// Free-form tags.
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl SpreadsheetDocument {
    /// Sheet by name.
    #[must_use]
    pub fn sheet(&self, name: &SheetName) -> Option<&Sheet> {
        self.sheets.iter().find(|s| &s.name == name)
    }

    /// Mutable sheet by name.
    pub fn sheet_mut(&mut self, name: &SheetName) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| &s.name == name)
    }

    /// The sheet currently shown, if `active_sheet` names a real sheet.
    #[must_use]
    pub fn active(&self) -> Option<&Sheet> {
        self.sheet(&self.active_sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(color: &str) -> CellStyle {
        CellStyle {
            background_color: Some(color.to_string()),
            ..CellStyle::default()
        }
    }

    #[test]
    fn cell_ref_parses_its_display_form() {
        let cell = CellRef::new(12, 3);
        assert_eq!(cell.to_string(), "12:3");
        assert_eq!("12:3".parse::<CellRef>().unwrap(), cell);
        assert!("12".parse::<CellRef>().is_err());
        assert!("a:b".parse::<CellRef>().is_err());
    }

    #[test]
    fn merge_is_additive() {
        let mut map: FormattingMap = (0..100)
            .map(|row| (CellRef::new(row, 0), style("#fff")))
            .collect();
        let chunk: FormattingMap = (100..200)
            .map(|row| (CellRef::new(row, 0), style("#eee")))
            .collect();

        let added = map.merge(chunk);
        assert_eq!(added, 100);
        assert_eq!(map.len(), 200);
    }

    #[test]
    fn merge_never_overwrites_existing_cells() {
        let mut map = FormattingMap::new();
        map.insert(CellRef::new(5, 5), style("#111111"));

        let mut late_chunk = FormattingMap::new();
        late_chunk.insert(CellRef::new(5, 5), style("#222222"));
        late_chunk.insert(CellRef::new(6, 5), style("#333333"));

        let added = map.merge(late_chunk);
        assert_eq!(added, 1);
        assert_eq!(
            map.get(CellRef::new(5, 5)).unwrap().background_color.as_deref(),
            Some("#111111")
        );
    }

    #[test]
    fn formatting_map_wire_format() {
        let mut map = FormattingMap::new();
        map.insert(
            CellRef::new(0, 2),
            CellStyle {
                bold: true,
                ..CellStyle::default()
            },
        );

        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("\"0:2\""));
        let back: FormattingMap = serde_json::from_str(&json).unwrap();
        assert!(back.get(CellRef::new(0, 2)).unwrap().bold);
    }

    proptest::proptest! {
        #[test]
        fn prop_cell_ref_display_parses_back(row in 0u32..1_000_000, column in 0u32..10_000) {
            let cell = CellRef::new(row, column);
            let parsed = cell.to_string().parse::<CellRef>().unwrap();
            proptest::prop_assert_eq!(parsed, cell);
        }
    }

    #[test]
    fn sheet_lookup_by_name() {
        let doc = SpreadsheetDocument {
            id: DocumentId::new("rid-1"),
            title: "Register".to_string(),
            sheets: vec![Sheet {
                name: SheetName::new("Q3"),
                columns: vec![Column::new("Risk")],
                rows: Vec::new(),
                total_row_count: 0,
                has_more: false,
                formatting: FormattingMap::new(),
            }],
            active_sheet: SheetName::new("Q3"),
            metadata: DocumentMetadata::empty(),
        };

        assert!(doc.active().is_some());
        assert!(doc.sheet(&SheetName::new("missing")).is_none());
    }
}
