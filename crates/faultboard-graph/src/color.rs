//! Session-stable group colors
//!
//! [`ColorAssignmentStore`] hands each group id a palette color the first
//! time it is seen and keeps it for the life of the store. Assignments are
//! never overwritten or removed, so a group that drops out of one snapshot
//! and comes back with the same root gets its old color back. The palette
//! cursor is session-wide: colors repeat only once the palette has been
//! cycled through.

use crate::engine::Groups;
use crate::error::ColorError;
use crate::record::RecordId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default group background palette
pub const DEFAULT_PALETTE: [&str; 6] = [
    "#f0f9ff", "#f7fee7", "#fefce8", "#fff7ed", "#fdf2f8", "#faf5ff",
];

/// `#rrggbb` color
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    /// Parse a `#rrggbb` color, normalized to lowercase
    ///
    /// # Errors
    /// Returns [`ColorError::InvalidColor`] for anything else.
    pub fn parse(value: &str) -> Result<Self, ColorError> {
        let hex = value
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| ColorError::InvalidColor(value.to_string()))?;
        Ok(Self(format!("#{}", hex.to_ascii_lowercase())))
    }

    /// Hex form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.0
    }
}

/// Non-empty, fixed list of colors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Color>", into = "Vec<Color>")]
pub struct Palette(Vec<Color>);

impl Palette {
    /// Build a palette
    ///
    /// # Errors
    /// Returns [`ColorError::EmptyPalette`] if `colors` is empty.
    pub fn new(colors: Vec<Color>) -> Result<Self, ColorError> {
        if colors.is_empty() {
            return Err(ColorError::EmptyPalette);
        }
        Ok(Self(colors))
    }

    /// Parse a palette from hex strings
    ///
    /// # Errors
    /// Fails on an empty list or any malformed color.
    pub fn parse<S: AsRef<str>>(colors: &[S]) -> Result<Self, ColorError> {
        let colors = colors
            .iter()
            .map(|c| Color::parse(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(colors)
    }

    /// Color at `index`, wrapping around
    #[must_use]
    pub fn cycle(&self, index: usize) -> &Color {
        &self.0[index % self.0.len()]
    }

    /// Number of colors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Colors in palette order
    pub fn iter(&self) -> impl Iterator<Item = &Color> {
        self.0.iter()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self(
            DEFAULT_PALETTE
                .iter()
                .map(|c| Color((*c).to_string()))
                .collect(),
        )
    }
}

impl TryFrom<Vec<Color>> for Palette {
    type Error = ColorError;

    fn try_from(value: Vec<Color>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Palette> for Vec<Color> {
    fn from(value: Palette) -> Self {
        value.0
    }
}

/// Append-only `group id -> color` map for one session
#[derive(Debug, Clone, Default)]
pub struct ColorAssignmentStore {
    palette: Palette,
    assignments: IndexMap<RecordId, Color>,
    issued: usize,
}

impl ColorAssignmentStore {
    /// Empty store over a palette
    #[must_use]
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            assignments: IndexMap::new(),
            issued: 0,
        }
    }

    /// Assign colors to every id that does not have one yet
    ///
    /// Ids are taken in the order given; existing assignments are left
    /// untouched. Returns how many ids received a new color.
    pub fn assign_colors<'a, I>(&mut self, group_ids: I) -> usize
    where
        I: IntoIterator<Item = &'a RecordId>,
    {
        let mut assigned = 0;
        for id in group_ids {
            if self.assignments.contains_key(id) {
                continue;
            }
            let color = self.palette.cycle(self.issued).clone();
            self.issued += 1;
            assigned += 1;
            tracing::trace!(group = %id, color = %color, "assigned group color");
            self.assignments.insert(id.clone(), color);
        }
        assigned
    }

    /// Assign colors to a grouping, oldest root first
    pub fn assign_groups(&mut self, groups: &Groups) -> usize {
        let ordered = groups.by_creation();
        self.assign_colors(ordered.iter().map(|g| &g.group_id))
    }

    /// Color of a group, if one was ever assigned
    #[inline]
    #[must_use]
    pub fn color_of(&self, group_id: &str) -> Option<&Color> {
        self.assignments.get(group_id)
    }

    /// Number of assignments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether nothing was assigned yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Assignments in the order they were made
    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &Color)> {
        self.assignments.iter()
    }

    /// Palette in use
    #[inline]
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<RecordId> {
        items.iter().map(|s| RecordId::from(*s)).collect()
    }

    #[test]
    fn parse_normalizes_case() {
        assert_eq!(Color::parse("#ABCDEF").unwrap().as_str(), "#abcdef");
        assert!(Color::parse("abcdef").is_err());
        assert!(Color::parse("#abc").is_err());
        assert!(Color::parse("#ghijkl").is_err());
    }

    #[test]
    fn empty_palette_rejected() {
        assert_eq!(Palette::new(Vec::new()), Err(ColorError::EmptyPalette));
        let empty: [&str; 0] = [];
        assert!(Palette::parse(&empty).is_err());
    }

    #[test]
    fn assigns_round_robin_once() {
        let mut store = ColorAssignmentStore::new(Palette::parse(&["#000001", "#000002"]).unwrap());

        assert_eq!(store.assign_colors(&ids(&["g1", "g2", "g3"])), 3);
        assert_eq!(store.color_of("g1").unwrap().as_str(), "#000001");
        assert_eq!(store.color_of("g2").unwrap().as_str(), "#000002");
        assert_eq!(store.color_of("g3").unwrap().as_str(), "#000001");

        assert_eq!(store.assign_colors(&ids(&["g3", "g2", "g1"])), 0);
        assert_eq!(store.color_of("g2").unwrap().as_str(), "#000002");
    }

    #[test]
    fn cursor_continues_across_calls() {
        let mut store = ColorAssignmentStore::default();
        store.assign_colors(&ids(&["g1"]));
        store.assign_colors(&ids(&["g2"]));

        assert_eq!(store.color_of("g1").unwrap().as_str(), DEFAULT_PALETTE[0]);
        assert_eq!(store.color_of("g2").unwrap().as_str(), DEFAULT_PALETTE[1]);
    }

    #[test]
    fn vanished_group_keeps_color() {
        let mut store = ColorAssignmentStore::default();
        store.assign_colors(&ids(&["g1", "g2"]));
        let c1 = store.color_of("g1").cloned();

        store.assign_colors(&ids(&["g2"]));
        store.assign_colors(&ids(&["g3"]));
        store.assign_colors(&ids(&["g1", "g3"]));

        assert_eq!(store.color_of("g1").cloned(), c1);
        assert_ne!(store.color_of("g3"), c1.as_ref());
        assert_eq!(store.len(), 3);
        let order: Vec<_> = store.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["g1", "g2", "g3"]);
    }

    #[test]
    fn palette_deserializes_from_strings() {
        let palette: Palette = serde_json::from_str(r##"["#FFFFFF", "#000000"]"##).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.cycle(3).as_str(), "#000000");
        assert!(serde_json::from_str::<Palette>("[]").is_err());
    }
}
