//! Board configuration
//!
//! Loaded from TOML; every field has a default so an empty file is a valid
//! configuration.
//!
//! ```toml
//! app_id = "samtech-record-board"
//! palette = ["#f0f9ff", "#f7fee7"]
//! status_filter = "open"
//! log_filter = "info,faultboard_store=debug"
//! ```

use crate::error::ConfigError;
use faultboard_graph::{Palette, DEFAULT_PALETTE};
use faultboard_store::{Direction, Query};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application id used when none is configured
pub const DEFAULT_APP_ID: &str = "samtech-record-board";

/// Which records the status-filtered feed shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Records still open
    #[default]
    Open,
    /// Records marked closed
    Closed,
    /// Everything
    All,
}

impl StatusFilter {
    /// Feed query: matching records, newest first
    #[must_use]
    pub fn query(self) -> Query {
        let query = match self {
            Self::Open => Query::all().where_eq("isClosed", false),
            Self::Closed => Query::all().where_eq("isClosed", true),
            Self::All => Query::all(),
        };
        query.order_by("createdAt", Direction::Descending)
    }

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

/// Board session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Application id; selects the record collection
    pub app_id: String,
    /// Group background colors, `#rrggbb`
    pub palette: Vec<String>,
    /// Initial status filter for the record feed
    pub status_filter: StatusFilter,
    /// Default `tracing` filter, overridden by `RUST_LOG`
    pub log_filter: String,
}

impl BoardConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With application id
    #[inline]
    #[must_use]
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    /// With palette
    #[must_use]
    pub fn with_palette<S: AsRef<str>>(mut self, colors: &[S]) -> Self {
        self.palette = colors.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    /// With initial status filter
    #[inline]
    #[must_use]
    pub fn with_status_filter(mut self, filter: StatusFilter) -> Self {
        self.status_filter = filter;
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed TOML and any error from
    /// [`BoardConfig::validate`].
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`BoardConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), app_id = %config.app_id, "loaded board config");
        Ok(config)
    }

    /// Check every field
    ///
    /// # Errors
    /// Fails on an empty app id, an empty palette or a malformed color.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "app_id",
                reason: "must not be empty".to_string(),
            });
        }
        if self.app_id.contains('/') {
            return Err(ConfigError::Invalid {
                field: "app_id",
                reason: format!("must not contain '/': {}", self.app_id),
            });
        }
        self.palette()?;
        Ok(())
    }

    /// Parsed palette
    ///
    /// # Errors
    /// Returns [`ConfigError::Palette`] on an empty list or malformed color.
    pub fn palette(&self) -> Result<Palette, ConfigError> {
        Ok(Palette::parse(&self.palette)?)
    }

    /// Path of the record collection for this application
    #[must_use]
    pub fn collection_path(&self) -> String {
        format!("artifacts/{}/public/data/records", self.app_id)
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            palette: DEFAULT_PALETTE.iter().map(|c| (*c).to_string()).collect(),
            status_filter: StatusFilter::default(),
            log_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultboard_graph::ColorError;

    #[test]
    fn empty_document_gives_defaults() {
        let config = BoardConfig::from_toml_str("").unwrap();
        assert_eq!(config, BoardConfig::default());
        assert_eq!(
            config.collection_path(),
            "artifacts/samtech-record-board/public/data/records"
        );
        assert_eq!(config.palette().unwrap(), Palette::default());
    }

    #[test]
    fn fields_override_defaults() {
        let config = BoardConfig::from_toml_str(
            r##"
            app_id = "workshop"
            palette = ["#FFFFFF", "#000000"]
            status_filter = "all"
            "##,
        )
        .unwrap();
        assert_eq!(config.app_id, "workshop");
        assert_eq!(config.status_filter, StatusFilter::All);
        assert_eq!(config.palette().unwrap().len(), 2);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn empty_palette_is_rejected() {
        let err = BoardConfig::new()
            .with_palette::<&str>(&[])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Palette(ColorError::EmptyPalette)));
    }

    #[test]
    fn malformed_color_is_rejected() {
        let err = BoardConfig::from_toml_str(r#"palette = ["blue"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Palette(ColorError::InvalidColor(_))));
    }

    #[test]
    fn unknown_status_is_a_parse_error() {
        let err = BoardConfig::from_toml_str(r#"status_filter = "pending""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn blank_app_id_is_rejected() {
        let err = BoardConfig::new().with_app_id("  ").validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "app_id", .. }));
    }

    #[test]
    fn status_queries_filter_on_is_closed() {
        let open = StatusFilter::Open.query();
        assert_eq!(open.filters().len(), 1);
        assert_eq!(open.filters()[0].value, serde_json::Value::Bool(false));
        assert!(StatusFilter::All.query().filters().is_empty());
    }
}
