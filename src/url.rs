use maplit::hashmap;
use std::{fmt, str::FromStr};
use strfmt::strfmt;
use thiserror::Error;

use crate::tile::Tile;

/// Static map endpoint the tool was written against.
pub const DEFAULT_URL_TEMPLATE: &str = "https://maps.googleapis.com/maps/api/staticmap?center={lat},{lon}&zoom={zoom}&size={size}x{size}&maptype={maptype}&scale={scale}&format={format}";

#[derive(Debug, Error, PartialEq)]
pub enum UrlError {
    #[error("failed formatting URL template: {0}")]
    Template(String),

    #[error("invalid style `{0}`, expected `feature|element|rule`")]
    Style(String),
}

/// A single map style rule, rendered as `feature:<feature>|element:<element>|<rule>`.
///
/// # Example
/// ```rust
/// # use static_map_spiral::Style;
/// let hide_labels: Style = "all|labels|visibility:off".parse().unwrap();
/// assert_eq!(hide_labels.to_string(), "feature:all|element:labels|visibility:off");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Style {
    pub feature: String,
    pub element: String,
    pub rule: String,
}

impl Style {
    pub fn new(
        feature: impl Into<String>,
        element: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            feature: feature.into(),
            element: element.into(),
            rule: rule.into(),
        }
    }
}

impl FromStr for Style {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '|');

        match (parts.next(), parts.next(), parts.next()) {
            (Some(feature), Some(element), Some(rule))
                if !feature.is_empty() && !element.is_empty() && !rule.is_empty() =>
            {
                Ok(Self::new(feature, element, rule))
            }
            _ => Err(UrlError::Style(s.to_owned())),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "feature:{}|element:{}|{}",
            self.feature, self.element, self.rule
        )
    }
}

/// Builds request URLs for single tiles.
///
/// The template may use the specifiers `{lat}`, `{lon}`, `{zoom}`, `{size}`,
/// `{maptype}`, `{scale}` and `{format}`. Styles and the API key are appended
/// as query parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct UrlFormat {
    format_str: String,
    styles: Vec<Style>,
    key: Option<String>,
}

impl UrlFormat {
    pub fn new(format_str: impl Into<String>) -> Self {
        Self {
            format_str: format_str.into(),
            styles: Vec::new(),
            key: None,
        }
    }

    pub fn with_styles(mut self, styles: Vec<Style>) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.key = key;
        self
    }

    pub fn tile_url(&self, tile: &Tile) -> Result<String, UrlError> {
        let vars = hashmap! {
            "lat".to_owned() => tile.coord.lat.to_string(),
            "lon".to_owned() => tile.coord.lon.to_string(),
            "zoom".to_owned() => tile.geometry.zoom.to_string(),
            "size".to_owned() => tile.geometry.size.to_string(),
            "scale".to_owned() => tile.geometry.scale.to_string(),
            "maptype".to_owned() => tile.map_type.as_str().to_owned(),
            "format".to_owned() => tile.format.as_str().to_owned(),
        };

        let mut url = strfmt(&self.format_str, &vars)
            .map_err(|e| UrlError::Template(e.to_string()))?;

        for style in &self.styles {
            url.push_str("&style=");
            url.push_str(&style.to_string());
        }

        if let Some(key) = &self.key {
            url.push_str("&key=");
            url.push_str(key);
        }

        Ok(url)
    }
}

impl Default for UrlFormat {
    fn default() -> Self {
        Self::new(DEFAULT_URL_TEMPLATE)
    }
}
