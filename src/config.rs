use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::content::slug::tag_slug;

/// Per-view graph settings. Every field falls back to its default on its own
/// when the source leaves it out or gives it the wrong type.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphConfig {
    pub depth: i32,
    pub scale: f32,
    pub repel_force: f32,
    pub center_force: f32,
    pub link_distance: f32,
    pub font_size: f32,
    pub opacity_scale: f32,
    pub remove_tags: Vec<String>,
    pub show_tags: bool,
    pub focus_on_hover: bool,
    pub enable_radial: bool,
    pub drag: bool,
    pub zoom: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::local()
    }
}

impl GraphConfig {
    pub fn local() -> Self {
        Self {
            depth: 1,
            scale: 1.1,
            repel_force: 0.5,
            center_force: 0.3,
            link_distance: 30.0,
            font_size: 0.6,
            opacity_scale: 1.0,
            remove_tags: Vec::new(),
            show_tags: true,
            focus_on_hover: false,
            enable_radial: false,
            drag: true,
            zoom: true,
        }
    }

    pub fn global() -> Self {
        Self {
            depth: -1,
            scale: 0.9,
            center_force: 0.2,
            focus_on_hover: true,
            enable_radial: true,
            ..Self::local()
        }
    }

    /// Overlays the recognised fields of `value` onto `defaults`.
    pub fn from_value(value: &Value, defaults: Self) -> Self {
        let Some(object) = value.as_object() else {
            if !value.is_null() {
                warn!("graph configuration is not an object, using defaults");
            }
            return defaults;
        };

        let remove_tags: Vec<String> = field(object, "removeTags", defaults.remove_tags);
        Self {
            depth: field(object, "depth", defaults.depth),
            scale: positive(field(object, "scale", defaults.scale), defaults.scale, "scale"),
            repel_force: field(object, "repelForce", defaults.repel_force),
            center_force: field(object, "centerForce", defaults.center_force),
            link_distance: field(object, "linkDistance", defaults.link_distance),
            font_size: positive(
                field(object, "fontSize", defaults.font_size),
                defaults.font_size,
                "fontSize",
            ),
            opacity_scale: field(object, "opacityScale", defaults.opacity_scale),
            remove_tags: remove_tags.iter().map(|tag| tag_slug(tag)).collect(),
            show_tags: field(object, "showTags", defaults.show_tags),
            focus_on_hover: field(object, "focusOnHover", defaults.focus_on_hover),
            enable_radial: field(object, "enableRadial", defaults.enable_radial),
            drag: field(object, "drag", defaults.drag),
            zoom: field(object, "zoom", defaults.zoom),
        }
    }
}

fn field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str, default: T) -> T {
    let Some(value) = object.get(key) else {
        return default;
    };

    match serde_json::from_value(value.clone()) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(field = key, %error, "ignoring malformed graph configuration field");
            default
        }
    }
}

fn positive(value: f32, default: f32, key: &str) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!(field = key, value, "graph configuration field must be positive");
        default
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub base_path: String,
    pub local: GraphConfig,
    pub global: GraphConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ViewerConfig {
    pub fn defaults() -> Self {
        Self {
            base_path: String::new(),
            local: GraphConfig::local(),
            global: GraphConfig::global(),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::defaults();
        let Some(object) = value.as_object() else {
            warn!("viewer configuration is not an object, using defaults");
            return defaults;
        };

        Self {
            base_path: field(object, "basePath", defaults.base_path),
            local: object
                .get("local")
                .map(|value| GraphConfig::from_value(value, GraphConfig::local()))
                .unwrap_or(defaults.local),
            global: object
                .get("global")
                .map(|value| GraphConfig::from_value(value, GraphConfig::global()))
                .unwrap_or(defaults.global),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("config {} is not valid JSON", path.display()))?;
        Ok(Self::from_value(&value))
    }

    /// Never fails: unreadable or malformed files are logged and replaced by defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::defaults();
        };

        match Self::read(path) {
            Ok(config) => config,
            Err(error) => {
                warn!(error = format!("{error:#}"), "using default viewer configuration");
                Self::defaults()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn absent_configuration_uses_defaults() {
        assert_eq!(GraphConfig::from_value(&Value::Null, GraphConfig::local()), GraphConfig::local());
        assert_eq!(ViewerConfig::load(None), ViewerConfig::defaults());
    }

    #[test]
    fn default_viewer_config_keeps_the_global_set() {
        let config = ViewerConfig::default();
        assert_eq!(config, ViewerConfig::defaults());
        assert_eq!(config.global, GraphConfig::global());
        assert_ne!(config.global, config.local);
    }

    #[test]
    fn malformed_fields_fall_back_individually() {
        let config = GraphConfig::from_value(
            &json!({"depth": "three", "scale": 2.0, "showTags": 1, "removeTags": ["draft"]}),
            GraphConfig::local(),
        );
        assert_eq!(config.depth, 1);
        assert_eq!(config.scale, 2.0);
        assert!(config.show_tags);
        assert_eq!(config.remove_tags, vec!["tags/draft".to_owned()]);
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        let config = GraphConfig::from_value(&json!({"scale": 0.0}), GraphConfig::global());
        assert_eq!(config.scale, GraphConfig::global().scale);
    }

    #[test]
    fn global_slot_keeps_its_own_defaults() {
        let config = ViewerConfig::from_value(&json!({"basePath": "docs", "global": {"depth": 2}}));
        assert_eq!(config.base_path, "docs");
        assert_eq!(config.local, GraphConfig::local());
        assert_eq!(config.global.depth, 2);
        assert!(config.global.enable_radial);
    }

    #[test]
    fn unreadable_file_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, "{ broken").unwrap();
        assert_eq!(ViewerConfig::load(Some(&path)), ViewerConfig::defaults());
    }
}
