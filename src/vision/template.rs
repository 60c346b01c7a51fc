//! Template library loading
//!
//! Templates are reference images of UI elements, loaded once at startup and
//! shared read-only for the lifetime of the run. A missing or undecodable
//! file is a configuration error at load time, never a runtime one.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use super::{Region, VisionError};

/// Default confidence threshold when the manifest does not override it
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// Default reference resolution templates were captured at
pub const DEFAULT_REFERENCE_WIDTH: u32 = 1920;
pub const DEFAULT_REFERENCE_HEIGHT: u32 = 1080;

/// A named reference image with its matching threshold and optional
/// search region (in reference-resolution pixels)
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub image: GrayImage,
    pub threshold: f32,
    pub region: Option<Region>,
}

/// Optional per-directory manifest (`templates.json`) overriding thresholds
/// and search regions for individual templates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateManifest {
    #[serde(default)]
    pub reference_width: Option<u32>,
    #[serde(default)]
    pub reference_height: Option<u32>,
    #[serde(default)]
    pub default_threshold: Option<f32>,
    #[serde(default)]
    pub templates: HashMap<String, TemplateOverride>,
}

/// Per-template manifest entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateOverride {
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub region: Option<Region>,
}

/// The loaded template set, keyed by file stem
pub struct TemplateStore {
    templates: HashMap<String, Template>,
    reference_width: u32,
    reference_height: u32,
}

impl TemplateStore {
    /// Load every `*.png` in a directory, applying `templates.json` overrides
    /// when present
    pub fn load_dir(dir: &Path) -> Result<Self, VisionError> {
        let manifest = Self::load_manifest(dir)?;
        let default_threshold = manifest.default_threshold.unwrap_or(DEFAULT_THRESHOLD);

        let entries = fs::read_dir(dir)
            .map_err(|e| VisionError::TemplateDir(format!("{}: {e}", dir.display())))?;

        let mut templates = HashMap::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| VisionError::TemplateDir(format!("{}: {e}", dir.display())))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }

            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            if name.is_empty() {
                continue;
            }

            let image = image::open(&path)
                .map_err(|e| VisionError::TemplateDecode(name.clone(), e.to_string()))?
                .to_luma8();

            let overrides = manifest.templates.get(&name);
            templates.insert(
                name.clone(),
                Template {
                    name,
                    image,
                    threshold: overrides
                        .and_then(|o| o.threshold)
                        .unwrap_or(default_threshold),
                    region: overrides.and_then(|o| o.region),
                },
            );
        }

        if templates.is_empty() {
            return Err(VisionError::TemplateDir(format!(
                "no templates found in {}",
                dir.display()
            )));
        }

        log::info!("Loaded {} templates from {}", templates.len(), dir.display());

        Ok(Self {
            templates,
            reference_width: manifest.reference_width.unwrap_or(DEFAULT_REFERENCE_WIDTH),
            reference_height: manifest
                .reference_height
                .unwrap_or(DEFAULT_REFERENCE_HEIGHT),
        })
    }

    fn load_manifest(dir: &Path) -> Result<TemplateManifest, VisionError> {
        let path = dir.join("templates.json");
        if !path.exists() {
            return Ok(TemplateManifest::default());
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| VisionError::Manifest(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw).map_err(|e| VisionError::Manifest(e.to_string()))
    }

    /// Build a store directly from templates (fixtures in tests, embedded sets)
    pub fn from_templates(
        templates: Vec<Template>,
        reference_width: u32,
        reference_height: u32,
    ) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
            reference_width,
            reference_height,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Look up a template that must exist, surfacing a config error otherwise
    pub fn require(&self, name: &str) -> Result<&Template, VisionError> {
        self.templates
            .get(name)
            .ok_or_else(|| VisionError::UnknownTemplate(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn reference_width(&self) -> u32 {
        self.reference_width
    }

    pub fn reference_height(&self) -> u32 {
        self.reference_height
    }
}
