use crate::images::DEFAULT_CATEGORY;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub images: Images,
    #[serde(default)]
    pub export: Export,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        self.images
            .allowed_extensions
            .iter()
            .any(|a| a.eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    pub data_file: String,
    /// Write a temporary sibling and rename it into place.
    pub atomic_writes: bool,
    pub skip_unchanged_writes: bool,
    pub seed_default_report: bool,
}
impl Default for Storage {
    fn default() -> Self {
        Self {
            data_file: "nev_research_data.json".into(),
            atomic_writes: true,
            skip_unchanged_writes: true,
            seed_default_report: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Images {
    pub allowed_extensions: Vec<String>,
    pub default_category: String,
    pub categories: Vec<String>,
    pub max_image_bytes: u64,
}
impl Default for Images {
    fn default() -> Self {
        Self {
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "bmp"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_category: DEFAULT_CATEGORY.into(),
            categories: [
                DEFAULT_CATEGORY,
                "Vehicle Images",
                "Infrastructure",
                "Charts & Graphs",
                "Research Data",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_image_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    pub out_dir: String,
    pub store_file_prefix: String,
    pub images_dir_prefix: String,
}
impl Default for Export {
    fn default() -> Self {
        Self {
            out_dir: "exports".into(),
            store_file_prefix: "nev_research".into(),
            images_dir_prefix: "nev_images".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "report-desk.log".into(),
        }
    }
}
