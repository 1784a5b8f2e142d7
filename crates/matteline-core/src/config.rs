use serde::{Deserialize, Serialize};

/// Project parameters used when a build request leaves them unspecified.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectDefaults {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub total_frames: u32,
    pub mask_expansion: i32,
    pub mask_feather: u32,
}

impl Default for ProjectDefaults {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 16,
            total_frames: 81,
            mask_expansion: 0,
            mask_feather: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Shard whole frames across a worker pool.
    pub parallel: bool,
    pub output_dir: String,
    pub frame_prefix: String,
    pub matte_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            output_dir: "output".to_string(),
            frame_prefix: "frame".to_string(),
            matte_prefix: "matte".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct MattelineConfig {
    #[serde(default)]
    pub project: ProjectDefaults,
    #[serde(default)]
    pub render: RenderConfig,
}

impl MattelineConfig {
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: MattelineConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
