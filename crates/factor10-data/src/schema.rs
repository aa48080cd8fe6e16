//! Serde structs for the on-disk project document.
//!
//! Field names follow the saved JSON (`tickDelay`, `createdAt`, ...). Every
//! section is optional on load so hand-written projects can carry just
//! `code`.

use factor10_core::compiler::DEFAULT_SCRIPT;
use factor10_core::config::SimConfig;
use factor10_core::engine::{CompileReport, Simulator};
use factor10_core::script::CompileError;
use serde::{Deserialize, Serialize};

// ===========================================================================
// Project document
// ===========================================================================

/// A saved Factor10 project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFile {
    pub meta: ProjectMeta,
    pub settings: ProjectSettings,
    pub assets: Vec<AssetEntry>,
    pub code: String,
}

impl Default for ProjectFile {
    /// The new-project state: the sample factory and default settings.
    fn default() -> Self {
        Self {
            meta: ProjectMeta::default(),
            settings: ProjectSettings::default(),
            assets: Vec::new(),
            code: DEFAULT_SCRIPT.to_string(),
        }
    }
}

impl ProjectFile {
    /// A project named `name` holding `code`.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            meta: ProjectMeta {
                name: name.into(),
                ..ProjectMeta::default()
            },
            code: code.into(),
            ..Self::default()
        }
    }

    /// Engine configuration for this project. Without a stored seed the
    /// engine default is used.
    pub fn sim_config(&self) -> SimConfig {
        match self.settings.seed {
            Some(seed) => SimConfig::with_seed(seed),
            None => SimConfig::default(),
        }
    }

    /// Build a simulator and compile the project's code into it.
    pub fn open(&self) -> Result<(Simulator, CompileReport), CompileError> {
        let mut sim = Simulator::new(self.sim_config());
        let report = sim.run_code(&self.code)?;
        Ok((sim, report))
    }

    /// Download name used by the editor: `factor10_<name>.json`, with every
    /// character outside `[a-z0-9]` replaced by `_`.
    pub fn suggested_file_name(&self) -> String {
        let stem: String = self
            .meta
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("factor10_{stem}.json")
    }
}

// ===========================================================================
// Meta and settings
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectMeta {
    pub name: String,
    pub version: String,
    pub author: String,
    /// ISO-8601 timestamp written by the editor. Kept verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Default for ProjectMeta {
    fn default() -> Self {
        Self {
            name: "Untitled Project".to_string(),
            version: "1.0.0".to_string(),
            author: "Anonymous".to_string(),
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectSettings {
    /// Wall-clock milliseconds between ticks in the interactive player.
    pub tick_delay: u32,
    pub show_grid: bool,
    pub show_links: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ProjectSettings {
    pub const DEFAULT_TICK_DELAY: u32 = 500;
    pub const MIN_TICK_DELAY: u32 = 100;
    pub const MAX_TICK_DELAY: u32 = 2000;
    /// Step used by the faster/slower controls.
    pub const TICK_DELAY_STEP: u32 = 100;

    /// The stored delay, with 0 read as the default and the result kept in
    /// `MIN_TICK_DELAY..=MAX_TICK_DELAY`.
    pub fn clamped_tick_delay(&self) -> u32 {
        let delay = if self.tick_delay == 0 {
            Self::DEFAULT_TICK_DELAY
        } else {
            self.tick_delay
        };
        delay.clamp(Self::MIN_TICK_DELAY, Self::MAX_TICK_DELAY)
    }

    /// Shorten the delay by one step, not below the minimum.
    pub fn speed_up(&mut self) {
        self.tick_delay = self
            .clamped_tick_delay()
            .saturating_sub(Self::TICK_DELAY_STEP)
            .max(Self::MIN_TICK_DELAY);
    }

    /// Lengthen the delay by one step, not above the maximum.
    pub fn slow_down(&mut self) {
        self.tick_delay =
            (self.clamped_tick_delay() + Self::TICK_DELAY_STEP).min(Self::MAX_TICK_DELAY);
    }
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            tick_delay: Self::DEFAULT_TICK_DELAY,
            show_grid: true,
            show_links: true,
            seed: None,
        }
    }
}

// ===========================================================================
// Assets
// ===========================================================================

/// A 3D asset registered with the project. Scripts refer to it by `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub name: String,
    /// Embedded model data or a URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default)]
    pub transform: AssetTransform,
}

/// Base transform applied to every instance of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetTransform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for AssetTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const ONE: Self = Self {
        x: 1.0,
        y: 1.0,
        z: 1.0,
    };
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_project_holds_sample() {
        let project = ProjectFile::default();
        assert_eq!(project.code, DEFAULT_SCRIPT);
        assert_eq!(project.meta.version, "1.0.0");
        assert_eq!(project.meta.author, "Anonymous");
        assert_eq!(project.settings.tick_delay, 500);
        assert!(project.settings.show_grid);
        assert!(project.settings.show_links);
    }

    #[test]
    fn tick_delay_is_clamped() {
        let mut settings = ProjectSettings::default();
        for (stored, read) in [(0, 500), (50, 100), (700, 700), (5_000, 2_000)] {
            settings.tick_delay = stored;
            assert_eq!(settings.clamped_tick_delay(), read, "stored {stored}");
        }
    }

    #[test]
    fn speed_controls_step_by_hundred() {
        let mut settings = ProjectSettings {
            tick_delay: 200,
            ..ProjectSettings::default()
        };
        settings.speed_up();
        assert_eq!(settings.tick_delay, 100);
        settings.speed_up();
        assert_eq!(settings.tick_delay, 100);

        settings.tick_delay = 1_950;
        settings.slow_down();
        assert_eq!(settings.tick_delay, 2_000);
    }

    #[test]
    fn seed_selects_config() {
        let mut project = ProjectFile::default();
        assert_eq!(project.sim_config(), SimConfig::default());
        project.settings.seed = Some(9);
        assert_eq!(project.sim_config().seed, 9);
    }

    #[test]
    fn open_compiles_code() {
        let (sim, report) = ProjectFile::default().open().unwrap();
        assert_eq!(report.entities, 2);
        assert_eq!(report.links, 1);
        assert_eq!(sim.tick_count(), 0);
    }

    #[test]
    fn open_reports_compile_error() {
        let project = ProjectFile::new("Broken", "var = 1;");
        assert!(matches!(
            project.open(),
            Err(CompileError::Syntax { .. })
        ));
    }

    #[test]
    fn file_name_is_sanitized() {
        let project = ProjectFile::new("My Line #2", "");
        assert_eq!(project.suggested_file_name(), "factor10_my_line__2.json");
    }
}
