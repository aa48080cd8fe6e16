//! Reading and writing project files.
//!
//! Projects load from RON, JSON or TOML, chosen by file extension. Saving
//! always produces the editor's pretty-printed JSON.

use std::path::{Path, PathBuf};

use crate::schema::ProjectFile;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading or saving a project.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// Serializing the project failed.
    #[error("cannot write {file}: {detail}")]
    Serialize { file: PathBuf, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported project file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Load / save
// ===========================================================================

/// Read a project file from disk.
pub fn load_project(path: &Path) -> Result<ProjectFile, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let project = parse_project(&content, format, path)?;
    tracing::debug!(
        path = %path.display(),
        name = %project.meta.name,
        assets = project.assets.len(),
        "project loaded"
    );
    Ok(project)
}

/// Deserialize project text. `file` is only used for error messages.
pub fn parse_project(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<ProjectFile, DataLoadError> {
    let parse_error = |detail: String| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Write `project` as pretty JSON. The path must end in `.json`.
pub fn save_project(path: &Path, project: &ProjectFile) -> Result<(), DataLoadError> {
    if detect_format(path)? != Format::Json {
        return Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        });
    }
    let json = serde_json::to_string_pretty(project).map_err(|e| DataLoadError::Serialize {
        file: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    std::fs::write(path, json)?;
    tracing::debug!(path = %path.display(), "project saved");
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AssetEntry, AssetTransform, Vec3};
    use std::fs;

    /// Create a unique temporary directory for a test.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "factor10_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Remove a test directory.
    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_known_extensions() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_unknown_extension() {
        let err = detect_format(Path::new("project.f10")).unwrap_err();
        assert!(matches!(err, DataLoadError::UnsupportedFormat { .. }));
    }

    // -----------------------------------------------------------------------
    // parse_project
    // -----------------------------------------------------------------------

    const EDITOR_JSON: &str = r#"{
  "meta": {
    "name": "Line A",
    "version": "1.0.0",
    "author": "Ada",
    "createdAt": "2024-03-01T10:00:00.000Z"
  },
  "settings": { "tickDelay": 300, "showGrid": true, "showLinks": false },
  "assets": [
    {
      "name": "crate",
      "src": "data:model/gltf-binary;base64,AAAA",
      "transform": {
        "position": { "x": 0, "y": 1, "z": 0 },
        "rotation": { "x": 0, "y": 0, "z": 0 },
        "scale": { "x": 2, "y": 2, "z": 2 }
      }
    }
  ],
  "code": "var s = createSink();"
}"#;

    #[test]
    fn parse_editor_json() {
        let project = parse_project(EDITOR_JSON, Format::Json, Path::new("a.json")).unwrap();
        assert_eq!(project.meta.name, "Line A");
        assert_eq!(project.meta.author, "Ada");
        assert_eq!(
            project.meta.created_at.as_deref(),
            Some("2024-03-01T10:00:00.000Z")
        );
        assert_eq!(project.settings.tick_delay, 300);
        assert!(!project.settings.show_links);
        assert_eq!(project.settings.seed, None);
        assert_eq!(project.assets.len(), 1);
        assert_eq!(project.assets[0].transform.position.y, 1.0);
        assert_eq!(project.assets[0].transform.scale, Vec3 { x: 2.0, y: 2.0, z: 2.0 });
        assert_eq!(project.code, "var s = createSink();");
    }

    #[test]
    fn parse_fills_missing_sections() {
        let project =
            parse_project(r#"{ "code": "log(1);" }"#, Format::Json, Path::new("a.json")).unwrap();
        assert_eq!(project.code, "log(1);");
        assert_eq!(project.meta.author, "Anonymous");
        assert_eq!(project.settings.tick_delay, 500);
        assert!(project.assets.is_empty());
    }

    #[test]
    fn parse_asset_without_transform() {
        let json = r#"{ "assets": [ { "name": "box" } ] }"#;
        let project = parse_project(json, Format::Json, Path::new("a.json")).unwrap();
        assert_eq!(project.assets[0].src, None);
        assert_eq!(project.assets[0].transform, AssetTransform::default());
    }

    #[test]
    fn parse_toml_project() {
        let toml = r#"
code = "var p = createProduct();"

[meta]
name = "Toml Line"

[settings]
tickDelay = 2500
seed = 7
"#;
        let project = parse_project(toml, Format::Toml, Path::new("a.toml")).unwrap();
        assert_eq!(project.meta.name, "Toml Line");
        assert_eq!(project.settings.clamped_tick_delay(), 2_000);
        assert_eq!(project.settings.seed, Some(7));
        assert_eq!(project.code, "var p = createProduct();");
    }

    #[test]
    fn parse_ron_project() {
        let ron = r#"(
    meta: (name: "Ron Line", author: "Bo"),
    settings: (tickDelay: 100),
    code: "var k = createSink();",
)"#;
        let project = parse_project(ron, Format::Ron, Path::new("a.ron")).unwrap();
        assert_eq!(project.meta.name, "Ron Line");
        assert_eq!(project.meta.version, "1.0.0");
        assert_eq!(project.settings.tick_delay, 100);
        assert_eq!(project.code, "var k = createSink();");
    }

    #[test]
    fn parse_error_names_file() {
        let err = parse_project("{ nope", Format::Json, Path::new("bad.json")).unwrap_err();
        match err {
            DataLoadError::Parse { file, .. } => assert_eq!(file, PathBuf::from("bad.json")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // load_project / save_project
    // -----------------------------------------------------------------------

    #[test]
    fn save_then_load() {
        let dir = make_test_dir("save_load");
        let path = dir.join("line.json");

        let mut project = ProjectFile::new("Line B", "var m = createSource();");
        project.settings.seed = Some(42);
        project.assets.push(AssetEntry {
            name: "machine".to_string(),
            src: None,
            transform: AssetTransform::default(),
        });
        save_project(&path, &project).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"tickDelay\": 500"));
        assert!(text.contains("\"showGrid\": true"));
        assert!(!text.contains("createdAt"));

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded, project);

        cleanup(&dir);
    }

    #[test]
    fn save_rejects_non_json() {
        let dir = make_test_dir("save_toml");
        let err = save_project(&dir.join("line.toml"), &ProjectFile::default()).unwrap_err();
        assert!(matches!(err, DataLoadError::UnsupportedFormat { .. }));
        cleanup(&dir);
    }

    #[test]
    fn load_missing_file() {
        let dir = make_test_dir("missing");
        let err = load_project(&dir.join("nothing.json")).unwrap_err();
        assert!(matches!(err, DataLoadError::Io(_)));
        cleanup(&dir);
    }

    #[test]
    fn loaded_project_runs() {
        let dir = make_test_dir("runs");
        let path = dir.join("sample.json");
        fs::write(
            &path,
            r#"{ "settings": { "seed": 1 }, "code": "var s = createSink(); s.setName('Only');" }"#,
        )
        .unwrap();

        let (mut sim, report) = load_project(&path).unwrap().open().unwrap();
        assert_eq!(report.entities, 1);
        assert_eq!(sim.config().seed, 1);
        sim.tick();
        assert_eq!(sim.results().sinks[0].name, "Only");

        cleanup(&dir);
    }
}
