use crate::error::{XliffError, XliffResult};
use crate::model::{Document, LATEST_LABEL};
use crate::parser::parse_document;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, warn};

static NUMBERED_EXPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\((\d+)\)\.(xlf|xliff)$").expect("valid regex"));

static LATEST_EXPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(latest\)\.(xlf|xliff)$").expect("valid regex"));

fn is_xliff(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlf") || ext.eq_ignore_ascii_case("xliff"))
}

/// Derive a version label from an export's file name
///
/// Translation platforms name exports like `translation_23925_de (983).xlf` or
/// `translation_23925_de (latest).xlf`:
/// - `(983).xlf` -> `"983"`
/// - `(latest).xlf` -> `"LATEST"`
/// - `LATEST.xlf` or `latest.xlf` -> `"LATEST"`
/// - anything else -> the file stem, e.g. `983.xlf` -> `"983"`
pub fn infer_version_label(file_name: &str) -> String {
    if let Some(caps) = NUMBERED_EXPORT.captures(file_name) {
        return caps[1].to_string();
    }
    if LATEST_EXPORT.is_match(file_name) {
        return LATEST_LABEL.to_string();
    }

    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    if stem.eq_ignore_ascii_case(LATEST_LABEL) {
        LATEST_LABEL.to_string()
    } else {
        stem.to_string()
    }
}

/// Load and parse a single XLIFF file
///
/// # Arguments
/// * `path` - Path to the `.xlf`/`.xliff` file
/// * `label` - Version label; inferred from the file name when `None`
///
/// # Returns
/// The parsed document. When the file declares no `original` attribute the file name is
/// used instead.
///
/// # Errors
/// - File read errors
/// - Malformed XML
pub fn load_document_from_file(path: &Path, label: Option<&str>) -> XliffResult<Document> {
    let content = fs::read_to_string(path)
        .map_err(|e| XliffError::Io(format!("Failed to read file '{}': {}", path.display(), e)))?;

    let mut document = parse_document(&content).map_err(|e| match e {
        XliffError::Parse(reason) => XliffError::Parse(format!("{}: {}", path.display(), reason)),
        other => other,
    })?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    document.version_label = match label {
        Some(label) => label.to_string(),
        None => infer_version_label(file_name),
    };
    if document.original_filename.is_empty() {
        document.original_filename = file_name.to_string();
    }

    info!(
        path = %path.display(),
        label = %document.version_label,
        segments = document.segments.len(),
        "loaded XLIFF file"
    );
    Ok(document)
}

/// File name for a merged export, e.g. `merged_LATEST_20240501-123000.xlf`
pub fn merge_file_name(version_label: &str, timestamp: DateTime<Utc>) -> String {
    let label: String = version_label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let label = if label.is_empty() { "merged".to_string() } else { label };
    format!("merged_{}_{}.xlf", label, timestamp.format("%Y%m%d-%H%M%S"))
}

/// A planned rename of one export file to its short version name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed(RenamePlan),
    /// The target name is taken; nothing was changed
    TargetExists(RenamePlan),
    Failed { plan: RenamePlan, reason: String },
}

/// Plan renames for every export in `dir` that carries a `(number)` or `(latest)` suffix
///
/// `name (983).xlf` becomes `983.xlf` and `name (latest).xlf` becomes `LATEST.xlf`, keeping
/// the original extension. Files that already have their short name are skipped. Plans
/// are sorted by source path.
pub fn plan_renames(dir: &Path) -> XliffResult<Vec<RenamePlan>> {
    if !dir.is_dir() {
        return Err(XliffError::Io(format!("Path is not a directory: {}", dir.display())));
    }

    let entries = fs::read_dir(dir)
        .map_err(|e| XliffError::Io(format!("Failed to read directory '{}': {}", dir.display(), e)))?;

    let mut plans = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| XliffError::Io(format!("Error reading directory entry: {}", e)))?;
        let path = entry.path();
        if !path.is_file() || !is_xliff(&path) {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };

        let new_name = if let Some(caps) = NUMBERED_EXPORT.captures(file_name) {
            format!("{}.{}", &caps[1], extension)
        } else if LATEST_EXPORT.is_match(file_name) {
            format!("{}.{}", LATEST_LABEL, extension)
        } else {
            continue;
        };

        if new_name != file_name {
            plans.push(RenamePlan {
                to: path.with_file_name(new_name),
                from: path,
            });
        }
    }

    plans.sort_by(|a, b| a.from.cmp(&b.from));
    Ok(plans)
}

/// Carry out rename plans, never overwriting an existing file
pub fn apply_renames(plans: &[RenamePlan]) -> Vec<RenameOutcome> {
    plans
        .iter()
        .map(|plan| {
            if plan.to.exists() {
                warn!(from = %plan.from.display(), to = %plan.to.display(), "rename target already exists");
                return RenameOutcome::TargetExists(plan.clone());
            }
            match fs::rename(&plan.from, &plan.to) {
                Ok(()) => RenameOutcome::Renamed(plan.clone()),
                Err(e) => RenameOutcome::Failed {
                    plan: plan.clone(),
                    reason: e.to_string(),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MINIMAL: &str = r#"<xliff version="1.2"><file source-language="en" target-language="de"><body>
<trans-unit id="1"><source>Hello</source><target>Hallo</target></trans-unit>
</body></file></xliff>"#;

    #[test]
    fn test_infer_version_label() {
        assert_eq!(infer_version_label("translation_23925_de-du (983).xlf"), "983");
        assert_eq!(infer_version_label("translation_23925_de-du (latest).xlf"), "LATEST");
        assert_eq!(infer_version_label("export (Latest).XLIFF"), "LATEST");
        assert_eq!(infer_version_label("LATEST.xlf"), "LATEST");
        assert_eq!(infer_version_label("latest.xliff"), "LATEST");
        assert_eq!(infer_version_label("983.xlf"), "983");
        assert_eq!(infer_version_label("messages.fr.xlf"), "messages.fr");
    }

    #[test]
    fn test_load_document_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app (412).xlf");
        fs::write(&path, MINIMAL).unwrap();

        let doc = load_document_from_file(&path, None).unwrap();
        assert_eq!(doc.version_label, "412");
        assert_eq!(doc.original_filename, "app (412).xlf");
        assert_eq!(doc.target_language, "de");
        assert_eq!(doc.segments.len(), 1);

        let doc = load_document_from_file(&path, Some("LATEST")).unwrap();
        assert!(doc.is_latest());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_document_from_file(&dir.path().join("nope.xlf"), None);
        assert!(matches!(result, Err(XliffError::Io(_))));
    }

    #[test]
    fn test_load_malformed_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlf");
        fs::write(&path, "<xliff><file></xliff>").unwrap();

        match load_document_from_file(&path, None) {
            Err(XliffError::Parse(reason)) => assert!(reason.contains("broken.xlf")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_file_name() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();
        assert_eq!(merge_file_name("LATEST", timestamp), "merged_LATEST_20240501-123005.xlf");
        assert_eq!(merge_file_name("build 7/b", timestamp), "merged_build_7_b_20240501-123005.xlf");
        assert_eq!(merge_file_name("", timestamp), "merged_merged_20240501-123005.xlf");
    }

    #[test]
    fn test_plan_and_apply_renames() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "translation_1_de (983).xlf",
            "translation_1_de (latest).xliff",
            "translation_1_de (984).xlf",
            "984.xlf",
            "notes (12).txt",
            "plain.xlf",
        ] {
            fs::write(dir.path().join(name), MINIMAL).unwrap();
        }

        let plans = plan_renames(dir.path()).unwrap();
        let targets: Vec<String> = plans
            .iter()
            .map(|p| p.to.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(targets, vec!["983.xlf", "984.xlf", "LATEST.xliff"]);

        let outcomes = apply_renames(&plans);
        assert!(matches!(outcomes[0], RenameOutcome::Renamed(_)));
        assert!(matches!(outcomes[1], RenameOutcome::TargetExists(_)));
        assert!(matches!(outcomes[2], RenameOutcome::Renamed(_)));
        assert!(dir.path().join("983.xlf").exists());
        assert!(dir.path().join("LATEST.xliff").exists());
        assert!(dir.path().join("translation_1_de (984).xlf").exists());
    }

    #[test]
    fn test_plan_renames_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(plan_renames(&dir.path().join("missing")).is_err());
    }
}
