//! `.hivemind` directory layout and filename construction.

use std::path::{Path, PathBuf};

pub const STRUCTURE_VERSION: &str = "2.0.0";

/// Resolved paths for one project's `.hivemind` directory.
#[derive(Clone, Debug)]
pub struct HivemindPaths {
    pub root: PathBuf,
    pub config: PathBuf,
    pub index: PathBuf,
    pub state_dir: PathBuf,
    pub brain: PathBuf,
    pub hierarchy: PathBuf,
    pub anchors: PathBuf,
    pub memory_dir: PathBuf,
    pub mems: PathBuf,
    pub sessions_dir: PathBuf,
    pub sessions_manifest: PathBuf,
    pub active_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub exports_dir: PathBuf,
}

impl HivemindPaths {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().join(".hivemind");
        let state_dir = root.join("state");
        let memory_dir = root.join("memory");
        let sessions_dir = root.join("sessions");
        Self {
            config: root.join("config.json"),
            index: root.join("index.md"),
            brain: state_dir.join("brain.json"),
            hierarchy: state_dir.join("hierarchy.json"),
            anchors: state_dir.join("anchors.json"),
            mems: memory_dir.join("mems.json"),
            sessions_manifest: sessions_dir.join("manifest.json"),
            active_dir: sessions_dir.join("active"),
            archive_dir: sessions_dir.join("archive"),
            exports_dir: sessions_dir.join("exports"),
            state_dir,
            memory_dir,
            sessions_dir,
            root,
        }
    }

    /// Every directory the layout needs, creation order.
    pub fn all_directories(&self) -> Vec<&Path> {
        vec![
            &self.root,
            &self.state_dir,
            &self.memory_dir,
            &self.sessions_dir,
            &self.active_dir,
            &self.archive_dir,
            &self.exports_dir,
        ]
    }

    pub async fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in self.all_directories() {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

/// Legacy flat layout (`.hivemind/*.json` at the root) handled by
/// migration.
#[derive(Clone, Debug)]
pub struct LegacyPaths {
    pub root: PathBuf,
    pub brain: PathBuf,
    pub hierarchy: PathBuf,
    pub anchors: PathBuf,
    pub mems: PathBuf,
    pub sessions_dir: PathBuf,
    pub sessions_manifest: PathBuf,
}

impl LegacyPaths {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().join(".hivemind");
        Self {
            brain: root.join("brain.json"),
            hierarchy: root.join("hierarchy.json"),
            anchors: root.join("anchors.json"),
            mems: root.join("mems.json"),
            sessions_dir: root.join("sessions"),
            sessions_manifest: root.join("sessions").join("manifest.json"),
            root,
        }
    }
}

pub fn is_new_structure(project_root: &Path) -> bool {
    HivemindPaths::new(project_root).state_dir.is_dir()
}

pub fn is_legacy_structure(project_root: &Path) -> bool {
    let legacy = LegacyPaths::new(project_root);
    !is_new_structure(project_root) && legacy.brain.is_file()
}

/// Reduce free text to a filename-safe slug: lowercase alphanumerics and
/// single dashes, bounded length.
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(max_len);
    let mut last_dash = true;
    for c in text.chars() {
        if slug.len() >= max_len {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "session".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Human-readable session filename: `YYYY-MM-DD-<mode>-<slug>.md`.
pub fn build_session_filename(at_ms: i64, mode: &str, focus: &str) -> String {
    let date = chrono::DateTime::from_timestamp_millis(at_ms)
        .unwrap_or_else(chrono::Utc::now)
        .format("%Y-%m-%d");
    format!("{}-{}-{}.md", date, mode, slugify(focus, 40))
}

/// Strip anything that could escape the sessions directory. Returns
/// `None` when nothing safe remains.
pub fn sanitize_session_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let base = base.trim();
    if base.is_empty() || base == "." || base == ".." || !base.ends_with(".md") {
        return None;
    }
    if base.contains("..") {
        return None;
    }
    Some(base.to_string())
}
