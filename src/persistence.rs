// called on startup and quit; saves the whole project so it reloads later
use std::path::{Path, PathBuf};

use crate::project::ProjectFile;

const BEATSMITH_DIR: &str = ".beatsmith";
const PROJECT_FILE: &str = "project.json";

// <project_dir>/.beatsmith/project.json
fn project_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(BEATSMITH_DIR).join(PROJECT_FILE)
}

pub fn load_project(project_dir: &Path) -> Option<ProjectFile> {
    let path = project_file_path(project_dir);
    let data = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&data).ok()
}

// Save the project to disk, making the directory if it doesn't exist yet
pub fn save_project(project_dir: &Path, project: &ProjectFile) -> anyhow::Result<()> {
    let path = project_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(project)?;
    std::fs::write(&path, json)?;
    Ok(())
}
