use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `text` next to `path` first and swaps it in, so readers never see a
/// half-written scene file.
pub(super) fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staged = staged_path_for(path);
    fs::write(&staged, text.as_bytes())?;
    swap_in(&staged, path)
}

/// `rename` replaces an existing target in one step, so the scene file is
/// never missing.
fn swap_in(staged: &Path, target: &Path) -> io::Result<()> {
    fs::rename(staged, target).inspect_err(|_| {
        let _ = fs::remove_file(staged);
    })
}

fn staged_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("scene.json");
    path.with_file_name(format!(".{file_name}.staged"))
}
