use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AmptError, AppResult};
use crate::preset::is_folder_name;
use crate::profile::{absolutize, is_under_presets};

/// Creates a preset folder (and any missing parents). The index is not
/// involved: folders have no rows of their own.
pub fn make_folder(path: &Path) -> AppResult<PathBuf> {
    if !is_folder_name(path) {
        return Err(AmptError::InvalidFolderName(
            path.to_string_lossy().into_owned(),
        ));
    }

    let target = absolutize(path);
    if target.is_dir() {
        return Err(AmptError::FolderExists(target));
    }
    if !is_under_presets(&target) {
        return Err(AmptError::OutsideProfile(target));
    }

    fs::create_dir_all(&target).map_err(AmptError::io(format!(
        "Failed to create folder {}",
        target.display()
    )))?;
    log::debug!("created {}", target.display());
    Ok(target)
}
