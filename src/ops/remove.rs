use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{AmptError, AppResult};
use crate::index::PresetIndex;
use crate::matcher::{is_empty_dir, resolve};
use crate::ops::{advise, Journal, REMOVE_OMITS_FOLDER};
use crate::preset::contains_wildcards;
use crate::profile::{absolutize, presets_root_of};

/// Deletes what `target` resolves to along with the index rows of every
/// deleted preset. Non-empty folders are left alone unless `recursive`.
///
/// Each preset is backed up next to itself before it goes, and all of them
/// come back if a later one fails.
pub fn remove(
    index: &PresetIndex<'_>,
    target: &Path,
    recursive: bool,
    out: &mut dyn Write,
) -> AppResult<usize> {
    let matches = resolve(target, recursive, false)?;

    let target = absolutize(target);
    let literal_folder = target.is_dir() && !contains_wildcards(&target);
    if literal_folder && !recursive && !is_empty_dir(&target, false) {
        advise(out, REMOVE_OMITS_FOLDER)?;
        return Ok(0);
    }

    let mut files = Vec::new();
    let mut folders = Vec::new();
    for entry in matches {
        if !entry.is_dir() {
            files.push(entry);
        } else if !recursive && !is_empty_dir(&entry, false) {
            advise(out, REMOVE_OMITS_FOLDER)?;
        } else {
            folders.push(entry);
        }
    }
    // the presets root itself always stays
    if literal_folder && presets_root_of(&target).as_deref() != Some(target.as_path()) {
        folders.push(target.clone());
    }

    let mut journal = Journal::default();
    for file in &files {
        if let Err(err) = remove_one(index, &mut journal, file) {
            journal.rollback();
            return Err(err);
        }
    }
    journal.commit();

    remove_emptied_folders(folders);

    log::info!("removed {} preset(s) under {}", files.len(), target.display());
    Ok(files.len())
}

fn remove_one(index: &PresetIndex<'_>, journal: &mut Journal, file: &Path) -> AppResult<()> {
    journal.shadow(file)?;
    fs::remove_file(file).map_err(AmptError::io(format!(
        "Failed to remove {}",
        file.display()
    )))?;
    index.delete_by_origin(file)?;
    log::debug!("removed {}", file.display());
    Ok(())
}

/// Deepest first, so a parent is looked at after its children are gone.
/// Only folders with no files left anywhere below are removed.
fn remove_emptied_folders(mut folders: Vec<PathBuf>) {
    folders.sort_by_key(|folder| std::cmp::Reverse(folder.components().count()));
    for folder in folders {
        if !is_empty_dir(&folder, true) {
            log::debug!("keeping {}: not empty", folder.display());
            continue;
        }
        if let Err(err) = fs::remove_dir_all(&folder) {
            log::warn!("could not remove {}: {err}", folder.display());
        }
    }
}
