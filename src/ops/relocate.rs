use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AmptError, AppResult};
use crate::index::PresetIndex;
use crate::matcher::{is_empty_dir, is_sub_dir, resolve};
use crate::ops::{
    destination, ensure_distinct_destinations, ensure_same_profile, validate_transfer, Journal,
};
use crate::preset::{contains_wildcards, is_folder_name};
use crate::profile::absolutize;

/// Moves what `source` resolves to under `target`, rewriting each preset's
/// index row in place. Folders move recursively only when both operands are
/// folder names.
pub fn relocate(index: &PresetIndex<'_>, source: &Path, target: &Path) -> AppResult<usize> {
    let recursive = is_folder_name(source) && is_folder_name(target);
    let matches = resolve(source, recursive, !recursive)?;

    let source = absolutize(source);
    let target = absolutize(target);
    validate_transfer("move", &source, &target)?;
    ensure_same_profile(&source, &target)?;

    let literal_folder = source.is_dir() && !contains_wildcards(&source);
    let nested = source.file_name().map(|name| target.join(name));
    if recursive {
        if let Some(nested) = nested.as_deref() {
            if nested.is_dir() && !is_empty_dir(nested, false) {
                return Err(AmptError::CannotMoveNonEmptyTarget(nested.to_path_buf()));
            }
        }
    }

    let plan: Vec<(PathBuf, PathBuf)> = matches
        .into_iter()
        .map(|entry| {
            let dest = destination(&source, &target, &entry, recursive);
            (entry, dest)
        })
        .filter(|(entry, dest)| entry != dest)
        .collect();
    ensure_distinct_destinations(&plan)?;

    let mut journal = Journal::default();
    let outcome = (|| -> AppResult<usize> {
        if recursive && literal_folder {
            if let Some(nested) = nested.as_deref() {
                journal.create_folders(nested)?;
            }
        }
        let mut moved = 0;
        for (from, to) in &plan {
            if from.is_dir() {
                journal.create_folders(to)?;
                continue;
            }
            move_one(index, &mut journal, from, to)?;
            moved += 1;
        }
        clean_up_source(&source, &target, recursive, literal_folder, &journal)?;
        Ok(moved)
    })();

    match outcome {
        Ok(moved) => {
            journal.commit();
            log::info!("moved {moved} preset(s) to {}", target.display());
            Ok(moved)
        }
        Err(err) => {
            journal.rollback();
            Err(err)
        }
    }
}

fn move_one(
    index: &PresetIndex<'_>,
    journal: &mut Journal,
    from: &Path,
    to: &Path,
) -> AppResult<()> {
    if !from.exists() {
        return Err(AmptError::PathNotFound(from.to_path_buf()));
    }
    if let Some(parent) = to.parent() {
        journal.create_folders(parent)?;
    }

    let overwriting = to.is_file();
    if overwriting {
        journal.shadow(to)?;
    }

    fs::rename(from, to).map_err(AmptError::io(format!(
        "Failed to move {} to {}",
        from.display(),
        to.display()
    )))?;
    journal.moved(from, to);

    if overwriting {
        index.delete_by_origin(to)?;
    }
    index.update_location(from, to)?;

    log::debug!("moved {} -> {}", from.display(), to.display());
    Ok(())
}

/// Removes what a completed move left behind at the source: the source
/// folder itself, or for a wildcard source every remaining match outside the
/// target. Anything still holding files is a failure.
fn clean_up_source(
    source: &Path,
    target: &Path,
    recursive: bool,
    literal_folder: bool,
    journal: &Journal,
) -> AppResult<()> {
    if literal_folder {
        if !is_empty_dir(source, true) {
            return Err(AmptError::MoveResidue(source.to_path_buf()));
        }
        return remove_tree(source);
    }

    if !contains_wildcards(source) {
        return Ok(());
    }

    // a pattern whose folder is gone has nothing left to clean up
    let leftovers = match resolve(source, recursive, false) {
        Ok(leftovers) => leftovers,
        Err(AmptError::PathNotFound(_)) => return Ok(()),
        Err(err) => return Err(err),
    };

    let mut folders = Vec::new();
    for entry in leftovers {
        if is_sub_dir(target, &entry) || journal.is_backup(&entry) {
            continue;
        }
        if entry.is_dir() {
            if !is_empty_dir(&entry, true) {
                return Err(AmptError::MoveResidue(entry));
            }
            folders.push(entry);
        } else if entry.is_file() {
            return Err(AmptError::MoveResidue(entry));
        }
    }
    for folder in folders {
        if folder.exists() {
            remove_tree(&folder)?;
        }
    }
    Ok(())
}

fn remove_tree(folder: &Path) -> AppResult<()> {
    fs::remove_dir_all(folder).map_err(AmptError::io(format!(
        "Failed to remove {}",
        folder.display()
    )))
}
