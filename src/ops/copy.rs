use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{AmptError, AppResult};
use crate::index::PresetIndex;
use crate::matcher::resolve;
use crate::ops::{
    advise, destination, ensure_distinct_destinations, ensure_same_profile, validate_transfer,
    Journal, COPY_OMITS_FOLDER,
};
use crate::preset::{contains_wildcards, is_folder_name, regenerate_identifier};
use crate::profile::absolutize;

/// Copies every preset `source` resolves to onto `target`, giving each copy a
/// new identifier and an index row cloned from its source's row.
///
/// A folder source without `recursive` is skipped with an advisory. Returns
/// the number of presets written.
pub fn copy(
    index: &PresetIndex<'_>,
    source: &Path,
    target: &Path,
    recursive: bool,
    out: &mut dyn Write,
) -> AppResult<usize> {
    let exclude_folders = !contains_wildcards(source) || recursive;
    let matches = resolve(source, recursive, exclude_folders)?;

    let source = absolutize(source);
    let target = absolutize(target);
    validate_transfer("copy", &source, &target)?;

    if source.is_dir() && !matches.is_empty() && !recursive {
        advise(out, COPY_OMITS_FOLDER)?;
        return Ok(0);
    }

    ensure_same_profile(&source, &target)?;

    let mut plan: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(matches.len());
    for entry in matches {
        if !recursive && is_folder_name(&target) && entry.is_dir() {
            advise(out, COPY_OMITS_FOLDER)?;
            continue;
        }
        let dest = destination(&source, &target, &entry, recursive);
        if dest != entry {
            plan.push((entry, dest));
        }
    }

    ensure_distinct_destinations(&plan)?;

    let mut journal = Journal::default();
    for (from, to) in &plan {
        if let Err(err) = copy_one(index, &mut journal, from, to, out) {
            journal.rollback();
            return Err(err);
        }
    }
    journal.commit();

    log::info!("copied {} preset(s) to {}", plan.len(), target.display());
    Ok(plan.len())
}

fn copy_one(
    index: &PresetIndex<'_>,
    journal: &mut Journal,
    from: &Path,
    to: &Path,
    out: &mut dyn Write,
) -> AppResult<()> {
    let overwriting = to.is_file();

    if let Some(parent) = to.parent() {
        journal.create_folders(parent)?;
    }
    if overwriting {
        journal.shadow(to)?;
    }

    fs::copy(from, to).map_err(AmptError::io(format!(
        "Could not copy {} to {}",
        from.display(),
        to.display()
    )))?;
    journal.written(to);

    regenerate_identifier(to)?;

    if overwriting && index.contains(to)? {
        index.delete_by_origin(to)?;
    }
    if index.insert_copy_of(from, to)? == 0 {
        advise(
            out,
            &format!("{} copied without database record", from.display()),
        )?;
    }

    log::debug!("copied {} -> {}", from.display(), to.display());
    Ok(())
}
