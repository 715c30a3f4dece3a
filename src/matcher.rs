//! Turns a user path expression into the ordered set of entries a command acts on.
//!
//! Expressions are absolute or working-directory relative paths. A `*` inside a
//! segment matches any run of characters within that segment only; deeper
//! levels are reached by the recursive walk, never by the pattern itself.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{AmptError, AppResult};
use crate::preset::{contains_wildcards, is_preset_name};
use crate::profile::{absolutize, is_under_presets};

pub type MatchSet = Vec<PathBuf>;

/// Resolves `expression` under `recursive`/`exclude_folders`.
///
/// * A literal preset path resolves to itself.
/// * Recursive: wildcard candidates are listed (files first, then every
///   candidate folder walked in full, the folder itself included); a literal
///   folder is walked with the folder itself left out.
/// * Non-recursive: the immediate children matching the pattern (an implicit
///   `*` for a literal folder).
///
/// `exclude_folders` drops every folder entry from the result.
pub fn resolve(expression: &Path, recursive: bool, exclude_folders: bool) -> AppResult<MatchSet> {
    let abs = check_expression(expression)?;

    if is_preset_name(&abs) {
        return Ok(vec![abs]);
    }

    let mut matches = Vec::new();
    let wildcard = contains_wildcards(&abs);

    if recursive {
        if wildcard {
            let candidates = expand_glob(&abs)?;
            matches.extend(candidates.iter().filter(|c| !c.is_dir()).cloned());
            for candidate in candidates.iter().filter(|c| c.is_dir()) {
                walk_into(&mut matches, candidate, None, exclude_folders)?;
            }
        } else {
            walk_into(&mut matches, &abs, Some(&abs), exclude_folders)?;
        }
    } else {
        let possibles = if wildcard {
            expand_glob(&abs)?
        } else {
            expand_glob(&abs.join("*"))?
        };
        matches.extend(
            possibles
                .into_iter()
                .filter(|p| !p.is_dir() || !exclude_folders),
        );
    }

    log::debug!(
        "resolved {} (recursive={recursive}, exclude_folders={exclude_folders}) to {} entries",
        abs.display(),
        matches.len()
    );
    Ok(matches)
}

/// Absolute form of `expression` once it is known to point into a presets
/// subtree. The part before any trailing wildcard segments must exist, or
/// when it still holds a wildcard, must match at least one entry.
pub fn check_expression(expression: &Path) -> AppResult<PathBuf> {
    let abs = absolutize(expression);

    let mut check = abs.as_path();
    while check
        .file_name()
        .is_some_and(|name| name.to_string_lossy().contains('*'))
    {
        match check.parent() {
            Some(parent) => check = parent,
            None => break,
        }
    }
    let found = if contains_wildcards(check) {
        !expand_glob(check)?.is_empty()
    } else {
        check.exists()
    };
    if !found {
        return Err(AmptError::PathNotFound(abs));
    }

    if !is_under_presets(&abs) {
        return Err(AmptError::OutsideProfile(abs));
    }
    Ok(abs)
}

fn walk_into(
    matches: &mut MatchSet,
    root: &Path,
    skip: Option<&Path>,
    exclude_folders: bool,
) -> AppResult<()> {
    let iter = WalkDir::new(root).follow_links(false).sort_by_file_name();
    for entry in iter {
        let entry = entry?;
        let path = entry.path();
        let is_dir = entry.file_type().is_dir();
        if !is_dir || (!exclude_folders && skip != Some(path)) {
            matches.push(path.to_path_buf());
        }
    }
    Ok(())
}

/// Expands every wildcard segment of `pattern` against the directory the
/// preceding segments resolved to. Results come back in lexical order.
pub fn expand_glob(pattern: &Path) -> AppResult<Vec<PathBuf>> {
    let mut current: Vec<PathBuf> = vec![PathBuf::new()];

    for component in pattern.components() {
        let segment = component.as_os_str().to_string_lossy();
        let is_pattern = matches!(component, Component::Normal(_)) && segment.contains('*');

        if !is_pattern {
            for base in &mut current {
                base.push(component.as_os_str());
            }
            continue;
        }

        let mut next = Vec::new();
        for dir in &current {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            let mut found: Vec<PathBuf> = entries
                .flatten()
                .filter(|entry| glob_matches(&segment, &entry.file_name().to_string_lossy()))
                .map(|entry| entry.path())
                .collect();
            found.sort();
            next.extend(found);
        }
        current = next;
    }

    Ok(current.into_iter().filter(|p| p.exists()).collect())
}

/// `*` matches any run of characters; everything else matches literally.
pub fn glob_matches(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (pn, tn) = (p.len(), t.len());

    let mut px = 0usize;
    let mut tx = 0usize;
    let mut star_px = usize::MAX;
    let mut star_tx = 0usize;

    while tx < tn {
        if px < pn && p[px] != '*' && p[px] == t[tx] {
            px += 1;
            tx += 1;
        } else if px < pn && p[px] == '*' {
            star_px = px;
            star_tx = tx;
            px += 1;
        } else if star_px != usize::MAX {
            px = star_px + 1;
            star_tx += 1;
            tx = star_tx;
        } else {
            return false;
        }
    }

    while px < pn && p[px] == '*' {
        px += 1;
    }

    px == pn
}

pub fn resolve_grouped(
    expression: &Path,
    recursive: bool,
) -> AppResult<BTreeMap<PathBuf, Vec<PathBuf>>> {
    resolve(expression, recursive, false).map(group_by_folder)
}

/// Buckets matches by parent folder; each bucket lists folders before files.
pub fn group_by_folder(matches: MatchSet) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut grouped: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for entry in matches {
        let parent = entry.parent().map(Path::to_path_buf).unwrap_or_default();
        grouped.entry(parent).or_default().push(entry);
    }
    for entries in grouped.values_mut() {
        sort_matches(entries);
    }
    grouped
}

pub fn sort_matches(matches: &mut [PathBuf]) {
    matches.sort_by_cached_key(|p| (p.parent().map(Path::to_path_buf), !p.is_dir(), p.clone()));
}

/// Longest component-wise prefix shared by every path.
pub fn common_base_path(paths: &[PathBuf]) -> PathBuf {
    let Some(first) = paths.first() else {
        return PathBuf::new();
    };
    let mut common: Vec<Component<'_>> = first.components().collect();
    for path in &paths[1..] {
        let shared = common
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }
    common.iter().map(|c| c.as_os_str()).collect()
}

/// True when `ancestor` is `path` or one of its ancestors. Wildcard
/// expressions are never considered ancestors.
pub fn is_sub_dir(ancestor: &Path, path: &Path) -> bool {
    !contains_wildcards(ancestor) && path.starts_with(ancestor)
}

/// A folder with no entries at all, or with `recursive`, with no files anywhere below it.
pub fn is_empty_dir(folder: &Path, recursive: bool) -> bool {
    if !folder.is_dir() {
        return false;
    }
    if recursive {
        WalkDir::new(folder)
            .follow_links(false)
            .into_iter()
            .all(|entry| entry.is_ok_and(|e| e.file_type().is_dir()))
    } else {
        fs::read_dir(folder).is_ok_and(|mut entries| entries.next().is_none())
    }
}
