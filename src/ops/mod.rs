//! Commands that change a profile: each one touches the presets tree and the
//! index together, and puts the tree back the way it was when it fails.

pub mod copy;
pub mod import;
pub mod mkdir;
pub mod reindex;
pub mod relocate;
pub mod remove;

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{perf_log, SHADOW_PREFIX};
use crate::error::{AmptError, AppResult};
use crate::index::with_transaction;
use crate::matcher::{check_expression, is_empty_dir};
use crate::preset::is_folder_name;
use crate::profile::{locate, Profile};

pub const COPY_OMITS_FOLDER: &str = "cp: -r not specified; omitting directory";
pub const REMOVE_OMITS_FOLDER: &str = "rm: -r not specified; omitting directory";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Copy {
        source: PathBuf,
        target: PathBuf,
        recursive: bool,
    },
    Move {
        source: PathBuf,
        target: PathBuf,
    },
    Delete {
        target: PathBuf,
        recursive: bool,
    },
    Import {
        source: PathBuf,
        target: PathBuf,
    },
    Reindex {
        profile: PathBuf,
    },
    MakeFolder {
        path: PathBuf,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Copy { .. } => "cp",
            Self::Move { .. } => "mv",
            Self::Delete { .. } => "rm",
            Self::Import { .. } => "import",
            Self::Reindex { .. } => "reindex",
            Self::MakeFolder { .. } => "mkdir",
        }
    }
}

/// Runs `command` against the profile its first operand belongs to (the
/// target's, for import). Advisory text goes to `out`.
pub fn run(command: &Command, out: &mut dyn Write) -> AppResult<usize> {
    let started = Instant::now();

    let result = match command {
        Command::Copy {
            source,
            target,
            recursive,
        } => {
            let profile = operand_profile(source)?;
            with_transaction(&profile, |index| {
                copy::copy(index, source, target, *recursive, out)
            })
        }
        Command::Move { source, target } => {
            let profile = operand_profile(source)?;
            with_transaction(&profile, |index| relocate::relocate(index, source, target))
        }
        Command::Delete { target, recursive } => {
            let profile = operand_profile(target)?;
            with_transaction(&profile, |index| {
                remove::remove(index, target, *recursive, out)
            })
        }
        Command::Import { source, target } => import::import(source, target, out),
        Command::Reindex { profile } => {
            let profile = Profile::at(profile)?;
            with_transaction(&profile, |index| reindex::reindex(index, &profile))
        }
        Command::MakeFolder { path } => mkdir::make_folder(path).map(|_| 0),
    };

    perf_log(format!(
        "{} finished in {}ms (ok={})",
        command.name(),
        started.elapsed().as_millis(),
        result.is_ok()
    ));
    result
}

fn operand_profile(expression: &Path) -> AppResult<Profile> {
    locate(&check_expression(expression)?)
}

pub(crate) fn advise(out: &mut dyn Write, message: &str) -> AppResult<()> {
    writeln!(out, "{message}").map_err(AmptError::io("failed to write advisory"))
}

/// Checks shared by copy and move before anything is touched.
pub(crate) fn validate_transfer(verb: &'static str, source: &Path, target: &Path) -> AppResult<()> {
    if !crate::profile::is_under_presets(target) {
        return Err(AmptError::OutsideProfile(target.to_path_buf()));
    }
    if source.is_dir() && is_folder_name(target) && crate::matcher::is_sub_dir(source, target) {
        return Err(AmptError::SelfSubfolder(verb));
    }
    Ok(())
}

pub(crate) fn ensure_same_profile(source: &Path, target: &Path) -> AppResult<()> {
    if locate(source)? != locate(target)? {
        return Err(AmptError::CrossProfile);
    }
    Ok(())
}

/// Fails when two planned entries share a destination, before anything is touched.
pub(crate) fn ensure_distinct_destinations(plan: &[(PathBuf, PathBuf)]) -> AppResult<()> {
    let mut seen = HashSet::with_capacity(plan.len());
    for (_, dest) in plan {
        if !seen.insert(dest) {
            return Err(AmptError::AmbiguousTarget(dest.clone()));
        }
    }
    Ok(())
}

/// Where `entry` (one match of the `source` expression) lands for `target`.
///
/// A folder-like target receives entries by basename, or with `recursive`
/// keeps each entry's path below the source's parent folder. Any other
/// target is the destination itself.
pub(crate) fn destination(source: &Path, target: &Path, entry: &Path, recursive: bool) -> PathBuf {
    if !is_folder_name(target) {
        return target.to_path_buf();
    }
    let basename = || target.join(entry.file_name().unwrap_or_default());
    if !recursive {
        return basename();
    }
    match source.parent().and_then(|parent| entry.strip_prefix(parent).ok()) {
        Some(relative) => target.join(relative),
        None => basename(),
    }
}

pub(crate) fn shadow_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| format!("{SHADOW_PREFIX}{}", name.to_string_lossy()))
        .unwrap_or_else(|| SHADOW_PREFIX.to_string());
    path.with_file_name(name)
}

pub(crate) fn free_shadow_path(path: &Path) -> PathBuf {
    let mut shadow = shadow_path(path);
    while shadow.symlink_metadata().is_ok() {
        shadow = shadow_path(&shadow);
    }
    shadow
}

/// Filesystem changes made so far by one command, in the order they happened,
/// so a failure can walk them back.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    created: Vec<PathBuf>,
    written: Vec<PathBuf>,
    moved: Vec<(PathBuf, PathBuf)>,
    shadowed: Vec<(PathBuf, PathBuf)>,
}

impl Journal {
    /// Creates `dir` with any missing parents, remembering the outermost
    /// folder that did not exist before.
    pub fn create_folders(&mut self, dir: &Path) -> AppResult<()> {
        let outermost = dir
            .ancestors()
            .take_while(|folder| !folder.exists())
            .last()
            .map(Path::to_path_buf);
        fs::create_dir_all(dir).map_err(AmptError::io(format!(
            "Failed to create directories {}",
            dir.display()
        )))?;
        self.created.extend(outermost);
        Ok(())
    }

    /// Keeps a sibling copy of `path` until the command finishes. An existing
    /// entry is never used as the backup; the prefix repeats until the name is free.
    pub fn shadow(&mut self, path: &Path) -> AppResult<()> {
        let shadow = free_shadow_path(path);
        fs::copy(path, &shadow).map_err(AmptError::io(format!(
            "Failed to backup {}",
            path.display()
        )))?;
        self.shadowed.push((path.to_path_buf(), shadow));
        Ok(())
    }

    pub fn written(&mut self, path: &Path) {
        self.written.push(path.to_path_buf());
    }

    pub fn moved(&mut self, from: &Path, to: &Path) {
        self.moved.push((from.to_path_buf(), to.to_path_buf()));
    }

    pub fn is_backup(&self, path: &Path) -> bool {
        self.shadowed.iter().any(|(_, shadow)| shadow == path)
    }

    /// Drops the shadow copies; the changes stand.
    pub fn commit(self) {
        for (_, shadow) in &self.shadowed {
            if let Err(err) = fs::remove_file(shadow) {
                log::warn!("could not remove backup {}: {err}", shadow.display());
            }
        }
    }

    /// Undoes every recorded change, newest first. Best effort: a step that
    /// fails is logged and the rest still run.
    pub fn rollback(self) {
        log::warn!(
            "rolling back: {} moved, {} written, {} backed up",
            self.moved.len(),
            self.written.len(),
            self.shadowed.len()
        );

        for (from, to) in self.moved.iter().rev() {
            if to.exists() {
                if let Some(parent) = from.parent() {
                    let _ = fs::create_dir_all(parent);
                }
                if let Err(err) = fs::rename(to, from) {
                    log::warn!("could not move {} back: {err}", to.display());
                }
            }
        }
        for path in self.written.iter().rev() {
            if path.is_file() {
                if let Err(err) = fs::remove_file(path) {
                    log::warn!("could not remove {}: {err}", path.display());
                }
            }
        }
        for (original, shadow) in self.shadowed.iter().rev() {
            if let Err(err) = fs::rename(shadow, original) {
                log::warn!("could not restore {}: {err}", original.display());
            }
        }
        for folder in self.created.iter().rev() {
            if is_empty_dir(folder, true) {
                if let Err(err) = fs::remove_dir_all(folder) {
                    log::warn!("could not remove {}: {err}", folder.display());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_by_target_shape() {
        let source = Path::new("/p/Presets/Amps/Amplitube");
        let entry = Path::new("/p/Presets/Amps/Amplitube/Metal/Metal Clean T.at5p");

        assert_eq!(
            destination(source, Path::new("/p/Presets/Amps/Empty"), entry, true),
            PathBuf::from("/p/Presets/Amps/Empty/Amplitube/Metal/Metal Clean T.at5p")
        );
        assert_eq!(
            destination(source, Path::new("/p/Presets/Amps/Empty"), entry, false),
            PathBuf::from("/p/Presets/Amps/Empty/Metal Clean T.at5p")
        );
        assert_eq!(
            destination(source, Path::new("/p/Presets/Test.at5p"), entry, true),
            PathBuf::from("/p/Presets/Test.at5p")
        );
    }

    #[test]
    fn destination_for_wildcard_source_keeps_path_below_pattern_folder() {
        let source = Path::new("/p/Presets/Amps/Amplitube/*");
        let entry = Path::new("/p/Presets/Amps/Amplitube/SVX/SVX-4B.at5p");
        assert_eq!(
            destination(source, Path::new("/p/Presets/Amps/Empty"), entry, true),
            PathBuf::from("/p/Presets/Amps/Empty/SVX/SVX-4B.at5p")
        );
    }

    #[test]
    fn shadow_is_a_prefixed_sibling() {
        assert_eq!(
            shadow_path(Path::new("/p/Presets/Amps/Default.at5p")),
            PathBuf::from("/p/Presets/Amps/_Default.at5p")
        );
    }

    #[test]
    fn shadow_skips_names_already_taken() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        fs::write(base.join("Default.at5p"), b"default").unwrap();
        fs::write(base.join("_Default.at5p"), b"underscored").unwrap();

        assert_eq!(free_shadow_path(&base.join("Default.at5p")), base.join("__Default.at5p"));

        let mut journal = Journal::default();
        journal.shadow(&base.join("Default.at5p")).unwrap();
        assert!(journal.is_backup(&base.join("__Default.at5p")));
        journal.commit();

        assert_eq!(fs::read(base.join("_Default.at5p")).unwrap(), b"underscored");
        assert!(!base.join("__Default.at5p").exists());
    }

    #[test]
    fn journal_rollback_restores_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        fs::write(base.join("kept.at5p"), b"original").unwrap();
        fs::write(base.join("moved.at5p"), b"moved").unwrap();

        let mut journal = Journal::default();
        journal.shadow(&base.join("kept.at5p")).unwrap();
        fs::write(base.join("kept.at5p"), b"overwritten").unwrap();

        journal.create_folders(&base.join("new").join("deep")).unwrap();
        fs::rename(base.join("moved.at5p"), base.join("new/deep/moved.at5p")).unwrap();
        journal.moved(&base.join("moved.at5p"), &base.join("new/deep/moved.at5p"));

        fs::write(base.join("fresh.at5p"), b"fresh").unwrap();
        journal.written(&base.join("fresh.at5p"));

        journal.rollback();

        assert_eq!(fs::read(base.join("kept.at5p")).unwrap(), b"original");
        assert_eq!(fs::read(base.join("moved.at5p")).unwrap(), b"moved");
        assert!(!base.join("fresh.at5p").exists());
        assert!(!base.join("new").exists());
        assert!(!base.join("_kept.at5p").exists());
    }
}
