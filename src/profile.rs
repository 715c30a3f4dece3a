use std::path::{Component, Path, PathBuf};

use crate::config::{INDEX_FILE, PRESETS_FOLDER};
use crate::error::{AmptError, AppResult};

/// A profile root: a directory holding both the presets tree and its index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    root: PathBuf,
}

impl Profile {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn presets_dir(&self) -> PathBuf {
        self.root.join(PRESETS_FOLDER)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    /// Accepts `path` only when it is itself a profile root.
    pub fn at(path: &Path) -> AppResult<Self> {
        let path = absolutize(path);
        if is_profile_folder(&path) {
            Ok(Self { root: path })
        } else {
            Err(AmptError::NotAProfile(path))
        }
    }
}

/// Makes `path` absolute against the working directory and folds `.`/`..`
/// lexically. Symlinks are left alone so index rows keep the spelling the
/// user's profile was registered with.
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub fn is_profile_folder(folder: &Path) -> bool {
    folder.join(PRESETS_FOLDER).exists() && folder.join(INDEX_FILE).exists()
}

/// Walks `path` and its ancestors until one qualifies as a profile root.
pub fn locate(path: &Path) -> AppResult<Profile> {
    let start = absolutize(path);
    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if is_profile_folder(dir) {
            return Ok(Profile {
                root: dir.to_path_buf(),
            });
        }
        current = dir.parent();
    }
    Err(AmptError::NotAProfile(start))
}

/// Nearest enclosing `Presets` folder whose parent is a profile root.
pub fn presets_root_of(path: &Path) -> Option<PathBuf> {
    let start = absolutize(path);
    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if dir.file_name().is_some_and(|name| name == PRESETS_FOLDER)
            && dir.parent().is_some_and(is_profile_folder)
        {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

pub fn is_under_presets(path: &Path) -> bool {
    presets_root_of(path).is_some()
}
