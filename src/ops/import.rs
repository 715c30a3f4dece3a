use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::IMPORT_FOLDER;
use crate::error::{AmptError, AppResult};
use crate::index::{detect_schema, open_index_read_only, with_transaction, IndexSchema, PresetIndex};
use crate::matcher::resolve;
use crate::ops::advise;
use crate::preset::regenerate_identifier;
use crate::profile::{locate, Profile};

/// Copies the whole presets tree of the profile holding `source` into a new
/// `Import` folder of the profile holding `target`, carrying each preset's
/// descriptive index columns across when the source index has a row for it.
///
/// Returns the number of presets imported.
pub fn import(source: &Path, target: &Path, out: &mut dyn Write) -> AppResult<usize> {
    let source_profile = locate(source).map_err(|_| AmptError::ArgsMustBeProfile)?;
    let target_profile = locate(target).map_err(|_| AmptError::ArgsMustBeProfile)?;
    if source_profile == target_profile {
        return Err(AmptError::SameProfile);
    }

    let source_presets = source_profile.presets_dir();
    let matches = resolve(&source_presets, true, false)?;
    let import_root = next_import_folder(&target_profile);

    let source_conn = open_index_read_only(&source_profile)?;
    let source_schema = detect_schema(&source_conn);
    let source_index = PresetIndex::new(&source_conn);
    log::debug!(
        "importing {} entries from {} ({:?} index) into {}",
        matches.len(),
        source_presets.display(),
        source_schema,
        import_root.display()
    );

    with_transaction(&target_profile, |index| {
        let run = ImportRun {
            source_index: &source_index,
            source_schema,
            target_index: index,
            source_presets: &source_presets,
            import_root: &import_root,
        };
        let outcome = run.apply(&matches, out);
        if outcome.is_err() && import_root.exists() {
            log::warn!("import failed, removing {}", import_root.display());
            if let Err(err) = fs::remove_dir_all(&import_root) {
                log::warn!("could not remove {}: {err}", import_root.display());
            }
        }
        outcome
    })
}

/// `Import`, or `Import - N` for the first N that is still free.
pub fn next_import_folder(profile: &Profile) -> PathBuf {
    let presets = profile.presets_dir();
    let mut candidate = presets.join(IMPORT_FOLDER);
    let mut counter = 0;
    while candidate.exists() {
        counter += 1;
        candidate = presets.join(format!("{IMPORT_FOLDER} - {counter}"));
    }
    candidate
}

struct ImportRun<'a> {
    source_index: &'a PresetIndex<'a>,
    source_schema: IndexSchema,
    target_index: &'a PresetIndex<'a>,
    source_presets: &'a Path,
    import_root: &'a Path,
}

impl ImportRun<'_> {
    fn apply(&self, matches: &[PathBuf], out: &mut dyn Write) -> AppResult<usize> {
        fs::create_dir_all(self.import_root).map_err(AmptError::io(format!(
            "Failed to create {}",
            self.import_root.display()
        )))?;

        let mut imported = 0;
        for entry in matches {
            let relative = entry.strip_prefix(self.source_presets).unwrap_or(entry);
            let dest = self.import_root.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&dest).map_err(AmptError::io(format!(
                    "Failed to create directories {}",
                    dest.display()
                )))?;
                continue;
            }

            self.import_one(entry, &dest, out)?;
            imported += 1;
        }

        log::info!(
            "imported {imported} preset(s) into {}",
            self.import_root.display()
        );
        Ok(imported)
    }

    fn import_one(&self, from: &Path, to: &Path, out: &mut dyn Write) -> AppResult<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(AmptError::io(format!(
                "Failed to create directories {}",
                parent.display()
            )))?;
        }
        fs::copy(from, to).map_err(AmptError::io(format!(
            "Could not copy {} to {}",
            from.display(),
            to.display()
        )))?;
        regenerate_identifier(to)?;

        match self.source_index.find_descriptive(self.source_schema, from)? {
            Some(row) => {
                self.target_index.insert_imported(&row, to)?;
            }
            None => advise(
                out,
                &format!("{} imported without database record", from.display()),
            )?,
        }
        Ok(())
    }
}
