use crate::error::AppResult;
use crate::index::PresetIndex;
use crate::profile::Profile;

/// Repoints every index row at `profile`'s current location, for a profile
/// folder that was moved or restored somewhere else. No preset is touched.
pub fn reindex(index: &PresetIndex<'_>, profile: &Profile) -> AppResult<usize> {
    let changed = index.rebase_all(profile)?;
    log::info!(
        "reindexed {changed} row(s) onto {}",
        profile.root().display()
    );
    Ok(changed)
}
