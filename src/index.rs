//! The profile's `Presets.db`: one row per preset file, keyed by its path.

use std::path::{Path, MAIN_SEPARATOR};

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags};

use crate::config::{INDEX_TABLE, PRESETS_FOLDER};
use crate::error::{AmptError, AppResult};
use crate::profile::Profile;

const CURRENT_SCHEMA_PROBE: &str = "select UserId, Product, Favorite, Description, Downloads, \
    Keywords, Song, ChainA, ChainB, Band, Artist, ATInstrumentsType, ATPickupType, \
    ATPickupPositions, ATSoundCharacter, ATGenre, SongStructureElement, Rating, MadeWith, \
    ChainType, ATInstrument, OriginalFileName, FileFolder, Name from pXcPresets";

/// Descriptive columns carried from one profile's index into another's.
const DESCRIPTIVE_COLUMNS: [&str; 21] = [
    "UserId",
    "Product",
    "Favorite",
    "Description",
    "Downloads",
    "Keywords",
    "Song",
    "ChainA",
    "ChainB",
    "Band",
    "Artist",
    "ATInstrumentsType",
    "ATPickupType",
    "ATPickupPositions",
    "ATSoundCharacter",
    "ATGenre",
    "SongStructureElement",
    "Rating",
    "MadeWith",
    "ChainType",
    "ATInstrument",
];

/// Projection of `DESCRIPTIVE_COLUMNS` over a legacy index, which lacks the
/// newer instrument and favourite columns.
const LEGACY_PROJECTION: [&str; 21] = [
    "UserId",
    "Product",
    "0 as Favorite",
    "Description",
    "Downloads",
    "Keywords",
    "Song",
    "ChainA",
    "ChainB",
    "NULL as Band",
    "NULL as Artist",
    "NULL as ATInstrumentsType",
    "NULL as ATPickupType",
    "NULL as ATPickupPositions",
    "NULL as ATSoundCharacter",
    "NULL as ATGenre",
    "SongStructureElement",
    "Rating",
    "MadeWith",
    "ChainType",
    "NULL as ATInstrument",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSchema {
    Current,
    Legacy,
}

/// Descriptive column values of one row, in `DESCRIPTIVE_COLUMNS` order.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveRow(pub Vec<Value>);

/// A row's location columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub origin: String,
    pub folder: String,
    pub name: String,
}

impl Location {
    pub fn of(path: &Path) -> Self {
        Self {
            origin: path_key(path),
            folder: path.parent().map(path_key).unwrap_or_default(),
            name: crate::preset::display_name_of(path),
        }
    }
}

/// The string an index row stores for `path`.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// `<sep>Presets<sep>`, the fixed point every stored path is rebased around.
pub fn presets_marker() -> String {
    format!("{MAIN_SEPARATOR}{PRESETS_FOLDER}{MAIN_SEPARATOR}")
}

fn db_connection(db_path: &Path, flags: OpenFlags) -> AppResult<Connection> {
    let conn = Connection::open_with_flags(db_path, flags).map_err(AmptError::index(format!(
        "failed to open index {}",
        db_path.display()
    )))?;
    conn.execute_batch(
        r#"
        PRAGMA temp_store=MEMORY;
        PRAGMA busy_timeout=3000;
        "#,
    )
    .map_err(AmptError::index("failed to configure index connection"))?;
    Ok(conn)
}

pub fn open_index(profile: &Profile) -> AppResult<Connection> {
    db_connection(
        &profile.index_path(),
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

pub fn open_index_read_only(profile: &Profile) -> AppResult<Connection> {
    db_connection(
        &profile.index_path(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

/// Current-schema indexes accept a statement naming every current column.
pub fn detect_schema(conn: &Connection) -> IndexSchema {
    match conn.prepare(CURRENT_SCHEMA_PROBE) {
        Ok(_) => IndexSchema::Current,
        Err(_) => IndexSchema::Legacy,
    }
}

/// Runs `operator` inside one index transaction for `profile`: committed when
/// the operator succeeds, rolled back otherwise. Only index writes are
/// covered; filesystem changes are the operator's to undo.
pub fn with_transaction<T>(
    profile: &Profile,
    operator: impl FnOnce(&PresetIndex<'_>) -> AppResult<T>,
) -> AppResult<T> {
    let mut conn = open_index(profile)?;
    if detect_schema(&conn) != IndexSchema::Current {
        return Err(AmptError::IncompatibleIndex(profile.index_path()));
    }

    let tx = conn
        .transaction()
        .map_err(AmptError::index("failed to begin index transaction"))?;

    let outcome = operator(&PresetIndex { conn: &tx });

    match outcome {
        Ok(value) => {
            tx.commit()
                .map_err(AmptError::index("failed to commit index transaction"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                log::warn!("index rollback failed: {rollback_err}");
            }
            Err(err)
        }
    }
}

/// Statements over one open index connection.
pub struct PresetIndex<'c> {
    conn: &'c Connection,
}

impl<'c> PresetIndex<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn contains(&self, origin: &Path) -> AppResult<bool> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "select count(*) from {INDEX_TABLE} where OriginalFileName = ?1"
        ))?;
        let count: i64 = stmt.query_row(params![path_key(origin)], |row| row.get(0))?;
        Ok(count > 0)
    }

    pub fn delete_by_origin(&self, origin: &Path) -> AppResult<usize> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("delete from {INDEX_TABLE} where OriginalFileName = ?1"))?;
        stmt.execute(params![path_key(origin)])
            .map_err(AmptError::index(format!(
                "failed to remove index record for {}",
                origin.display()
            )))
    }

    /// Inserts a row for `target` duplicating every non-location column of
    /// `source`'s row. Returns the rows inserted (0 if `source` has none).
    pub fn insert_copy_of(&self, source: &Path, target: &Path) -> AppResult<usize> {
        let location = Location::of(target);
        let mut stmt = self.conn.prepare_cached(&format!(
            "insert into {INDEX_TABLE} (UserId, Product, OriginalFileName, FileFolder, Favorite, \
             Date, Name, Description, Downloads, Keywords, Song, ChainA, ChainB, Band, Artist, \
             ATInstrumentsType, ATPickupType, ATPickupPositions, ATSoundCharacter, ATGenre, \
             SongStructureElement, Rating, MadeWith, ChainType, tstamp, ATInstrument) \
             select UserId, Product, ?1, ?2, Favorite, Date, ?3, Description, Downloads, \
             Keywords, Song, ChainA, ChainB, Band, Artist, ATInstrumentsType, ATPickupType, \
             ATPickupPositions, ATSoundCharacter, ATGenre, SongStructureElement, Rating, \
             MadeWith, ChainType, tstamp, ATInstrument from {INDEX_TABLE} \
             where OriginalFileName = ?4"
        ))?;
        stmt.execute(params![
            location.origin,
            location.folder,
            location.name,
            path_key(source)
        ])
        .map_err(AmptError::index(format!(
            "copy failed, could not index {}",
            target.display()
        )))
    }

    /// Rewrites the location columns of `source`'s row in place.
    pub fn update_location(&self, source: &Path, target: &Path) -> AppResult<usize> {
        let location = Location::of(target);
        let mut stmt = self.conn.prepare_cached(&format!(
            "update {INDEX_TABLE} set OriginalFileName = ?1, FileFolder = ?2, Name = ?3 \
             where OriginalFileName = ?4"
        ))?;
        stmt.execute(params![
            location.origin,
            location.folder,
            location.name,
            path_key(source)
        ])
        .map_err(AmptError::index(format!(
            "failed to update index record for {}",
            source.display()
        )))
    }

    /// Finds the row whose path, from the `Presets` marker on, equals
    /// `path`'s. Tolerates indexes recorded under a different profile root.
    pub fn find_descriptive(
        &self,
        schema: IndexSchema,
        path: &Path,
    ) -> AppResult<Option<DescriptiveRow>> {
        let projection = match schema {
            IndexSchema::Current => DESCRIPTIVE_COLUMNS.join(", "),
            IndexSchema::Legacy => LEGACY_PROJECTION.join(", "),
        };
        let mut stmt = self.conn.prepare_cached(&format!(
            "select {projection} from {INDEX_TABLE} \
             where substr(OriginalFileName, instr(OriginalFileName, ?1)) = substr(?2, instr(?2, ?1))"
        ))?;
        let mut rows = stmt.query(params![presets_marker(), path_key(path)])?;

        // the last matching row wins when an index holds duplicates
        let mut found = None;
        while let Some(row) = rows.next()? {
            let values = (0..DESCRIPTIVE_COLUMNS.len())
                .map(|i| row.get::<_, Value>(i))
                .collect::<Result<Vec<_>, _>>()?;
            found = Some(DescriptiveRow(values));
        }
        Ok(found)
    }

    pub fn insert_imported(&self, row: &DescriptiveRow, target: &Path) -> AppResult<usize> {
        let location = Location::of(target);
        let columns = DESCRIPTIVE_COLUMNS.join(", ");
        let placeholders = vec!["?"; DESCRIPTIVE_COLUMNS.len() + 3].join(", ");
        let mut stmt = self.conn.prepare_cached(&format!(
            "insert into {INDEX_TABLE} ({columns}, OriginalFileName, FileFolder, Name) \
             values ({placeholders})"
        ))?;

        let values = row.0.iter().cloned().chain([
            Value::Text(location.origin),
            Value::Text(location.folder),
            Value::Text(location.name),
        ]);
        stmt.execute(params_from_iter(values))
            .map_err(AmptError::index(format!(
                "import failed, could not index {}",
                target.display()
            )))
    }

    /// Points every row's location columns at `profile`'s root, keeping the
    /// part from the `Presets` folder on. Returns the rows changed.
    pub fn rebase_all(&self, profile: &Profile) -> AppResult<usize> {
        let root = path_key(profile.root());
        let rows: Vec<(i64, String, String)> = {
            let mut stmt = self.conn.prepare(&format!(
                "select rowid, OriginalFileName, FileFolder from {INDEX_TABLE}"
            ))?;
            let mapped = stmt.query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                ))
            })?;
            let rows = mapped.collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut update = self.conn.prepare(&format!(
            "update {INDEX_TABLE} set OriginalFileName = ?1, FileFolder = ?2 where rowid = ?3"
        ))?;
        let mut changed = 0;
        for (rowid, origin, folder) in rows {
            let new_origin = rebase_on_profile(&origin, &root).unwrap_or_else(|| origin.clone());
            let new_folder = rebase_on_profile(&folder, &root).unwrap_or_else(|| folder.clone());
            if new_origin == origin && new_folder == folder {
                continue;
            }
            update
                .execute(params![new_origin, new_folder, rowid])
                .map_err(AmptError::index(format!("failed to reindex row {rowid}")))?;
            changed += 1;
        }
        Ok(changed)
    }
}

/// Replaces everything before the `Presets` folder in a stored path with
/// `root`. `None` when the value has no `Presets` folder in it.
pub fn rebase_on_profile(stored: &str, root: &str) -> Option<String> {
    let marker = presets_marker();
    if let Some(at) = stored.find(&marker) {
        return Some(format!("{root}{}", &stored[at..]));
    }
    let bare = &marker[..marker.len() - MAIN_SEPARATOR.len_utf8()];
    stored
        .ends_with(bare)
        .then(|| format!("{root}{bare}"))
}
