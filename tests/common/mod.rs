//! Temporary profiles for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tempfile::TempDir;
use uuid::Uuid;

pub const CURRENT_TREE: &[(&str, &str)] = &[
    ("Amps/Default.at5p", "Brit 8000"),
    ("Amps/Amplitube/American Tube Clean 1.at5p", "American Tube Clean"),
    ("Amps/Amplitube/Metal/Metal Clean T.at5p", "Metal Clean T"),
    ("Amps/Amplitube/SVX/SVX-4B.at5p", "SVX-4B"),
    ("Amps/THD/BiValve.at5p", "THD BiValve"),
    ("Amps2/Amplitube/American Tube Clean 1.at5p", "American Tube Clean"),
    ("Amps2/Amplitube/Metal/Metal Clean T.at5p", "Metal Clean T"),
    ("Amps2/Amplitube/SVX/SVX-4B.at5p", "SVX-4B"),
];

pub const CURRENT_EMPTY_FOLDERS: &[&str] = &["Amps/Empty", "Amps2/THD"];

pub const LEGACY_TREE: &[(&str, &str)] = &[
    ("Default.at4p", "Brit 8000"),
    ("Old/Clean.at4p", "American Tube Clean"),
];

const CURRENT_COLUMNS: &str = "id INTEGER PRIMARY KEY, UserId, Product, OriginalFileName TEXT, \
    FileFolder TEXT, Favorite, Date, Name TEXT, Description, Downloads, Keywords, Song, ChainA, \
    ChainB, Band, Artist, ATInstrumentsType, ATPickupType, ATPickupPositions, ATSoundCharacter, \
    ATGenre, SongStructureElement, Rating, MadeWith, ChainType, tstamp, ATInstrument";

const LEGACY_COLUMNS: &str = "id INTEGER PRIMARY KEY, UserId, Product, OriginalFileName TEXT, \
    FileFolder TEXT, Date, Name TEXT, Description, Downloads, Keywords, Song, ChainA, ChainB, \
    SongStructureElement, Rating, MadeWith, ChainType, tstamp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Current,
    Legacy,
}

pub struct Fixture {
    _tmp: TempDir,
    pub root: PathBuf,
    pub variant: Variant,
}

impl Fixture {
    pub fn current() -> Self {
        Self::build(Variant::Current)
    }

    pub fn legacy() -> Self {
        Self::build(Variant::Legacy)
    }

    fn build(variant: Variant) -> Self {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let root = tmp.path().join("profile");
        fs::create_dir_all(root.join("Presets")).expect("create presets folder");

        let fixture = Self {
            _tmp: tmp,
            root,
            variant,
        };

        let conn = Connection::open(fixture.root.join("Presets.db")).expect("create index");
        let columns = match variant {
            Variant::Current => CURRENT_COLUMNS,
            Variant::Legacy => LEGACY_COLUMNS,
        };
        conn.execute_batch(&format!("create table pXcPresets ({columns})"))
            .expect("create index table");

        let (tree, folders): (&[(&str, &str)], &[&str]) = match variant {
            Variant::Current => (CURRENT_TREE, CURRENT_EMPTY_FOLDERS),
            Variant::Legacy => (LEGACY_TREE, &[]),
        };
        for folder in folders {
            fs::create_dir_all(fixture.preset(folder)).expect("create empty folder");
        }
        for (rel, model) in tree {
            fixture.write_preset(rel, model);
            fixture.index_row(&conn, rel);
        }
        fixture
    }

    /// Absolute path of `rel` (slash separated) under `Presets`.
    pub fn preset(&self, rel: &str) -> PathBuf {
        rel.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.join("Presets"), |path, part| path.join(part))
    }

    pub fn write_preset(&self, rel: &str, model: &str) {
        let path = self.preset(rel);
        fs::create_dir_all(path.parent().expect("preset has a parent")).expect("create folders");
        let (version, format) = match self.variant {
            Variant::Current => ("5", "at5p"),
            Variant::Legacy => ("4.0", "at4p"),
        };
        let body = format!(
            "<?xml version=\"1.0\" ?>\n<Preset Version=\"{version}\" Format=\"{format}\" GUID=\"{}\" PresetBPM=\"120\" ProgramChange=\"0\">\n    <AmpA Model=\"{model}\"/>\n</Preset>\n",
            Uuid::new_v4()
        );
        fs::write(path, body).expect("write preset");
    }

    /// Writes a preset and gives it an index row.
    pub fn add_preset(&self, rel: &str, model: &str) {
        self.write_preset(rel, model);
        self.index_row(&self.connection(), rel);
    }

    fn index_row(&self, conn: &Connection, rel: &str) {
        let path = self.preset(rel);
        let origin = path.to_string_lossy().to_string();
        let folder = path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let description = format!("description of {rel}");

        match self.variant {
            Variant::Current => conn.execute(
                "insert into pXcPresets (UserId, Product, OriginalFileName, FileFolder, Favorite, \
                 Date, Name, Description, Band, Artist, ATGenre, Rating, tstamp, ATInstrument) \
                 values (7, 'AmpliTube 5', ?1, ?2, 1, '2021-03-04', ?3, ?4, 'The Band', \
                 'The Artist', 'Rock', 5, 1614816000, 'Guitar')",
                params![origin, folder, name, description],
            ),
            Variant::Legacy => conn.execute(
                "insert into pXcPresets (UserId, Product, OriginalFileName, FileFolder, Date, \
                 Name, Description, Rating, tstamp) \
                 values (7, 'AmpliTube 4', ?1, ?2, '2019-01-02', ?3, ?4, 3, 1546387200)",
                params![origin, folder, name, description],
            ),
        }
        .expect("insert index row");
    }

    pub fn connection(&self) -> Connection {
        Connection::open(self.root.join("Presets.db")).expect("open index")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.preset(rel).exists()
    }

    pub fn indexed(&self, rel: &str) -> bool {
        self.row_count_for(&self.preset(rel)) == 1
    }

    pub fn row_count_for(&self, path: &Path) -> i64 {
        self.connection()
            .query_row(
                "select count(*) from pXcPresets where OriginalFileName = ?1",
                params![path.to_string_lossy().to_string()],
                |row| row.get(0),
            )
            .expect("count rows")
    }

    pub fn row_count(&self) -> i64 {
        self.connection()
            .query_row("select count(*) from pXcPresets", [], |row| row.get(0))
            .expect("count rows")
    }

    /// `(FileFolder, Name, Description)` of the row for `rel`.
    pub fn row(&self, rel: &str) -> (String, String, String) {
        self.connection()
            .query_row(
                "select FileFolder, Name, Description from pXcPresets where OriginalFileName = ?1",
                params![self.preset(rel).to_string_lossy().to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .expect("read row")
    }

    pub fn guid(&self, rel: &str) -> String {
        ampt::preset::read_identifier(&self.preset(rel))
            .expect("read preset header")
            .expect("preset has a GUID")
    }

    pub fn model(&self, rel: &str) -> String {
        let content = fs::read_to_string(self.preset(rel)).expect("read preset");
        let start = content.find("Model=\"").expect("preset has an amp") + "Model=\"".len();
        let end = content[start..].find('"').expect("closing quote") + start;
        content[start..end].to_string()
    }

    /// Files (not folders) anywhere under `Presets`.
    pub fn file_count(&self) -> usize {
        walkdir::WalkDir::new(self.root.join("Presets"))
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .count()
    }

    /// Moves the whole profile folder to a sibling called `name`.
    pub fn relocate(&mut self, name: &str) {
        let moved = self.root.with_file_name(name);
        fs::rename(&self.root, &moved).expect("relocate profile");
        self.root = moved;
    }
}

pub fn run(command: ampt::Command) -> (ampt::AppResult<usize>, String) {
    let mut out = Vec::new();
    let result = ampt::run(&command, &mut out);
    (result, String::from_utf8(out).expect("utf-8 output"))
}
