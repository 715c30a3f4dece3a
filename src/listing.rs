//! `ls`: the entries an expression resolves to, grouped by folder.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{AmptError, AppResult};
use crate::matcher::{common_base_path, resolve_grouped};
use crate::preset::display_name_of;

#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub recursive: bool,
    pub full_path: bool,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDto {
    pub path: String,
    pub name: String,
    pub dir: String,
    pub is_dir: bool,
    pub ext: Option<String>,
}

pub fn entry_from_path(path: &Path) -> EntryDto {
    let is_dir = path.is_dir();
    EntryDto {
        path: path.to_string_lossy().to_string(),
        name: path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default(),
        dir: path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default(),
        is_dir,
        ext: if is_dir {
            None
        } else {
            path.extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
        },
    }
}

/// Writes the listing of `expression` to `out`; returns the entry count.
pub fn list(expression: &Path, options: ListOptions, out: &mut dyn Write) -> AppResult<usize> {
    let grouped = resolve_grouped(expression, options.recursive)?;
    let count = grouped.values().map(Vec::len).sum();

    let rendered = if options.json {
        render_json(&grouped)?
    } else if options.full_path {
        render_full_paths(&grouped)
    } else {
        render_grouped(&grouped)
    };

    if !rendered.is_empty() {
        writeln!(out, "{rendered}").map_err(AmptError::io("failed to write listing"))?;
    }
    Ok(count)
}

fn render_json(grouped: &BTreeMap<PathBuf, Vec<PathBuf>>) -> AppResult<String> {
    let entries: Vec<EntryDto> = grouped
        .values()
        .flatten()
        .map(|path| entry_from_path(path))
        .collect();
    serde_json::to_string_pretty(&entries).map_err(|e| AmptError::Io {
        context: "failed to encode listing".to_string(),
        source: e.into(),
    })
}

fn render_full_paths(grouped: &BTreeMap<PathBuf, Vec<PathBuf>>) -> String {
    grouped
        .values()
        .flatten()
        .map(|path| path.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `+ Folder` / `- Preset` lines; when more than one folder is involved,
/// each group gets a `Folder:` header relative to the folders' common base.
pub fn render_grouped(grouped: &BTreeMap<PathBuf, Vec<PathBuf>>) -> String {
    let folders: Vec<PathBuf> = grouped.keys().cloned().collect();
    let common = common_base_path(&folders);
    let base = if grouped.contains_key(&common) {
        common.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        common
    };

    let mut blocks = Vec::with_capacity(grouped.len());
    for (folder, entries) in grouped {
        let mut lines = Vec::with_capacity(entries.len() + 1);
        if grouped.len() > 1 {
            let header = folder.strip_prefix(&base).unwrap_or(folder);
            lines.push(format!("{}:", header.display()));
        }
        for entry in entries {
            if entry.is_dir() {
                let name = entry.file_name().unwrap_or_default().to_string_lossy();
                lines.push(format!("+ {name}"));
            } else {
                lines.push(format!("- {}", display_name_of(entry)));
            }
        }
        blocks.push(lines.join("\n"));
    }
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn grouped_rendering_uses_headers_for_several_folders() {
        let tmp = tempfile::tempdir().unwrap();
        let amplitube = tmp.path().join("Amps").join("Amplitube");
        fs::create_dir_all(amplitube.join("Metal")).unwrap();
        fs::write(amplitube.join("American Tube Clean 1.at5p"), b"").unwrap();
        fs::write(amplitube.join("Metal").join("Metal Clean T.at5p"), b"").unwrap();

        let mut grouped = BTreeMap::new();
        grouped.insert(
            amplitube.clone(),
            vec![amplitube.join("Metal"), amplitube.join("American Tube Clean 1.at5p")],
        );
        grouped.insert(
            amplitube.join("Metal"),
            vec![amplitube.join("Metal").join("Metal Clean T.at5p")],
        );

        let expected = format!(
            "Amplitube:\n+ Metal\n- American Tube Clean 1\n\n{}:\n- Metal Clean T",
            Path::new("Amplitube").join("Metal").display()
        );
        assert_eq!(render_grouped(&grouped), expected);
    }

    #[test]
    fn single_folder_has_no_header() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("Default.at5p"), b"").unwrap();

        let mut grouped = BTreeMap::new();
        grouped.insert(tmp.path().to_path_buf(), vec![tmp.path().join("Default.at5p")]);
        assert_eq!(render_grouped(&grouped), "- Default");
    }

    #[test]
    fn entry_dto_serializes_camel_case() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("Default.at5p");
        fs::write(&file, b"").unwrap();

        let json = serde_json::to_value(entry_from_path(&file)).unwrap();
        assert_eq!(json["isDir"], false);
        assert_eq!(json["name"], "Default.at5p");
        assert_eq!(json["ext"], "at5p");
    }
}
