//! Preset file naming rules and the identifier stored in each preset's header.

use std::fs;
use std::path::Path;

use regex::{NoExpand, Regex};
use uuid::Uuid;

use crate::config::{LEGACY_PRESET_EXTENSION, PRESETS_FOLDER, PRESET_EXTENSION};
use crate::error::{AmptError, AppResult};

const ROOT_ELEMENT: &str = r"<Preset\b[^>]*>";
const FORMAT_ATTR: &str = r#"\bFormat\s*=\s*"([^"]*)""#;
const GUID_ATTR: &str = r#"\bGUID\s*=\s*"([^"]*)""#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetFormat {
    Current,
    Legacy,
}

impl PresetFormat {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "at5p" => Some(Self::Current),
            "at4p" => Some(Self::Legacy),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Current => "at5p",
            Self::Legacy => "at4p",
        }
    }
}

pub fn contains_wildcards(path: &Path) -> bool {
    path.to_string_lossy().contains('*')
}

/// A literal path naming a preset file in either format.
pub fn is_preset_name(path: &Path) -> bool {
    let s = path.to_string_lossy();
    !s.contains('*') && (s.ends_with(PRESET_EXTENSION) || s.ends_with(LEGACY_PRESET_EXTENSION))
}

/// A path that can only denote a folder: no preset extension anywhere in it.
pub fn is_folder_name(path: &Path) -> bool {
    let s = path.to_string_lossy();
    !s.contains(PRESET_EXTENSION) && !s.contains(LEGACY_PRESET_EXTENSION)
}

/// Logical preset name for the index `Name` column: presets-relative, extension stripped.
pub fn display_name(path: &str) -> String {
    let mut name = path.strip_prefix(PRESETS_FOLDER).unwrap_or(path);
    name = name.strip_prefix(&['/', '\\'][..]).unwrap_or(name);
    name.strip_suffix(PRESET_EXTENSION)
        .or_else(|| name.strip_suffix(LEGACY_PRESET_EXTENSION))
        .unwrap_or(name)
        .to_string()
}

pub fn display_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| display_name(&name.to_string_lossy()))
        .unwrap_or_default()
}

fn read_header(path: &Path) -> AppResult<(String, std::ops::Range<usize>)> {
    let content = fs::read_to_string(path).map_err(AmptError::io(format!(
        "Could not read preset {}",
        path.display()
    )))?;
    let root = Regex::new(ROOT_ELEMENT)?;
    let range = root
        .find(&content)
        .map(|m| m.range())
        .ok_or_else(|| AmptError::UnknownPresetFormat(path.to_path_buf()))?;
    Ok((content, range))
}

fn attribute(header: &str, pattern: &str) -> AppResult<Option<String>> {
    let re = Regex::new(pattern)?;
    Ok(re
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string()))
}

pub fn read_format(path: &Path) -> AppResult<PresetFormat> {
    let (content, range) = read_header(path)?;
    attribute(&content[range], FORMAT_ATTR)?
        .as_deref()
        .and_then(PresetFormat::from_tag)
        .ok_or_else(|| AmptError::UnknownPresetFormat(path.to_path_buf()))
}

pub fn read_identifier(path: &Path) -> AppResult<Option<String>> {
    let (content, range) = read_header(path)?;
    attribute(&content[range], GUID_ATTR)
}

/// Stamps a freshly generated identifier into the preset header, leaving the
/// rest of the file byte-for-byte intact. Returns the new identifier.
pub fn regenerate_identifier(path: &Path) -> AppResult<String> {
    let (content, range) = read_header(path)?;
    let header = &content[range.clone()];

    let format = attribute(header, FORMAT_ATTR)?
        .as_deref()
        .and_then(PresetFormat::from_tag)
        .ok_or_else(|| AmptError::UnknownPresetFormat(path.to_path_buf()))?;

    let id = Uuid::new_v4().to_string();
    let guid = Regex::new(GUID_ATTR)?;
    let new_attr = format!(r#"GUID="{id}""#);
    let new_header = if guid.is_match(header) {
        guid.replace(header, NoExpand(&new_attr)).into_owned()
    } else {
        header.replacen("<Preset", &format!("<Preset {new_attr}"), 1)
    };

    let mut rewritten = String::with_capacity(content.len() + 8);
    rewritten.push_str(&content[..range.start]);
    rewritten.push_str(&new_header);
    rewritten.push_str(&content[range.end..]);

    fs::write(path, rewritten).map_err(AmptError::io(format!(
        "Failed to generate new GUID for {}",
        path.display()
    )))?;

    log::debug!("{} ({}) now has GUID {id}", path.display(), format.tag());
    Ok(id)
}
