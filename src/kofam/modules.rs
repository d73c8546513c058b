//! KEGG module catalog from the BRITE hierarchy `ko00002.keg`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::ModuleId;
use crate::error::ProfileDbError;
use crate::fs_util::{fs_error, last_nonempty_line};

/// Last line of every complete module record served by the KEGG REST API.
pub const RECORD_TERMINATOR: &str = "///";

static MODULE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^D\s+(M\d{5})\s+(.*)$").expect("valid regex"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[^>]+>").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleEntry {
    pub name: String,
    pub module_type: String,
    pub category: String,
    pub subcategory: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleCatalog {
    entries: BTreeMap<ModuleId, ModuleEntry>,
}

impl ModuleCatalog {
    pub fn load(path: &Path) -> Result<Self, ProfileDbError> {
        let file = File::open(path).map_err(|err| fs_error(path, err))?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Streams the hierarchy: `A`, `B` and `C` lines set the type, category
    /// and subcategory that apply to the `D` (module) lines below them.
    /// `+`, `#` and `!` lines carry layout only.
    pub fn from_reader<R: BufRead>(reader: R, path: &Path) -> Result<Self, ProfileDbError> {
        let mut catalog = ModuleCatalog::default();
        let mut module_type = String::new();
        let mut category = String::new();
        let mut subcategory = String::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|err| fs_error(path, err))?;
            let bad_line = || ProfileDbError::BadLine {
                path: path.to_path_buf(),
                line_number: index + 1,
                line: line.clone(),
            };

            let Some(tag) = line.chars().next() else {
                continue;
            };
            let rest = &line[tag.len_utf8()..];
            match tag {
                '+' | '#' | '!' => {}
                'A' => module_type = strip_tags(rest),
                'B' => {
                    let value = strip_tags(rest);
                    if !value.is_empty() {
                        category = value;
                    }
                }
                'C' => subcategory = strip_tags(rest),
                'D' => {
                    let captures = MODULE_LINE.captures(&line).ok_or_else(bad_line)?;
                    let id: ModuleId = captures[1].parse().map_err(|_| bad_line())?;
                    catalog.entries.insert(
                        id,
                        ModuleEntry {
                            name: captures[2].trim().to_string(),
                            module_type: module_type.clone(),
                            category: category.clone(),
                            subcategory: subcategory.clone(),
                        },
                    );
                }
                _ => return Err(bad_line()),
            }
        }

        Ok(catalog)
    }

    pub fn get(&self, id: &ModuleId) -> Option<&ModuleEntry> {
        self.entries.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &ModuleEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn strip_tags(value: &str) -> String {
    HTML_TAG.replace_all(value, "").trim().to_string()
}

/// A downloaded module record is complete only if it ends with `///`.
pub fn verify_module_record(path: &Path) -> Result<(), ProfileDbError> {
    let last_line = last_nonempty_line(path)?.unwrap_or_default();
    if last_line.trim_end() != RECORD_TERMINATOR {
        return Err(ProfileDbError::BadModuleRecord {
            path: path.to_path_buf(),
            last_line,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn strips_html() {
        assert_eq!(strip_tags("<b>Pathway module</b>"), "Pathway module");
        assert_eq!(strip_tags("    Central carbohydrate metabolism"), "Central carbohydrate metabolism");
    }

    #[test]
    fn blank_lines_are_ignored() {
        let text = "A<b>Pathway module</b>\n\nB  <b>Energy metabolism</b>\nC    Methane metabolism\nD      M00567  Methanogenesis, CO2 => methane\n";
        let catalog = ModuleCatalog::from_reader(Cursor::new(text), Path::new("ko00002.keg")).unwrap();
        let id: ModuleId = "M00567".parse().unwrap();
        assert_eq!(catalog.get(&id).unwrap().category, "Energy metabolism");
    }
}
