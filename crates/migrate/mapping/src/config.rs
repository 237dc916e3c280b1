use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info};
use thiserror::Error;


/// The syntax of a mod's id-allocation config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// Flat `key = integer` lines.
    Ini,
    /// Braced, nestable sections; keys used verbatim.
    HierNoPrefix,
    /// Braced sections where only `I:`-prefixed keys count (prefix stripped).
    HierPrefix,
}

/// Where to find a config file, relative to a world's base directory.
#[derive(Debug, Clone)]
pub struct ConfigDescriptor {
    pub format: ConfigFormat,
    pub path:   &'static str,
}

impl ConfigDescriptor {
    pub const fn new(format: ConfigFormat, path: &'static str) -> Self {
        Self { format, path }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path:   PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config line {line_number} (expected exactly one '='): {line}")]
    MalformedLine { line_number: usize, line: String },
    #[error("multiple {0} sections at the top level")]
    DuplicateSection(&'static str),
    #[error("unbalanced closing brace on line {0}")]
    UnbalancedBrace(usize),
}

/// A parsed config file: symbolic name → allocated integer id.
///
/// Hierarchical files additionally remember which top-level section held the
/// block ids and which held the item ids, which makes the symbol lists
/// enumerable; flat files cannot be enumerated (nothing marks an entry as a
/// block or an item).
#[derive(Debug)]
pub enum Config {
    Flat {
        values: IndexMap<String, i32>,
    },
    Hier {
        /// Keys are full section paths joined with `/`, e.g. `blocks/pipe.item`.
        values:        IndexMap<String, i32>,
        block_section: Option<String>,
        item_section:  Option<String>,
    },
}

impl Config {
    /// Loads and parses the file the descriptor points at, resolved against
    /// `base_dir`.
    pub fn load(base_dir: &Path, descriptor: &ConfigDescriptor) -> Result<Self, ConfigError> {
        let path = base_dir.join(descriptor.path);
        info!("loading config file {} ({:?})", path.display(), descriptor.format);

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        match descriptor.format {
            ConfigFormat::Ini => Self::parse_flat(&text),
            ConfigFormat::HierNoPrefix => Self::parse_hier(&text, false),
            ConfigFormat::HierPrefix => Self::parse_hier(&text, true),
        }
    }

    /// Parses the flat `key = integer` format.
    pub fn parse_flat(text: &str) -> Result<Self, ConfigError> {
        let mut values = IndexMap::new();

        for (index, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split('=');
            let (key, value) = match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => (key.trim(), value.trim()),
                _ => {
                    return Err(ConfigError::MalformedLine {
                        line_number: index + 1,
                        line:        line.to_owned(),
                    });
                }
            };

            match value.parse::<i32>() {
                Ok(value) => {
                    values.insert(key.to_owned(), value);
                }
                // Non-integer entries describe something other than an id.
                Err(_) => debug!("skipping non-integer config value {key} = {value}"),
            }
        }

        Ok(Self::Flat { values })
    }

    /// Parses the hierarchical braced format. With `prefixed`, only keys
    /// carrying an `I:` prefix are kept (prefix stripped); everything else
    /// is ignored.
    pub fn parse_hier(text: &str, prefixed: bool) -> Result<Self, ConfigError> {
        let mut values = IndexMap::new();
        let mut block_section: Option<String> = None;
        let mut item_section: Option<String> = None;

        let mut path: Vec<String> = Vec::new();
        let mut in_angle_brackets = false;

        for (index, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if in_angle_brackets {
                if line.ends_with('>') {
                    in_angle_brackets = false;
                }
                continue;
            }

            if let Some(section) = line.strip_suffix('{') {
                let section = section.trim();
                if path.is_empty() && (section == "block" || section == "blocks") {
                    if block_section.is_some() {
                        return Err(ConfigError::DuplicateSection("block"));
                    }
                    block_section = Some(section.to_owned());
                }
                if path.is_empty() && (section == "item" || section == "items") {
                    if item_section.is_some() {
                        return Err(ConfigError::DuplicateSection("item"));
                    }
                    item_section = Some(section.to_owned());
                }
                path.push(section.to_owned());
                continue;
            }

            if line == "}" {
                if path.pop().is_none() {
                    return Err(ConfigError::UnbalancedBrace(index + 1));
                }
                continue;
            }

            let mut parts = line.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => {
                    let key = key.trim();
                    let key = if prefixed {
                        match key.strip_prefix("I:") {
                            Some(stripped) => stripped,
                            None => continue,
                        }
                    } else {
                        key
                    };

                    let full_key = if path.is_empty() {
                        format!("/{key}")
                    } else {
                        format!("{}/{key}", path.join("/"))
                    };
                    match value.trim().parse::<i32>() {
                        Ok(value) => {
                            values.insert(full_key, value);
                        }
                        Err(_) => debug!("skipping non-integer config value {full_key}"),
                    }
                }
                // A line ending in `<` opens a free-form block which runs
                // until a line ending in `>`; its contents carry no ids.
                (Some(_), None, None) if line.ends_with('<') => in_angle_brackets = true,
                _ => {
                    return Err(ConfigError::MalformedLine {
                        line_number: index + 1,
                        line:        line.to_owned(),
                    });
                }
            }
        }

        Ok(Self::Hier {
            values,
            block_section,
            item_section,
        })
    }

    /// The id allocated to a block symbol, if the file names one.
    pub fn get_block(&self, name: &str) -> Option<i32> {
        match self {
            Self::Flat { values } => values.get(name).copied(),
            Self::Hier {
                values,
                block_section,
                ..
            } => {
                let section = block_section.as_ref()?;
                values.get(&format!("{section}/{name}")).copied()
            }
        }
    }

    /// The id allocated to an item symbol, if the file names one.
    pub fn get_item(&self, name: &str) -> Option<i32> {
        match self {
            Self::Flat { values } => values.get(name).copied(),
            Self::Hier {
                values,
                item_section,
                ..
            } => {
                let section = item_section.as_ref()?;
                values.get(&format!("{section}/{name}")).copied()
            }
        }
    }

    /// Every block symbol the file names, in file order, or `None` if the
    /// format cannot be enumerated (flat files).
    pub fn auto_blocks(&self) -> Option<Vec<String>> {
        match self {
            Self::Flat { .. } => None,
            Self::Hier {
                values,
                block_section,
                ..
            } => Some(enumerate_section(values, block_section.as_deref())),
        }
    }

    /// Every item symbol the file names, in file order, or `None` if the
    /// format cannot be enumerated (flat files).
    pub fn auto_items(&self) -> Option<Vec<String>> {
        match self {
            Self::Flat { .. } => None,
            Self::Hier {
                values,
                item_section,
                ..
            } => Some(enumerate_section(values, item_section.as_deref())),
        }
    }
}

fn enumerate_section(values: &IndexMap<String, i32>, section: Option<&str>) -> Vec<String> {
    let Some(section) = section else {
        return Vec::new();
    };
    let prefix = format!("{section}/");

    values
        .keys()
        .filter_map(|key| key.strip_prefix(&prefix))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_basics() {
        let config = Config::parse_flat(
            "# comment\n\
             \n\
             stone = 1\n\
             not_an_id = hello\n\
             dirt=3\n",
        )
        .unwrap();

        assert_eq!(config.get_block("stone"), Some(1));
        assert_eq!(config.get_item("dirt"), Some(3));
        assert_eq!(config.get_block("not_an_id"), None);
        assert_eq!(config.auto_blocks(), None);
        assert_eq!(config.auto_items(), None);
    }

    #[test]
    fn flat_rejects_wrong_equals_count() {
        assert!(Config::parse_flat("a = b = c\n").is_err());
        assert!(Config::parse_flat("just a word\n").is_err());
    }

    #[test]
    fn hier_sections_and_enumeration() {
        let config = Config::parse_hier(
            "blocks {\n\
             \x20   pipe = 200\n\
             \x20   nested {\n\
             \x20       tank = 201\n\
             \x20   }\n\
             }\n\
             item {\n\
             \x20   wrench = 5000\n\
             }\n\
             general {\n\
             \x20   power = 17\n\
             }\n",
            false,
        )
        .unwrap();

        assert_eq!(config.get_block("pipe"), Some(200));
        assert_eq!(config.get_block("nested/tank"), Some(201));
        assert_eq!(config.get_item("wrench"), Some(5000));
        assert_eq!(config.get_block("power"), None);

        assert_eq!(
            config.auto_blocks(),
            Some(vec!["pipe".to_owned(), "nested/tank".to_owned()]),
        );
        assert_eq!(config.auto_items(), Some(vec!["wrench".to_owned()]));
    }

    #[test]
    fn hier_duplicate_block_section_is_fatal() {
        let text = "block {\n}\nblocks {\n}\n";
        assert!(matches!(
            Config::parse_hier(text, false),
            Err(ConfigError::DuplicateSection("block")),
        ));
    }

    #[test]
    fn hier_angle_bracket_blocks_are_ignored() {
        let config = Config::parse_hier(
            "blocks {\n\
             \x20   custom <\n\
             \x20       anything at all = not parsed\n\
             \x20   >\n\
             \x20   pipe = 7\n\
             }\n",
            false,
        )
        .unwrap();

        assert_eq!(config.get_block("pipe"), Some(7));
        assert_eq!(config.auto_blocks(), Some(vec!["pipe".to_owned()]));
    }

    #[test]
    fn prefixed_keys_are_stripped_and_others_ignored() {
        let config = Config::parse_hier(
            "item {\n\
             \x20   I:gear = 5100\n\
             \x20   B:flag = 1\n\
             }\n",
            true,
        )
        .unwrap();

        assert_eq!(config.get_item("gear"), Some(5100));
        assert_eq!(config.get_item("flag"), None);
        assert_eq!(config.auto_items(), Some(vec!["gear".to_owned()]));
    }

    #[test]
    fn hier_without_sections_enumerates_empty() {
        let config = Config::parse_hier("general {\n\x20   a = 1\n}\n", false).unwrap();
        assert_eq!(config.auto_blocks(), Some(Vec::new()));
        assert_eq!(config.get_block("a"), None);
    }
}
