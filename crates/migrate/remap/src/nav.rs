//! Lookup helpers over compounds, with the legal-kinds assertions the
//! traversal engine relies on: a referenced path is either absent or present
//! with its documented variant, and anything else is a malformed input.

use worldshift_nbt::{Tag, TagCompound, TagKind, TagList};

use crate::RemapError;


fn wrong_kind(name: &str, expected: &str, found: TagKind) -> RemapError {
    RemapError::WrongKind {
        name:     name.to_owned(),
        expected: expected.to_owned(),
        found,
    }
}

/// Widens a numeric tag to `i64`, asserting its kind is one of
/// `legal_kinds`. A mismatch means the input is malformed.
pub fn get_number(tag: &Tag, name: &str, legal_kinds: &[TagKind]) -> Result<i64, RemapError> {
    let value = match *tag {
        Tag::Byte(value)  => i64::from(value),
        Tag::Short(value) => i64::from(value),
        Tag::Int(value)   => i64::from(value),
        Tag::Long(value)  => value,
        _ => {
            return Err(wrong_kind(name, &legal_kind_names(legal_kinds), tag.kind()));
        }
    };

    if legal_kinds.contains(&tag.kind()) {
        Ok(value)
    } else {
        Err(wrong_kind(name, &legal_kind_names(legal_kinds), tag.kind()))
    }
}

fn legal_kind_names(legal_kinds: &[TagKind]) -> String {
    let names: Vec<&str> = legal_kinds.iter().map(|kind| kind.name()).collect();
    names.join("/")
}

/// The named numeric child, widened, or `None` if absent.
pub fn optional_number(
    compound: &TagCompound,
    name: &str,
    legal_kinds: &[TagKind],
) -> Result<Option<i64>, RemapError> {
    match compound.get(name) {
        Some(tag) => Ok(Some(get_number(tag, name, legal_kinds)?)),
        None => Ok(None),
    }
}

/// The named numeric child, widened. Absence is a structural error.
pub fn require_number(
    compound: &TagCompound,
    name: &str,
    legal_kinds: &[TagKind],
) -> Result<i64, RemapError> {
    optional_number(compound, name, legal_kinds)?
        .ok_or_else(|| RemapError::MissingChild(name.to_owned()))
}

/// The named string child. Absence is a structural error.
pub fn require_string<'t>(compound: &'t TagCompound, name: &str) -> Result<&'t str, RemapError> {
    match compound.get(name) {
        Some(Tag::String(string)) => Ok(string),
        Some(tag) => Err(wrong_kind(name, "String", tag.kind())),
        None => Err(RemapError::MissingChild(name.to_owned())),
    }
}

pub fn optional_compound_mut<'t>(
    compound: &'t mut TagCompound,
    name: &str,
) -> Result<Option<&'t mut TagCompound>, RemapError> {
    match compound.get_mut(name) {
        Some(Tag::Compound(child)) => Ok(Some(child)),
        Some(tag) => Err(wrong_kind(name, "Compound", tag.kind())),
        None => Ok(None),
    }
}

pub fn require_compound_mut<'t>(
    compound: &'t mut TagCompound,
    name: &str,
) -> Result<&'t mut TagCompound, RemapError> {
    match compound.get_mut(name) {
        Some(Tag::Compound(child)) => Ok(child),
        Some(tag) => Err(wrong_kind(name, "Compound", tag.kind())),
        None => Err(RemapError::MissingChild(name.to_owned())),
    }
}

/// The named list child, or `None` if absent. A non-empty list must hold
/// compounds (element kind 10); other element kinds are structural errors.
pub fn optional_compound_list_mut<'t>(
    compound: &'t mut TagCompound,
    name: &str,
) -> Result<Option<&'t mut TagList>, RemapError> {
    match compound.get_mut(name) {
        Some(Tag::List(list)) => {
            if !list.is_empty() && list.kind() != TagKind::Compound {
                return Err(RemapError::NotACompoundList(name.to_owned(), list.kind()));
            }
            Ok(Some(list))
        }
        Some(tag) => Err(wrong_kind(name, "List", tag.kind())),
        None => Ok(None),
    }
}

pub fn require_compound_list_mut<'t>(
    compound: &'t mut TagCompound,
    name: &str,
) -> Result<&'t mut TagList, RemapError> {
    match compound.get_mut(name) {
        Some(Tag::List(list)) => {
            if !list.is_empty() && list.kind() != TagKind::Compound {
                return Err(RemapError::NotACompoundList(name.to_owned(), list.kind()));
            }
            Ok(list)
        }
        Some(tag) => Err(wrong_kind(name, "List", tag.kind())),
        None => Err(RemapError::MissingChild(name.to_owned())),
    }
}

/// The `Level` compound inside a chunk root.
pub fn level_mut(chunk: &mut TagCompound) -> Result<&mut TagCompound, RemapError> {
    require_compound_mut(chunk, "Level")
}

/// The `Sections` list inside a chunk root.
pub fn sections_mut(chunk: &mut TagCompound) -> Result<&mut TagList, RemapError> {
    require_compound_list_mut(level_mut(chunk)?, "Sections")
}

/// The `TileEntities` list inside a chunk root.
pub fn tile_entities_mut(chunk: &mut TagCompound) -> Result<&mut TagList, RemapError> {
    require_compound_list_mut(level_mut(chunk)?, "TileEntities")
}

/// The `Entities` list inside a chunk root.
pub fn entities_mut(chunk: &mut TagCompound) -> Result<&mut TagList, RemapError> {
    require_compound_list_mut(level_mut(chunk)?, "Entities")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_widening_and_kind_assertion() {
        let tag = Tag::Short(-7);
        assert_eq!(get_number(&tag, "x", &[TagKind::Short]).unwrap(), -7);
        assert_eq!(
            get_number(&tag, "x", &[TagKind::Short, TagKind::Int]).unwrap(),
            -7,
        );
        assert!(get_number(&tag, "x", &[TagKind::Int]).is_err());
        assert!(get_number(&Tag::String("5".to_owned()), "x", &[TagKind::Int]).is_err());
    }

    #[test]
    fn optional_number_distinguishes_absent_from_mistyped() {
        let mut compound = TagCompound::new();
        compound.insert("present", Tag::Int(3));

        assert_eq!(
            optional_number(&compound, "absent", &[TagKind::Int]).unwrap(),
            None,
        );
        assert_eq!(
            optional_number(&compound, "present", &[TagKind::Int]).unwrap(),
            Some(3),
        );
        assert!(optional_number(&compound, "present", &[TagKind::Short]).is_err());
    }

    #[test]
    fn compound_list_kind_is_checked() {
        let mut compound = TagCompound::new();
        let mut shorts = TagList::new();
        shorts.push(Tag::Short(1)).unwrap();
        compound.insert("bad", Tag::List(shorts));
        compound.insert("empty", Tag::List(TagList::new()));

        assert!(optional_compound_list_mut(&mut compound, "bad").is_err());
        assert!(optional_compound_list_mut(&mut compound, "empty").unwrap().is_some());
        assert!(optional_compound_list_mut(&mut compound, "missing").unwrap().is_none());
    }
}
