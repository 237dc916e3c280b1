//! The traversal and transform engine.
//!
//! A chunk's tag tree is walked once per registered [`Transformer`]; each
//! transformer finds the tile entities or entities it cares about by kind
//! string and rewrites identifiers, renames keys, or migrates sub-trees
//! between schema generations. All transformers are safe to re-run on
//! already-migrated data: they detect the newer shape and then perform only
//! identifier remapping.

pub mod blocks;
pub mod catalog;
pub mod nav;

mod item;
mod transformer;

use thiserror::Error;

use worldshift_mapping::MapInfo;
use worldshift_nbt::TagKind;

pub use item::remap_item_compound;
pub use transformer::Transformer;


/// Everything a transformer may consult while rewriting: the frozen mapping
/// tables and the full transformer list (so the item-remap primitive can
/// offer every transformer a look at nested items).
#[derive(Debug, Clone, Copy)]
pub struct RemapContext<'a> {
    pub map:          &'a MapInfo,
    pub transformers: &'a [Transformer],
}

/// Applies every registered transformer to a chunk root compound.
pub fn remap_chunk(
    chunk: &mut worldshift_nbt::TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    for transformer in ctx.transformers {
        transformer.remap_chunk(chunk, ctx)?;
    }
    Ok(())
}

/// Applies every registered transformer to a player root compound.
pub fn remap_player(
    player: &mut worldshift_nbt::TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    for transformer in ctx.transformers {
        transformer.remap_player(player, ctx)?;
    }
    Ok(())
}

/// A fatal condition encountered during traversal. Mis-typed or missing
/// required structure means the input is malformed; an unmapped identifier
/// means the migration cannot complete safely.
#[derive(Debug, Error)]
pub enum RemapError {
    #[error("required tag {0} is missing")]
    MissingChild(String),
    #[error("tag {name} has kind {}, expected one of {expected}", .found.name())]
    WrongKind {
        name:     String,
        expected: String,
        found:    TagKind,
    },
    #[error("list {0} holds {found_kind} elements, expected compounds", found_kind = .1.name())]
    NotACompoundList(String, TagKind),
    #[error("byte array {name} is {found} bytes, expected {expected}")]
    BadArrayLength {
        name:     &'static str,
        expected: usize,
        found:    usize,
    },
    #[error("block id {0} has no mapping")]
    UnmappedBlock(i32),
    #[error("remapped block id {0} does not fit in 12 bits")]
    BlockIdOutOfRange(i32),
    #[error("item id {0} has no mapping")]
    UnmappedItem(i32),
    #[error("remapped item id {0} does not fit the id field")]
    ItemIdOutOfRange(i32),
    #[error("item {0} has no damage value but its mapping is damage-specific")]
    DamageRequired(i32),
    #[error("item {id} has damage value {damage} not present in its mapping")]
    DamageNotMapped { id: i32, damage: i16 },
    #[error("inventory slot {0} is out of range")]
    SlotOutOfRange(i64),
    #[error("liquid id {0} has a damage-split item mapping")]
    LiquidDamageSplit(i32),
    #[error("liquid id {0} has no name")]
    UnknownLiquid(i32),
    #[error("liquid id {id} metadata {meta} has no name")]
    UnknownLiquidMeta { id: i32, meta: i32 },
    #[error("legacy refinery filter is set (liquid id {0}), which cannot be converted")]
    UnsupportedFilter(i64),
}
