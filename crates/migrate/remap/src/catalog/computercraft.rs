//! ComputerCraft disk drives and turtles.

use worldshift_nbt::TagCompound;

use crate::{nav, remap_item_compound, RemapContext, RemapError, Transformer};


pub fn transformers() -> Vec<Transformer> {
    vec![
        Transformer::DiskDrive,
        Transformer::TileInventory {
            kind:      "turtle",
            list_name: "Items",
        },
    ]
}

/// A disk drive holds at most one disk, in an `item` compound.
pub(crate) fn remap_disk_drive(
    te: &mut TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    if let Some(item) = nav::optional_compound_mut(te, "item")? {
        remap_item_compound(item, ctx)?;
    }
    Ok(())
}
