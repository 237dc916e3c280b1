//! IndustrialCraft machine containers, plus the cropnalyzer.

use worldshift_nbt::{TagCompound, TagKind};

use crate::{remap_item_compound, RemapContext, RemapError, Transformer};


const MACHINE_KINDS: [&str; 25] = [
    "Crop-Matron",
    "BatBox",
    "MFE",
    "MFS",
    "Electrolyzer",
    "Miner",
    "Pump",
    "Generator",
    "Geothermal Generator",
    "Nuclear Reactor",
    "Solar Panel",
    "Water Mill",
    "Wind Mill",
    "Canning Machine",
    "Compressor",
    "Electric Furnace",
    "Extractor",
    "Induction Furnace",
    "Iron Furnace",
    "Macerator",
    "Mass Fabricator",
    "Recycler",
    "Personal Safe",
    "Terraformer",
    "Trade-O-Mat",
];

pub fn transformers() -> Vec<Transformer> {
    let mut ret: Vec<Transformer> = MACHINE_KINDS
        .into_iter()
        .map(|kind| Transformer::TileInventory {
            kind,
            list_name: "Items",
        })
        .collect();
    ret.push(Transformer::Cropnalyzer);
    ret
}

/// Nothing marks an item as a cropnalyzer, but only one carries a `tag`
/// compound holding an `Items` list; detect that shape and recurse into the
/// nested inventory.
pub(crate) fn remap_cropnalyzer_item(
    item: &mut TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    let Some(tag_compound) = item.get_mut("tag").and_then(|tag| tag.as_compound_mut()) else {
        return Ok(());
    };
    let Some(items) = tag_compound.get_mut("Items").and_then(|tag| tag.as_list_mut()) else {
        return Ok(());
    };
    if items.kind() != TagKind::Compound {
        return Ok(());
    }

    for nested in items.compounds_mut() {
        remap_item_compound(nested, ctx)?;
    }
    Ok(())
}
