//! RedPower tube machines and the project table.

use worldshift_nbt::{Tag, TagCompound, TagKind};

use crate::transformer::remap_inventory_list;
use crate::{nav, RemapContext, RemapError, Transformer};


const TUBE_MACHINE_KINDS: [&str; 16] = [
    "RPDeploy", "RPAssemble", "RPAFurnace", "RPItemDet", "RPEject", "RPFilter", "RPBatBox",
    "RPBFurnace", "RPRetrieve", "RPBuffer", "RPRelay", "RPSorter", "RPAdvBench", "RPBAFurnace",
    "RPRegulate", "RPConDDrv",
];

pub fn transformers() -> Vec<Transformer> {
    let mut ret: Vec<Transformer> = TUBE_MACHINE_KINDS
        .into_iter()
        .map(|kind| Transformer::TubeMachine { kind })
        .collect();
    for kind in ["RPTube", "RPMTube", "RPAccel"] {
        ret.push(Transformer::TileInventory {
            kind,
            list_name: "Items",
        });
    }
    ret
}

/// The project table grew a plan slot at position 9, shifting the bulk
/// storage area up by one. Nothing in the data says whether the shift has
/// already happened, so this transformer is NOT part of the default set:
/// running it twice would shift the storage area again.
pub fn project_table_slot_shifter() -> Transformer {
    Transformer::ProjectTableSlotShift
}

/// Tube machines buffer backstuffed items from the attached tube network in
/// a second list beside the ordinary inventory.
pub(crate) fn remap_tube_machine(
    te: &mut TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    remap_inventory_list(te, "Items", ctx)?;

    // The Buffer list is tolerated in any shape; only a well-formed
    // compound list is remapped.
    if let Some(buffer) = te.get_mut("Buffer").and_then(Tag::as_list_mut) {
        if buffer.kind() == TagKind::Compound {
            for item in buffer.compounds_mut() {
                crate::remap_item_compound(item, ctx)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn shift_project_table_slots(te: &mut TagCompound) -> Result<(), RemapError> {
    if let Some(items) = nav::optional_compound_list_mut(te, "Items")? {
        for item in items.compounds_mut() {
            let Some(slot) = nav::optional_number(item, "Slot", &[TagKind::Byte])? else {
                continue;
            };
            if slot >= 9 {
                item.insert("Slot", Tag::Byte((slot + 1) as i8));
            }
        }
    }
    Ok(())
}
