//! Forestry engines, bee housing, and machines.

use crate::transformer::remap_inventory_list;
use crate::{nav, RemapContext, RemapError, Transformer};

use worldshift_nbt::TagCompound;


pub fn transformers() -> Vec<Transformer> {
    let mut ret = Vec::new();

    // Engine inventories, across the rename from one shared kind to
    // per-engine kinds.
    for (kind, list_name) in [
        ("forestry.Engine", "sockets"),
        ("forestry.Engine", "Items"),
        ("forestry.EngineTin", "sockets"),
        ("forestry.EngineBronze", "Items"),
        ("forestry.EngineCopper", "Items"),
    ] {
        ret.push(Transformer::TileInventory { kind, list_name });
    }

    // Bee housing.
    for kind in [
        "forestry.Apiary",
        "forestry.Alveary",
        "forestry.AlvearyFan",
        "forestry.AlvearyHeater",
        "forestry.AlvearySwarmer",
    ] {
        ret.push(Transformer::TileInventory {
            kind,
            list_name: "Items",
        });
    }

    ret.push(Transformer::ForestryMachine);
    ret.push(Transformer::ForestryTankQuantity);
    ret
}

/// Older machines keep their whole state inside a nested `Machine`
/// compound; its `Items` list needs remapping.
pub(crate) fn remap_machine(
    te: &mut TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    if let Some(machine) = nav::optional_compound_mut(te, "Machine")? {
        remap_inventory_list(machine, "Items", ctx)?;
    }
    Ok(())
}

/// Engine tanks renamed their `quantity` key to `Amount`.
pub(crate) fn rename_tank_quantity(te: &mut TagCompound) -> Result<(), RemapError> {
    for slot_name in ["HeatingSlot", "FuelSlot"] {
        if let Some(slot) = nav::optional_compound_mut(te, slot_name)? {
            slot.rename("quantity", "Amount");
        }
    }
    Ok(())
}
