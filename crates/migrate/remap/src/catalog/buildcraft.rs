//! BuildCraft pipes, tanks, engines, fillers, refineries, and crafting
//! tables. The mod changed its tile-entity schemas between its second and
//! third major versions; these transformers read either generation and emit
//! the newer one.

use worldshift_mapping::MapTarget;
use worldshift_nbt::{Tag, TagCompound, TagKind, TagList};

use crate::transformer::remap_inventory_list;
use crate::{nav, remap_item_compound, RemapContext, RemapError, Transformer};


/// The newer pipe/tank schema defaults a missing `capacity` to this.
const DEFAULT_TANK_CAPACITY: i32 = 250;

const OLD_TANK_NAMES: [&str; 7] = [
    "side[0]", "side[1]", "side[2]", "side[3]", "side[4]", "side[5]", "center",
];
const NEW_TANK_NAMES: [&str; 7] = [
    "tank[0]", "tank[1]", "tank[2]", "tank[3]", "tank[4]", "tank[5]", "tank[6]",
];

pub fn transformers() -> Vec<Transformer> {
    vec![
        Transformer::Pipe {
            kind: "net.minecraft.src.buildcraft.transport.GenericPipe",
        },
        Transformer::Pipe {
            kind: "net.minecraft.src.buildcraft.GenericPipe",
        },
        Transformer::BuildcraftTank,
        Transformer::BuildcraftEngine,
        Transformer::Filler,
        Transformer::Refinery,
        Transformer::TileInventory {
            kind:      "AutoWorkbench",
            list_name: "stackList",
        },
        Transformer::AssemblyTable,
    ]
}

/// Remaps a numeric liquid id stored under `key`, in place, preserving the
/// slot's recorded numeric kind. Liquids are identified by item ids, so the
/// item table applies; zero means "empty" and is left alone.
pub(crate) fn remap_liquid_id(
    compound: &mut TagCompound,
    ctx: &RemapContext<'_>,
    key: &str,
) -> Result<(), RemapError> {
    let Some(tag) = compound.get_mut(key) else {
        return Ok(());
    };

    let id = nav::get_number(tag, key, &[TagKind::Int, TagKind::Short])? as i32;
    if id == 0 {
        return Ok(());
    }

    let new_id = match ctx.map.item_target(id) {
        Some(MapTarget::Id(new_id)) => *new_id,
        Some(MapTarget::ByDamage(_)) => return Err(RemapError::LiquidDamageSplit(id)),
        None => return Err(RemapError::UnmappedItem(id)),
    };

    match tag {
        Tag::Int(value) => *value = new_id,
        Tag::Short(value) => {
            *value = i16::try_from(new_id).map_err(|_| RemapError::ItemIdOutOfRange(new_id))?;
        }
        _ => {}
    }
    Ok(())
}

/// Pipes are identified by the item id of the item used to place them, and
/// liquid pipes hold per-side tanks whose naming changed across schema
/// generations (`side[0..5]`/`center` became `tank[0..6]`).
pub(crate) fn remap_pipe(te: &mut TagCompound, ctx: &RemapContext<'_>) -> Result<(), RemapError> {
    // The placement item id.
    let pipe_id = nav::require_number(te, "pipeId", &[TagKind::Int])? as i32;
    let new_pipe_id = match ctx.map.item_target(pipe_id) {
        Some(MapTarget::Id(new_id)) => *new_id,
        Some(MapTarget::ByDamage(_)) => return Err(RemapError::LiquidDamageSplit(pipe_id)),
        None => return Err(RemapError::UnmappedItem(pipe_id)),
    };
    te.insert("pipeId", Tag::Int(new_pipe_id));

    // Remap liquid ids in both tank generations.
    for tank_name in OLD_TANK_NAMES {
        if let Some(tank) = nav::optional_compound_mut(te, tank_name)? {
            remap_liquid_id(tank, ctx, "liquidId")?;
        }
    }
    for tank_name in NEW_TANK_NAMES {
        if let Some(tank) = nav::optional_compound_mut(te, tank_name)? {
            remap_liquid_id(tank, ctx, "Id")?;
        }
    }

    // Synthesize each missing new-generation tank from its old counterpart.
    // The newer schema also carries a capacity the old one lacked.
    for (old_name, new_name) in OLD_TANK_NAMES.into_iter().zip(NEW_TANK_NAMES) {
        if te.contains_key(new_name) {
            continue;
        }
        let Some(old_tank) = nav::optional_compound_mut(te, old_name)? else {
            continue;
        };

        let id = nav::optional_number(old_tank, "liquidId", &[TagKind::Short])?.unwrap_or(0);
        if id == 0 {
            continue;
        }
        let qty = nav::require_number(old_tank, "qty", &[TagKind::Short])?;

        let mut new_tank = TagCompound::new();
        new_tank.insert("Id", Tag::Short(id as i16));
        new_tank.insert("Amount", Tag::Int(qty as i32));
        new_tank.insert("capacity", Tag::Int(DEFAULT_TANK_CAPACITY));
        te.insert(new_name, new_tank);
    }

    // Traveling items: remap each, and split the single `orientation` field
    // into the newer input/output pair. Copying one direction to both is
    // imprecise for corner pipes; accepted data loss.
    if let Some(travelers) = nav::optional_compound_list_mut(te, "travelingEntities")? {
        for traveler in travelers.compounds_mut() {
            if let Some(item) = nav::optional_compound_mut(traveler, "Item")? {
                remap_item_compound(item, ctx)?;
            }
            let orientation = nav::optional_number(traveler, "orientation", &[TagKind::Int])?;
            if let Some(orientation) = orientation {
                for direction_key in ["input", "output"] {
                    if !traveler.contains_key(direction_key) {
                        traveler.insert(direction_key, Tag::Int(orientation as i32));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Tanks moved their liquid id from a top-level `liquidId` to an `Id` inside
/// a nested `tank` compound. Remap whichever shapes are present, and
/// synthesize the nested form from the flat one when it is missing.
pub(crate) fn remap_tank(te: &mut TagCompound, ctx: &RemapContext<'_>) -> Result<(), RemapError> {
    remap_liquid_id(te, ctx, "liquidId")?;

    match nav::optional_compound_mut(te, "tank")? {
        Some(tank) => remap_liquid_id(tank, ctx, "Id")?,
        None => {
            // The liquidId here has already been remapped above.
            let id =
                nav::optional_number(te, "liquidId", &[TagKind::Int, TagKind::Short])?.unwrap_or(0);
            if id != 0 {
                let mut tank = TagCompound::new();
                tank.insert("Id", Tag::Short(id as i16));
                te.insert("tank", tank);
            }
        }
    }
    Ok(())
}

/// Combustion engines track fuel and coolant ids plus one inventory slot;
/// the newer schema nests the ids in `fuelTank`/`coolantTank` compounds.
pub(crate) fn remap_engine(te: &mut TagCompound, ctx: &RemapContext<'_>) -> Result<(), RemapError> {
    remap_liquid_id(te, ctx, "liquidId")?;
    remap_liquid_id(te, ctx, "coolantId")?;

    if let Some(item) = nav::optional_compound_mut(te, "itemInInventory")? {
        remap_item_compound(item, ctx)?;
    }

    for tank_name in ["fuelTank", "coolantTank"] {
        if let Some(tank) = nav::optional_compound_mut(te, tank_name)? {
            remap_liquid_id(tank, ctx, "Id")?;
        }
    }
    Ok(())
}

/// Fillers moved from a sparse variable-length `Items` list (each element
/// carrying its own `Slot`) to a dense fixed list of 36 slots. Gather from
/// whichever shape is present, remap, and emit the dense form with slot
/// bytes that agree with each item's position.
pub(crate) fn remap_filler(te: &mut TagCompound, ctx: &RemapContext<'_>) -> Result<(), RemapError> {
    const FILLER_SLOTS: usize = 36;

    let Some(list) = nav::optional_compound_list_mut(te, "Items")? else {
        return Ok(());
    };

    let mut slots: Vec<Option<TagCompound>> = vec![None; FILLER_SLOTS];
    let entries: Vec<TagCompound> = std::mem::take(list).into_iter().filter_map(|tag| {
        match tag {
            Tag::Compound(compound) => Some(compound),
            _ => None,
        }
    }).collect();

    for (position, mut item) in entries.into_iter().enumerate() {
        if item.is_empty() {
            continue;
        }
        remap_item_compound(&mut item, ctx)?;

        match nav::optional_number(&item, "Slot", &[TagKind::Byte])? {
            Some(slot) => {
                let index = usize::try_from(slot)
                    .ok()
                    .filter(|&index| index < FILLER_SLOTS)
                    .ok_or(RemapError::SlotOutOfRange(slot))?;
                slots[index] = Some(item);
            }
            None => {
                if position >= FILLER_SLOTS {
                    return Err(RemapError::SlotOutOfRange(position as i64));
                }
                item.insert("Slot", Tag::Byte(position as i8));
                slots[position] = Some(item);
            }
        }
    }

    let rebuilt = TagList::from_compounds(
        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_default()),
    );
    te.insert("Items", Tag::List(rebuilt));
    Ok(())
}

/// Refineries hold three tanks whose names changed across generations, plus
/// two top-level in-GUI filter ids.
pub(crate) fn remap_refinery(
    te: &mut TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    for slot_name in ["result", "slot1", "slot2"] {
        if let Some(slot) = nav::optional_compound_mut(te, slot_name)? {
            remap_liquid_id(slot, ctx, "liquidId")?;
        }
    }
    for slot_name in ["result", "ingredient1", "ingredient2"] {
        if let Some(slot) = nav::optional_compound_mut(te, slot_name)? {
            remap_liquid_id(slot, ctx, "Id")?;
        }
    }
    for key in ["filters_0", "filters_1"] {
        remap_liquid_id(te, ctx, key)?;
    }
    Ok(())
}

/// Assembly tables store input items and previously chosen outputs in two
/// separate lists.
pub(crate) fn remap_assembly_table(
    te: &mut TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    remap_inventory_list(te, "items", ctx)?;
    remap_inventory_list(te, "planned", ctx)
}
