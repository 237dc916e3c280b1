//! Railcraft multiblocks, minecarts, loaders, and track.
//!
//! Three schema generations coexist in the wild: the oldest stores liquids
//! as flat id/quantity keys, the middle one as a `tanks` list of compounds,
//! and inventories wandered between a shared `Items` list and
//! structure-specific names. Painted metal posts are not converted; their
//! colour is accepted data loss (they turn unpainted).

use log::debug;

use worldshift_mapping::MapTarget;
use worldshift_nbt::{Tag, TagCompound, TagKind, TagList};

use crate::{nav, remap_item_compound, RemapContext, RemapError, Transformer};


const MINECART_RENAMES: [(&str, &str); 12] = [
    ("entity.cart.basic", "Railcraft.cart.basic"),
    ("entity.cart.furnace", "Railcraft.cart.furnace"),
    ("entity.cart.chest", "railcraft.railcraft.cart.chest"),
    ("Railcraft.cart.chest", "Railcraft.railcraft.cart.chest"),
    ("Tankcart", "Railcraft.railcraft.cart.tank"),
    ("Railcraft.cart.tank", "Railcraft.railcraft.cart.tank"),
    ("EnergyCart", "Railcraft.cart.energy"),
    ("Workcart", "Railcraft.cart.work"),
    ("Anchorcart", "Railcraft.cart.anchor"),
    ("TNTcart", "Railcraft.cart.tnt"),
    ("Railcraft.cart.track.relayer", "Railcraft.railcraft.cart.track.relayer"),
    ("Railcraft.cart.undercutter", "Railcraft.railcraft.cart.undercutter"),
];

pub fn transformers() -> Vec<Transformer> {
    let mut ret = Vec::new();

    // Multiblock structures renamed their inventories.
    for kind in [
        "RCCokeOvenTile",
        "RCBlastFurnaceTile",
        "RCRockCrusherTile",
        "RCSteamOvenTile",
        "RCWaterTankTile",
    ] {
        ret.push(Transformer::InventoryRename {
            kind,
            new_name: "invStructure",
        });
    }
    ret.push(Transformer::InventoryRename {
        kind:     "RCRollingMachineTile",
        new_name: "Crafting",
    });
    for kind in [
        "RCIronTankWallTile",
        "RCIronTankGaugeTile",
        "RCIronTankValveTile",
        "RCBoilerFireboxLiquidTile",
        "RCBoilerFireboxSolidTile",
    ] {
        ret.push(Transformer::InventoryRename {
            kind,
            new_name: "inv",
        });
    }

    // Flat liquid keys to the tanks-list form.
    for kind in [
        "RCCokeOvenTile",
        "RCIronTankWallTile",
        "RCIronTankGaugeTile",
        "RCIronTankValveTile",
        "RCWaterTankTile",
    ] {
        ret.push(Transformer::LiquidToTank {
            kind,
            id_key:  "liquidId",
            qty_key: "liquidQty",
        });
    }

    // Minecarts renamed across versions.
    for (old_kind, new_kind) in MINECART_RENAMES {
        ret.push(Transformer::EntityRename { old_kind, new_kind });
    }

    // Carts whose contents need remapping.
    for kind in [
        "Railcraft.railcraft.cart.chest",
        "Railcraft.railcraft.cart.tank",
        "Railcraft.railcraft.cart.energy",
        "Railcraft.railcraft.cart.track.relayer",
        "Railcraft.railcraft.cart.undercutter",
    ] {
        ret.push(Transformer::EntityInventory {
            kind,
            list_name: "Items",
        });
    }
    for kind in [
        "Railcraft.railcraft.cart.track.relayer",
        "Railcraft.railcraft.cart.undercutter",
    ] {
        ret.push(Transformer::EntityInventory {
            kind,
            list_name: "patternInv",
        });
    }

    ret.push(Transformer::TankCart);
    ret.push(Transformer::EnergyLoader {
        kind: "RCLoaderTileEnergy",
    });
    ret.push(Transformer::EnergyLoader {
        kind: "RCUnloaderTileEnergy",
    });
    ret.push(Transformer::CouplerTrack);
    ret
}

/// Converts the oldest flat liquid representation (`id_key`/`qty_key`) into
/// a one-element `tanks` list, then remaps the id of every tank in the list
/// regardless of which generation produced it.
pub(crate) fn convert_liquid_to_tank(
    compound: &mut TagCompound,
    id_key: &str,
    qty_key: &str,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    if compound.get("tanks").is_none() {
        let liquid_id =
            nav::optional_number(compound, id_key, &[TagKind::Short, TagKind::Int])?.unwrap_or(0);
        let liquid_qty = nav::optional_number(compound, qty_key, &[TagKind::Int])?.unwrap_or(0);

        if liquid_id != 0 {
            let mut tank = TagCompound::new();
            tank.insert("tank", Tag::Byte(0));
            tank.insert("Id", Tag::Short(liquid_id as i16));
            tank.insert("Amount", Tag::Int(liquid_qty as i32));
            compound.insert("tanks", Tag::List(TagList::from_compounds([tank])));

            compound.remove(id_key);
            compound.remove(qty_key);
        }
    }

    if let Some(tanks) = nav::optional_compound_list_mut(compound, "tanks")? {
        for tank in tanks.compounds_mut() {
            let Some(id) = nav::optional_number(tank, "Id", &[TagKind::Short])? else {
                continue;
            };
            let id = id as i32;
            let new_id = match ctx.map.item_target(id) {
                Some(MapTarget::Id(new_id)) => *new_id,
                Some(MapTarget::ByDamage(_)) => return Err(RemapError::LiquidDamageSplit(id)),
                None => return Err(RemapError::UnmappedItem(id)),
            };
            let new_id =
                i16::try_from(new_id).map_err(|_| RemapError::ItemIdOutOfRange(new_id))?;
            tank.insert("Id", Tag::Short(new_id));
        }
    }
    Ok(())
}

/// Reads the inventory from whichever of the new name or the legacy `Items`
/// list is present (preferring the new name), remaps it, and emits it under
/// the new name only.
pub(crate) fn rename_inventory(
    te: &mut TagCompound,
    new_name: &str,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    let mut items: Vec<TagCompound> = Vec::new();
    let mut found = false;
    for list_name in [new_name, "Items"] {
        if let Some(list) = nav::optional_compound_list_mut(te, list_name)? {
            for item in list.compounds_mut() {
                remap_item_compound(item, ctx)?;
                items.push(item.clone());
            }
            found = true;
            break;
        }
    }
    if !found {
        debug!("no inventory list to rename to {new_name}, emitting an empty one");
    }

    te.remove(new_name);
    te.remove("Items");
    te.insert(new_name, Tag::List(TagList::from_compounds(items)));
    Ok(())
}

/// Reshapes an inventory from one shared `Items` list into several named
/// lists (or re-reads the named lists if the reshape already happened).
/// `slot_mapping[i]` gives the destination list and slot for old slot `i`.
/// Ids are not remapped here: the shared `Items` list is the registered
/// container transformer's responsibility, and reshaping the same items
/// twice in one pass would translate their ids twice.
fn shuffle_inventory(
    compound: &mut TagCompound,
    slot_mapping: &[(&str, i8)],
) -> Result<(), RemapError> {
    let mut items: Vec<Option<TagCompound>> = vec![None; slot_mapping.len()];

    // Gather from the old shared list only when none of the new lists exist.
    let new_exists = slot_mapping
        .iter()
        .any(|(name, _)| compound.contains_key(name));
    if !new_exists {
        if let Some(list) = nav::optional_compound_list_mut(compound, "Items")? {
            for item in list.compounds_mut() {
                let Some(slot) = nav::optional_number(item, "Slot", &[TagKind::Byte])? else {
                    continue;
                };
                if let Ok(slot) = usize::try_from(slot) {
                    if slot < items.len() {
                        items[slot] = Some(item.clone());
                    }
                }
            }
        }
    }

    // Gather anything already in the new named lists.
    for (index, (list_name, slot_number)) in slot_mapping.iter().enumerate() {
        if let Some(list) = nav::optional_compound_list_mut(compound, list_name)? {
            for item in list.compounds_mut() {
                let Some(slot) = nav::optional_number(item, "Slot", &[TagKind::Byte])? else {
                    continue;
                };
                if slot == i64::from(*slot_number) {
                    items[index] = Some(item.clone());
                }
            }
        }
    }

    // Replace the old structures wholesale. Every destination list is
    // created even when empty, so a later run can tell the reshaped form
    // from the legacy one.
    compound.remove("Items");
    for (list_name, _) in slot_mapping {
        compound.remove(list_name);
    }
    for (list_name, _) in slot_mapping {
        if !compound.contains_key(list_name) {
            compound.insert(*list_name, Tag::List(TagList::with_kind(TagKind::Compound)));
        }
    }

    for (index, (list_name, slot_number)) in slot_mapping.iter().enumerate() {
        let Some(mut item) = items[index].take() else {
            continue;
        };
        item.insert("Slot", Tag::Byte(*slot_number));

        if let Some(list) = nav::optional_compound_list_mut(compound, list_name)? {
            let _ = list.push(Tag::Compound(item));
        }
    }
    Ok(())
}

/// Tank carts replaced a flat `Liquid`/`Tank` pair with the tanks-list
/// form, split their three-slot `Items` list into `invFilter` and
/// `invBucket`, and then renamed `invBucket` back to `Items` one version
/// later.
pub(crate) fn remap_tank_cart(
    entity: &mut TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    convert_liquid_to_tank(entity, "Liquid", "Tank", ctx)?;

    // Already reshaped (either the invFilter/invBucket generation or the
    // final invFilter + Items one): the slots are in place. The filter and
    // bucket lists are remapped here because no container transformer is
    // registered for them; the shared Items list already was.
    if entity.contains_key("invFilter") || entity.contains_key("invBucket") {
        for list_name in ["invFilter", "invBucket"] {
            crate::transformer::remap_inventory_list(entity, list_name, ctx)?;
        }
        entity.rename("invBucket", "Items");
        return Ok(());
    }

    shuffle_inventory(entity, &[("invFilter", 0), ("invBucket", 0), ("invBucket", 1)])?;
    entity.rename("invBucket", "Items");
    Ok(())
}

/// Energy loaders and unloaders remap their inventory and narrow the legacy
/// `facing` short into a `direction` byte.
pub(crate) fn remap_energy_loader(
    te: &mut TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    if let Some(list) = nav::optional_compound_list_mut(te, "Items")? {
        for item in list.compounds_mut() {
            remap_item_compound(item, ctx)?;
        }
    }

    let facing = nav::optional_number(te, "facing", &[TagKind::Short])?;
    if let Some(facing) = facing {
        if te.get("direction").is_none() {
            te.insert("direction", Tag::Byte(facing as i8));
            te.remove("facing");
        }
    }
    Ok(())
}

/// Decoupler track lost its own id: both coupler and decoupler share one id
/// now, distinguished by a `decouple` byte.
pub(crate) fn coalesce_coupler_track(te: &mut TagCompound) -> Result<(), RemapError> {
    let track_id = nav::optional_number(te, "trackId", &[TagKind::Int])?;
    if track_id == Some(23) {
        te.insert("trackId", Tag::Int(22));
        te.insert("decouple", Tag::Byte(1));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use worldshift_mapping::{MapInfo, MapTarget};

    use super::*;

    fn ctx_map(items: &[(i32, i32)]) -> MapInfo {
        let items: HashMap<i32, MapTarget> = items
            .iter()
            .map(|&(source, target)| (source, MapTarget::Id(target)))
            .collect();
        MapInfo::from_tables(HashMap::new(), items)
    }

    #[test]
    fn flat_liquid_becomes_a_tanks_list() {
        let mut te = TagCompound::new();
        te.insert("id", "RCCokeOvenTile");
        te.insert("liquidId", Tag::Short(8));
        te.insert("liquidQty", Tag::Int(4000));

        let map = ctx_map(&[(8, 80)]);
        let ctx = RemapContext {
            map:          &map,
            transformers: &[],
        };
        convert_liquid_to_tank(&mut te, "liquidId", "liquidQty", &ctx).unwrap();

        assert!(te.get("liquidId").is_none());
        assert!(te.get("liquidQty").is_none());
        let tanks = te.get("tanks").and_then(Tag::as_list).unwrap();
        let tank = tanks.compounds().next().unwrap();
        assert_eq!(tank.get("tank"), Some(&Tag::Byte(0)));
        assert_eq!(tank.get("Id"), Some(&Tag::Short(80)));
        assert_eq!(tank.get("Amount"), Some(&Tag::Int(4000)));
    }

    #[test]
    fn existing_tanks_list_only_gets_ids_remapped() {
        let mut tank = TagCompound::new();
        tank.insert("tank", Tag::Byte(0));
        tank.insert("Id", Tag::Short(8));
        tank.insert("Amount", Tag::Int(250));

        let mut te = TagCompound::new();
        te.insert("id", "RCCokeOvenTile");
        te.insert("tanks", Tag::List(TagList::from_compounds([tank])));

        let map = ctx_map(&[(8, 8)]);
        let ctx = RemapContext {
            map:          &map,
            transformers: &[],
        };

        let before = te.clone();
        convert_liquid_to_tank(&mut te, "liquidId", "liquidQty", &ctx).unwrap();
        assert_eq!(te, before);
    }

    #[test]
    fn energy_loader_narrows_facing_to_direction() {
        let mut te = TagCompound::new();
        te.insert("id", "RCLoaderTileEnergy");
        te.insert("facing", Tag::Short(4));

        let map = ctx_map(&[]);
        let ctx = RemapContext {
            map:          &map,
            transformers: &[],
        };
        remap_energy_loader(&mut te, &ctx).unwrap();

        assert!(te.get("facing").is_none());
        assert_eq!(te.get("direction"), Some(&Tag::Byte(4)));

        let after_first = te.clone();
        remap_energy_loader(&mut te, &ctx).unwrap();
        assert_eq!(te, after_first);
    }

    #[test]
    fn decoupler_track_coalesces_into_coupler_plus_flag() {
        let mut te = TagCompound::new();
        te.insert("id", "RailcraftTrackTile");
        te.insert("trackId", Tag::Int(23));

        coalesce_coupler_track(&mut te).unwrap();
        assert_eq!(te.get("trackId"), Some(&Tag::Int(22)));
        assert_eq!(te.get("decouple"), Some(&Tag::Byte(1)));

        let after_first = te.clone();
        coalesce_coupler_track(&mut te).unwrap();
        assert_eq!(te, after_first);
    }

    #[test]
    fn inventory_rename_prefers_the_new_list() {
        let mut item = TagCompound::new();
        item.insert("id", Tag::Short(4));

        let mut te = TagCompound::new();
        te.insert("id", "RCCokeOvenTile");
        te.insert("Items", Tag::List(TagList::from_compounds([item])));

        let map = ctx_map(&[(4, 40)]);
        let ctx = RemapContext {
            map:          &map,
            transformers: &[],
        };
        rename_inventory(&mut te, "invStructure", &ctx).unwrap();

        assert!(te.get("Items").is_none());
        let inv = te.get("invStructure").and_then(Tag::as_list).unwrap();
        assert_eq!(inv.compounds().next().unwrap().get("id"), Some(&Tag::Short(40)));
    }

    #[test]
    fn tank_cart_reshape_is_idempotent() {
        let mut bucket = TagCompound::new();
        bucket.insert("id", Tag::Short(325));
        bucket.insert("Slot", Tag::Byte(1));

        let mut cart = TagCompound::new();
        cart.insert("id", "Railcraft.railcraft.cart.tank");
        cart.insert("Liquid", Tag::Short(8));
        cart.insert("Tank", Tag::Int(2000));
        cart.insert("Items", Tag::List(TagList::from_compounds([bucket])));

        let map = ctx_map(&[(8, 8), (325, 325)]);
        let ctx = RemapContext {
            map:          &map,
            transformers: &[],
        };

        remap_tank_cart(&mut cart, &ctx).unwrap();
        let tanks = cart.get("tanks").and_then(Tag::as_list).unwrap();
        assert_eq!(tanks.len(), 1);
        // Old slot 1 is the first bucket slot, which lands in Items
        // (the invBucket list under its final name).
        let buckets = cart.get("Items").and_then(Tag::as_list).unwrap();
        assert_eq!(
            buckets.compounds().next().unwrap().get("Slot"),
            Some(&Tag::Byte(0)),
        );

        let after_first = cart.clone();
        remap_tank_cart(&mut cart, &ctx).unwrap();
        assert_eq!(cart, after_first);
    }
}
