//! Thermal Expansion machines and energy conduits.
//!
//! Machines kept their data but changed tile-entity kind, several key
//! names, and where redstone control lives. Energy conduits became parts
//! inside a multipart container and are rebuilt wholesale.

use worldshift_nbt::{Tag, TagCompound, TagList};

use crate::transformer::remap_inventory_list;
use crate::{nav, RemapContext, RemapError, Transformer};


const MACHINE_KINDS: [(&str, &str); 9] = [
    ("thermalexpansion.factory.RockGen", "cofh.thermalexpansion.RockGen"),
    ("thermalexpansion.factory.Furnace", "cofh.thermalexpansion.Furnace"),
    ("thermalexpansion.factory.Smelter", "cofh.thermalexpansion.Smelter"),
    ("thermalexpansion.factory.Pulverizer", "cofh.thermalexpansion.Pulverizer"),
    ("thermalexpansion.factory.IceGen", "cofh.thermalexpansion.IceGen"),
    ("thermalexpansion.factory.WaterGen", "cofh.thermalexpansion.WaterGen"),
    ("thermalexpansion.factory.Crucible", "cofh.thermalexpansion.Crucible"),
    ("thermalexpansion.factory.Sawmill", "cofh.thermalexpansion.Sawmill"),
    // The filler became the transposer.
    ("thermalexpansion.factory.Filler", "cofh.thermalexpansion.Transposer"),
];

pub fn transformers() -> Vec<Transformer> {
    let mut ret = Vec::new();
    for (old_kind, new_kind) in MACHINE_KINDS {
        ret.push(Transformer::Machine147 { old_kind, new_kind });
    }
    ret.push(Transformer::EnergyConduit);
    ret
}

/// Migrates one machine to the newer schema: new kind string, renamed keys,
/// item `slot` keys capitalized, redstone control relocated under `RS`, and
/// the inventory remapped.
pub(crate) fn remap_machine(
    te: &mut TagCompound,
    new_kind: &str,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    te.insert("id", new_kind);

    for (old_name, new_name) in [
        ("inventory", "Inventory"),
        ("side.array", "SideCache"),
        ("side.facing", "Facing"),
        ("flag.active", "Active"),
    ] {
        te.rename(old_name, new_name);
    }

    if let Some(inventory) = nav::optional_compound_list_mut(te, "Inventory")? {
        for item in inventory.compounds_mut() {
            item.rename("slot", "Slot");
        }
    }

    // red.disable/red.state moved into an RS compound as Disable/Setting.
    if nav::optional_compound_mut(te, "RS")?.is_none() {
        te.insert("RS", TagCompound::new());
    }
    for (old_name, new_name) in [("red.disable", "Disable"), ("red.state", "Setting")] {
        if let Some(value) = te.remove(old_name) {
            if let Some(rs) = nav::optional_compound_mut(te, "RS")? {
                rs.insert(new_name, value);
            }
        }
    }

    remap_inventory_list(te, "Inventory", ctx)
}

/// Rebuilds an energy conduit as a `savedMultipart` tile entity holding one
/// conduit part, carrying the side configuration across and defaulting the
/// fields the old schema never stored.
pub(crate) fn rebuild_energy_conduit(te: &mut TagCompound) -> Result<(), RemapError> {
    let coords: Vec<(String, Tag)> = ["z", "y", "x"]
        .into_iter()
        .map(|name| {
            te.get(name)
                .cloned()
                .map(|tag| (name.to_owned(), tag))
                .ok_or_else(|| RemapError::MissingChild(name.to_owned()))
        })
        .collect::<Result<_, _>>()?;

    let side_types = match te.get("side.array") {
        Some(Tag::ByteArray(bytes)) => bytes.clone(),
        Some(tag) => {
            return Err(RemapError::WrongKind {
                name:     "side.array".to_owned(),
                expected: "ByteArray".to_owned(),
                found:    tag.kind(),
            });
        }
        None => return Err(RemapError::MissingChild("side.array".to_owned())),
    };

    te.clear();
    te.insert("id", "savedMultipart");

    let mut part = TagCompound::new();
    part.insert("id", "ConduitEnergy0");

    let mut rs = TagCompound::new();
    rs.insert("Disable", Tag::Byte(0));
    rs.insert("Setting", Tag::Byte(1));
    rs.insert("Powered", Tag::Byte(0));
    part.insert("RS", rs);

    part.insert("Tracker", Tag::Byte(0));
    part.insert("Energy", Tag::Int(0));
    part.insert("SideType", Tag::ByteArray(side_types));
    part.insert("hasServo", Tag::Byte(0));
    part.insert("Mode", Tag::Byte(0));
    part.insert("SubType", Tag::Byte(0));
    part.insert("SideMode", Tag::ByteArray(vec![1; 6]));

    te.insert("parts", Tag::List(TagList::from_compounds([part])));

    for (name, tag) in coords {
        te.insert(name, tag);
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
    fn machine_migration_renames_and_relocates() {
        let mut item = TagCompound::new();
        item.insert("id", Tag::Short(4));
        item.insert("slot", Tag::Byte(2));

        let mut te = TagCompound::new();
        te.insert("id", "thermalexpansion.factory.Pulverizer");
        te.insert("inventory", Tag::List(TagList::from_compounds([item])));
        te.insert("side.facing", Tag::Byte(3));
        te.insert("red.disable", Tag::Byte(0));
        te.insert("red.state", Tag::Byte(1));

        let map = ctx_map(&[(4, 44)]);
        let ctx = RemapContext {
            map:          &map,
            transformers: &[],
        };
        remap_machine(&mut te, "cofh.thermalexpansion.Pulverizer", &ctx).unwrap();

        assert_eq!(
            te.get("id"),
            Some(&Tag::String("cofh.thermalexpansion.Pulverizer".to_owned())),
        );
        assert_eq!(te.get("Facing"), Some(&Tag::Byte(3)));
        assert!(te.get("side.facing").is_none());
        assert!(te.get("red.disable").is_none());
        assert!(te.get("red.state").is_none());

        let rs = te.get("RS").and_then(Tag::as_compound).unwrap();
        assert_eq!(rs.get("Disable"), Some(&Tag::Byte(0)));
        assert_eq!(rs.get("Setting"), Some(&Tag::Byte(1)));

        let inventory = te.get("Inventory").and_then(Tag::as_list).unwrap();
        let item = inventory.compounds().next().unwrap();
        assert_eq!(item.get("Slot"), Some(&Tag::Byte(2)));
        assert_eq!(item.get("id"), Some(&Tag::Short(44)));
    }

    #[test]
    fn energy_conduit_becomes_a_saved_multipart() {
        let mut te = TagCompound::new();
        te.insert("id", "thermalexpansion.transport.ConduitEnergy");
        te.insert("x", Tag::Int(10));
        te.insert("y", Tag::Int(64));
        te.insert("z", Tag::Int(-5));
        te.insert("side.array", Tag::ByteArray(vec![0, 1, 0, 1, 0, 1]));
        te.insert("Energy", Tag::Int(12));

        rebuild_energy_conduit(&mut te).unwrap();

        assert_eq!(te.get("id"), Some(&Tag::String("savedMultipart".to_owned())));
        assert_eq!(te.get("x"), Some(&Tag::Int(10)));
        assert_eq!(te.get("y"), Some(&Tag::Int(64)));
        assert_eq!(te.get("z"), Some(&Tag::Int(-5)));

        let parts = te.get("parts").and_then(Tag::as_list).unwrap();
        let part = parts.compounds().next().unwrap();
        assert_eq!(part.get("id"), Some(&Tag::String("ConduitEnergy0".to_owned())));
        assert_eq!(
            part.get("SideType"),
            Some(&Tag::ByteArray(vec![0, 1, 0, 1, 0, 1])),
        );
        assert_eq!(part.get("SideMode"), Some(&Tag::ByteArray(vec![1; 6])));
        let rs = part.get("RS").and_then(Tag::as_compound).unwrap();
        assert_eq!(rs.get("Setting"), Some(&Tag::Byte(1)));
    }
}
