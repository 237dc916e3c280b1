//! Conversion of numeric liquid references to symbolic fluid names.
//!
//! The older schema identifies a tank's contents by an (id, metadata) pair
//! of shorts; the newer one carries a `FluidName` string. The id → name
//! lookup is provided by the migration profile. One id splits by metadata:
//! the combined redstone/ender liquid maps to `redstone` at metadata 0 and
//! `ender` at 64.

use std::collections::HashMap;
use std::sync::Arc;

#[cfg(test)]
use worldshift_nbt::Tag;
use worldshift_nbt::{TagCompound, TagKind};

use crate::{nav, RemapError, Transformer};


/// The frozen liquid id → fluid name lookup.
#[derive(Debug)]
pub struct FluidNames {
    names: HashMap<i32, String>,
}

impl FluidNames {
    pub fn new(names: HashMap<i32, String>) -> Self {
        Self { names }
    }

    /// Resolves an (id, metadata) pair to a fluid name. Unknown ids and
    /// unknown metadata on a metadata-split id are fatal.
    pub fn name_for(&self, id: i32, meta: i32) -> Result<&str, RemapError> {
        let name = self
            .names
            .get(&id)
            .ok_or(RemapError::UnknownLiquid(id))?;
        if name == "teliquid" {
            return match meta {
                0 => Ok("redstone"),
                64 => Ok("ender"),
                _ => Err(RemapError::UnknownLiquidMeta { id, meta }),
            };
        }
        Ok(name)
    }
}

/// All fluid-name transformers, mirroring the machines whose tanks still
/// carry numeric ids.
pub fn transformers(names: &Arc<FluidNames>) -> Vec<Transformer> {
    let mut ret = Vec::new();

    for kind in [
        "net.minecraft.src.buildcraft.transport.GenericPipe",
        "net.minecraft.src.buildcraft.GenericPipe",
    ] {
        ret.push(Transformer::FluidPipe {
            kind,
            names: Arc::clone(names),
        });
    }

    ret.push(Transformer::FluidTank {
        kind:       "net.minecraft.src.buildcraft.factory.TileTank",
        tank_name:  Some("tank"),
        id_key:     "Id",
        meta_key:   "Meta",
        result_key: "FluidName",
        names:      Arc::clone(names),
    });

    for kind in [
        "net.minecraft.src.buildcraft.energy.Engine",
        "RCEngineSteamHobby",
        "RCEngineSteamLow",
        "RCEngineSteamHigh",
    ] {
        ret.push(Transformer::FluidMachineTanks {
            kind,
            names: Arc::clone(names),
        });
    }

    ret.push(Transformer::FluidRefinery {
        names: Arc::clone(names),
    });

    for kind in [
        "RCIronTankWallTile",
        "RCIronTankGaugeTile",
        "RCIronTankValveTile",
        "RCCokeOvenTile",
        "RCWaterTankTile",
        "RCBoilerFireboxLiquidTile",
        "RCBoilerFireboxSolidTile",
    ] {
        ret.push(Transformer::FluidMachineTanks {
            kind,
            names: Arc::clone(names),
        });
    }

    for kind in ["Railcraft.railcraft.cart.tank", "Railcraft.cart.tank"] {
        ret.push(Transformer::FluidCartTanks {
            kind,
            names: Arc::clone(names),
        });
    }

    // Forestry engines track their heating and fuel tanks plus the liquid
    // currently burning.
    for tank_name in ["FuelSlot", "HeatingSlot"] {
        ret.push(Transformer::FluidTank {
            kind:       "forestry.Engine",
            tank_name:  Some(tank_name),
            id_key:     "liquidId",
            meta_key:   "liquidMeta",
            result_key: "FluidName",
            names:      Arc::clone(names),
        });
    }
    ret.push(Transformer::FluidTank {
        kind:       "forestry.Engine",
        tank_name:  None,
        id_key:     "CurrentLiquidId",
        meta_key:   "CurrentLiquidMeta",
        result_key: "currentFluid",
        names:      Arc::clone(names),
    });

    ret.push(Transformer::FluidForestryMachine {
        names: Arc::clone(names),
    });

    ret.push(Transformer::FluidTank {
        kind:       "forestry.Farm",
        tank_name:  Some("LiquidTank"),
        id_key:     "liquidId",
        meta_key:   "liquidMeta",
        result_key: "FluidName",
        names:      Arc::clone(names),
    });

    ret
}

/// Converts one tank compound in place: requires both the id and metadata
/// keys to be present, writes the name under `result_key`, and removes the
/// numeric pair. A zero id means an empty tank and is left untouched.
pub(crate) fn convert_tank_compound(
    tank: &mut TagCompound,
    names: &FluidNames,
    id_key: &str,
    meta_key: &str,
    result_key: &str,
) -> Result<(), RemapError> {
    let numeric = [TagKind::Short, TagKind::Int];
    let (Some(id), Some(meta)) = (
        nav::optional_number(tank, id_key, &numeric)?,
        nav::optional_number(tank, meta_key, &numeric)?,
    ) else {
        return Ok(());
    };

    if id == 0 {
        return Ok(());
    }

    let name = names.name_for(id as i32, meta as i32)?.to_owned();
    tank.insert(result_key, name);
    tank.remove(id_key);
    tank.remove(meta_key);
    Ok(())
}

/// Converts the tank at `tank_name` (or the tile entity itself, for
/// machines that keep the keys top-level).
pub(crate) fn remap_named_tank(
    te: &mut TagCompound,
    tank_name: Option<&str>,
    id_key: &str,
    meta_key: &str,
    result_key: &str,
    names: &FluidNames,
) -> Result<(), RemapError> {
    match tank_name {
        None => convert_tank_compound(te, names, id_key, meta_key, result_key),
        Some(tank_name) => {
            if let Some(tank) = nav::optional_compound_mut(te, tank_name)? {
                convert_tank_compound(tank, names, id_key, meta_key, result_key)?;
            }
            Ok(())
        }
    }
}

/// Liquid pipes: one tank per side plus the center.
pub(crate) fn remap_pipe_tanks(
    te: &mut TagCompound,
    names: &FluidNames,
) -> Result<(), RemapError> {
    for tank_name in [
        "tank[0]", "tank[1]", "tank[2]", "tank[3]", "tank[4]", "tank[5]", "tank[6]",
    ] {
        remap_named_tank(te, Some(tank_name), "Id", "Meta", "FluidName", names)?;
    }
    Ok(())
}

/// Engines and multiblocks: `fuelTank`/`coolantTank` compounds and the
/// tanks-list form.
pub(crate) fn remap_machine_tanks(
    te: &mut TagCompound,
    names: &FluidNames,
) -> Result<(), RemapError> {
    for tank_name in ["fuelTank", "coolantTank"] {
        remap_named_tank(te, Some(tank_name), "Id", "Meta", "FluidName", names)?;
    }
    convert_tank_list(te, names)
}

pub(crate) fn remap_cart_tanks(
    entity: &mut TagCompound,
    names: &FluidNames,
) -> Result<(), RemapError> {
    convert_tank_list(entity, names)
}

fn convert_tank_list(compound: &mut TagCompound, names: &FluidNames) -> Result<(), RemapError> {
    if let Some(tanks) = nav::optional_compound_list_mut(compound, "tanks")? {
        for tank in tanks.compounds_mut() {
            convert_tank_compound(tank, names, "Id", "Meta", "FluidName")?;
        }
    }
    Ok(())
}

/// Refinery tanks, plus a check that the legacy in-GUI filters are unset:
/// converting a nonzero filter id has never been implemented.
pub(crate) fn remap_refinery_tanks(
    te: &mut TagCompound,
    names: &FluidNames,
) -> Result<(), RemapError> {
    for tank_name in ["ingredient1", "ingredient2", "result"] {
        remap_named_tank(te, Some(tank_name), "Id", "Meta", "FluidName", names)?;
    }

    for key in ["filters_0", "filters_1"] {
        if let Some(filter) = nav::optional_number(te, key, &[TagKind::Int])? {
            if filter != 0 {
                return Err(RemapError::UnsupportedFilter(filter));
            }
        }
    }
    Ok(())
}

/// Forestry machines nest their tanks inside the `Machine` compound and
/// still use the old `quantity` key, which becomes `Amount`.
pub(crate) fn remap_forestry_machine(
    te: &mut TagCompound,
    names: &FluidNames,
) -> Result<(), RemapError> {
    if let Some(machine) = nav::optional_compound_mut(te, "Machine")? {
        for tank_name in ["ProductTank", "ResourceTank"] {
            if let Some(tank) = nav::optional_compound_mut(machine, tank_name)? {
                convert_tank_compound(tank, names, "liquidId", "liquidMeta", "FluidName")?;
                tank.rename("quantity", "Amount");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> FluidNames {
        let mut map = HashMap::new();
        map.insert(8, "water".to_owned());
        map.insert(10, "lava".to_owned());
        map.insert(4064, "teliquid".to_owned());
        FluidNames::new(map)
    }

    fn tank(id: i16, meta: i16) -> TagCompound {
        let mut compound = TagCompound::new();
        compound.insert("Id", Tag::Short(id));
        compound.insert("Meta", Tag::Short(meta));
        compound.insert("Amount", Tag::Int(1000));
        compound
    }

    #[test]
    fn numeric_pair_becomes_a_fluid_name() {
        let mut compound = tank(8, 0);
        convert_tank_compound(&mut compound, &names(), "Id", "Meta", "FluidName").unwrap();

        assert!(compound.get("Id").is_none());
        assert!(compound.get("Meta").is_none());
        assert_eq!(
            compound.get("FluidName"),
            Some(&Tag::String("water".to_owned())),
        );
        assert_eq!(compound.get("Amount"), Some(&Tag::Int(1000)));

        // Once converted there is no numeric pair left, so a second pass
        // changes nothing.
        let after_first = compound.clone();
        convert_tank_compound(&mut compound, &names(), "Id", "Meta", "FluidName").unwrap();
        assert_eq!(compound, after_first);
    }

    #[test]
    fn combined_liquid_splits_by_metadata() {
        let names = names();
        assert_eq!(names.name_for(4064, 0).unwrap(), "redstone");
        assert_eq!(names.name_for(4064, 64).unwrap(), "ender");
        assert!(matches!(
            names.name_for(4064, 32),
            Err(RemapError::UnknownLiquidMeta { id: 4064, meta: 32 }),
        ));
        assert!(matches!(
            names.name_for(9999, 0),
            Err(RemapError::UnknownLiquid(9999)),
        ));
    }

    #[test]
    fn empty_tank_and_half_pairs_are_left_alone() {
        let mut empty = tank(0, 0);
        let before = empty.clone();
        convert_tank_compound(&mut empty, &names(), "Id", "Meta", "FluidName").unwrap();
        assert_eq!(empty, before);

        let mut half = TagCompound::new();
        half.insert("Id", Tag::Short(8));
        let before = half.clone();
        convert_tank_compound(&mut half, &names(), "Id", "Meta", "FluidName").unwrap();
        assert_eq!(half, before);
    }

    #[test]
    fn nonzero_refinery_filter_is_fatal() {
        let mut te = TagCompound::new();
        te.insert("id", "net.minecraft.src.buildcraft.factory.Refinery");
        te.insert("filters_0", Tag::Int(8));

        let err = remap_refinery_tanks(&mut te, &names()).unwrap_err();
        assert!(matches!(err, RemapError::UnsupportedFilter(8)));
    }
}
