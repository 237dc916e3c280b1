use std::sync::Arc;

use worldshift_nbt::{Tag, TagCompound, TagKind, TagList};

use crate::catalog::fluids::FluidNames;
use crate::catalog::{buildcraft, computercraft, fluids, forestry, industrialcraft, railcraft,
                     redpower, thermalexpansion};
use crate::{blocks, nav, remap_item_compound, RemapContext, RemapError};


/// One registered rewrite rule. Transformers are data: each variant carries
/// its configuration, and a single dispatch below routes it to the right
/// traversal surface (chunk, nested item, or player root).
#[derive(Debug, Clone)]
pub enum Transformer {
    /// Rewrites the packed section arrays of every chunk.
    WorldBlocks,
    /// Remaps the items of one tile-entity kind's inventory list.
    TileInventory {
        kind:      &'static str,
        list_name: &'static str,
    },
    /// Remaps the items of one entity kind's inventory list.
    EntityInventory {
        kind:      &'static str,
        list_name: &'static str,
    },
    /// Dropped item entities carry a single nested `Item` compound.
    LooseItem,
    /// Item frames carry an optional nested `Item` compound.
    ItemFrame,
    /// Falling blocks record their block id as either a legacy `Tile` byte
    /// or a `TileID` short; both coalesce into a remapped `TileID`.
    FallingSand,
    /// Remaps the `Inventory` list on each player root.
    PlayerInventory,
    /// Renames an entity kind, structure preserved.
    EntityRename {
        old_kind: &'static str,
        new_kind: &'static str,
    },

    // BuildCraft
    Pipe { kind: &'static str },
    BuildcraftTank,
    BuildcraftEngine,
    Filler,
    Refinery,
    AssemblyTable,

    // Railcraft
    InventoryRename {
        kind:     &'static str,
        new_name: &'static str,
    },
    LiquidToTank {
        kind:    &'static str,
        id_key:  &'static str,
        qty_key: &'static str,
    },
    TankCart,
    EnergyLoader { kind: &'static str },
    CouplerTrack,

    // Thermal Expansion
    Machine147 {
        old_kind: &'static str,
        new_kind: &'static str,
    },
    EnergyConduit,

    // Forestry
    ForestryMachine,
    ForestryTankQuantity,

    // IndustrialCraft
    Cropnalyzer,

    // RedPower
    TubeMachine { kind: &'static str },
    ProjectTableSlotShift,

    // ComputerCraft
    DiskDrive,

    // Numeric liquid ids to symbolic fluid names
    FluidPipe {
        kind:  &'static str,
        names: Arc<FluidNames>,
    },
    FluidTank {
        kind:       &'static str,
        tank_name:  Option<&'static str>,
        id_key:     &'static str,
        meta_key:   &'static str,
        result_key: &'static str,
        names:      Arc<FluidNames>,
    },
    FluidMachineTanks {
        kind:  &'static str,
        names: Arc<FluidNames>,
    },
    FluidCartTanks {
        kind:  &'static str,
        names: Arc<FluidNames>,
    },
    FluidRefinery { names: Arc<FluidNames> },
    FluidForestryMachine { names: Arc<FluidNames> },
}

impl Transformer {
    /// Chunk surface: the packed-block rewriter mutates sections directly;
    /// every other variant dispatches by tile-entity or entity kind.
    pub fn remap_chunk(
        &self,
        chunk: &mut TagCompound,
        ctx: &RemapContext<'_>,
    ) -> Result<(), RemapError> {
        if let Self::WorldBlocks = self {
            return blocks::remap_sections(chunk, ctx.map);
        }

        if let Some(kind) = self.tile_entity_kind() {
            let tile_entities = nav::tile_entities_mut(chunk)?;
            return for_each_matching(tile_entities, kind, |te| self.remap_tile_entity(te, ctx));
        }

        if let Some(kind) = self.entity_kind() {
            let entities = nav::entities_mut(chunk)?;
            return for_each_matching(entities, kind, |entity| self.remap_entity(entity, ctx));
        }

        Ok(())
    }

    /// Item surface: invoked on every item compound after its id has been
    /// translated, enabling nested-container recursion.
    pub fn remap_item(
        &self,
        item: &mut TagCompound,
        ctx: &RemapContext<'_>,
    ) -> Result<(), RemapError> {
        match self {
            Self::Cropnalyzer => industrialcraft::remap_cropnalyzer_item(item, ctx),
            _ => Ok(()),
        }
    }

    /// Player surface: invoked once per player root compound.
    pub fn remap_player(
        &self,
        player: &mut TagCompound,
        ctx: &RemapContext<'_>,
    ) -> Result<(), RemapError> {
        match self {
            Self::PlayerInventory => {
                let inventory = nav::require_compound_list_mut(player, "Inventory")?;
                for item in inventory.compounds_mut() {
                    remap_item_compound(item, ctx)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Liquid surface: reserved. No transformer currently rewrites here.
    pub fn remap_liquid(&self, _liquid: &mut Tag) -> Result<(), RemapError> {
        Ok(())
    }

    fn tile_entity_kind(&self) -> Option<&'static str> {
        match self {
            Self::TileInventory { kind, .. }
            | Self::Pipe { kind }
            | Self::InventoryRename { kind, .. }
            | Self::LiquidToTank { kind, .. }
            | Self::EnergyLoader { kind }
            | Self::TubeMachine { kind }
            | Self::FluidPipe { kind, .. }
            | Self::FluidTank { kind, .. }
            | Self::FluidMachineTanks { kind, .. } => Some(*kind),
            Self::Machine147 { old_kind, .. } => Some(*old_kind),
            Self::BuildcraftTank => Some("net.minecraft.src.buildcraft.factory.TileTank"),
            Self::BuildcraftEngine => Some("net.minecraft.src.buildcraft.energy.Engine"),
            Self::Filler => Some("Filler"),
            Self::Refinery | Self::FluidRefinery { .. } => {
                Some("net.minecraft.src.buildcraft.factory.Refinery")
            }
            Self::AssemblyTable => Some("net.minecraft.src.buildcraft.factory.TileAssemblyTable"),
            Self::CouplerTrack => Some("RailcraftTrackTile"),
            Self::EnergyConduit => Some("thermalexpansion.transport.ConduitEnergy"),
            Self::ForestryMachine | Self::FluidForestryMachine { .. } => Some("forestry.Machine"),
            Self::ForestryTankQuantity => Some("forestry.Engine"),
            Self::ProjectTableSlotShift => Some("RPAdvBench"),
            Self::DiskDrive => Some("diskdrive"),
            _ => None,
        }
    }

    fn entity_kind(&self) -> Option<&'static str> {
        match self {
            Self::EntityInventory { kind, .. } | Self::FluidCartTanks { kind, .. } => Some(*kind),
            Self::EntityRename { old_kind, .. } => Some(*old_kind),
            Self::LooseItem => Some("Item"),
            Self::ItemFrame => Some("ItemFrame"),
            Self::FallingSand => Some("FallingSand"),
            Self::TankCart => Some("Railcraft.railcraft.cart.tank"),
            _ => None,
        }
    }

    fn remap_tile_entity(
        &self,
        te: &mut TagCompound,
        ctx: &RemapContext<'_>,
    ) -> Result<(), RemapError> {
        match self {
            Self::TileInventory { list_name, .. } => remap_inventory_list(te, list_name, ctx),
            Self::Pipe { .. } => buildcraft::remap_pipe(te, ctx),
            Self::BuildcraftTank => buildcraft::remap_tank(te, ctx),
            Self::BuildcraftEngine => buildcraft::remap_engine(te, ctx),
            Self::Filler => buildcraft::remap_filler(te, ctx),
            Self::Refinery => buildcraft::remap_refinery(te, ctx),
            Self::AssemblyTable => buildcraft::remap_assembly_table(te, ctx),
            Self::InventoryRename { new_name, .. } => {
                railcraft::rename_inventory(te, new_name, ctx)
            }
            Self::LiquidToTank { id_key, qty_key, .. } => {
                railcraft::convert_liquid_to_tank(te, id_key, qty_key, ctx)
            }
            Self::EnergyLoader { .. } => railcraft::remap_energy_loader(te, ctx),
            Self::CouplerTrack => railcraft::coalesce_coupler_track(te),
            Self::Machine147 { new_kind, .. } => {
                thermalexpansion::remap_machine(te, new_kind, ctx)
            }
            Self::EnergyConduit => thermalexpansion::rebuild_energy_conduit(te),
            Self::ForestryMachine => forestry::remap_machine(te, ctx),
            Self::ForestryTankQuantity => forestry::rename_tank_quantity(te),
            Self::TubeMachine { .. } => redpower::remap_tube_machine(te, ctx),
            Self::ProjectTableSlotShift => redpower::shift_project_table_slots(te),
            Self::DiskDrive => computercraft::remap_disk_drive(te, ctx),
            Self::FluidPipe { names, .. } => fluids::remap_pipe_tanks(te, names),
            Self::FluidTank {
                tank_name,
                id_key,
                meta_key,
                result_key,
                names,
                ..
            } => fluids::remap_named_tank(te, *tank_name, id_key, meta_key, result_key, names),
            Self::FluidMachineTanks { names, .. } => fluids::remap_machine_tanks(te, names),
            Self::FluidRefinery { names } => fluids::remap_refinery_tanks(te, names),
            Self::FluidForestryMachine { names } => fluids::remap_forestry_machine(te, names),
            _ => Ok(()),
        }
    }

    fn remap_entity(
        &self,
        entity: &mut TagCompound,
        ctx: &RemapContext<'_>,
    ) -> Result<(), RemapError> {
        match self {
            Self::EntityInventory { list_name, .. } => remap_inventory_list(entity, list_name, ctx),
            Self::EntityRename { new_kind, .. } => {
                entity.insert("id", *new_kind);
                Ok(())
            }
            Self::LooseItem => {
                let item = nav::require_compound_mut(entity, "Item")?;
                remap_item_compound(item, ctx)
            }
            Self::ItemFrame => {
                if let Some(item) = nav::optional_compound_mut(entity, "Item")? {
                    remap_item_compound(item, ctx)?;
                }
                Ok(())
            }
            Self::FallingSand => remap_falling_sand(entity, ctx),
            Self::TankCart => railcraft::remap_tank_cart(entity, ctx),
            Self::FluidCartTanks { names, .. } => fluids::remap_cart_tanks(entity, names),
            _ => Ok(()),
        }
    }
}

/// Runs `f` on every compound in the list whose `id` string equals `kind`.
/// An element without a string `id` is malformed.
pub(crate) fn for_each_matching(
    list: &mut TagList,
    kind: &str,
    mut f: impl FnMut(&mut TagCompound) -> Result<(), RemapError>,
) -> Result<(), RemapError> {
    for entry in list.compounds_mut() {
        if nav::require_string(entry, "id")? == kind {
            f(entry)?;
        }
    }
    Ok(())
}

/// The simple-inventory rewrite: every element of the named compound list
/// (if the list is present) goes through the item-remap primitive.
pub(crate) fn remap_inventory_list(
    compound: &mut TagCompound,
    list_name: &str,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    if let Some(list) = nav::optional_compound_list_mut(compound, list_name)? {
        for item in list.compounds_mut() {
            remap_item_compound(item, ctx)?;
        }
    }
    Ok(())
}

fn remap_falling_sand(
    entity: &mut TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    let tile = nav::optional_number(entity, "Tile", &[TagKind::Byte])?;
    let tile_id = nav::optional_number(entity, "TileID", &[TagKind::Short])?;

    // The newer TileID wins when both shapes are present.
    let Some(id) = tile_id.or(tile) else {
        return Ok(());
    };
    let id = id as i32;
    let new_id = ctx.map.remap_block(id).ok_or(RemapError::UnmappedBlock(id))?;

    entity.remove("Tile");
    entity.remove("TileID");
    entity.insert("TileID", Tag::Short(new_id as i16));
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use worldshift_mapping::{MapInfo, MapTarget};

    use super::*;

    fn identity_map(ids: impl IntoIterator<Item = i32>) -> MapInfo {
        let blocks: HashMap<i32, i32> = ids.into_iter().map(|id| (id, id)).collect();
        MapInfo::from_tables(blocks, HashMap::new())
    }

    fn chunk_with(tile_entities: Vec<TagCompound>, entities: Vec<TagCompound>) -> TagCompound {
        let mut level = TagCompound::new();
        level.insert("Sections", Tag::List(TagList::with_kind(TagKind::Compound)));
        level.insert("Entities", Tag::List(TagList::from_compounds(entities)));
        level.insert("TileEntities", Tag::List(TagList::from_compounds(tile_entities)));

        let mut root = TagCompound::new();
        root.insert("Level", level);
        root
    }

    fn item(id: i16, damage: i16) -> TagCompound {
        let mut compound = TagCompound::new();
        compound.insert("id", Tag::Short(id));
        compound.insert("Damage", Tag::Short(damage));
        compound.insert("Count", Tag::Byte(1));
        compound
    }

    #[test]
    fn identity_chest_round_trips_unchanged() {
        let mut chest = TagCompound::new();
        chest.insert("id", "Chest");
        chest.insert("Items", Tag::List(TagList::from_compounds([item(4, 0)])));

        let mut chunk = chunk_with(vec![chest], vec![]);
        let original = chunk.clone();

        let map = identity_map([4]);
        let transformers = vec![Transformer::TileInventory {
            kind:      "Chest",
            list_name: "Items",
        }];
        let ctx = RemapContext {
            map:          &map,
            transformers: &transformers,
        };

        crate::remap_chunk(&mut chunk, &ctx).unwrap();
        assert_eq!(chunk, original);
    }

    #[test]
    fn falling_sand_coalesces_tile_into_tile_id() {
        let mut sand = TagCompound::new();
        sand.insert("id", "FallingSand");
        sand.insert("Tile", Tag::Byte(12));

        let mut chunk = chunk_with(vec![], vec![sand]);

        let mut blocks = HashMap::new();
        blocks.insert(12, 300);
        let map = MapInfo::from_tables(blocks, HashMap::new());
        let transformers = vec![Transformer::FallingSand];
        let ctx = RemapContext {
            map:          &map,
            transformers: &transformers,
        };

        crate::remap_chunk(&mut chunk, &ctx).unwrap();
        let entities = nav::entities_mut(&mut chunk).unwrap();
        let sand = entities.compounds().next().unwrap();
        assert!(sand.get("Tile").is_none());
        assert_eq!(sand.get("TileID"), Some(&Tag::Short(300)));
    }

    #[test]
    fn entity_rename_preserves_everything_else() {
        let mut cart = TagCompound::new();
        cart.insert("id", "Tankcart");
        cart.insert("Fuel", Tag::Short(7));

        let mut chunk = chunk_with(vec![], vec![cart]);

        let map = identity_map([]);
        let transformers = vec![Transformer::EntityRename {
            old_kind: "Tankcart",
            new_kind: "Railcraft.railcraft.cart.tank",
        }];
        let ctx = RemapContext {
            map:          &map,
            transformers: &transformers,
        };

        crate::remap_chunk(&mut chunk, &ctx).unwrap();
        let entities = nav::entities_mut(&mut chunk).unwrap();
        let cart = entities.compounds().next().unwrap();
        assert_eq!(
            cart.get("id"),
            Some(&Tag::String("Railcraft.railcraft.cart.tank".to_owned())),
        );
        assert_eq!(cart.get("Fuel"), Some(&Tag::Short(7)));
        let keys: Vec<&str> = cart.keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "Fuel"]);
    }

    #[test]
    fn nested_container_items_are_descended() {
        // An item whose `tag` compound holds an `Items` list is recursed
        // into by the structure-detecting transformer.
        let mut nested = item(5, 0);
        let mut tag_compound = TagCompound::new();
        tag_compound.insert("Items", Tag::List(TagList::from_compounds([item(6, 0)])));
        nested.insert("tag", tag_compound);

        let mut chest = TagCompound::new();
        chest.insert("id", "Chest");
        chest.insert("Items", Tag::List(TagList::from_compounds([nested])));

        let mut chunk = chunk_with(vec![chest], vec![]);

        let mut items = HashMap::new();
        items.insert(5, MapTarget::Id(5));
        items.insert(6, MapTarget::Id(600));
        let map = MapInfo::from_tables(HashMap::new(), items);
        let transformers = vec![
            Transformer::TileInventory {
                kind:      "Chest",
                list_name: "Items",
            },
            Transformer::Cropnalyzer,
        ];
        let ctx = RemapContext {
            map:          &map,
            transformers: &transformers,
        };

        crate::remap_chunk(&mut chunk, &ctx).unwrap();

        let tile_entities = nav::tile_entities_mut(&mut chunk).unwrap();
        let chest = tile_entities.compounds().next().unwrap();
        let outer = chest
            .get("Items")
            .and_then(Tag::as_list)
            .and_then(|list| list.compounds().next())
            .unwrap();
        let inner = outer
            .get("tag")
            .and_then(Tag::as_compound)
            .and_then(|tag| tag.get("Items"))
            .and_then(Tag::as_list)
            .and_then(|list| list.compounds().next())
            .unwrap();
        assert_eq!(inner.get("id"), Some(&Tag::Short(600)));
    }

    #[test]
    fn player_inventory_is_remapped() {
        let mut player = TagCompound::new();
        player.insert("Inventory", Tag::List(TagList::from_compounds([item(9, 0)])));

        let mut items = HashMap::new();
        items.insert(9, MapTarget::Id(90));
        let map = MapInfo::from_tables(HashMap::new(), items);
        let transformers = vec![Transformer::PlayerInventory];
        let ctx = RemapContext {
            map:          &map,
            transformers: &transformers,
        };

        crate::remap_player(&mut player, &ctx).unwrap();
        let inventory = player.get("Inventory").and_then(Tag::as_list).unwrap();
        assert_eq!(
            inventory.compounds().next().unwrap().get("id"),
            Some(&Tag::Short(90)),
        );
    }

    #[test]
    fn tile_entity_without_string_id_is_structural_error() {
        let mut te = TagCompound::new();
        te.insert("id", Tag::Int(1));
        let mut chunk = chunk_with(vec![te], vec![]);

        let map = identity_map([]);
        let transformers = vec![Transformer::TileInventory {
            kind:      "Chest",
            list_name: "Items",
        }];
        let ctx = RemapContext {
            map:          &map,
            transformers: &transformers,
        };

        assert!(crate::remap_chunk(&mut chunk, &ctx).is_err());
    }
}
