//! The migration profile: which mods are installed, where their config
//! files live on each side of the migration, the rule dictionaries steering
//! symbol translation, and the vanilla identity ranges.
//!
//! This is deliberately plain data. A migration between a different pair of
//! installs edits the tables here; nothing below reaches into the engine.

use std::collections::HashMap;
use std::sync::Arc;

use worldshift_mapping::{ConfigDescriptor, ConfigFormat, ModRules};
use worldshift_remap::catalog::{self, fluids::FluidNames};
use worldshift_remap::Transformer;


/// Vanilla block ids of the source version, mapped to themselves.
pub(crate) const VANILLA_BLOCK_RANGES: &[(i32, i32)] = &[(0, 125)];

/// Vanilla item ids of the source version (including the records block at
/// the top of the id space), mapped to themselves.
pub(crate) const VANILLA_ITEM_RANGES: &[(i32, i32)] = &[(256, 385), (2256, 2266)];

/// Per-mod config descriptors and translation rules.
///
/// Mods whose old config is hierarchical enumerate their symbols
/// automatically; rules there only redirect renamed symbols (longest
/// dot-prefix match). Mods with flat configs list every symbol to map
/// explicitly.
pub(crate) fn mod_rules() -> Vec<ModRules> {
    vec![
        ModRules::new(
            "buildcraft",
            ConfigDescriptor::new(ConfigFormat::Ini, "config/buildcraft/main.conf"),
            ConfigDescriptor::new(ConfigFormat::HierPrefix, "config/buildcraft/main.conf"),
        )
        .block("stonePipe.id", "stonePipe.id")
        .block("woodenPipe.id", "woodenPipe.id")
        .block("ironPipe.id", "ironPipe.id")
        .block("goldenPipe.id", "goldenPipe.id")
        .block("diamondPipe.id", "diamondPipe.id")
        .block("tank.id", "tank.id")
        .block("refinery.id", "refinery.id")
        .block("engine.id", "engine.id")
        .block("machine.id", "machine.id")
        .block("autoWorkbench.id", "autoWorkbench.id")
        .block("frame.id", "frame.id")
        .block("oilStill.id", "oil.id")
        .block("oilMoving.id", "oil.id")
        .item("wrench.id", "wrench.id")
        .item("bucketOil.id", "bucketOil.id")
        .item("bucketFuel.id", "bucketFuel.id")
        .item("gearWood.id", "woodenGear.id")
        .item("gearStone.id", "stoneGear.id")
        .item("gearIron.id", "ironGear.id")
        .item("gearGold.id", "goldenGear.id")
        .item("gearDiamond.id", "diamondGear.id"),
        ModRules::new(
            "railcraft",
            ConfigDescriptor::new(ConfigFormat::Ini, "config/railcraft.cfg"),
            ConfigDescriptor::new(ConfigFormat::HierPrefix, "config/railcraft/railcraft.cfg"),
        )
        .block("block.structure", "block.post")
        .block("block.rail", "block.track")
        .block("block.machine", "block.machine.alpha")
        .block("block.utility", "block.machine.beta")
        .item("item.coke", "fuel.coke")
        .item("item.rail", "part.rail")
        .item("item.tie", "part.tie")
        .item("item.rebar", "part.rebar"),
        ModRules::new(
            "industrialcraft",
            ConfigDescriptor::new(ConfigFormat::Ini, "config/IC2.cfg"),
            ConfigDescriptor::new(ConfigFormat::HierPrefix, "config/IC2.cfg"),
        )
        .block("blockMachine", "blockMachine")
        .block("blockElectric", "blockElectric")
        .block("blockGenerator", "blockGenerator")
        .block("blockCable", "blockCable")
        .block("blockOreCopper", "blockOreCopper")
        .block("blockOreTin", "blockOreTin")
        .block("blockOreUran", "blockOreUran")
        .block("blockRubWood", "blockRubWood")
        .item("itemCable", "itemCable")
        .item("itemBatRE", "itemBatRE")
        .item("itemCellEmpty", "itemCellEmpty")
        .item("itemOreIngotCopper", "itemOreIngotCopper")
        .item("itemOreIngotTin", "itemOreIngotTin")
        .item("itemOreIngotUran", "itemOreIngotUran"),
        ModRules::new(
            "redpower",
            ConfigDescriptor::new(ConfigFormat::Ini, "config/redpower/redpower.cfg"),
            ConfigDescriptor::new(ConfigFormat::Ini, "config/redpower/redpower.cfg"),
        )
        .block("blocks.base.id", "blocks.base.id")
        .block("blocks.machine.id", "blocks.machine.id")
        .block("blocks.logic.id", "blocks.logic.id")
        .block("blocks.wiring.id", "blocks.wiring.id")
        .block("blocks.lighting.id", "blocks.lighting.id")
        .item("items.screwdriver.id", "items.screwdriver.id")
        .item("items.sonicdriver.id", "items.sonicdriver.id")
        .item("items.drawplate.id", "items.drawplate.id"),
        ModRules::new(
            "forestry",
            ConfigDescriptor::new(ConfigFormat::Ini, "config/forestry/base.conf"),
            ConfigDescriptor::new(ConfigFormat::Ini, "config/forestry/base.conf"),
        )
        .block("block.machine", "block.factory.tesr")
        .block("block.engine", "block.engine")
        .block("block.soil", "block.soil")
        .block("block.resources", "block.resources")
        .item("item.beealyzer", "item.beealyzer")
        .item("item.pipette", "item.pipette")
        .item("item.wrench", "item.wrench"),
        ModRules::new(
            "thermalexpansion",
            ConfigDescriptor::new(ConfigFormat::HierNoPrefix, "config/thermalexpansion.cfg"),
            ConfigDescriptor::new(ConfigFormat::HierPrefix, "config/cofh/thermalexpansion.cfg"),
        ),
        ModRules::new(
            "ironchests",
            ConfigDescriptor::new(ConfigFormat::Ini, "config/IronChest.cfg"),
            ConfigDescriptor::new(ConfigFormat::HierPrefix, "config/IronChest.cfg"),
        )
        .block("ironChests.id", "ironChests.id"),
        ModRules::new(
            "computercraft",
            ConfigDescriptor::new(ConfigFormat::Ini, "config/mod_ComputerCraft.cfg"),
            ConfigDescriptor::new(ConfigFormat::Ini, "config/ComputerCraft.cfg"),
        )
        .block("computerBlockID", "computerBlockID")
        .block("diskDriveBlockID", "diskDriveBlockID")
        .item("diskItemID", "diskItemID"),
    ]
}

/// Liquid id → fluid name, for the machines that now store fluids by name.
/// Ids here are in the migrated (output) id space. Mod liquids belong in
/// this table too; the combined redstone/ender liquid must be entered as
/// `teliquid` so its metadata split applies.
fn fluid_names() -> Arc<FluidNames> {
    let mut names = HashMap::new();
    names.insert(8, "water".to_owned());
    names.insert(9, "water".to_owned());
    names.insert(10, "lava".to_owned());
    names.insert(11, "lava".to_owned());
    Arc::new(FluidNames::new(names))
}

/// The full transformer pipeline: per-mod catalogs first, then the fluid
/// naming pass, then the stock set (world blocks, vanilla containers,
/// loose items, players).
pub(crate) fn transformers() -> Vec<Transformer> {
    let mut transformers = Vec::new();
    transformers.extend(catalog::buildcraft::transformers());
    transformers.extend(catalog::railcraft::transformers());
    transformers.extend(catalog::thermalexpansion::transformers());
    transformers.extend(catalog::forestry::transformers());
    transformers.extend(catalog::industrialcraft::transformers());
    transformers.extend(catalog::redpower::transformers());
    transformers.extend(catalog::ironchests::transformers());
    transformers.extend(catalog::computercraft::transformers());
    transformers.extend(catalog::fluids::transformers(&fluid_names()));
    transformers.extend(catalog::stock_transformers());
    transformers
}
