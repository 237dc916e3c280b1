//! The transformer catalogs: the stock set every migration registers, plus
//! one module per supported mod. Each catalog is a list of literal
//! [`Transformer`] constructors; the mechanisms they configure live in the
//! framework, not here.

pub mod buildcraft;
pub mod computercraft;
pub mod fluids;
pub mod forestry;
pub mod industrialcraft;
pub mod ironchests;
pub mod railcraft;
pub mod redpower;
pub mod thermalexpansion;

use crate::Transformer;


/// The always-registered transformers: world blocks, the vanilla
/// containers, loose and framed items, chest carts of both generations,
/// falling blocks, and player inventories.
///
/// Registered after the per-mod catalogs, in this order.
pub fn stock_transformers() -> Vec<Transformer> {
    let mut transformers = vec![Transformer::WorldBlocks];
    for kind in ["Cauldron", "Chest", "Furnace", "Hopper", "Trap"] {
        transformers.push(Transformer::TileInventory {
            kind,
            list_name: "Items",
        });
    }
    transformers.push(Transformer::LooseItem);
    for kind in ["Minecart", "MinecartChest"] {
        transformers.push(Transformer::EntityInventory {
            kind,
            list_name: "Items",
        });
    }
    transformers.push(Transformer::FallingSand);
    transformers.push(Transformer::ItemFrame);
    transformers.push(Transformer::PlayerInventory);
    transformers
}
