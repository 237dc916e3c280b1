//! Iron Chests: plain containers, one per chest tier.

use crate::Transformer;


pub fn transformers() -> Vec<Transformer> {
    ["COPPER", "IRON", "SILVER", "GOLD", "DIAMOND", "CRYSTAL"]
        .into_iter()
        .map(|kind| Transformer::TileInventory {
            kind,
            list_name: "Items",
        })
        .collect()
}
