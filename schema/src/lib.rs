// Grid Tactics Schema - Shared type definitions
// Static data shared by the battle engine and by anything that produces
// template documents for it: elemental types, terrain, positions, move and
// species templates.

pub use element_types::*;
pub use map_types::*;
pub use move_types::*;
pub use species_data::*;

pub mod element_types;
pub mod map_types;
pub mod move_types;
pub mod species_data;
