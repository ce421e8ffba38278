//! Domain models for the Shelftrack perishable stock tracker

mod expiry;
mod inventory;
mod item;
mod location;
mod movement;
mod sales;
mod stock;

pub use expiry::*;
pub use inventory::*;
pub use item::*;
pub use location::*;
pub use movement::*;
pub use sales::*;
pub use stock::*;
