//! Business logic services for the Shelftrack backend

pub mod expiry;
pub mod ingest;
pub mod ledger;
pub mod maintenance;
pub mod registry;
pub mod reversal;
pub mod sales;
pub mod stock;

pub use expiry::ExpiryService;
pub use ingest::ImportService;
pub use ledger::MovementService;
pub use maintenance::MaintenanceService;
pub use registry::{ItemService, LocationService, ResponsibleService};
pub use reversal::ReversalService;
pub use sales::SalesService;
pub use stock::StockService;
