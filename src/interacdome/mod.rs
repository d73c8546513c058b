pub mod annotate;
pub mod setup;
pub mod table;

pub use setup::{InteracdomeSetup, InteracdomeUrls};
pub use table::{BindingFrequencyTable, ClanCatalog, ClanEntry};
