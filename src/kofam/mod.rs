pub mod annotate;
pub mod ko_list;
pub mod modules;
pub mod setup;

pub use ko_list::{KoClass, KoEntry, KoList, ScoreType};
pub use modules::{ModuleCatalog, ModuleEntry};
pub use setup::{KofamSetup, KofamUrls};
