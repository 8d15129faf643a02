pub mod load;
pub mod save;
pub mod types;

pub use types::{
    Config, Language, MAX_RECENT_PATHS, ModelPrice, PricingTable, RequestDefaults, UserSettings,
};
