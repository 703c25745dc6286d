pub mod dedup;
pub mod detection;
pub mod fallback;
pub mod history;
pub mod instances;
pub mod layout;
pub mod pipeline;
pub mod registry;
pub mod selector;
