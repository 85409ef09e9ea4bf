// Domain layer - Core types, presets and profile rules

pub mod errors;
pub mod model;
pub mod presets;
pub mod rules;
