//! Type definitions

pub mod order;
pub mod proposal;
pub mod settings;
pub mod team;

pub use order::*;
pub use proposal::*;
pub use settings::*;
pub use team::*;
