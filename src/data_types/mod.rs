pub mod configs;
pub mod interval;
pub mod row;
pub mod selection;
pub mod signals;

// Re-export everything for convenience
pub use configs::*;
pub use interval::*;
pub use row::*;
pub use selection::*;
pub use signals::*;
