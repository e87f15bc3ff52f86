mod browser;
mod browser_actions;
mod cache;
pub mod events;
pub mod options;

pub use browser::*;
pub use browser_actions::*;
pub use cache::*;
pub use events::*;
pub use options::*;
