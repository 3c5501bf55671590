pub mod navigation;
pub mod state;
pub mod update;

pub use navigation::handle_key;
pub use state::{AppState, Request, MAX_MESSAGES};
pub use update::update;
