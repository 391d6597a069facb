pub mod initialization;

pub use initialization::{initialize_app, AppContext};
