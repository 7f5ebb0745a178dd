pub mod ids;
pub mod menu;
pub mod task;
pub mod user;

pub use ids::*;
pub use menu::*;
pub use task::*;
pub use user::*;
