pub mod auth;
pub mod directory;
pub mod domain;
pub mod error;
pub mod settings;
pub mod storage;
pub mod traits;

pub use auth::*;
pub use directory::*;
pub use domain::*;
pub use error::*;
pub use settings::*;
pub use storage::*;
pub use traits::*;
