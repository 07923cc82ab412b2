pub mod collab;
pub mod messages;
pub mod health;
pub mod room_state;
pub mod diagnostics;
pub mod error;

pub use collab::*;
pub use messages::*;
pub use health::*;
pub use room_state::*;
pub use diagnostics::*;
pub use error::*;
