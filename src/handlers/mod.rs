pub mod health;
pub mod room_state;
pub mod diagnostics;

pub use health::*;
pub use room_state::*;
pub use diagnostics::*;
