// Session and tenant-context resolution.

pub mod controller;
pub mod guard;
pub mod session;

pub use controller::*;
pub use guard::*;
pub use session::*;
