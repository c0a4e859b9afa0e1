pub mod account;
pub mod bar;
pub mod control;
pub mod decision;
pub mod signal;

pub use account::*;
pub use bar::*;
pub use control::*;
pub use decision::*;
pub use signal::*;
