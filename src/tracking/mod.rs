pub mod abaque;
pub mod regime;
pub mod session;
pub mod smoother;
