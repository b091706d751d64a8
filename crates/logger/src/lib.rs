//! Tracing setup shared by the Servicarr binaries.

mod subscriber;

pub use self::subscriber::{LogFormat, init_tracing, init_with_level};
