pub mod logging;
pub mod scratch;
