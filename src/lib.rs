pub mod error;
pub mod helpers;
pub mod liveness;
pub mod magic_packet;
pub mod monitor;
pub mod notify;
pub mod target;
pub mod test_utils;
