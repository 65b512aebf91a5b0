//! Kitchen orders for catering requests and the live notification of kitchen workers.

pub mod client;
pub mod notification_channel;
pub mod order_linker;
