//! Marketplace chat sync layer: message store, transport bridge and the
//! façade UI code talks to.

pub mod api;
pub mod configs;
pub mod constants;
pub mod modules;
#[cfg(test)]
mod test;
pub mod utils;
