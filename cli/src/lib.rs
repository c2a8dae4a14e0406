//! Host pieces for the `escola` terminal client: the ureq transport, the
//! on-disk session store and logging setup. Command handling lives in the
//! binary.

pub mod logging;
pub mod store;
pub mod transport;
