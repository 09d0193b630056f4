//! Docker Compose port extraction.
//!
//! Pure functions from compose-file text to the host ports each service
//! publishes. berth only ever reads compose files; it never writes them.

mod extract;
mod types;


pub use extract::{detect_services, extract_ports, find_compose_file, scan_dir, ComposeScan};
pub use types::{LongPort, PortNumber, PortSpec, ShortPort};
