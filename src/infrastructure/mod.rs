pub mod connectivity;

pub use connectivity::{ConnectivityMonitor, ConnectivityProbe};
