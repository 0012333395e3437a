//! Ambient pieces shared by the aggregator binaries.

pub mod logging;
