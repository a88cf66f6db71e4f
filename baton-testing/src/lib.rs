pub mod harness;

pub use harness::{init_test_logging, ClusterHarness};
