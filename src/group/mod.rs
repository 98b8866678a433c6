//! Collapsing per-sample matrices into group-level values.

pub mod average;

pub use average::{group_average, group_average_all, write_group_table, GroupAverage};
