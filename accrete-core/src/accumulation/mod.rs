//! Multi-frame accumulation of instance observations
//!
//! This module provides the merge policies and the accumulator that feeds
//! them with strided observations of one instance.

pub mod accumulator;
pub mod default;
pub mod greedy_grid;
pub mod strategy;

pub use accumulator::PointCloudAccumulator;
pub use default::DefaultStrategy;
pub use greedy_grid::{Alignment, GreedyGridStrategy, VoxelGrid};
pub use strategy::{AccumulationStrategy, Observation, build_strategy, common_channels};
