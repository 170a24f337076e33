//! Integration tests for the detection-to-terminal-state pipeline.

mod helpers;
mod orchestration;
mod watcher;
