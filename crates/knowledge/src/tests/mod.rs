//! Cross-module tests for indexing, snapshots and conversations.

mod session_flow;
mod support;
