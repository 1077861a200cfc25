//! Purpose: Library crate for talking to an Islandora 7 REST endpoint, used by the `islandora-rest` CLI and tests.
//! Exports: `api` (client, transport, resources), `config` (URL/credential resolution), `core` (errors, params, multipart).
//! Role: Blocking client library; callers own threading and retries.
//! Invariants: Every request goes through the `api::Transport` seam.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod config;
pub mod core;
