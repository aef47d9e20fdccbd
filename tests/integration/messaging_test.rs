//! Messaging integration tests
//!
//! End-to-end scenarios across the session gateway, delivery router, seen
//! reconciler and REST fallback, on in-memory storage.

#![allow(dead_code)]

mod backfill;
mod common;
mod delivery;
mod rest;
mod seen;
mod sessions;
