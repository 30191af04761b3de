#![doc = "ci-type-sync-core: core logic library for ci-type-sync."]

//! This crate contains the data model, the report builder and the Confluence page
//! synchronisation protocol for ci-type-sync.
//! Concrete database access and CLI plumbing live in the `ci-type-sync` crate.
//!
//! # Usage
//! Build a [`report::ReportBuilder`] over any [`contract::RelationalSource`], render the
//! report with a [`contract::TemplateRenderer`] and hand the text to a
//! [`contract::Publisher`]; [`synchronise::synchronise`] wires the three together.

pub mod config;
pub mod contract;
pub mod error;
pub mod memory_source;
pub mod model;
pub mod page_sync;
pub mod render;
pub mod report;
pub mod synchronise;
