//! Pure build-restriction logic for Scrapyard.
//!
//! Decides, for every cube block definition the game host loads, whether the
//! block can be built freely or must first be started from a placeholder
//! component (a scrap construction frame), and keeps the block's mass and
//! integrity thresholds consistent after its build list changes.
//!
//! Nothing here talks to the game directly. The host hands in plain
//! [`blocks::BlockDescriptor`] records plus a [`restrictions::DefinitionCatalogue`]
//! for lookups and gets the mutated records back, which keeps every step
//! unit-testable and runnable from the native simtest harness.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`blocks`] | Block kinds, component entries, derived attributes |
//! | [`builtin`] | Built-in rule table and session constants |
//! | [`integrity`] | Mass/integrity recalculation after a build list change |
//! | [`restrictions`] | The restriction pass: classify, prepend placeholder, tally |
//! | [`rules`] | Ordered first-match-wins rule table |
//! | [`session`] | Per-session rule table, apply and restore |
//! | [`settings`] | User exemptions, world file and shared variable loading |

pub mod blocks;
pub mod builtin;
pub mod integrity;
pub mod restrictions;
pub mod rules;
pub mod session;
pub mod settings;
