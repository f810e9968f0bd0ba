//! Barmatic control core.
//!
//! The pour-orchestration engine for the Barmatic cocktail robot: a
//! table-driven state machine, the [`bartender::Bartender`] controller
//! that sequences dispensing hardware component by component, and the
//! port traits that keep the core hardware-agnostic. All physical I/O
//! flows through [`ports::DispensePort`], so the entire crate runs and
//! tests on the host without a rig attached.

#![deny(unused_must_use)]

pub mod adapters;
pub mod bartender;
pub mod config;
pub mod error;
pub mod fsm;
pub mod ports;
pub mod recipe;
