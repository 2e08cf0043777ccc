//! # Tandem IO
//!
//! Serialisation boundary of the Tandem assembly planner: XML reading of
//! assembly descriptions, XML writing of annotated plans, and DOT
//! visualisation. Pure producers/consumers over the core data model; no
//! planning logic lives here.

pub mod dot;
pub mod xml;
