//! Core data structures flowing through `ion-forge`.
//!
//! - [`element`] – The [`Element`](element::Element) unit of configuration, its kind and identifier.
//! - [`ions`] – Physical description of an ion species.
//! - [`attributes`] – Metadata produced by rendering and persisted with each run.

pub mod attributes;
pub mod element;
pub mod ions;
