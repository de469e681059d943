//! Channel orchestration.
//!
//! This module provides:
//! - [`Pipeline`], the fixed-order list of binding elements
//! - [`Channel`], which folds outgoing messages through the pipeline and
//!   incoming messages through it in reverse
//! - [`ChannelBuilder`] for wiring credentials, stores and settings

#[allow(clippy::module_inception)]
mod channel;
mod pipeline;

pub use channel::{Channel, ChannelBuilder};
pub use pipeline::{BindingContext, BindingElement, ElementKind, Pipeline, ProtocolElement};
