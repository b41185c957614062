//! Stream primitives for composing state out of independent event sources.
//!
//! Built directly on `futures::Stream`. Every combinator here works over
//! `BoxStream<'static, Result<T, E>>` so that a failure in any input ends the
//! combined stream instead of being swallowed.
//!
//! - [`emitter`]: controllable hot source (push side + stream side)
//! - [`merge`]: delivery-ordered merge of many inputs
//! - [`fold_with_seed`]: left fold that yields its seed before any input
//! - [`combine_latest`]: latest value of each side, recomputed on either update
//! - [`tap`]: pass-through that copies each item into an emitter

pub mod combine;
pub mod emitter;
pub mod fold;
pub mod merge;

pub use combine::{combine_latest, CombineLatest};
pub use emitter::{emitter, tap, Emitter, EmitterClosed};
pub use fold::{fold_with_seed, Fold};
pub use merge::{merge, Merge};
