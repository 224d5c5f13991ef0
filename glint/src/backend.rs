//! Backend interfacing.
//!
//! Backend crates implement the traits of this module on their backend type. The typed API of
//! glint only ever calls through them.
//!
//! All traits are `unsafe` to implement: the typed API relies on backends upholding the
//! post-conditions documented on each method (e.g. releasing a failed shader object).

pub mod buffer;
pub mod pipeline;
pub mod shader;
