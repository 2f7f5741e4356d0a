//! Fixed-width binary encodings of the records the storage layer and the operators exchange.
//!
//! All integers are encoded little-endian. The encoders are pure functions; the decoders check
//! the record length and report a [CorruptionError](rdf_bucket_common::CorruptionError) on a
//! mismatch. Records have no header, checksum or padding.

mod binding;
mod io;
mod payload;
mod triple;
mod tuple;

pub use binding::*;
pub use io::*;
pub use payload::*;
pub use triple::*;
pub use tuple::*;
