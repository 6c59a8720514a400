//! Metadata codec for the SCIFIO bridge.
//!
//! An `info` reply is a text frame of alternating key and value lines. This
//! crate turns it into an ordered [`MetadataDictionary`] and derives the
//! typed [`ImageDescriptor`] from it. Regions and lookup tables, the other
//! structured values exchanged with the worker, live here too.

pub mod descriptor;
pub mod dictionary;
pub mod error;
pub mod escape;
pub mod lut;
pub mod region;
pub mod value;

pub use descriptor::{ByteOrder, ChannelLayout, ComponentType, ImageDescriptor, AXES, AXIS_NAMES};
pub use dictionary::MetadataDictionary;
pub use error::{MetaError, Result};
pub use escape::{escape, unescape};
pub use lut::{LookupTable, LutEntry};
pub use region::Region;
pub use value::MetadataValue;
