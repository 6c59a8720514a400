//! Read and write scientific image files through a SCIFIO worker process.
//!
//! Format decoding happens in a long-lived JVM (`ITKBridgePipes`) that this
//! crate starts, feeds with tab-separated commands over its stdin, and reads
//! back over its stdout/stderr.
//!
//! ```no_run
//! use scifio_bridge::Bridge;
//!
//! # fn main() -> scifio_bridge::session::Result<()> {
//! let mut bridge = Bridge::from_env()?;
//! if bridge.probe_readable("/data/cells.ome.tif")? {
//!     let description = bridge.describe("/data/cells.ome.tif")?;
//!     let region = description.descriptor.full_region();
//!     let pixels = bridge.read("/data/cells.ome.tif", &region, &description.descriptor)?;
//!     println!("{} bytes", pixels.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Structure
//!
//! - [`process`]: worker configuration and supervision
//! - [`frame`]: text and binary response framing
//! - [`meta`]: metadata dictionary, image descriptor, regions
//! - [`session`]: command encoding, bulk transfer, the [`Bridge`] API

/// Re-export process types.
pub mod process {
    pub use scifio_bridge_process::*;
}

/// Re-export frame types.
pub mod frame {
    pub use scifio_bridge_frame::*;
}

/// Re-export metadata types.
pub mod meta {
    pub use scifio_bridge_meta::*;
}

/// Re-export session types.
pub mod session {
    pub use scifio_bridge_session::*;
}

pub use scifio_bridge_meta::{ImageDescriptor, MetadataDictionary, Region};
pub use scifio_bridge_session::{Bridge, BridgeConfig, BridgeError, Description, WriteRequest};
