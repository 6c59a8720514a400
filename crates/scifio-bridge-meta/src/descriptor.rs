use std::fmt;

use tracing::{debug, warn};

use crate::dictionary::MetadataDictionary;
use crate::error::{MetaError, Result};
use crate::lut::LookupTable;
use crate::region::Region;

/// Number of axes in the worker's image model.
pub const AXES: usize = 5;

/// Axis names in protocol order.
pub const AXIS_NAMES: [&str; AXES] = ["X", "Y", "Z", "T", "C"];

/// Pixel component type, keyed by the worker's `PixelType` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ComponentType {
    pub const ALL: [ComponentType; 8] = [
        Self::I8,
        Self::U8,
        Self::I16,
        Self::U16,
        Self::I32,
        Self::U32,
        Self::F32,
        Self::F64,
    ];

    /// Map a `PixelType` code, `None` for codes the worker marks unknown.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::I8),
            1 => Some(Self::U8),
            2 => Some(Self::I16),
            3 => Some(Self::U16),
            4 => Some(Self::I32),
            5 => Some(Self::U32),
            6 => Some(Self::F32),
            7 => Some(Self::F64),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::I8 => 0,
            Self::U8 => 1,
            Self::I16 => 2,
            Self::U16 => 3,
            Self::I32 => 4,
            Self::U32 => 5,
            Self::F32 => 6,
            Self::F64 => 7,
        }
    }

    /// Bytes per component.
    pub fn size_bytes(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "int8",
            Self::U8 => "uint8",
            Self::I16 => "int16",
            Self::U16 => "uint16",
            Self::I32 => "int32",
            Self::U32 => "uint32",
            Self::F32 => "float",
            Self::F64 => "double",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
    NotApplicable,
}

impl ByteOrder {
    /// Flag sent in `write` commands. Anything but big-endian is written as little-endian.
    pub fn flag(self) -> u8 {
        match self {
            Self::BigEndian => 1,
            Self::LittleEndian | Self::NotApplicable => 0,
        }
    }
}

/// What the components of one pixel mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Scalar,
    Rgb,
    Vector(usize),
}

impl ChannelLayout {
    pub fn from_count(count: usize) -> Self {
        match count {
            1 => Self::Scalar,
            3 => Self::Rgb,
            n => Self::Vector(n),
        }
    }

    pub fn count(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Rgb => 3,
            Self::Vector(n) => n,
        }
    }
}

/// Image geometry and pixel format as reported by the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescriptor {
    /// Extent of each axis, X, Y, Z, T, C.
    pub sizes: [usize; AXES],
    /// Physical pixel spacing per axis.
    pub spacing: [f64; AXES],
    pub component_type: ComponentType,
    pub byte_order: ByteOrder,
    pub channel_layout: ChannelLayout,
    pub lookup_table: Option<LookupTable>,
}

impl ImageDescriptor {
    /// A little-endian scalar image with unit spacing.
    pub fn new(sizes: [usize; AXES], component_type: ComponentType) -> Self {
        Self {
            sizes,
            spacing: [1.0; AXES],
            component_type,
            byte_order: ByteOrder::LittleEndian,
            channel_layout: ChannelLayout::Scalar,
            lookup_table: None,
        }
    }

    /// Populate a descriptor from an `info` dictionary.
    ///
    /// Fields are read in a fixed order: interleaving (logged only), byte
    /// order, pixel type, sizes, channel count, spacings, lookup table. A
    /// missing boolean flag reads as `false`; every other field is required.
    /// A lookup table that cannot be decoded is logged and left out.
    pub fn from_metadata(dict: &MetadataDictionary) -> Result<Self> {
        if !dict.contains_key("PixelType") {
            return Err(MetaError::MissingKey("PixelType".to_string()));
        }

        let interleaved = dict.get_optional::<bool>("Interleaved")?.unwrap_or(false);
        debug!(interleaved, "image interleaving");

        let byte_order = if dict.get_optional::<bool>("LittleEndian")?.unwrap_or(false) {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };

        let code = dict.get_typed::<i64>("PixelType")?;
        let component_type =
            ComponentType::from_code(code).ok_or(MetaError::UnknownPixelType(code))?;

        let mut sizes = [0; AXES];
        for (size, axis) in sizes.iter_mut().zip(AXIS_NAMES) {
            *size = dict.get_typed::<usize>(&format!("Size{axis}"))?;
        }

        let channels = dict.get_typed::<usize>("RGBChannelCount")?;
        let channel_layout = ChannelLayout::from_count(channels);

        let mut spacing = [0.0; AXES];
        for (value, axis) in spacing.iter_mut().zip(AXIS_NAMES) {
            *value = dict.get_typed::<f64>(&format!("PixelsPhysicalSize{axis}"))?;
        }

        let lookup_table = match LookupTable::from_dictionary(dict) {
            Ok(table) => table,
            Err(err) => {
                warn!(error = %err, "ignoring undecodable lookup table");
                None
            }
        };

        let descriptor = Self {
            sizes,
            spacing,
            component_type,
            byte_order,
            channel_layout,
            lookup_table,
        };
        debug!(
            sizes = ?descriptor.sizes,
            spacing = ?descriptor.spacing,
            component = %descriptor.component_type,
            byte_order = ?descriptor.byte_order,
            channels,
            "image descriptor decoded"
        );
        Ok(descriptor)
    }

    pub fn channel_count(&self) -> usize {
        self.channel_layout.count()
    }

    /// Bytes per pixel: component size times channel count.
    pub fn pixel_size(&self) -> usize {
        self.component_type.size_bytes() * self.channel_count()
    }

    /// Bytes needed to hold `region` in this pixel format.
    pub fn byte_count(&self, region: &Region) -> Result<usize> {
        region
            .pixel_count()
            .and_then(|pixels| pixels.checked_mul(self.pixel_size()))
            .ok_or_else(|| {
                MetaError::InvalidRegion(format!(
                    "{:?} in {}-byte pixels does not fit in memory",
                    region.size(),
                    self.pixel_size()
                ))
            })
    }

    /// The region covering the whole image.
    pub fn full_region(&self) -> Region {
        Region::from_axes([0; AXES], self.sizes)
    }
}
