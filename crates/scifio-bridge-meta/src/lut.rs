use crate::dictionary::MetadataDictionary;
use crate::error::{MetaError, Result};

pub const USE_LUT_KEY: &str = "UseLUT";
pub const LUT_BITS_KEY: &str = "LUTBits";
pub const LUT_LENGTH_KEY: &str = "LUTLength";

/// One indexed colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LutEntry {
    pub red: i32,
    pub green: i32,
    pub blue: i32,
}

/// Indexed-colour lookup table.
///
/// 8-bit tables hold byte values, signed or unsigned, since the worker may
/// report either. Any other depth holds signed 16-bit values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    pub bits: i32,
    pub entries: Vec<LutEntry>,
}

impl LookupTable {
    pub fn new(bits: i32, entries: Vec<LutEntry>) -> Result<Self> {
        let table = Self { bits, entries };
        table.validate()?;
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode the table announced by `UseLUT`, if any.
    ///
    /// A missing `UseLUT` key means no table.
    pub fn from_dictionary(dict: &MetadataDictionary) -> Result<Option<Self>> {
        if !dict.get_optional::<bool>(USE_LUT_KEY)?.unwrap_or(false) {
            return Ok(None);
        }

        let bits = dict.get_typed::<i32>(LUT_BITS_KEY)?;
        if bits <= 0 {
            return Err(MetaError::InvalidLookupTable(format!(
                "{LUT_BITS_KEY} must be positive, got {bits}"
            )));
        }
        let length = dict.get_typed::<usize>(LUT_LENGTH_KEY)?;

        let channel = |name: char, i: usize| -> Result<i32> {
            let key = format!("LUT{name}{i}");
            if bits == 8 {
                dict.get_typed::<i32>(&key)
            } else {
                dict.get_typed::<i16>(&key).map(i32::from)
            }
        };

        let entries = (0..length)
            .map(|i| {
                Ok(LutEntry {
                    red: channel('R', i)?,
                    green: channel('G', i)?,
                    blue: channel('B', i)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(bits, entries).map(Some)
    }

    /// Record the table in a dictionary using the keys `from_dictionary` reads.
    pub fn write_to(&self, dict: &mut MetadataDictionary) {
        dict.insert(USE_LUT_KEY, "1");
        dict.insert(LUT_BITS_KEY, self.bits.to_string());
        dict.insert(LUT_LENGTH_KEY, self.entries.len().to_string());
        for (i, entry) in self.entries.iter().enumerate() {
            dict.insert(format!("LUTR{i}"), entry.red.to_string());
            dict.insert(format!("LUTG{i}"), entry.green.to_string());
            dict.insert(format!("LUTB{i}"), entry.blue.to_string());
        }
    }

    fn validate(&self) -> Result<()> {
        if self.bits <= 0 {
            return Err(MetaError::InvalidLookupTable(format!(
                "bit depth must be positive, got {}",
                self.bits
            )));
        }
        let (min, max) = if self.bits == 8 {
            (i32::from(i8::MIN), i32::from(u8::MAX))
        } else {
            (i32::from(i16::MIN), i32::from(i16::MAX))
        };
        for (i, entry) in self.entries.iter().enumerate() {
            for value in [entry.red, entry.green, entry.blue] {
                if !(min..=max).contains(&value) {
                    return Err(MetaError::InvalidLookupTable(format!(
                        "entry {i} value {value} does not fit a {}-bit table",
                        self.bits
                    )));
                }
            }
        }
        Ok(())
    }
}
