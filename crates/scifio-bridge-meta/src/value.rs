/// A type that can be read out of a metadata value string.
pub trait MetadataValue: Sized {
    /// Name used in conversion errors.
    const TYPE_NAME: &'static str;

    /// Parse a raw (already unescaped) value, `None` if it does not fit.
    fn parse_value(raw: &str) -> Option<Self>;
}

impl MetadataValue for bool {
    const TYPE_NAME: &'static str = "bool";

    /// Numeric `0`/`1` first, then the literal `true`/`false`.
    fn parse_value(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" => Some(true),
            "0" => Some(false),
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

macro_rules! impl_from_str_value {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl MetadataValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn parse_value(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

impl_from_str_value! {
    u8 => "u8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    usize => "usize",
    f64 => "f64",
}
