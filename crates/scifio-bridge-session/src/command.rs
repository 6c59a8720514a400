//! Command lines understood by the worker.
//!
//! Each command is one line of tab-separated fields. The worker works on a
//! fixed five-axis model, so every region is padded to five axes (index 0,
//! extent 1) before it is encoded.

use std::fmt::Write as _;

use scifio_bridge_meta::{ByteOrder, ComponentType, LookupTable, Region, AXES};

pub const CAN_READ: &str = "canRead";
pub const CAN_WRITE: &str = "canWrite";
pub const INFO: &str = "info";
pub const READ: &str = "read";
pub const WRITE: &str = "write";

/// `canRead\t<path>\n`
pub fn probe_readable(path: &str) -> String {
    format!("{CAN_READ}\t{path}\n")
}

/// `canWrite\t<path>\n`
pub fn probe_writable(path: &str) -> String {
    format!("{CAN_WRITE}\t{path}\n")
}

/// `info\t<path>\n`
pub fn describe(path: &str) -> String {
    format!("{INFO}\t{path}\n")
}

/// `read\t<path>` followed by five `\t<index>\t<extent>` pairs.
pub fn read_region(path: &str, region: &Region) -> String {
    let mut line = format!("{READ}\t{path}");
    for (index, size) in region.padded_index().iter().zip(region.padded_size()) {
        let _ = write!(line, "\t{index}\t{size}");
    }
    line.push('\n');
    line
}

/// Encode a `write` command.
///
/// Fields: path, byte-order flag, region dimension, five extents, five
/// spacings, pixel type code, channel count, five index/extent pairs, then
/// the lookup table block (`1 bits length r g b ...`) or `0`. Every field is
/// followed by a tab, including the last one.
pub fn write_region(
    path: &str,
    byte_order: ByteOrder,
    region: &Region,
    spacing: &[f64],
    component_type: ComponentType,
    channel_count: usize,
    lookup_table: Option<&LookupTable>,
) -> String {
    let mut fields: Vec<String> = vec![WRITE.to_string(), path.to_string()];
    fields.push(byte_order.flag().to_string());
    fields.push(region.dimension().to_string());
    fields.extend(region.padded_size().iter().map(ToString::to_string));

    let dimension = region.dimension();
    fields.extend((0..AXES).map(|axis| match spacing.get(axis) {
        Some(value) if axis < dimension => value.to_string(),
        _ => "1".to_string(),
    }));

    fields.push(component_type.code().to_string());
    fields.push(channel_count.to_string());

    for (index, size) in region.padded_index().iter().zip(region.padded_size()) {
        fields.push(index.to_string());
        fields.push(size.to_string());
    }

    match lookup_table {
        Some(table) => {
            fields.push("1".to_string());
            fields.push(table.bits.to_string());
            fields.push(table.len().to_string());
            for entry in &table.entries {
                fields.push(entry.red.to_string());
                fields.push(entry.green.to_string());
                fields.push(entry.blue.to_string());
            }
        }
        None => fields.push("0".to_string()),
    }

    let mut line = fields.join("\t");
    line.push_str("\t\n");
    line
}

#[cfg(test)]
mod tests {
    use scifio_bridge_meta::LutEntry;

    use super::*;

    #[test]
    fn probes_and_describe() {
        assert_eq!(probe_readable("/data/a.tif"), "canRead\t/data/a.tif\n");
        assert_eq!(probe_writable("/data/b.ome.tif"), "canWrite\t/data/b.ome.tif\n");
        assert_eq!(describe("/data/a.tif"), "info\t/data/a.tif\n");
    }

    #[test]
    fn read_pads_two_dimensional_region() {
        let region = Region::from_size([10, 20]).expect("valid region");
        assert_eq!(
            read_region("a.tif", &region),
            "read\ta.tif\t0\t10\t0\t20\t0\t1\t0\t1\t0\t1\n"
        );
    }

    #[test]
    fn read_keeps_start_indices() {
        let region = Region::new([5, 6, 2, 0, 1], [10, 20, 3, 1, 1]).expect("valid region");
        assert_eq!(
            read_region("a.tif", &region),
            "read\ta.tif\t5\t10\t6\t20\t2\t3\t0\t1\t1\t1\n"
        );
    }

    #[test]
    fn write_without_lookup_table() {
        let region = Region::from_size([10, 20]).expect("valid region");
        let line = write_region(
            "/tmp/out.tif",
            ByteOrder::LittleEndian,
            &region,
            &[0.5, 0.25, 3.0, 1.0, 1.0],
            ComponentType::U16,
            1,
            None,
        );
        assert_eq!(
            line,
            "write\t/tmp/out.tif\t0\t2\t10\t20\t1\t1\t1\t0.5\t0.25\t1\t1\t1\t3\t1\t\
             0\t10\t0\t20\t0\t1\t0\t1\t0\t1\t0\t\n"
        );
    }

    #[test]
    fn write_big_endian_three_dimensional() {
        let region = Region::new([0, 0, 1], [4, 4, 2]).expect("valid region");
        let line = write_region(
            "o.ics",
            ByteOrder::BigEndian,
            &region,
            &[1.0, 1.0, 2.5, 9.0, 9.0],
            ComponentType::F32,
            3,
            None,
        );
        assert_eq!(
            line,
            "write\to.ics\t1\t3\t4\t4\t2\t1\t1\t1\t1\t2.5\t1\t1\t6\t3\t\
             0\t4\t0\t4\t1\t2\t0\t1\t0\t1\t0\t\n"
        );
    }

    #[test]
    fn not_applicable_byte_order_is_written_little_endian() {
        let region = Region::from_size([1]).expect("valid region");
        let line = write_region(
            "x",
            ByteOrder::NotApplicable,
            &region,
            &[],
            ComponentType::U8,
            1,
            None,
        );
        assert!(line.starts_with("write\tx\t0\t1\t"));
    }

    #[test]
    fn write_with_eight_bit_lookup_table() {
        let region = Region::from_size([2, 2]).expect("valid region");
        let table = LookupTable::new(
            8,
            vec![
                LutEntry { red: 0, green: 0, blue: 0 },
                LutEntry { red: 255, green: 128, blue: 1 },
            ],
        )
        .expect("valid table");
        let line = write_region(
            "lut.tif",
            ByteOrder::LittleEndian,
            &region,
            &[1.0, 1.0],
            ComponentType::U8,
            1,
            Some(&table),
        );
        assert!(line.ends_with("\t0\t1\t1\t8\t2\t0\t0\t0\t255\t128\t1\t\n"));
    }

    #[test]
    fn write_with_sixteen_bit_lookup_table() {
        let region = Region::from_size([2, 2]).expect("valid region");
        let table = LookupTable::new(16, vec![LutEntry { red: -2, green: 1000, blue: 7 }])
            .expect("valid table");
        let line = write_region(
            "lut.tif",
            ByteOrder::LittleEndian,
            &region,
            &[1.0, 1.0],
            ComponentType::U16,
            1,
            Some(&table),
        );
        assert!(line.ends_with("\t1\t16\t1\t-2\t1000\t7\t\n"));
    }
}
