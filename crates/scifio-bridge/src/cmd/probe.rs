use serde::Serialize;
use tracing::info;

use scifio_bridge::frame::FrameSentinel;
use scifio_bridge::meta::ByteOrder;
use scifio_bridge::{Bridge, BridgeConfig, Description};

use crate::cmd::{parse_duration, ProbeArgs};
use crate::exit::{bridge_error, CliResult, FAILURE, SUCCESS};
use crate::output::{key_value_table, print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct ImageOutput {
    sizes: [usize; 5],
    spacing: [f64; 5],
    component_type: String,
    byte_order: &'static str,
    channels: usize,
    lookup_table_entries: Option<usize>,
    metadata_keys: usize,
}

#[derive(Debug, Serialize)]
struct ProbeOutput {
    schema_id: &'static str,
    path: String,
    readable: bool,
    writable: Option<bool>,
    image: Option<ImageOutput>,
}

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let grace = parse_duration(&args.startup_grace)?;
    let mut config = BridgeConfig::from_env().map_err(|err| bridge_error("probe", err))?;
    config.worker = config.worker.with_startup_grace(grace);
    info!(command = %config.worker.display_command(), "starting worker");

    let mut bridge = Bridge::new(config);
    let result = probe(&mut bridge, &args);
    bridge.shutdown();
    let output = result?;

    print_probe(&output, format);
    Ok(if output.readable { SUCCESS } else { FAILURE })
}

fn probe<S>(bridge: &mut Bridge<S>, args: &ProbeArgs) -> CliResult<ProbeOutput>
where
    S: scifio_bridge::process::WorkerChannel,
{
    let readable = bridge
        .probe_readable(&args.path)
        .map_err(|err| bridge_error("canRead", err))?;

    let image = if readable {
        let description = bridge
            .describe(&args.path)
            .map_err(|err| bridge_error("info", err))?;
        Some(image_output(&description))
    } else {
        None
    };

    let writable = if args.writable {
        Some(
            bridge
                .probe_writable(&args.path)
                .map_err(|err| bridge_error("canWrite", err))?,
        )
    } else {
        None
    };

    Ok(ProbeOutput {
        schema_id: "https://schemas.3leaps.dev/scifio-bridge/cli/v1/probe-report.schema.json",
        path: args.path.display().to_string(),
        readable,
        writable,
        image,
    })
}

fn image_output(description: &Description) -> ImageOutput {
    let descriptor = &description.descriptor;
    ImageOutput {
        sizes: descriptor.sizes,
        spacing: descriptor.spacing,
        component_type: descriptor.component_type.to_string(),
        byte_order: byte_order_name(descriptor.byte_order),
        channels: descriptor.channel_count(),
        lookup_table_entries: descriptor.lookup_table.as_ref().map(|lut| lut.len()),
        metadata_keys: description.metadata.len(),
    }
}

fn byte_order_name(order: ByteOrder) -> &'static str {
    match order {
        ByteOrder::LittleEndian => "little",
        ByteOrder::BigEndian => "big",
        ByteOrder::NotApplicable => "n/a",
    }
}

fn print_probe(output: &ProbeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut rows = vec![
                ("path".to_string(), output.path.clone()),
                ("readable".to_string(), output.readable.to_string()),
            ];
            if let Some(writable) = output.writable {
                rows.push(("writable".to_string(), writable.to_string()));
            }
            if let Some(image) = &output.image {
                rows.push(("sizes".to_string(), format!("{:?}", image.sizes)));
                rows.push(("spacing".to_string(), format!("{:?}", image.spacing)));
                rows.push(("component".to_string(), image.component_type.clone()));
                rows.push(("byte order".to_string(), image.byte_order.to_string()));
                rows.push(("channels".to_string(), image.channels.to_string()));
                if let Some(entries) = image.lookup_table_entries {
                    rows.push(("lookup table".to_string(), format!("{entries} entries")));
                }
                rows.push(("metadata keys".to_string(), image.metadata_keys.to_string()));
            }
            println!("{}", key_value_table(rows));
        }
        OutputFormat::Raw => println!("{}", output.readable),
    }
}

#[cfg(test)]
mod tests {
    use scifio_bridge_process::ScriptedChannel;

    use super::*;

    const INFO: &str = "LittleEndian\nfalse\nPixelType\n1\n\
        SizeX\n8\nSizeY\n4\nSizeZ\n1\nSizeT\n1\nSizeC\n1\n\
        RGBChannelCount\n3\n\
        PixelsPhysicalSizeX\n1\nPixelsPhysicalSizeY\n1\nPixelsPhysicalSizeZ\n1\n\
        PixelsPhysicalSizeT\n1\nPixelsPhysicalSizeC\n1\n\n";

    fn args(writable: bool) -> ProbeArgs {
        ProbeArgs {
            path: "/data/rgb.png".into(),
            writable,
            startup_grace: "0ms".to_string(),
        }
    }

    #[test]
    fn readable_file_is_described() {
        let mut channel = ScriptedChannel::new();
        channel.push_output("true\n\n").push_output(INFO).push_output("false\n\n");
        let mut bridge = Bridge::with_channel(channel, FrameSentinel::Lf);

        let output = probe(&mut bridge, &args(true)).expect("probe should succeed");
        assert!(output.readable);
        assert_eq!(output.writable, Some(false));
        let image = output.image.expect("image details");
        assert_eq!(image.sizes, [8, 4, 1, 1, 1]);
        assert_eq!(image.channels, 3);
        assert_eq!(image.byte_order, "big");
        assert_eq!(image.component_type, "uint8");

        let json = serde_json::to_string(&image).expect("serializable");
        assert!(json.contains("\"lookup_table_entries\":null"));
    }

    #[test]
    fn unreadable_file_is_not_described() {
        let mut channel = ScriptedChannel::new();
        channel.push_output("false\n\n");
        let mut bridge = Bridge::with_channel(channel, FrameSentinel::Lf);

        let output = probe(&mut bridge, &args(false)).expect("probe should succeed");
        assert!(!output.readable);
        assert!(output.image.is_none());
        assert_eq!(bridge.channel().remaining(), 0);
    }
}
