use std::path::Path;

use scifio_bridge_frame::{DiagnosticPolicy, FrameReader, FrameSentinel};
use scifio_bridge_meta::{
    ImageDescriptor, LookupTable, MetadataDictionary, MetadataValue, Region,
};
use scifio_bridge_process::{WorkerChannel, WorkerConfig, WorkerSession};
use tracing::debug;

use crate::command::{self, CAN_READ, CAN_WRITE, INFO};
use crate::error::{BridgeError, Result};
use crate::transfer::{read_region_data, write_region_data, WriteStats};

/// Largest chunk written to the worker before waiting for an acknowledgement.
pub const DEFAULT_WRITE_CHUNK_SIZE: usize = 10_000;

/// Configuration for a [`Bridge`] backed by a real worker process.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How to launch the worker.
    pub worker: WorkerConfig,
    /// Frame terminator the worker uses.
    pub sentinel: FrameSentinel,
    /// Chunk size for the write handshake.
    pub write_chunk_size: usize,
    /// What to do with worker diagnostic output.
    pub diagnostics: DiagnosticPolicy,
}

impl BridgeConfig {
    /// Defaults around an explicit worker command.
    pub fn new(worker: WorkerConfig) -> Self {
        Self {
            worker,
            sentinel: FrameSentinel::platform(),
            write_chunk_size: DEFAULT_WRITE_CHUNK_SIZE,
            diagnostics: DiagnosticPolicy::Capture,
        }
    }

    /// Defaults around the java worker resolved from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(WorkerConfig::from_env()?))
    }
}

/// Reply to an `info` request.
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    pub descriptor: ImageDescriptor,
    /// Every key the worker reported, including the ones in `descriptor`.
    pub metadata: MetadataDictionary,
}

impl Description {
    /// Build a write request for `region` that carries this image's format and metadata.
    pub fn write_request(&self, region: Region) -> WriteRequest {
        WriteRequest {
            region,
            descriptor: self.descriptor.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Everything a `write` needs besides the pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub region: Region,
    pub descriptor: ImageDescriptor,
    /// Metadata to forward; supplies the lookup table when it declares one.
    pub metadata: MetadataDictionary,
}

impl WriteRequest {
    pub fn new(region: Region, descriptor: ImageDescriptor) -> Self {
        Self {
            region,
            descriptor,
            metadata: MetadataDictionary::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataDictionary) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Synchronous client for one SCIFIO worker.
///
/// The worker is started on the first request and reused while it stays
/// alive. A failed request tears it down; the next request starts a new one.
/// Every method takes `&mut self`, so at most one command is ever in flight.
pub struct Bridge<C: WorkerChannel = WorkerSession> {
    channel: C,
    sentinel: FrameSentinel,
    write_chunk_size: usize,
    diagnostics: DiagnosticPolicy,
}

impl Bridge<WorkerSession> {
    /// A bridge to the java worker configured by `SCIFIO_PATH` and `JAVA_HOME`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(BridgeConfig::from_env()?))
    }

    pub fn new(config: BridgeConfig) -> Self {
        Self {
            channel: WorkerSession::new(config.worker),
            sentinel: config.sentinel,
            write_chunk_size: config.write_chunk_size,
            diagnostics: config.diagnostics,
        }
    }
}

impl<C: WorkerChannel> Bridge<C> {
    /// A bridge over any worker channel.
    pub fn with_channel(channel: C, sentinel: FrameSentinel) -> Self {
        Self {
            channel,
            sentinel,
            write_chunk_size: DEFAULT_WRITE_CHUNK_SIZE,
            diagnostics: DiagnosticPolicy::Capture,
        }
    }

    pub fn with_write_chunk_size(mut self, size: usize) -> Self {
        self.write_chunk_size = size;
        self
    }

    pub fn with_diagnostic_policy(mut self, policy: DiagnosticPolicy) -> Self {
        self.diagnostics = policy;
        self
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn sentinel(&self) -> FrameSentinel {
        self.sentinel
    }

    /// Ask the worker whether it can read `path`.
    pub fn probe_readable(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = command_path(path.as_ref())?;
        self.request(&command::probe_readable(path))?;
        self.read_bool(CAN_READ)
    }

    /// Ask the worker whether it can write `path`.
    pub fn probe_writable(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = command_path(path.as_ref())?;
        self.request(&command::probe_writable(path))?;
        self.read_bool(CAN_WRITE)
    }

    /// Read the image metadata of `path`.
    pub fn describe(&mut self, path: impl AsRef<Path>) -> Result<Description> {
        let path = command_path(path.as_ref())?;
        self.request(&command::describe(path))?;

        let frame = self.reader().read_text_frame(INFO)?;
        let metadata = MetadataDictionary::parse(&frame.text(), self.sentinel);
        debug!(path, keys = metadata.len(), "metadata received");

        match ImageDescriptor::from_metadata(&metadata) {
            Ok(descriptor) => Ok(Description {
                descriptor,
                metadata,
            }),
            Err(err) => {
                self.channel.shutdown();
                Err(err.into())
            }
        }
    }

    /// Read the pixels of `region` into a new buffer.
    pub fn read(
        &mut self,
        path: impl AsRef<Path>,
        region: &Region,
        descriptor: &ImageDescriptor,
    ) -> Result<Vec<u8>> {
        let mut data = vec![0u8; descriptor.byte_count(region)?];
        self.read_into(path, region, descriptor, &mut data)?;
        Ok(data)
    }

    /// Read the pixels of `region` into `dst`, which must be exactly the region's size.
    pub fn read_into(
        &mut self,
        path: impl AsRef<Path>,
        region: &Region,
        descriptor: &ImageDescriptor,
        dst: &mut [u8],
    ) -> Result<()> {
        let path = command_path(path.as_ref())?;
        let expected = descriptor.byte_count(region)?;
        if dst.len() != expected {
            return Err(BridgeError::BufferSize {
                expected,
                actual: dst.len(),
            });
        }

        self.request(&command::read_region(path, region))?;
        let mut reader = self.reader();
        read_region_data(&mut reader, dst)
    }

    /// Write `data` as `request.region` of `path`.
    pub fn write(
        &mut self,
        path: impl AsRef<Path>,
        request: &WriteRequest,
        data: &[u8],
    ) -> Result<WriteStats> {
        let path = command_path(path.as_ref())?;
        let descriptor = &request.descriptor;
        let expected = descriptor.byte_count(&request.region)?;
        if data.len() < expected {
            return Err(BridgeError::BufferSize {
                expected,
                actual: data.len(),
            });
        }

        let from_metadata = LookupTable::from_dictionary(&request.metadata)?;
        let lookup_table = from_metadata.as_ref().or(descriptor.lookup_table.as_ref());

        let line = command::write_region(
            path,
            descriptor.byte_order,
            &request.region,
            &descriptor.spacing,
            descriptor.component_type,
            descriptor.channel_count(),
            lookup_table,
        );
        self.request(&line)?;

        let chunk_size = self.write_chunk_size;
        let mut reader = self.reader();
        write_region_data(&mut reader, &request.region, data, chunk_size)
    }

    /// Stop the worker. The next request starts a new one.
    pub fn shutdown(&mut self) {
        self.channel.shutdown();
    }

    fn request(&mut self, line: &str) -> Result<()> {
        self.channel.ensure_running()?;
        debug!(command = line.trim_end(), "sending command");
        if let Err(err) = self.channel.send(line.as_bytes()) {
            self.channel.shutdown();
            return Err(err.into());
        }
        Ok(())
    }

    fn reader(&mut self) -> FrameReader<'_, C> {
        FrameReader::new(&mut self.channel, self.sentinel).with_policy(self.diagnostics)
    }

    fn read_bool(&mut self, context: &'static str) -> Result<bool> {
        let frame = self.reader().read_text_frame(context)?;
        let line = frame.first_line();
        debug!(context, result = %line, "probe answered");
        match bool::parse_value(&line) {
            Some(answer) => Ok(answer),
            None => {
                self.channel.shutdown();
                Err(BridgeError::Protocol {
                    context,
                    message: format!("expected a boolean, got {line:?}"),
                })
            }
        }
    }
}

impl<C: WorkerChannel> Drop for Bridge<C> {
    fn drop(&mut self) {
        self.channel.shutdown();
    }
}

/// Paths travel inside tab-separated lines.
fn command_path(path: &Path) -> Result<&str> {
    match path.to_str() {
        Some(text) if !text.contains(['\t', '\n', '\r']) => Ok(text),
        _ => Err(BridgeError::InvalidPath(path.display().to_string())),
    }
}
