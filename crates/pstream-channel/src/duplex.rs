use crate::channel::ByteChannel;
use crate::error::ChannelResult;

/// Pairs an independent input channel and output channel into one
/// bidirectional channel.
///
/// Reads go to the input half, writes and flushes to the output half.
/// Useful when the two directions are physically distinct resources, such
/// as reading one file while writing another, or bridging two memory
/// buffers in a test harness.
#[derive(Debug)]
pub struct DuplexChannel<I, O> {
    input: I,
    output: O,
}

impl<I: ByteChannel, O: ByteChannel> DuplexChannel<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    pub fn into_parts(self) -> (I, O) {
        (self.input, self.output)
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }
}

impl<I: ByteChannel, O: ByteChannel> ByteChannel for DuplexChannel<I, O> {
    fn read(&mut self, buf: &mut [u8]) -> ChannelResult<usize> {
        self.input.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> ChannelResult<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> ChannelResult<()> {
        self.output.flush()
    }

    fn is_readable(&self) -> bool {
        self.input.is_readable()
    }

    fn is_writable(&self) -> bool {
        self.output.is_writable()
    }

    fn name(&self) -> String {
        format!("{}+{}", self.input.name(), self.output.name())
    }
}
