use std::io::{Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};

use tracing::{debug, warn};

use crate::channel::ByteChannel;
use crate::error::{ChannelError, ChannelResult};

/// Channel talking to a child process over its standard streams.
///
/// Bytes written go to the child's stdin; bytes read come from its stdout.
/// Both directions block, so a caller interleaving writes and reads against
/// a child that buffers heavily can deadlock itself; such callers should
/// run the two directions from separate threads, or call
/// [`close_input`](Self::close_input) before draining output.
///
/// Dropping the channel closes both pipes and waits for the child to exit.
#[derive(Debug)]
pub struct PipeChannel {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    command: String,
}

impl PipeChannel {
    /// Spawn `program` with `args`, stdin and stdout piped.
    pub fn spawn(program: &str, args: &[&str]) -> ChannelResult<Self> {
        let command = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| ChannelError::Spawn {
                command: command.clone(),
                source,
            })?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        debug!(command = %command, pid = child.id(), "spawned pipe channel");
        Ok(Self {
            child,
            stdin,
            stdout,
            command,
        })
    }

    /// Close the child's stdin, signalling end of input.
    pub fn close_input(&mut self) {
        self.stdin = None;
    }

    /// Close both pipes and wait for the child to exit.
    pub fn wait(mut self) -> ChannelResult<ExitStatus> {
        self.stdin = None;
        self.stdout = None;
        let status = self.child.wait().map_err(|source| ChannelError::Wait {
            command: self.command.clone(),
            source,
        })?;
        Ok(status)
    }

    fn io_err(&self, source: std::io::Error) -> ChannelError {
        ChannelError::Io {
            name: self.name(),
            source,
        }
    }
}

impl ByteChannel for PipeChannel {
    fn read(&mut self, buf: &mut [u8]) -> ChannelResult<usize> {
        let name = self.name();
        match &mut self.stdout {
            Some(out) => {
                let result = out.read(buf);
                result.map_err(|source| ChannelError::Io { name, source })
            }
            None => Err(ChannelError::NotReadable { name }),
        }
    }

    fn write(&mut self, buf: &[u8]) -> ChannelResult<usize> {
        let name = self.name();
        match &mut self.stdin {
            Some(input) => {
                let result = input.write(buf);
                result.map_err(|source| ChannelError::Io { name, source })
            }
            None => Err(ChannelError::NotWritable { name }),
        }
    }

    fn flush(&mut self) -> ChannelResult<()> {
        if let Some(input) = &mut self.stdin {
            let result = input.flush();
            return result.map_err(|e| self.io_err(e));
        }
        Ok(())
    }

    fn is_readable(&self) -> bool {
        self.stdout.is_some()
    }

    fn is_writable(&self) -> bool {
        self.stdin.is_some()
    }

    fn name(&self) -> String {
        format!("pipe:{}", self.command)
    }
}

impl Drop for PipeChannel {
    fn drop(&mut self) {
        self.stdin = None;
        self.stdout = None;
        match self.child.wait() {
            Ok(status) => debug!(command = %self.command, %status, "pipe channel child exited"),
            Err(e) => warn!(command = %self.command, error = %e, "failed to reap pipe channel child"),
        }
    }
}
