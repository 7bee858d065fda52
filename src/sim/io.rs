//! IO devices for the simulator.
//!
//! The machine's `INP` and `OUT` instructions exchange whole lines of text
//! with whatever implements [`IODevice`]. Three devices are provided:
//! - [`EmptyIO`]: a disconnected device, for programs that do no IO;
//! - [`BufferedIO`]: backed by in-memory buffers, for tests and for
//!   programmatic runs;
//! - [`BiChannelIO`]: backed by a pair of channels serviced by worker
//!   threads, notably [`BiChannelIO::stdio`] for interactive runs.
//!
//! [`SimIO`] wraps the three so a [`Simulator`] can hold any of them
//! without a generic parameter.
//!
//! [`Simulator`]: crate::sim::Simulator

use std::collections::VecDeque;
use std::io::BufRead as _;
use std::sync::{Arc, RwLock};

use crossbeam_channel as cbc;

/// A line-oriented IO device the simulator can attach to.
pub trait IODevice {
    /// Reads one line of input, blocking until one is available.
    ///
    /// Returns `None` if the input source is closed and no more lines
    /// will ever arrive.
    fn read_line(&mut self) -> Option<String>;

    /// Writes one line of output.
    ///
    /// Returns whether the line was accepted; `false` means the output
    /// sink is gone.
    fn write_line(&mut self, line: &str) -> bool;

    /// Closes the device, releasing any resources it holds.
    fn close(self);
}

/// A device that is not connected to anything.
///
/// Reads report a closed input and writes are rejected.
pub struct EmptyIO;
impl IODevice for EmptyIO {
    fn read_line(&mut self) -> Option<String> {
        None
    }

    fn write_line(&mut self, _line: &str) -> bool {
        false
    }

    fn close(self) {}
}

/// A device backed by shared in-memory buffers.
///
/// Input lines are popped from a queue that can be filled before or during
/// the run; output lines are appended to a vector. Both sides are behind
/// `Arc<RwLock>` so a test can hold handles to them while the simulator
/// owns the device.
#[derive(Debug, Clone, Default)]
pub struct BufferedIO {
    input: Arc<RwLock<VecDeque<String>>>,
    output: Arc<RwLock<Vec<String>>>,
}

impl BufferedIO {
    /// Creates a device with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a device whose input queue starts with the given lines.
    pub fn with_input(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let io = Self::new();
        io.input.write().unwrap_or_else(|e| e.into_inner())
            .extend(lines.into_iter().map(Into::into));
        io
    }

    /// Gets a handle to the input queue.
    pub fn get_input(&self) -> Arc<RwLock<VecDeque<String>>> {
        Arc::clone(&self.input)
    }

    /// Gets a handle to the output lines.
    pub fn get_output(&self) -> Arc<RwLock<Vec<String>>> {
        Arc::clone(&self.output)
    }
}

impl IODevice for BufferedIO {
    fn read_line(&mut self) -> Option<String> {
        self.input.write().unwrap_or_else(|e| e.into_inner()).pop_front()
    }

    fn write_line(&mut self, line: &str) -> bool {
        self.output.write().unwrap_or_else(|e| e.into_inner()).push(line.to_string());
        true
    }

    fn close(self) {}
}

/// A device backed by a channel pair, each serviced by a worker thread.
///
/// The reader thread pulls lines from a source and forwards them into the
/// input channel; the writer thread drains the output channel into a sink.
/// The simulator side only ever touches the channels, so a blocking source
/// (like stdin) never blocks anything but its own thread.
pub struct BiChannelIO {
    read: cbc::Receiver<String>,
    write: cbc::Sender<String>,
    write_handle: std::thread::JoinHandle<()>,
}

impl BiChannelIO {
    /// Creates a device serviced by the given reader and writer.
    ///
    /// The reader is called repeatedly for one line at a time; it should
    /// block until a line is available and return `None` once its source
    /// is exhausted, which ends the reader thread.
    pub fn new(
        mut reader: impl FnMut() -> Option<String> + Send + 'static,
        mut writer: impl FnMut(&str) + Send + 'static,
    ) -> Self {
        let (in_tx, in_rx) = cbc::unbounded();
        let (out_tx, out_rx) = cbc::unbounded::<String>();

        std::thread::spawn(move || {
            while let Some(line) = reader() {
                if in_tx.send(line).is_err() {
                    return;
                }
            }
        });
        let write_handle = std::thread::spawn(move || {
            while let Ok(line) = out_rx.recv() {
                writer(&line);
            }
        });

        Self { read: in_rx, write: out_tx, write_handle }
    }

    /// Creates a device reading lines from stdin and printing lines to
    /// stdout.
    pub fn stdio() -> Self {
        Self::new(
            || {
                let mut buf = String::new();
                let n = std::io::stdin().lock().read_line(&mut buf).ok()?;
                (n > 0).then(|| buf.trim_end_matches(&['\r', '\n'][..]).to_string())
            },
            |line| println!("{line}"),
        )
    }
}

impl IODevice for BiChannelIO {
    fn read_line(&mut self) -> Option<String> {
        self.read.recv().ok()
    }

    fn write_line(&mut self, line: &str) -> bool {
        self.write.send(line.to_string()).is_ok()
    }

    fn close(self) {
        // Dropping the sender lets the writer thread drain and exit.
        // The reader thread may still be blocked on its source (e.g. a
        // stdin read with no input coming), so it is not joined.
        drop(self.write);
        let _ = self.write_handle.join();
    }
}

/// An IO device attached to a simulator.
///
/// Constructed via the `From` impls of its variants.
#[derive(Default)]
pub enum SimIO {
    /// No connected device.
    #[default]
    Empty,
    /// A [`BufferedIO`] device.
    Buffered(BufferedIO),
    /// A [`BiChannelIO`] device.
    BiChannel(BiChannelIO),
}

impl std::fmt::Debug for SimIO {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimIO::Empty => f.write_str("SimIO::Empty"),
            SimIO::Buffered(io) => f.debug_tuple("SimIO::Buffered").field(io).finish(),
            SimIO::BiChannel(_) => f.write_str("SimIO::BiChannel(..)"),
        }
    }
}

impl From<EmptyIO> for SimIO {
    fn from(_: EmptyIO) -> Self {
        SimIO::Empty
    }
}
impl From<BufferedIO> for SimIO {
    fn from(io: BufferedIO) -> Self {
        SimIO::Buffered(io)
    }
}
impl From<BiChannelIO> for SimIO {
    fn from(io: BiChannelIO) -> Self {
        SimIO::BiChannel(io)
    }
}

impl IODevice for SimIO {
    fn read_line(&mut self) -> Option<String> {
        match self {
            SimIO::Empty => None,
            SimIO::Buffered(io) => io.read_line(),
            SimIO::BiChannel(io) => io.read_line(),
        }
    }

    fn write_line(&mut self, line: &str) -> bool {
        match self {
            SimIO::Empty => false,
            SimIO::Buffered(io) => io.write_line(line),
            SimIO::BiChannel(io) => io.write_line(line),
        }
    }

    fn close(self) {
        match self {
            SimIO::Empty => {},
            SimIO::Buffered(io) => io.close(),
            SimIO::BiChannel(io) => io.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BiChannelIO, BufferedIO, EmptyIO, IODevice};

    #[test]
    fn test_empty_io() {
        let mut io = EmptyIO;
        assert_eq!(io.read_line(), None);
        assert!(!io.write_line("5"));
    }

    #[test]
    fn test_buffered_io() {
        let mut io = BufferedIO::with_input(["12", "34"]);
        let output = io.get_output();

        assert_eq!(io.read_line().as_deref(), Some("12"));
        assert_eq!(io.read_line().as_deref(), Some("34"));
        assert_eq!(io.read_line(), None);

        assert!(io.write_line("46"));
        assert_eq!(*output.read().unwrap(), vec!["46".to_string()]);
    }

    #[test]
    fn test_buffered_io_refillable() {
        let mut io = BufferedIO::new();
        assert_eq!(io.read_line(), None);

        io.get_input().write().unwrap().push_back("7".to_string());
        assert_eq!(io.read_line().as_deref(), Some("7"));
    }

    #[test]
    fn test_bichannel_io() {
        let (tx, rx) = crossbeam_channel::unbounded::<String>();

        let mut lines = vec!["1".to_string(), "2".to_string()].into_iter();
        let mut io = BiChannelIO::new(
            move || lines.next(),
            move |line| { let _ = tx.send(line.to_string()); },
        );

        assert_eq!(io.read_line().as_deref(), Some("1"));
        assert_eq!(io.read_line().as_deref(), Some("2"));
        assert_eq!(io.read_line(), None);

        assert!(io.write_line("3"));
        io.close();
        assert_eq!(rx.recv().unwrap(), "3");
    }
}
