use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;

use serialport::SerialPort;

use super::error::MotionError;

/// Line oriented link to the servo bridge.
pub trait LineTransport: Send {
    fn send_line(&mut self, line: &str) -> io::Result<()>;

    /// Reads one reply line without its terminator. A read timeout surfaces as
    /// `io::ErrorKind::TimedOut`.
    fn read_line(&mut self) -> io::Result<String>;
}

impl<T: LineTransport + ?Sized> LineTransport for Box<T> {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        (**self).send_line(line)
    }

    fn read_line(&mut self) -> io::Result<String> {
        (**self).read_line()
    }
}

pub struct SerialTransport {
    writer: Box<dyn SerialPort>,
    reader: BufReader<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Self, MotionError> {
        log::info!("Opening serial port {} at {} bps", path, baud);

        let writer = serialport::new(path, baud).timeout(timeout).open()?;
        let reader = BufReader::new(writer.try_clone()?);
        let mut transport = Self { writer, reader };
        transport.drain_stale_line();
        Ok(transport)
    }

    /// The bridge prints a banner after reset; throw it away so it is not
    /// mistaken for the first reply.
    fn drain_stale_line(&mut self) {
        std::thread::sleep(Duration::from_secs(1));
        match self.read_line() {
            Ok(line) if !line.is_empty() => log::debug!("Discarded stale line: {}", line),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => log::warn!("Failed to drain serial port: {}", e),
        }
    }
}

impl LineTransport for SerialTransport {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        Ok(line.trim_end().to_string())
    }
}
