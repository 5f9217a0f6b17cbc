use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Line settings for a serial device.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyS2`.
    pub path: PathBuf,
    /// Line speed in bits per second.
    pub baud_rate: u32,
    /// Upper bound on a single blocking read. Rounded up to tenths of a second.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/ttyS2"),
            baud_rate: 115_200,
            read_timeout: Duration::from_secs(1),
        }
    }
}

impl SerialConfig {
    /// Settings for `path` with the default speed and timeout.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

/// A termios serial device in raw 8N1 mode with no flow control.
///
/// Reads use `VMIN=0` with `VTIME` set from the configured read timeout, so a
/// read returns whatever arrived or `Ok(0)` once the timeout elapses.
pub struct SerialPort {
    config: SerialConfig,
    file: Mutex<Option<Arc<File>>>,
}

impl SerialPort {
    /// Create a closed port for the given settings.
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            file: Mutex::new(None),
        }
    }

    /// Device settings.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<File>>> {
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn handle(&self) -> Result<Arc<File>> {
        self.slot().clone().ok_or(TransportError::NotOpen)
    }

    fn configure(&self, file: &File) -> Result<()> {
        let speed = termios_speed(self.config.baud_rate)?;
        let vtime = read_timeout_deciseconds(self.config.read_timeout);
        let fd = file.as_raw_fd();
        let configure_err = |source: std::io::Error| TransportError::Configure {
            path: self.config.path.clone(),
            source,
        };

        // SAFETY: `termios` is a plain C struct; all-zero is a valid bit pattern and it
        // is fully overwritten by `tcgetattr` before use.
        let mut tty: libc::termios = unsafe { std::mem::zeroed() };

        // SAFETY: `fd` is an open descriptor owned by `file` and `tty` is a valid
        // writable termios struct.
        if unsafe { libc::tcgetattr(fd, &mut tty) } != 0 {
            return Err(configure_err(std::io::Error::last_os_error()));
        }

        // SAFETY: `tty` is a valid termios struct obtained from `tcgetattr`.
        unsafe {
            libc::cfmakeraw(&mut tty);
            libc::cfsetispeed(&mut tty, speed);
            libc::cfsetospeed(&mut tty, speed);
        }

        tty.c_cflag |= libc::CREAD | libc::CLOCAL;
        tty.c_cflag &= !libc::CSIZE;
        tty.c_cflag |= libc::CS8;
        tty.c_cflag &= !(libc::PARENB | libc::CSTOPB | libc::CRTSCTS);
        tty.c_iflag &= !(libc::IXON | libc::IXOFF | libc::IXANY);
        tty.c_cc[libc::VMIN] = 0;
        tty.c_cc[libc::VTIME] = vtime;

        // SAFETY: `fd` is open; `tty` is a fully initialized termios struct.
        unsafe {
            libc::tcflush(fd, libc::TCIFLUSH);
            if libc::tcsetattr(fd, libc::TCSANOW, &tty) != 0 {
                return Err(configure_err(std::io::Error::last_os_error()));
            }
        }

        // Opened non-blocking so a missing carrier cannot hang `open`; reads block
        // (bounded by VTIME) from here on.
        // SAFETY: `fd` is an open descriptor; F_SETFL with 0 clears O_NONBLOCK.
        if unsafe { libc::fcntl(fd, libc::F_SETFL, 0) } != 0 {
            return Err(configure_err(std::io::Error::last_os_error()));
        }

        Ok(())
    }
}

impl Transport for SerialPort {
    fn open(&self) -> Result<()> {
        let mut slot = self.slot();
        if slot.is_some() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&self.config.path)
            .map_err(|source| TransportError::Open {
                path: self.config.path.clone(),
                source,
            })?;
        self.configure(&file)?;

        info!(
            path = %self.config.path.display(),
            baud = self.config.baud_rate,
            "serial port open"
        );
        *slot = Some(Arc::new(file));
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if self.slot().take().is_some() {
            debug!(path = %self.config.path.display(), "serial port closed");
        }
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let file = self.handle()?;
        Ok((&*file).read(buf)?)
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        let file = self.handle()?;
        Ok((&*file).write(buf)?)
    }

    fn is_open(&self) -> bool {
        self.slot().is_some()
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.config.path)
            .field("baud_rate", &self.config.baud_rate)
            .field("open", &self.is_open())
            .finish()
    }
}

fn termios_speed(baud: u32) -> Result<libc::speed_t> {
    let speed = match baud {
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        #[cfg(target_os = "linux")]
        460_800 => libc::B460800,
        #[cfg(target_os = "linux")]
        921_600 => libc::B921600,
        other => return Err(TransportError::UnsupportedBaud(other)),
    };
    Ok(speed)
}

fn read_timeout_deciseconds(timeout: Duration) -> libc::cc_t {
    let tenths = timeout.as_millis().div_ceil(100).clamp(1, 255);
    tenths as libc::cc_t
}
