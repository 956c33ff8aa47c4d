//! Userspace I2C bus access through the Linux `i2c-dev` interface
//!
//! A handle wraps one open `/dev/i2c-{N}` node and implements the
//! [`embedded-hal`] blocking I2C trait, so device code stays generic over the
//! bus it runs on.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal

use std::{
    error, fmt,
    fs::OpenOptions,
    io,
    os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, RawFd},
};

use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};

use crate::device::OpenBus;

pub struct I2cBus(RawFd);

/// An i2c wrapper around std::io::Error.
#[derive(Debug)]
pub struct I2cError(io::Error);

impl fmt::Display for I2cError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<io::Error> for I2cError {
    fn from(err: io::Error) -> I2cError {
        I2cError(err)
    }
}

impl error::Error for I2cError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_hal::i2c::Error for I2cError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind::*, NoAcknowledgeSource};
        match self.0.raw_os_error() {
            // Most adapter drivers report a NAKed transfer as EREMOTEIO and a
            // missing device as ENXIO; plain EIO stays ambiguous
            Some(libc::EREMOTEIO) | Some(libc::ENXIO) => {
                NoAcknowledge(NoAcknowledgeSource::Unknown)
            },
            Some(libc::EAGAIN) => ArbitrationLoss,
            Some(libc::EBUSY) | Some(libc::ETIMEDOUT) => Bus,
            _ => Other,
        }
    }
}

impl FromRawFd for I2cBus {
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        I2cBus(fd)
    }
}

impl IntoRawFd for I2cBus {
    fn into_raw_fd(self) -> RawFd {
        self.0
    }
}

impl AsRawFd for I2cBus {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl Drop for I2cBus {
    fn drop(&mut self) {
        unsafe { libc::close(self.0) };
    }
}

impl I2cBus {
    pub fn from_unit(unit: u32) -> Result<I2cBus, I2cError> {
        Self::from_path(format!("/dev/i2c-{}", unit))
    }

    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<I2cBus, I2cError> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map(|f| I2cBus(f.into_raw_fd()))
            .map_err(|e| e.into())
    }
}

impl ErrorType for I2cBus {
    type Error = I2cError;
}

impl I2c<SevenBitAddress> for I2cBus {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        // The kernel issues a repeated start between the messages of one
        // I2C_RDWR call and a stop after the last one.
        let msgs = operations
            .iter_mut()
            .map(|op| match op {
                Operation::Read(buffer) => i2c_msg {
                    addr: address as u16,
                    flags: I2C_M_RD,
                    len: buffer.len() as u16,
                    buf: buffer.as_mut_ptr(),
                },
                Operation::Write(bytes) => i2c_msg {
                    addr: address as u16,
                    flags: 0,
                    len: bytes.len() as u16,
                    buf: bytes.as_ptr() as *mut _,
                },
            })
            .collect::<Vec<_>>();
        rdwr(self.0, &msgs)
    }
}

/// Opens a fresh `/dev/i2c-{N}` handle per call.
pub struct BusUnit(pub u32);

impl OpenBus for BusUnit {
    type Bus = I2cBus;

    fn open(&self) -> Result<I2cBus, I2cError> {
        I2cBus::from_unit(self.0)
    }
}

const I2C_RDWR: libc::c_ulong = 0x0707;
const I2C_M_RD: u16 = 0x0001;

#[repr(C)]
#[allow(non_camel_case_types)]
struct i2c_msg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

#[repr(C)]
#[allow(non_camel_case_types)]
struct i2c_rdwr_ioctl_data {
    msgs: *const i2c_msg,
    nmsgs: u32,
}

fn rdwr(fd: RawFd, msgs: &[i2c_msg]) -> Result<(), I2cError> {
    let mut dat = i2c_rdwr_ioctl_data { msgs: msgs.as_ptr(), nmsgs: msgs.len() as u32 };
    let res = unsafe { libc::ioctl(fd, I2C_RDWR, &mut dat as *mut _) };
    if res == -1 {
        return Err(I2cError(io::Error::last_os_error()));
    }
    Ok(())
}
