use std::fs::File;
use std::io::{Error, ErrorKind, Read, Result, Write};
use std::os::fd::FromRawFd;

const WORD: usize = std::mem::size_of::<u64>();

/// Reads one native-endian `u64`. Eventfd reads are all or nothing.
pub(crate) fn read_u64(fd: libc::c_int) -> Result<u64> {
    let mut file = std::mem::ManuallyDrop::new(unsafe { File::from_raw_fd(fd) });
    let mut buffer = 0u64.to_ne_bytes();
    match file.read(&mut buffer)? {
        WORD => Ok(u64::from_ne_bytes(buffer)),
        _ => Err(Error::from(ErrorKind::UnexpectedEof)),
    }
}

/// Writes one native-endian `u64`. Eventfd writes are all or nothing.
pub(crate) fn write_u64(fd: libc::c_int, value: u64) -> Result<()> {
    let mut file = std::mem::ManuallyDrop::new(unsafe { File::from_raw_fd(fd) });
    match file.write(&value.to_ne_bytes())? {
        WORD => Ok(()),
        _ => Err(Error::from(ErrorKind::WriteZero)),
    }
}

pub(crate) fn dup(fd: libc::c_int) -> Result<libc::c_int> {
    let fd = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) };
    if fd >= 0 {
        Ok(fd)
    } else {
        Err(Error::last_os_error())
    }
}

pub(crate) fn close_log_on_error(fd: libc::c_int) {
    if fd >= 0 && unsafe { libc::close(fd) } < 0 {
        log::warn!(
            "libc::close({}) failed: {:?}",
            fd,
            std::io::Error::last_os_error()
        );
    }
}
