use std::io;

pub fn cerr<Int: Copy + TryInto<libc::c_long>>(res: Int) -> io::Result<Int> {
    match res.try_into() {
        Ok(-1) => Err(io::Error::last_os_error()),
        _ => Ok(res),
    }
}

/// Whether a failed system call should simply be retried.
pub fn was_interrupted(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::Interrupted
}
