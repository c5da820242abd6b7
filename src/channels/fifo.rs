use nix::sys::stat::Mode;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

const READ_CHUNK: usize = 64 * 1024;
const WRITER_POLL: Duration = Duration::from_millis(5);

pub fn make_fifo(path: &Path) -> io::Result<()> {
    nix::unistd::mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR).map_err(io::Error::from)
}

pub fn is_fifo(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_fifo())
        .unwrap_or(false)
}

/// Opens the read end without waiting for a writer.
pub fn open_read_nonblocking(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
        .open(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// Waits until `file` has data or its writer hung up. A pipe that never had
/// a writer stays not ready.
pub fn wait_readable(file: &File, timeout: Duration) -> io::Result<Readiness> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let millis = remaining.as_millis().min(i32::MAX as u128) as libc::c_int;
        let mut fds = [libc::pollfd {
            fd: file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        }];
        // Safety: `fds` is a valid array of one pollfd over an fd that
        // `file` keeps open for the duration of the call.
        #[allow(unsafe_code)]
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if rc == 0 {
            return Ok(Readiness::TimedOut);
        }
        if fds[0].revents & libc::POLLNVAL != 0 {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }
        return Ok(Readiness::Ready);
    }
}

#[derive(Debug)]
pub enum PipeReadError {
    TimedOut,
    Io(io::Error),
}

/// Reads a pipe until its writer closes. Every wait for more data, including
/// the first, is bounded by `timeout`.
pub fn read_pipe(path: &Path, timeout: Duration) -> Result<Vec<u8>, PipeReadError> {
    let mut file = open_read_nonblocking(path).map_err(PipeReadError::Io)?;
    let mut payload = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match wait_readable(&file, timeout).map_err(PipeReadError::Io)? {
            Readiness::TimedOut => return Err(PipeReadError::TimedOut),
            Readiness::Ready => {}
        }
        loop {
            match file.read(&mut chunk) {
                Ok(0) => return Ok(payload),
                Ok(n) => payload.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(PipeReadError::Io(err)),
            }
        }
    }
}

/// Opens the write end once the model has opened the read end. Gives up
/// with `None` as soon as `cancelled` returns true.
pub fn open_write_when_read<F>(path: &Path, cancelled: F) -> io::Result<Option<File>>
where
    F: Fn() -> bool,
{
    loop {
        let opened = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(path);
        match opened {
            Ok(file) => {
                set_blocking(&file)?;
                return Ok(Some(file));
            }
            Err(err) if err.raw_os_error() == Some(libc::ENXIO) => {
                if cancelled() {
                    return Ok(None);
                }
                thread::sleep(WRITER_POLL);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
}

fn set_blocking(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    // Safety: `fcntl(F_GETFL)` and `fcntl(F_SETFL)` are safe system calls on
    // a valid, open file descriptor.
    #[allow(unsafe_code)]
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags == -1 {
        return Err(io::Error::last_os_error());
    }
    #[allow(unsafe_code)]
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_times_out_when_no_writer_appears() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("never.OUT");
        make_fifo(&path).expect("mkfifo");
        assert!(is_fifo(&path));

        let started = Instant::now();
        let result = read_pipe(&path, Duration::from_millis(150));
        assert!(matches!(result, Err(PipeReadError::TimedOut)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn read_collects_payload_until_writer_closes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.OUT");
        make_fifo(&path).expect("mkfifo");

        let writer_path = path.clone();
        let writer = thread::spawn(move || {
            let mut file = OpenOptions::new()
                .write(true)
                .open(&writer_path)
                .expect("open writer");
            file.write_all(b"first\n").expect("write");
            thread::sleep(Duration::from_millis(50));
            file.write_all(b"second\n").expect("write");
        });

        let payload = read_pipe(&path, Duration::from_secs(2)).expect("read");
        writer.join().expect("writer");
        assert_eq!(payload, b"first\nsecond\n");
    }

    #[test]
    fn writer_waits_for_reader_then_delivers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("input.WTH");
        make_fifo(&path).expect("mkfifo");

        let writer_path = path.clone();
        let writer = thread::spawn(move || {
            let mut file = open_write_when_read(&writer_path, || false)
                .expect("open")
                .expect("reader arrived");
            file.write_all(b"weather\n").expect("write");
        });
        thread::sleep(Duration::from_millis(30));
        let payload = read_pipe(&path, Duration::from_secs(2)).expect("read");
        writer.join().expect("writer");
        assert_eq!(payload, b"weather\n");
    }

    #[test]
    fn cancelled_writer_gives_up_without_a_reader() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stranded.v47");
        make_fifo(&path).expect("mkfifo");

        let opened = open_write_when_read(&path, || true).expect("open");
        assert!(opened.is_none());
    }
}
