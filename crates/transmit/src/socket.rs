//! crates/transmit/src/socket.rs
//!
//! Non-blocking Unix socket transmitter over `writev` and `sendfile`.

use std::fs::File;
use std::io::{self, IoSlice};
use std::os::fd::{AsRawFd, RawFd};

use crate::{Outcome, Transmitted, Transmitter, total_len};

/// Drives a non-blocking socket with vectored writes and zero-copy file
/// sends.
///
/// The transmitter borrows the descriptor by value: the caller owns the
/// socket and must keep it open for the transmitter's lifetime, the same
/// contract as handing a raw fd to any syscall wrapper.
#[derive(Debug)]
pub struct SocketTransmitter {
    fd: RawFd,
}

impl SocketTransmitter {
    /// Wraps an already-connected, non-blocking socket descriptor.
    #[must_use]
    pub const fn new(fd: RawFd) -> Self {
        Self { fd }
    }
}

/// Maps a retryable errno to its outcome; `None` means fatal.
fn errno_outcome(err: &io::Error) -> Option<Outcome> {
    match err.raw_os_error() {
        Some(libc::EINTR) => Some(Outcome::Interrupted),
        Some(code) if code == libc::EAGAIN || code == libc::EWOULDBLOCK => {
            Some(Outcome::WouldBlock)
        }
        _ => None,
    }
}

/// One `writev` attempt. Retry decisions belong to the caller.
fn writev_once(fd: RawFd, bufs: &[IoSlice<'_>]) -> io::Result<Transmitted> {
    if bufs.is_empty() {
        return Ok(Transmitted::complete(0));
    }

    // SAFETY: IoSlice is guaranteed ABI-compatible with iovec, and the
    // slices outlive the call.
    let rc = unsafe {
        libc::writev(
            fd,
            bufs.as_ptr().cast::<libc::iovec>(),
            bufs.len() as libc::c_int,
        )
    };

    if rc < 0 {
        let err = io::Error::last_os_error();
        return match errno_outcome(&err) {
            Some(outcome) => {
                tracing::info!(?outcome, "writev sent nothing");
                Ok(Transmitted { sent: 0, outcome })
            }
            None => Err(err),
        };
    }

    tracing::trace!(sent = rc, requested = total_len(bufs), "writev");
    Ok(Transmitted::complete(rc as u64))
}

impl Transmitter for SocketTransmitter {
    fn send_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<Transmitted> {
        writev_once(self.fd, bufs)
    }

    #[cfg(target_os = "linux")]
    fn send_file(
        &mut self,
        file: &File,
        offset: u64,
        len: u64,
        _header_hint: u64,
        header: &[IoSlice<'_>],
        trailer: &[IoSlice<'_>],
    ) -> io::Result<Transmitted> {
        // Linux sendfile carries no header/trailer vectors, so they ride
        // as separate vectored writes around the zero-copy transfer. A
        // short or retryable stage ends the attempt with the bytes so far.
        let mut total = 0u64;

        if !header.is_empty() {
            let hdr = writev_once(self.fd, header)?;
            total += hdr.sent;
            if hdr.outcome != Outcome::Complete || hdr.sent < total_len(header) {
                return Ok(Transmitted {
                    sent: total,
                    outcome: hdr.outcome,
                });
            }
        }

        let mut off = offset as libc::off_t;
        // SAFETY: both descriptors are valid for the duration of the call;
        // the explicit offset pointer leaves the file's position untouched.
        let rc = unsafe { libc::sendfile(self.fd, file.as_raw_fd(), &mut off, len as usize) };

        if rc < 0 {
            let err = io::Error::last_os_error();
            return match errno_outcome(&err) {
                Some(outcome) => {
                    tracing::info!(sent = total, ?outcome, "sendfile stopped early");
                    Ok(Transmitted {
                        sent: total,
                        outcome,
                    })
                }
                None => Err(err),
            };
        }

        total += rc as u64;
        tracing::trace!(sent = rc, offset, requested = len, "sendfile");
        if (rc as u64) < len {
            // Socket buffer filled inside the file region.
            return Ok(Transmitted::complete(total));
        }

        if !trailer.is_empty() {
            let trl = writev_once(self.fd, trailer)?;
            total += trl.sent;
            if trl.outcome != Outcome::Complete {
                return Ok(Transmitted {
                    sent: total,
                    outcome: trl.outcome,
                });
            }
        }

        Ok(Transmitted::complete(total))
    }

    #[cfg(target_os = "freebsd")]
    fn send_file(
        &mut self,
        file: &File,
        offset: u64,
        len: u64,
        header_hint: u64,
        header: &[IoSlice<'_>],
        trailer: &[IoSlice<'_>],
    ) -> io::Result<Transmitted> {
        let hdtr = libc::sf_hdtr {
            headers: header.as_ptr().cast::<libc::iovec>().cast_mut(),
            hdr_cnt: header.len() as libc::c_int,
            trailers: trailer.as_ptr().cast::<libc::iovec>().cast_mut(),
            trl_cnt: trailer.len() as libc::c_int,
        };
        let mut sbytes: libc::off_t = 0;
        // Older kernels only honor the length parameter when it covers the
        // header bytes too; the caller folds them in via `header_hint`.
        let nbytes = (len + header_hint) as usize;

        // SAFETY: descriptors, iovec arrays, and the sbytes out-parameter
        // are valid for the duration of the call.
        let rc = unsafe {
            libc::sendfile(
                file.as_raw_fd(),
                self.fd,
                offset as libc::off_t,
                nbytes,
                std::ptr::from_ref(&hdtr).cast_mut(),
                &mut sbytes,
                0,
            )
        };

        let sent = sbytes as u64;
        if rc < 0 {
            let err = io::Error::last_os_error();
            return match errno_outcome(&err) {
                Some(outcome) => {
                    // sendfile reports how far it got through sbytes even
                    // when it stops on EINTR/EAGAIN.
                    tracing::info!(sent, ?outcome, "sendfile stopped early");
                    Ok(Transmitted { sent, outcome })
                }
                None => Err(err),
            };
        }

        tracing::trace!(sent, offset, requested = nbytes, "sendfile");
        Ok(Transmitted::complete(sent))
    }

    #[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
    fn send_file(
        &mut self,
        file: &File,
        offset: u64,
        len: u64,
        _header_hint: u64,
        header: &[IoSlice<'_>],
        trailer: &[IoSlice<'_>],
    ) -> io::Result<Transmitted> {
        // Portable staging path: read the file region through userspace and
        // push it with plain writes.
        use std::os::unix::fs::FileExt;

        let mut total = 0u64;

        if !header.is_empty() {
            let hdr = writev_once(self.fd, header)?;
            total += hdr.sent;
            if hdr.outcome != Outcome::Complete || hdr.sent < total_len(header) {
                return Ok(Transmitted {
                    sent: total,
                    outcome: hdr.outcome,
                });
            }
        }

        let mut buf = vec![0u8; (len as usize).min(256 * 1024)];
        let mut file_sent = 0u64;
        while file_sent < len {
            let want = ((len - file_sent) as usize).min(buf.len());
            let got = file.read_at(&mut buf[..want], offset + file_sent)?;
            if got == 0 {
                break;
            }
            // SAFETY: the buffer slice is valid and fd is owned by the
            // caller for the duration of the call.
            let rc = unsafe {
                libc::write(self.fd, buf.as_ptr().cast::<libc::c_void>(), got)
            };
            if rc < 0 {
                let err = io::Error::last_os_error();
                return match errno_outcome(&err) {
                    Some(outcome) => Ok(Transmitted {
                        sent: total,
                        outcome,
                    }),
                    None => Err(err),
                };
            }
            total += rc as u64;
            file_sent += rc as u64;
            if (rc as usize) < got {
                return Ok(Transmitted::complete(total));
            }
        }

        if !trailer.is_empty() {
            let trl = writev_once(self.fd, trailer)?;
            total += trl.sent;
            if trl.outcome != Outcome::Complete {
                return Ok(Transmitted {
                    sent: total,
                    outcome: trl.outcome,
                });
            }
        }

        Ok(Transmitted::complete(total))
    }

    fn enable_batching(&mut self) -> io::Result<()> {
        let one: libc::c_int = 1;
        #[cfg(target_os = "linux")]
        let option = libc::TCP_CORK;
        #[cfg(not(target_os = "linux"))]
        let option = libc::TCP_NOPUSH;

        // SAFETY: the option value points at a live c_int of the size we
        // report.
        let rc = unsafe {
            libc::setsockopt(
                self.fd,
                libc::IPPROTO_TCP,
                option,
                std::ptr::from_ref(&one).cast::<libc::c_void>(),
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        tracing::debug!("segment batching enabled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom, Write};
    use std::os::fd::{FromRawFd, OwnedFd};
    use tempfile::NamedTempFile;

    fn socketpair() -> (OwnedFd, OwnedFd) {
        let mut fds = [0i32; 2];
        // SAFETY: fds points at two writable c_ints.
        let rc = unsafe {
            libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr())
        };
        assert_eq!(rc, 0, "socketpair failed");
        // SAFETY: socketpair returned two freshly created descriptors.
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) }
    }

    fn set_nonblocking(fd: RawFd) {
        // SAFETY: fcntl on a valid descriptor.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        assert!(flags >= 0);
        // SAFETY: same descriptor, adding O_NONBLOCK.
        let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        assert_eq!(rc, 0);
    }

    fn read_exact_fd(fd: RawFd, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        let mut read = 0;
        while read < len {
            // SAFETY: the slice is valid for the remaining length.
            let n = unsafe {
                libc::read(
                    fd,
                    out[read..].as_mut_ptr().cast::<libc::c_void>(),
                    len - read,
                )
            };
            assert!(n > 0, "short read from socketpair");
            read += n as usize;
        }
        out
    }

    fn body_file(content: &[u8]) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(content).unwrap();
        tmp.flush().unwrap();
        tmp.seek(SeekFrom::Start(0)).unwrap();
        tmp
    }

    #[test]
    fn vectored_write_reports_full_count() {
        let (rx, tx) = socketpair();
        let mut t = SocketTransmitter::new(tx.as_raw_fd());

        let bufs = [IoSlice::new(b"hello "), IoSlice::new(b"world")];
        let out = t.send_vectored(&bufs).unwrap();
        assert_eq!(out.outcome, Outcome::Complete);
        assert_eq!(out.sent, 11);

        assert_eq!(read_exact_fd(rx.as_raw_fd(), 11), b"hello world");
    }

    #[test]
    fn empty_vector_set_is_a_no_op() {
        let (_rx, tx) = socketpair();
        let mut t = SocketTransmitter::new(tx.as_raw_fd());
        let out = t.send_vectored(&[]).unwrap();
        assert_eq!(out, Transmitted::complete(0));
    }

    #[test]
    fn full_socket_buffer_reports_would_block() {
        let (_rx, tx) = socketpair();
        set_nonblocking(tx.as_raw_fd());
        let mut t = SocketTransmitter::new(tx.as_raw_fd());

        let chunk = vec![0u8; 64 * 1024];
        let mut saw_would_block = false;
        for _ in 0..10_000 {
            let out = t.send_vectored(&[IoSlice::new(&chunk)]).unwrap();
            if out.outcome == Outcome::WouldBlock {
                assert_eq!(out.sent, 0, "blocked writev sends nothing");
                saw_would_block = true;
                break;
            }
        }
        assert!(saw_would_block, "socketpair buffer never filled");
    }

    #[test]
    fn send_file_keeps_header_body_trailer_order() {
        let body = b"0123456789abcdef";
        let tmp = body_file(body);
        let (rx, tx) = socketpair();
        let mut t = SocketTransmitter::new(tx.as_raw_fd());

        let header = [IoSlice::new(b"HDR:")];
        let trailer = [IoSlice::new(b":TRL")];
        let out = t
            .send_file(tmp.as_file(), 0, body.len() as u64, 0, &header, &trailer)
            .unwrap();
        assert_eq!(out.outcome, Outcome::Complete);
        assert_eq!(out.sent, 4 + body.len() as u64 + 4);

        let got = read_exact_fd(rx.as_raw_fd(), out.sent as usize);
        assert_eq!(got, b"HDR:0123456789abcdef:TRL");
    }

    #[test]
    fn send_file_honors_the_region_offset() {
        let tmp = body_file(b"skipped|counted");
        let (rx, tx) = socketpair();
        let mut t = SocketTransmitter::new(tx.as_raw_fd());

        let out = t.send_file(tmp.as_file(), 8, 7, 0, &[], &[]).unwrap();
        assert_eq!(out.sent, 7);
        assert_eq!(read_exact_fd(rx.as_raw_fd(), 7), b"counted");
    }

    #[test]
    fn send_file_does_not_disturb_the_file_position() {
        let tmp = body_file(b"abcdefgh");
        let (_rx, tx) = socketpair();
        let mut t = SocketTransmitter::new(tx.as_raw_fd());

        t.send_file(tmp.as_file(), 4, 4, 0, &[], &[]).unwrap();

        let mut first = [0u8; 4];
        tmp.reopen().unwrap().read_exact(&mut first).unwrap();
        assert_eq!(&first, b"abcd");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn batching_option_applies_to_tcp_sockets() {
        use std::net::{TcpListener, TcpStream};

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let _accepted = listener.accept().unwrap();

        let mut t = SocketTransmitter::new(stream.as_raw_fd());
        t.enable_batching().unwrap();
    }

    #[test]
    fn batching_option_fails_on_non_tcp_descriptors() {
        let (_rx, tx) = socketpair();
        let mut t = SocketTransmitter::new(tx.as_raw_fd());
        assert!(t.enable_batching().is_err(), "AF_UNIX rejects TCP options");
    }
}
