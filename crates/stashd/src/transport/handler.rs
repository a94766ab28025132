//! Connection handling abstractions for the daemon listener.

use std::io::{self, Read};
use std::os::unix::net::UnixStream;

/// Requests larger than this are refused before parsing.
pub(crate) const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: UnixStream);
}

/// Reads one newline-terminated request from the stream.
///
/// Returns `None` when the peer closed the connection without sending any
/// bytes. A stream that ends without a trailing newline yields the bytes
/// read so far, so clients that shut down their write half cleanly are
/// still served.
///
/// # Errors
///
/// Propagates read failures and reports `InvalidData` once the accumulated
/// request exceeds [`MAX_REQUEST_BYTES`].
pub(crate) fn read_request_line(stream: &mut UnixStream) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let bytes_read = read_chunk_with_retry(stream, &mut chunk)?;
        if bytes_read == 0 {
            return Ok(if buffer.is_empty() {
                None
            } else {
                Some(buffer)
            });
        }

        if let Some(pos) = chunk[..bytes_read].iter().position(|byte| *byte == b'\n') {
            buffer.extend_from_slice(&chunk[..pos]);
            enforce_request_limit(buffer.len())?;
            return Ok(Some(buffer));
        }

        buffer.extend_from_slice(&chunk[..bytes_read]);
        enforce_request_limit(buffer.len())?;
    }
}

fn read_chunk_with_retry(stream: &mut UnixStream, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

fn enforce_request_limit(size: usize) -> io::Result<()> {
    if size > MAX_REQUEST_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "request exceeds maximum size",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::thread;

    #[test]
    fn reads_a_single_line_without_the_newline() {
        let (mut client, mut server) = UnixStream::pair().expect("socket pair");
        let writer = thread::spawn(move || {
            client.write_all(b"{\"command\":{}}\nignored").expect("write");
        });
        let line = read_request_line(&mut server)
            .expect("read line")
            .expect("line present");
        assert_eq!(line, b"{\"command\":{}}");
        writer.join().expect("writer");
    }

    #[test]
    fn half_closed_stream_yields_partial_request() {
        let (mut client, mut server) = UnixStream::pair().expect("socket pair");
        let writer = thread::spawn(move || {
            client.write_all(b"{\"command\":{}}").expect("write");
            client
                .shutdown(std::net::Shutdown::Write)
                .expect("shutdown write half");
        });
        let line = read_request_line(&mut server)
            .expect("read line")
            .expect("line present");
        assert_eq!(line, b"{\"command\":{}}");
        writer.join().expect("writer");
    }

    #[test]
    fn empty_stream_yields_none() {
        let (client, mut server) = UnixStream::pair().expect("socket pair");
        drop(client);
        assert!(read_request_line(&mut server).expect("read").is_none());
    }

    #[test]
    fn oversized_request_is_refused() {
        let (mut client, mut server) = UnixStream::pair().expect("socket pair");
        let writer = thread::spawn(move || {
            let chunk = vec![b'x'; 64 * 1024];
            for _ in 0..17 {
                if client.write_all(&chunk).is_err() {
                    return;
                }
            }
        });
        let error = read_request_line(&mut server).expect_err("limit enforced");
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        drop(server);
        writer.join().expect("writer");
    }
}
