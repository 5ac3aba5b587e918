//! Wire protocol shared by client and server.
//!
//! There is no framing: the client writes the raw request bytes, the server
//! treats whatever a single read returns as one complete request and answers
//! with the raw reply bytes. Both peers rely on messages being small enough
//! to arrive in one read. A message split across TCP segments is misread as
//! several requests (or a truncated response); this limitation is kept
//! deliberately so the measured traffic matches a plain send/recv exchange.
//!
//! ```text
//! Request:  test
//! Response: respuesta
//! ```

use std::io::{self, Read, Write};

/// Reply sent by the server for every request.
pub const DEFAULT_REPLY: &str = "respuesta";

/// Request sent by the client when none is configured.
pub const DEFAULT_REQUEST: &str = "test";

/// Upper bound on bytes taken from a single read, on both sides.
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Perform exactly one read into `buf`.
///
/// `Ok(0)` means the peer closed the connection. Reads interrupted by a
/// signal are retried, since they did not consume anything.
pub fn receive_once<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

/// Write all of `data`, looping over short writes.
pub fn send_all<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    writer.write_all(data)?;
    writer.flush()
}
