//! scan::stream
//!
//! The tee-and-parse stream scanner.
//!
//! # Contract
//!
//! For the lifetime of a child output stream:
//!
//! - every byte read is written to the sink unmodified, in order, and
//!   flushed immediately so the child's real-time console behavior is
//!   preserved;
//! - independently, bytes accumulate in a line buffer; each completed line
//!   is parsed and every resulting set/reset command is applied to the
//!   shared store under its mutex;
//! - malformed commands produce a diagnostic on the wrapper's stderr and
//!   are otherwise ignored;
//! - when the stream closes, a trailing unterminated line is processed
//!   like any other.
//!
//! Correctness does not depend on read boundaries: one read may carry a
//! fragment of a line or many lines at once.

use std::io::{ErrorKind, Read, Write};
use std::sync::{Mutex, PoisonError};

use super::grammar::{parse_line, Command};
use crate::store::VarStore;
use crate::ui::output::{self, Verbosity};

/// Read buffer size for pipe reads.
const READ_BUF_SIZE: usize = 8192;

/// Drive one child output stream to completion.
///
/// Reads `reader` in chunks until EOF, forwarding every chunk to `sink`
/// and applying embedded commands to `store`. Returns the first I/O error
/// from the pipe or the sink; `ErrorKind::Interrupted` reads are retried.
pub fn scan_stream(
    mut reader: impl Read,
    mut sink: impl Write,
    store: &Mutex<VarStore>,
    verbosity: Verbosity,
) -> std::io::Result<()> {
    let mut buf = [0u8; READ_BUF_SIZE];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                sink.write_all(&buf[..n])?;
                sink.flush()?;

                pending.extend_from_slice(&buf[..n]);
                while let Some(newline) = pending.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = pending.drain(..=newline).collect();
                    apply_line(&line[..line.len() - 1], store, verbosity);
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    // Stream closed; whatever is buffered is the final, unterminated line.
    if !pending.is_empty() {
        apply_line(&pending, store, verbosity);
    }

    Ok(())
}

/// Parse one completed line and apply its commands to the store.
///
/// The raw bytes are decoded lossily for parsing only; forwarding to the
/// sink already happened byte-exact. A trailing `\r` (CRLF output) is
/// stripped before parsing.
fn apply_line(raw: &[u8], store: &Mutex<VarStore>, verbosity: Verbosity) {
    let line = String::from_utf8_lossy(raw);
    let line = line.strip_suffix('\r').unwrap_or(&line);

    for command in parse_line(line) {
        let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
        match command {
            Command::Set { name, value } => store.set(name, value),
            Command::Reset { name } => store.reset(&name),
            Command::Malformed { body } => {
                output::warn(format!("ignoring malformed envrun command: {body}"), verbosity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Reader that hands out a fixed sequence of chunks, one per read call,
    /// regardless of the caller's buffer size.
    struct ChunkedReader {
        chunks: Vec<Vec<u8>>,
        next: usize,
    }

    impl ChunkedReader {
        fn new(chunks: &[&str]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
                next: 0,
            }
        }
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.next >= self.chunks.len() {
                return Ok(0);
            }
            let chunk = &self.chunks[self.next];
            self.next += 1;
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    fn temp_store(dir: &TempDir) -> Mutex<VarStore> {
        let path: PathBuf = dir.path().join("envrun.db");
        Mutex::new(VarStore::load(&path).expect("load store"))
    }

    fn scan(chunks: &[&str], store: &Mutex<VarStore>) -> Vec<u8> {
        let mut sink = Vec::new();
        scan_stream(ChunkedReader::new(chunks), &mut sink, store, Verbosity::Quiet)
            .expect("scan stream");
        sink
    }

    #[test]
    fn forwards_all_bytes_verbatim() {
        let temp = TempDir::new().expect("temp dir");
        let store = temp_store(&temp);

        let sink = scan(&["plain output\nmore @@envrun[bogus] text\n"], &store);
        assert_eq!(sink, b"plain output\nmore @@envrun[bogus] text\n");
    }

    #[test]
    fn applies_set_command_from_single_chunk() {
        let temp = TempDir::new().expect("temp dir");
        let store = temp_store(&temp);

        scan(&["@@envrun[set name='X' value='Y']\n"], &store);
        let store = store.into_inner().expect("store");
        assert_eq!(store.get("X"), Some("Y"));
    }

    #[test]
    fn line_split_across_reads_is_reassembled() {
        let temp = TempDir::new().expect("temp dir");
        let store = temp_store(&temp);

        let sink = scan(&["@@envrun[set nam", "e='X' value='Y']\n"], &store);
        assert_eq!(sink, b"@@envrun[set name='X' value='Y']\n");

        let store = store.into_inner().expect("store");
        assert_eq!(store.get("X"), Some("Y"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn many_lines_in_one_read() {
        let temp = TempDir::new().expect("temp dir");
        let store = temp_store(&temp);

        scan(
            &["@@envrun[set name='A' value='1']\n@@envrun[set name='B' value='2']\nnoise\n"],
            &store,
        );
        let store = store.into_inner().expect("store");
        assert_eq!(store.get("A"), Some("1"));
        assert_eq!(store.get("B"), Some("2"));
    }

    #[test]
    fn final_line_without_newline_is_processed() {
        let temp = TempDir::new().expect("temp dir");
        let store = temp_store(&temp);

        let sink = scan(&["@@envrun[set name='LAST' value='1']"], &store);
        assert_eq!(sink, b"@@envrun[set name='LAST' value='1']");

        let store = store.into_inner().expect("store");
        assert_eq!(store.get("LAST"), Some("1"));
    }

    #[test]
    fn crlf_line_parses_and_forwards_verbatim() {
        let temp = TempDir::new().expect("temp dir");
        let store = temp_store(&temp);

        let sink = scan(&["@@envrun[set name='X' value='Y']\r\n"], &store);
        assert_eq!(sink, b"@@envrun[set name='X' value='Y']\r\n");

        let store = store.into_inner().expect("store");
        assert_eq!(store.get("X"), Some("Y"));
    }

    #[test]
    fn reset_command_removes_entry() {
        let temp = TempDir::new().expect("temp dir");
        let store = temp_store(&temp);
        store
            .lock()
            .expect("lock")
            .set("X", "old");

        scan(&["@@envrun[reset name='X']\n"], &store);
        let store = store.into_inner().expect("store");
        assert_eq!(store.get("X"), None);
    }

    #[test]
    fn malformed_command_does_not_mutate_store() {
        let temp = TempDir::new().expect("temp dir");
        let store = temp_store(&temp);

        scan(&["@@envrun[bogus]\n"], &store);
        let store = store.into_inner().expect("store");
        assert!(store.is_empty());
    }

    #[test]
    fn commands_on_one_line_apply_in_order() {
        let temp = TempDir::new().expect("temp dir");
        let store = temp_store(&temp);

        // Last write wins within a line, so in-order application is visible.
        scan(
            &["@@envrun[set name='A' value='1'] @@envrun[set name='A' value='2']\n"],
            &store,
        );
        let store = store.into_inner().expect("store");
        assert_eq!(store.get("A"), Some("2"));
    }
}
