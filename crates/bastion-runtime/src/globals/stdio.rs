// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Standard streams shared by `console` and `@stdio`

use boa_gc::{Finalize, Trace};
use std::cell::RefCell;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::rc::Rc;

struct Streams {
    stdin: Box<dyn BufRead>,
    stdout: Box<dyn Write>,
    stderr: Box<dyn Write>,
}

/// Handle to an engine's standard streams.
///
/// Cloning shares the underlying streams, so reconnecting through any handle
/// redirects every native function holding a clone. Streams start out
/// discarding output, with empty input.
#[derive(Clone, Trace, Finalize)]
pub struct StdioStreams {
    #[unsafe_ignore_trace]
    inner: Rc<RefCell<Streams>>,
}

impl StdioStreams {
    /// Streams that discard all output and read nothing
    pub fn discard() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Streams {
                stdin: Box::new(io::empty()),
                stdout: Box::new(io::sink()),
                stderr: Box::new(io::sink()),
            })),
        }
    }

    /// Replace all three streams
    pub fn connect(&self, stdin: Box<dyn Read>, stdout: Box<dyn Write>, stderr: Box<dyn Write>) {
        let mut streams = self.inner.borrow_mut();
        streams.stdin = Box::new(BufReader::new(stdin));
        streams.stdout = stdout;
        streams.stderr = stderr;
    }

    /// Replace the error writer only
    pub fn set_stderr(&self, stderr: Box<dyn Write>) {
        self.inner.borrow_mut().stderr = stderr;
    }

    /// Read one line from stdin, without its terminator.
    ///
    /// `None` at end of input.
    pub fn read_line(&self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.inner.borrow_mut().stdin.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    /// Write all of `bytes` to stdout and flush
    pub fn write_stdout(&self, bytes: &[u8]) -> io::Result<()> {
        let mut streams = self.inner.borrow_mut();
        streams.stdout.write_all(bytes)?;
        streams.stdout.flush()
    }

    /// Write all of `bytes` to stderr and flush
    pub fn write_stderr(&self, bytes: &[u8]) -> io::Result<()> {
        let mut streams = self.inner.borrow_mut();
        streams.stderr.write_all(bytes)?;
        streams.stderr.flush()
    }
}

impl Default for StdioStreams {
    fn default() -> Self {
        Self::discard()
    }
}

impl std::fmt::Debug for StdioStreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioStreams").finish_non_exhaustive()
    }
}

/// In-memory writer whose contents stay readable after it is handed to an
/// engine.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
