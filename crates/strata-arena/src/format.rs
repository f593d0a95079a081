//! Two-pass formatting into bump-allocated memory.
//!
//! The first pass measures the output, the second writes it into a block
//! of exactly that size. Nothing is buffered on the heap.

use std::fmt::{self, Write};

/// Length in bytes of the formatted output of `args`.
pub(crate) fn measure(args: fmt::Arguments<'_>) -> usize {
    let mut counter = Counter(0);
    // `Counter` never fails; an error can only come from a `Display` impl.
    let _ = counter.write_fmt(args);
    counter.0
}

/// Write `args` into `buf`, returning the number of bytes written.
///
/// Output is written in whole pieces, so the written prefix is always
/// valid UTF-8 even if a second formatting pass produced more bytes than
/// the first.
pub(crate) fn write_into(buf: &mut [u8], args: fmt::Arguments<'_>) -> usize {
    let mut writer = SliceWriter { buf, len: 0 };
    let _ = writer.write_fmt(args);
    writer.len
}

struct Counter(usize);

impl Write for Counter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

struct SliceWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len.checked_add(s.len()).ok_or(fmt::Error)?;
        let dst = self.buf.get_mut(self.len..end).ok_or(fmt::Error)?;
        dst.copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}
