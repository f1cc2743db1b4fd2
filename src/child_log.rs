//! Diagnostics from the forked child
//!
//! Between fork and exec only async-signal-safe calls are allowed, so this
//! cannot go through `tracing`. Messages are written with raw `write(2)` to the
//! child's stderr, which forkpty has already bound to the slave side. Delivery
//! is best effort: write errors are ignored.

use libc::{c_int, STDERR_FILENO};

/// Write `"<prefix><what>: <context>: errno <n>\r\n"` to stderr
pub(crate) fn report(what: &[u8], context: &[u8], errno: c_int) {
    let mut digits = [0u8; 12];
    let digits = format_decimal(errno, &mut digits);

    write_all(b"ptyspawn: ");
    write_all(what);
    if !context.is_empty() {
        write_all(b": ");
        write_all(context);
    }
    write_all(b": errno ");
    write_all(digits);
    write_all(b"\r\n");
}

fn write_all(mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: write(2) is async-signal-safe and `bytes` is a live slice
        let n = unsafe { libc::write(STDERR_FILENO, bytes.as_ptr().cast(), bytes.len()) };
        if n <= 0 {
            return;
        }
        bytes = &bytes[n as usize..];
    }
}

/// Render `value` into `buf` without allocating
fn format_decimal(value: c_int, buf: &mut [u8; 12]) -> &[u8] {
    let negative = value < 0;
    let mut n = value.unsigned_abs();
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    if negative {
        pos -= 1;
        buf[pos] = b'-';
    }
    &buf[pos..]
}
