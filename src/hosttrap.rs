/*!
hosttrap.rs - Sentinel-PC syscall bridge (spec §4.4).

Overview
========
When a warp's current instruction PC is the trap sentinel
(`0x70000000`), the dispatcher hands control here before any lane is
iterated (spec §4.1, §4.4). The bridge reads one command word from the
read buffer and, for the two implemented commands, performs the real
host-side effect and optionally uploads a response to the write buffer.

The wire format is a sequence of length-prefixed blobs: a 4-byte
little-endian size `n` followed by `n` payload bytes, each byte
occupying the low 8 bits of an aligned word read (spec §4.4, §9). This
framing applies to *every* value taken off the buffers, not only the
multi-byte blob arguments - `examples/original_source/simX/instruction.cpp`'s
`download()` reads a size header before every call site, including the
single `command` and `file` ints (see its call sites around
`trap_to_simulator`), and its `upload()` writes one before the FSTAT
reply struct. `download_framed`/`upload_framed` below exist so that
discipline is applied once rather than reimplemented ad hoc at each
call site, the same way the teacher's `bus/ram_helpers.rs` centralizes
its own small byte-twiddling helpers rather than inlining them at every
read site.
*/

use crate::memory::Memory;

/// Executing this PC triggers the host-trap bridge instead of ordinary
/// dispatch (spec §4.1, §6).
pub const SENTINEL_PC: u32 = 0x7000_0000;
/// Guest address the bridge reads its command word and arguments from.
pub const READ_BUF_BASE: u32 = 0x7100_0000;
/// Guest address the bridge writes command responses to.
pub const WRITE_BUF_BASE: u32 = 0x7200_0000;

const CMD_CLOSE: u32 = 1;
const CMD_ISATTY: u32 = 2;
const CMD_LSEEK: u32 = 3;
const CMD_READ: u32 = 4;
const CMD_WRITE: u32 = 5;
const CMD_FSTAT: u32 = 6;

/// Guest stdout (fd 1) is always redirected to host stderr (fd 2),
/// spec §4.4 WRITE.
const REMAPPED_STDOUT_FD: i32 = 1;
const HOST_STDERR_FD: i32 = 2;

/// Read one byte from guest memory at `addr`, going through the
/// mandatory aligned-word read port.
fn download_byte(mem: &mut dyn Memory, addr: u32, supervisor: bool) -> u8 {
    let word = mem.read(addr & !0x3, supervisor);
    let shift = (addr & 0x3) * 8;
    ((word >> shift) & 0xff) as u8
}

/// Write one byte to guest memory at `addr` (a plain 1-byte store).
fn upload_byte(mem: &mut dyn Memory, addr: u32, byte: u8, supervisor: bool) {
    mem.write(addr, u32::from(byte), supervisor, 1);
}

/// Read `n` bytes starting at `addr`, one guest byte address at a time.
fn download(mem: &mut dyn Memory, addr: u32, n: usize, supervisor: bool) -> Vec<u8> {
    (0..n as u32)
        .map(|i| download_byte(mem, addr + i, supervisor))
        .collect()
}

/// Write `bytes` starting at `addr`, one guest byte address at a time.
fn upload(mem: &mut dyn Memory, addr: u32, bytes: &[u8], supervisor: bool) {
    for (i, &b) in bytes.iter().enumerate() {
        upload_byte(mem, addr + i as u32, b, supervisor);
    }
}

/// A raw little-endian `u32` at `addr`, read one byte at a time with no
/// length framing of its own - used only to read/write the length
/// header that precedes every framed value (below).
fn download_u32(mem: &mut dyn Memory, addr: u32, supervisor: bool) -> u32 {
    let bytes = download(mem, addr, 4, supervisor);
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn upload_u32(mem: &mut dyn Memory, addr: u32, value: u32, supervisor: bool) {
    upload(mem, addr, &value.to_le_bytes(), supervisor);
}

/// Read one length-prefixed blob starting at `addr`: a 4-byte size
/// header followed by that many payload bytes (spec §4.4/§9). Returns
/// the payload and the address immediately following it, for chaining
/// further framed reads off the same buffer.
fn download_framed(mem: &mut dyn Memory, addr: u32, supervisor: bool) -> (Vec<u8>, u32) {
    let len = download_u32(mem, addr, supervisor) as u32;
    let payload_addr = addr + 4;
    let payload = download(mem, payload_addr, len as usize, supervisor);
    (payload, payload_addr + len)
}

/// Read one length-prefixed scalar `u32` (the original wraps even
/// scalar ints like `command`/`file` in the same framing as blobs -
/// see the module overview). Returns the value and the next cursor.
fn download_framed_u32(mem: &mut dyn Memory, addr: u32, supervisor: bool) -> (u32, u32) {
    let (bytes, next) = download_framed(mem, addr, supervisor);
    let mut word = [0u8; 4];
    let n = bytes.len().min(4);
    word[..n].copy_from_slice(&bytes[..n]);
    (u32::from_le_bytes(word), next)
}

/// Write one length-prefixed blob at `addr`: a 4-byte size header
/// followed by `bytes` (spec §4.4/§9 - used for the FSTAT reply).
fn upload_framed(mem: &mut dyn Memory, addr: u32, bytes: &[u8], supervisor: bool) {
    upload_u32(mem, addr, bytes.len() as u32, supervisor);
    upload(mem, addr + 4, bytes, supervisor);
}

/// Minimal stand-in for a host `struct stat`: only the fields a guest
/// newlib-style libc actually inspects after an `fstat` (the mode bits
/// distinguishing a character device from a regular file) are
/// populated; everything else is zeroed. The real platform `stat`
/// layout is not reproduced - see DESIGN.md for why.
fn synth_stat(file: i32) -> [u8; 64] {
    let mut buf = [0u8; 64];
    const S_IFCHR: u32 = 0o020000;
    const S_IFREG: u32 = 0o100000;
    let mode = if (0..=2).contains(&file) { S_IFCHR } else { S_IFREG } | 0o644;
    buf[16..20].copy_from_slice(&mode.to_le_bytes());
    buf
}

/// Forward a guest WRITE to the real host stream selected by `file`.
fn host_write(file: i32, buf: &[u8]) {
    use std::io::Write;
    if file == HOST_STDERR_FD {
        let _ = std::io::stderr().write_all(buf);
    } else {
        let _ = std::io::stdout().write_all(buf);
    }
}

/// Handle the host-trap bridge for one dispatch (spec §4.4). Called by
/// `execute::execute` before any lane iterates, once per instruction at
/// the sentinel PC.
pub fn handle(mem: &mut dyn Memory, supervisor: bool) {
    let cursor = READ_BUF_BASE;
    let (cmd, cursor) = download_framed_u32(mem, cursor, supervisor);

    match cmd {
        CMD_WRITE => {
            let (file, cursor) = download_framed_u32(mem, cursor, supervisor);
            let mut file = file as i32;
            if file == REMAPPED_STDOUT_FD {
                file = HOST_STDERR_FD;
            }
            let (buf, _cursor) = download_framed(mem, cursor, supervisor);
            host_write(file, &buf);
        }
        CMD_FSTAT => {
            let (file, _cursor) = download_framed_u32(mem, cursor, supervisor);
            let stat = synth_stat(file as i32);
            upload_framed(mem, WRITE_BUF_BASE, &stat, supervisor);
        }
        CMD_CLOSE | CMD_ISATTY | CMD_LSEEK | CMD_READ => {
            tracing::warn!(cmd, "host-trap command recognized but not implemented");
        }
        other => {
            tracing::warn!(cmd = other, "unknown host-trap command");
        }
    }
}
