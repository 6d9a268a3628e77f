/// Rearranges a decoded row-major array in place so that consumers always see
/// rows running left to right with the first encoded row first, whatever
/// scanning mode the producer used.
///
/// The vertical direction is deliberately not corrected here, the caller's
/// coordinate system owns it. Bit 0x10 set means adjacent rows alternate
/// direction, so only odd-indexed rows are mirrored. With 0x10 clear every
/// row runs the same way and only -x scans (bit 0x80) need mirroring; +x
/// modes such as 0, 32, 64 and 96 pass through untouched.
pub(crate) fn scanning_mode_check(data: &mut [f32], scan_mode: u8, nx: usize) {
    if nx == 0 {
        return;
    }

    if scan_mode & 0x10 == 0 {
        if scan_mode & 0x80 != 0 {
            for row in data.chunks_mut(nx) {
                row.reverse();
            }
        }
        return;
    }

    for (i, row) in data.chunks_mut(nx).enumerate() {
        if i % 2 != 0 {
            row.reverse();
        }
    }
}
