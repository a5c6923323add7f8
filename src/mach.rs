// Functions related to encoding.
use byteorder::{BigEndian, ByteOrder};

// MariaDB uses big-endian byte order for its Mach-O files.
// The most significant byte is at the lowest address.
type E = BigEndian;

pub fn mach_read_from_2(buf: &[u8]) -> u16 {
    E::read_u16(buf)
}

pub fn mach_read_from_4(buf: &[u8]) -> u32 {
    E::read_u32(buf)
}

pub fn mach_read_from_8(buf: &[u8]) -> u64 {
    E::read_u64(buf)
}

pub fn mach_write_to_2(buf: &mut [u8], n: u16) {
    E::write_u16(buf, n)
}

pub fn mach_write_to_4(buf: &mut [u8], n: u32) {
    E::write_u32(buf, n)
}

pub fn mach_write_to_8(buf: &mut [u8], n: u64) {
    E::write_u64(buf, n)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut buf = [0u8; 8];

        mach_write_to_2(&mut buf[0..2], 0x1234);
        assert_eq!(mach_read_from_2(&buf[0..2]), 0x1234);

        mach_write_to_4(&mut buf[0..4], 0xdead_beef);
        assert_eq!(mach_read_from_4(&buf[0..4]), 0xdead_beef);

        mach_write_to_8(&mut buf, 0x0123_4567_89ab_cdef);
        assert_eq!(mach_read_from_8(&buf), 0x0123_4567_89ab_cdef);
    }

    #[test]
    fn test_big_endian() {
        let mut buf = [0u8; 4];
        mach_write_to_4(&mut buf, 1);
        assert_eq!(buf, [0, 0, 0, 1]);
    }
}
