//! CityHash128, version 1.0.2.
//!
//! The server checksums every compressed frame with this exact revision of the
//! algorithm, later revisions produce different digests.
//!
//! <https://github.com/google/cityhash>

const K0: u64 = 0xc3a5_c85c_97cb_3127;
const K1: u64 = 0xb492_b66f_be98_f273;
const K2: u64 = 0x9ae1_6a3b_2f90_404f;
const K3: u64 = 0xc949_d7c7_509e_6557;

/// 128 bit digest, as `(low, high)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hash128 {
    pub low: u64,
    pub high: u64,
}

impl Hash128 {
    const fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }
}

fn fetch64(s: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&s[at..at + 8]);
    u64::from_le_bytes(b)
}

fn fetch32(s: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&s[at..at + 4]);
    u32::from_le_bytes(b) as u64
}

fn rotate(val: u64, shift: u32) -> u64 {
    if shift == 0 { val } else { val.rotate_right(shift) }
}

fn shift_mix(val: u64) -> u64 {
    val ^ (val >> 47)
}

fn hash_128_to_64(low: u64, high: u64) -> u64 {
    const MUL: u64 = 0x9ddf_ea08_eb38_2d69;
    let mut a = (low ^ high).wrapping_mul(MUL);
    a ^= a >> 47;
    let mut b = (high ^ a).wrapping_mul(MUL);
    b ^= b >> 47;
    b.wrapping_mul(MUL)
}

fn hash_len16(u: u64, v: u64) -> u64 {
    hash_128_to_64(u, v)
}

fn hash_len0to16(s: &[u8]) -> u64 {
    let len = s.len();
    if len > 8 {
        let a = fetch64(s, 0);
        let b = fetch64(s, len - 8);
        // rotate by at least one, `len` is never 0 here
        return hash_len16(a, b.wrapping_add(len as u64).rotate_right(len as u32)) ^ b;
    }
    if len >= 4 {
        let a = fetch32(s, 0);
        return hash_len16((len as u64).wrapping_add(a << 3), fetch32(s, len - 4));
    }
    if len > 0 {
        let a = s[0] as u32;
        let b = s[len >> 1] as u32;
        let c = s[len - 1] as u32;
        let y = a.wrapping_add(b << 8);
        let z = (len as u32).wrapping_add(c << 2);
        return shift_mix((y as u64).wrapping_mul(K2) ^ (z as u64).wrapping_mul(K3)).wrapping_mul(K2);
    }
    K2
}

fn weak_hash_len32_with_seeds(s: &[u8], at: usize, a: u64, b: u64) -> (u64, u64) {
    let w = fetch64(s, at);
    let x = fetch64(s, at + 8);
    let y = fetch64(s, at + 16);
    let z = fetch64(s, at + 24);

    let mut a = a.wrapping_add(w);
    let mut b = rotate(b.wrapping_add(a).wrapping_add(z), 21);
    let c = a;
    a = a.wrapping_add(x);
    a = a.wrapping_add(y);
    b = b.wrapping_add(rotate(a, 44));
    (a.wrapping_add(z), b.wrapping_add(c))
}

fn city_murmur(s: &[u8], seed: Hash128) -> Hash128 {
    let len = s.len();
    let mut a = seed.low;
    let mut b = seed.high;
    let mut c;
    let mut d;

    if len <= 16 {
        a = shift_mix(a.wrapping_mul(K1)).wrapping_mul(K1);
        c = b.wrapping_mul(K1).wrapping_add(hash_len0to16(s));
        d = shift_mix(a.wrapping_add(if len >= 8 { fetch64(s, 0) } else { c }));
    } else {
        c = hash_len16(fetch64(s, len - 8).wrapping_add(K1), a);
        d = hash_len16(b.wrapping_add(len as u64), c.wrapping_add(fetch64(s, len - 16)));
        a = a.wrapping_add(d);

        let mut at = 0;
        let mut l = len as isize - 16;
        loop {
            a ^= shift_mix(fetch64(s, at).wrapping_mul(K1)).wrapping_mul(K1);
            a = a.wrapping_mul(K1);
            b ^= a;
            c ^= shift_mix(fetch64(s, at + 8).wrapping_mul(K1)).wrapping_mul(K1);
            c = c.wrapping_mul(K1);
            d ^= c;
            at += 16;
            l -= 16;
            if l <= 0 {
                break;
            }
        }
    }

    a = hash_len16(a, c);
    b = hash_len16(d, b);
    Hash128::new(a ^ b, hash_len16(b, a))
}

fn city_hash128_with_seed(s: &[u8], seed: Hash128) -> Hash128 {
    if s.len() < 128 {
        return city_murmur(s, seed);
    }

    let mut len = s.len();
    let mut x = seed.low;
    let mut y = seed.high;
    let mut z = (len as u64).wrapping_mul(K1);

    let mut v = (0u64, 0u64);
    v.0 = rotate(y ^ K1, 49).wrapping_mul(K1).wrapping_add(fetch64(s, 0));
    v.1 = rotate(v.0, 42).wrapping_mul(K1).wrapping_add(fetch64(s, 8));
    let mut w = (0u64, 0u64);
    w.0 = rotate(y.wrapping_add(z), 35).wrapping_mul(K1).wrapping_add(x);
    w.1 = rotate(x.wrapping_add(fetch64(s, 88)), 53).wrapping_mul(K1);

    let mut at = 0;
    loop {
        for _ in 0..2 {
            x = rotate(x.wrapping_add(y).wrapping_add(v.0).wrapping_add(fetch64(s, at + 16)), 37).wrapping_mul(K1);
            y = rotate(y.wrapping_add(v.1).wrapping_add(fetch64(s, at + 48)), 42).wrapping_mul(K1);
            x ^= w.1;
            y ^= v.0;
            z = rotate(z ^ w.0, 33);
            v = weak_hash_len32_with_seeds(s, at, v.1.wrapping_mul(K1), x.wrapping_add(w.0));
            w = weak_hash_len32_with_seeds(s, at + 32, z.wrapping_add(w.1), y);
            std::mem::swap(&mut z, &mut x);
            at += 64;
        }
        len -= 128;
        if len < 128 {
            break;
        }
    }

    y = y.wrapping_add(rotate(w.0, 37).wrapping_mul(K0).wrapping_add(z));
    x = x.wrapping_add(rotate(v.0.wrapping_add(z), 49).wrapping_mul(K0));

    // hash up to 4 chunks of 32 bytes from the end
    let mut tail_done = 0;
    while tail_done < len {
        tail_done += 32;
        y = rotate(y.wrapping_sub(x), 42).wrapping_mul(K0).wrapping_add(v.1);
        w.0 = w.0.wrapping_add(fetch64(s, at + len - tail_done + 16));
        x = rotate(x, 49).wrapping_mul(K0).wrapping_add(w.0);
        w.0 = w.0.wrapping_add(v.0);
        v = weak_hash_len32_with_seeds(s, at + len - tail_done, v.0, v.1);
    }

    x = hash_len16(x, v.0);
    y = hash_len16(y, w.0);

    Hash128::new(
        hash_len16(x.wrapping_add(v.1), w.1).wrapping_add(y),
        hash_len16(x.wrapping_add(w.1), y.wrapping_add(v.1)),
    )
}

/// Compute CityHash128 v1.0.2 of `s`.
pub fn city_hash128(s: &[u8]) -> Hash128 {
    let len = s.len();
    if len >= 16 {
        city_hash128_with_seed(&s[16..], Hash128::new(fetch64(s, 0) ^ K3, fetch64(s, 8)))
    } else if len >= 8 {
        city_hash128_with_seed(
            &[],
            Hash128::new(fetch64(s, 0) ^ (len as u64).wrapping_mul(K0), fetch64(s, len - 8) ^ K1),
        )
    } else {
        city_hash128_with_seed(s, Hash128::new(K0, K1))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_digests() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
        let cases = [
            (0, 0x3df09dfc64c09a2b, 0x3cb540c392e51e29),
            (1, 0xa04b71ab61de6422, 0xf768684937e23970),
            (3, 0x6473720e9e25546d, 0x55ad3d94ab5ba66b),
            (4, 0x75ca4ea9671a8b2d, 0xaffe8fa7aae1cc45),
            (7, 0x2b10aba75d97da2d, 0xbd3a37170971ff49),
            (8, 0x8e7cf242a241c273, 0xaa643fb72007a5ba),
            (15, 0x554ca5c50cf16c1a, 0xd5c3f2121c3c87e7),
            (16, 0x17940e0b74a93764, 0xc1cef72a803123eb),
            (17, 0x0390b413948a7266, 0xfcd42d37e6d38034),
            (31, 0xd478728594d61e54, 0x779751dee6b71fa6),
            (32, 0x441af40218bd049a, 0x2ed12e07d84d09b4),
            (64, 0x8494973b60c138d1, 0xef25d78c7d736f3a),
            (65, 0xe321a7651cc42da8, 0x283b546436dc4b0d),
            (127, 0x914dda37066b13bc, 0xf56be1ac13892b4d),
            (128, 0x48174d5201884046, 0xa2a2738d3fe044ee),
            (129, 0x6e11402789cf82f7, 0x0c881dfb3c37c49f),
            (255, 0x7c7d1020d71414e6, 0xb9215c2320c2c4a3),
            (256, 0xdaf6e503059c12c3, 0xff2fed62218d0c9f),
            (300, 0xbf5acc364e84165f, 0x9b46f2d2fc87306a),
            (600, 0xddeede9a320b8fd4, 0xdacb15b86dea734e),
            (1024, 0xe9aeb89f9786e1c3, 0x7218a49c9720d62f),
            (4096, 0xf9b88b63081911c1, 0x2719eaa405157d16),
        ];
        for (len, low, high) in cases {
            assert_eq!(city_hash128(&data[..len]), Hash128 { low, high }, "length {len}");
        }
        assert_eq!(
            city_hash128(b"abc"),
            Hash128 { low: 0x900ff195577748fe, high: 0x13a9176355b20d7e },
        );
    }

    #[test]
    fn sensitive_to_every_byte() {
        let data = vec![7u8; 300];
        let base = city_hash128(&data);
        for at in [0, 15, 16, 100, 200, 299] {
            let mut changed = data.clone();
            changed[at] ^= 1;
            assert_ne!(city_hash128(&changed), base, "flip at {at}");
        }
    }

    #[test]
    fn prefixes_differ() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let mut seen = Vec::new();
        for len in 0..data.len() {
            let h = city_hash128(&data[..len]);
            assert!(!seen.contains(&h));
            seen.push(h);
        }
    }
}
