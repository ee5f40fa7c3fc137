use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of non-zero padding bytes in a type-2 block
pub const MIN_PADDING_LEN: usize = 8;

/// Length of a TLS premaster secret
pub const PREMASTER_SECRET_LEN: usize = 48;

// 0x00 0x02 prefix, at least 8 padding bytes, 0x00 separator
pub(crate) const OVERHEAD_LEN: usize = 3 + MIN_PADDING_LEN;

// premaster secret, 80 bytes of JSSE padding and the last byte
const JSSE_TAIL_LEN: usize = PREMASTER_SECRET_LEN + 80 + 1;

/// PKCS#1 v1.5 encoding errors
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("message of {len} bytes does not fit a {block_size}-byte block")]
    MessageTooLong { len: usize, block_size: usize },
    #[error("block size {0} is too small for PKCS#1 v1.5 padding")]
    BlockTooSmall(usize),
}

/// Strictness class of a padding oracle
///
/// Named after the (first, second, third) checks from Bardou et al.,
/// where T means the check is lenient and F means it is enforced:
/// a zero separator after the padding, eight non-zero padding bytes,
/// and the exact payload length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OracleType {
    /// Only the 0x00 0x02 prefix
    Ttt,
    /// Prefix and eight non-zero padding bytes
    Tft,
    /// Prefix and a zero byte somewhere after the padding
    Ftt,
    /// Prefix, eight non-zero padding bytes and a zero separator
    Fft,
    /// Prefix, non-zero padding and a zero separator right before a 48-byte premaster secret
    Fff,
    /// Only the second byte is checked to be 0x02
    BigIp,
    /// JSSE internal-error leak: prefix, eight non-zero padding bytes and a first
    /// zero either as the second to last byte or far from the end of the block
    Jsse,
}

impl OracleType {
    /// Whether the first eight padding bytes must be non-zero
    pub fn checks_padding(self) -> bool {
        matches!(self, Self::Tft | Self::Fft | Self::Fff | Self::Jsse)
    }

    /// Whether a zero separator must follow the padding
    pub fn checks_separator(self) -> bool {
        matches!(self, Self::Ftt | Self::Fft | Self::Fff | Self::Jsse)
    }
}

impl Default for OracleType {
    fn default() -> Self {
        Self::Fft
    }
}

/// Encode a message into a PKCS#1 v1.5 type-2 block
///
/// Layout: 0x00 0x02 || random non-zero padding || 0x00 || msg
pub fn encode<R: Rng>(msg: &[u8], block_size: usize, rng: &mut R) -> Result<Vec<u8>, Error> {
    if block_size < OVERHEAD_LEN {
        return Err(Error::BlockTooSmall(block_size));
    }
    if msg.len() > block_size - OVERHEAD_LEN {
        return Err(Error::MessageTooLong {
            len: msg.len(),
            block_size,
        });
    }

    let pad_len = block_size - 3 - msg.len();
    let mut block = Vec::with_capacity(block_size);
    block.extend_from_slice(&[0x00, 0x02]);
    for _ in 0..pad_len {
        block.push(rng.gen_range::<u8, u8, u8>(1, u8::MAX));
    }
    block.push(0x00);
    block.extend_from_slice(msg);

    Ok(block)
}

/// Check a decrypted block for PKCS#1 v1.5 conformity according to the oracle type
///
/// Short inputs are left-padded to the block size first, longer inputs never conform
pub fn is_conforming(decrypted: &[u8], oracle_type: OracleType, block_size: usize) -> bool {
    if decrypted.len() > block_size || block_size < OVERHEAD_LEN {
        return false;
    }

    let mut msg = vec![0_u8; block_size - decrypted.len()];
    msg.extend_from_slice(decrypted);

    if msg[1] != 0x02 {
        return false;
    }

    match oracle_type {
        OracleType::BigIp => true,
        _ if msg[0] != 0x00 => false,
        OracleType::Ttt => true,
        OracleType::Tft => has_nonzero_padding(&msg),
        OracleType::Ftt => has_separator(&msg),
        OracleType::Fft => has_nonzero_padding(&msg) && has_separator(&msg),
        OracleType::Fff => has_premaster_secret(&msg),
        OracleType::Jsse => has_nonzero_padding(&msg) && has_jsse_separator(&msg),
    }
}

// the first eight padding bytes contain no zero
fn has_nonzero_padding(msg: &[u8]) -> bool {
    msg[2..2 + MIN_PADDING_LEN].iter().all(|&b| b != 0x00)
}

// a zero byte follows the minimal padding
fn has_separator(msg: &[u8]) -> bool {
    msg[2 + MIN_PADDING_LEN..].iter().any(|&b| b == 0x00)
}

// padding runs non-zero right up to the separator of a 48-byte payload
fn has_premaster_secret(msg: &[u8]) -> bool {
    if msg.len() < OVERHEAD_LEN + PREMASTER_SECRET_LEN {
        return false;
    }
    let sep = msg.len() - PREMASTER_SECRET_LEN - 1;
    msg[sep] == 0x00 && msg[2..sep].iter().all(|&b| b != 0x00)
}

// first zero after the padding is the second to last byte, or lies before
// the last JSSE_TAIL_LEN bytes
fn has_jsse_separator(msg: &[u8]) -> bool {
    let start = 2 + MIN_PADDING_LEN;
    match msg[start..].iter().position(|&b| b == 0x00) {
        Some(pos) => {
            let sep = start + pos;
            sep + 2 == msg.len() || sep + JSSE_TAIL_LEN < msg.len()
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    const K: usize = 64;

    fn block_with_separator_at(pos: usize) -> Vec<u8> {
        block_of_len_with_separator_at(K, pos)
    }

    fn block_of_len_with_separator_at(len: usize, pos: usize) -> Vec<u8> {
        let mut block = vec![0x11_u8; len];
        block[0] = 0x00;
        block[1] = 0x02;
        block[pos] = 0x00;
        block
    }

    #[test]
    fn check_encode() {
        let mut rng = thread_rng();
        let msg = b"premaster";
        let block = encode(msg.as_ref(), K, &mut rng).unwrap();

        assert_eq!(block.len(), K);
        assert_eq!(&block[..2], &[0x00, 0x02]);
        assert!(block[2..K - msg.len() - 1].iter().all(|&b| b != 0));
        assert_eq!(block[K - msg.len() - 1], 0x00);
        assert_eq!(&block[K - msg.len()..], msg.as_ref());
        assert!(is_conforming(&block, OracleType::Fft, K));
    }

    #[test]
    fn check_encode_errors() {
        let mut rng = thread_rng();
        assert_eq!(
            encode(&[0x41; K - 10], K, &mut rng),
            Err(Error::MessageTooLong {
                len: K - 10,
                block_size: K
            })
        );
        assert_eq!(encode(&[], 10, &mut rng), Err(Error::BlockTooSmall(10)));
        assert_eq!(encode(&[0x41; K - 11], K, &mut rng).unwrap().len(), K);
    }

    #[test]
    fn check_prefix() {
        let mut bad = block_with_separator_at(20);
        bad[1] = 0x01;
        for &t in [OracleType::Ttt, OracleType::Tft, OracleType::Ftt, OracleType::Fft].iter() {
            assert!(!is_conforming(&bad, t, K));
        }

        // BigIP ignores the first byte
        let mut big_ip = block_with_separator_at(20);
        big_ip[0] = 0x07;
        assert!(is_conforming(&big_ip, OracleType::BigIp, K));
        assert!(!is_conforming(&big_ip, OracleType::Ttt, K));
    }

    #[test]
    fn check_short_padding() {
        // zero inside the first eight padding bytes
        let block = block_with_separator_at(5);
        assert!(is_conforming(&block, OracleType::Ttt, K));
        assert!(!is_conforming(&block, OracleType::Tft, K));
        assert!(!is_conforming(&block, OracleType::Fft, K));
    }

    #[test]
    fn check_unterminated() {
        let mut block = vec![0x11_u8; K];
        block[0] = 0x00;
        block[1] = 0x02;
        assert!(is_conforming(&block, OracleType::Ttt, K));
        assert!(is_conforming(&block, OracleType::Tft, K));
        assert!(!is_conforming(&block, OracleType::Ftt, K));
        assert!(!is_conforming(&block, OracleType::Fft, K));
    }

    #[test]
    fn check_premaster_secret_position() {
        let good = block_with_separator_at(K - PREMASTER_SECRET_LEN - 1);
        assert!(is_conforming(&good, OracleType::Fff, K));
        assert!(is_conforming(&good, OracleType::Fft, K));

        let bad = block_with_separator_at(K - PREMASTER_SECRET_LEN);
        assert!(!is_conforming(&bad, OracleType::Fff, K));
        assert!(is_conforming(&bad, OracleType::Fft, K));
    }

    #[test]
    fn check_jsse() {
        // second to last byte, no earlier zero
        let last = block_with_separator_at(K - 2);
        assert!(is_conforming(&last, OracleType::Jsse, K));

        let mut earlier = last.clone();
        earlier[20] = 0x00;
        assert!(!is_conforming(&earlier, OracleType::Jsse, K));
        assert!(is_conforming(&earlier, OracleType::Fft, K));

        // a zero anywhere else only leaks on keys longer than 129 bytes
        assert!(!is_conforming(&block_with_separator_at(20), OracleType::Jsse, K));
        assert!(!is_conforming(&block_with_separator_at(K - 1), OracleType::Jsse, K));

        let long = 256;
        let early = block_of_len_with_separator_at(long, 20);
        assert!(is_conforming(&early, OracleType::Jsse, long));
        assert!(is_conforming(&block_of_len_with_separator_at(long, long - 130), OracleType::Jsse, long));
        assert!(!is_conforming(&block_of_len_with_separator_at(long, long - 129), OracleType::Jsse, long));
        assert!(!is_conforming(&block_of_len_with_separator_at(long, 200), OracleType::Jsse, long));

        // padding is still enforced
        let mut short_padding = last;
        short_padding[5] = 0x00;
        assert!(!is_conforming(&short_padding, OracleType::Jsse, K));
    }

    #[test]
    fn check_enforced_checks() {
        for &t in [OracleType::Ttt, OracleType::BigIp].iter() {
            assert!(!t.checks_padding() && !t.checks_separator());
        }
        assert!(OracleType::Tft.checks_padding() && !OracleType::Tft.checks_separator());
        assert!(!OracleType::Ftt.checks_padding() && OracleType::Ftt.checks_separator());
        for &t in [OracleType::Fft, OracleType::Fff, OracleType::Jsse].iter() {
            assert!(t.checks_padding() && t.checks_separator());
        }
    }

    #[test]
    fn check_length_handling() {
        // leading zero stripped by big integer encoding
        let block = block_with_separator_at(30);
        assert!(is_conforming(&block[1..], OracleType::Fft, K));
        // longer than the block never conforms
        let mut long = vec![0x00];
        long.extend_from_slice(&block);
        assert!(!is_conforming(&long, OracleType::Fft, K));
    }
}
