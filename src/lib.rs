//! Bleichenbacher's adaptive chosen-ciphertext attack on RSA PKCS#1 v1.5 padding

pub mod attack;
pub mod bigint;
pub mod config;
pub mod interval;
pub mod oracle;
pub mod pkcs1;

pub use attack::{Bleichenbacher, Bounds, CoarseBounds, CoarseConfig, CoarseSearch, Error, Session};
pub use interval::{Interval, IntervalSet};
pub use oracle::{Oracle, OracleType, PublicKeyInfo};
