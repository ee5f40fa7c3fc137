use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use num::bigint::BigUint;
use tracing::{debug, trace};

use crate::bigint::to_block;

use super::{Error, Oracle, OracleType, PublicKeyInfo};

/// Oracle backed by an external program
///
/// Each query runs `program args... <hex ciphertext>`. The program signals
/// a conforming block with exit status 0 and a non-conforming one with 1.
/// Anything else is a transport failure.
pub struct CommandOracle {
    program: PathBuf,
    args: Vec<OsString>,
    public_key: PublicKeyInfo,
    plaintext: bool,
    oracle_type: OracleType,
    block_size: usize,
    queries: u64,
}

impl CommandOracle {
    pub fn new<P, I, A>(program: P, args: I, public_key: PublicKeyInfo) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        let block_size = public_key.block_size();
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            public_key,
            plaintext: false,
            oracle_type: OracleType::Ttt,
            block_size,
            queries: 0,
        }
    }

    /// Mark the program as taking multiplied plaintexts instead of ciphertexts
    pub fn plaintext(mut self, plaintext: bool) -> Self {
        self.plaintext = plaintext;
        self
    }

    /// Declare the checks the program is known to enforce
    pub fn with_oracle_type(mut self, oracle_type: OracleType) -> Self {
        self.oracle_type = oracle_type;
        self
    }
}

impl Oracle for CommandOracle {
    fn check_pkcs_conformity(&mut self, ciphertext: &[u8]) -> Result<bool, Error> {
        self.queries += 1;

        let block = to_block(&BigUint::from_bytes_be(ciphertext), self.block_size);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(hex::encode(&block))
            .stdin(Stdio::null())
            .output()?;

        match output.status.code() {
            Some(0) => {
                trace!(query = self.queries, conforming = true, "command oracle query");
                Ok(true)
            }
            Some(1) => {
                trace!(query = self.queries, conforming = false, "command oracle query");
                Ok(false)
            }
            status => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                debug!(?status, %stderr, "oracle command failed");
                Err(Error::CommandFailed { status, stderr })
            }
        }
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn number_of_queries(&self) -> u64 {
        self.queries
    }

    fn public_key(&self) -> &PublicKeyInfo {
        &self.public_key
    }

    fn is_plaintext_oracle(&self) -> bool {
        self.plaintext
    }

    fn oracle_type(&self) -> OracleType {
        self.oracle_type
    }
}
