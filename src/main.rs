use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use nsp_aes::options::DEFAULT_ITERATIONS;
use nsp_aes::{
    AesEngine, Algorithm, DEFAULT_CHARSET, HashSize, KeyFileFormat, KeySize, Options, Storage,
    default_key_path, format, generate_password,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Args)]
struct KdfArgs {
    /// AES key size in bits: 128, 192 or 256
    #[arg(long = "key-size", default_value = "256")]
    key_size: KeySize,

    /// PBKDF2 hash width: 224, 256, 384 or 512
    #[arg(long = "hash", default_value = "256")]
    hash: HashSize,

    /// PBKDF2 iteration count
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: u32,

    /// Salt for key derivation (default: the password itself)
    #[arg(long, env = "NSP_AES_SALT")]
    salt: Option<String>,
}

impl KdfArgs {
    fn to_options(&self, password: &str) -> Options {
        Options::new()
            .with_key_size(self.key_size)
            .with_hash_size(self.hash)
            .with_iterations(self.iterations)
            .with_password_and_salt(password, self.salt.as_deref().unwrap_or(""))
    }
}

fn resolve_key_file(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p),
        None => Ok(default_key_path()?),
    }
}

#[derive(Debug, Parser)]
#[command(name = "nsp-aes")]
#[command(
    version,
    about = "Password-based AES-CBC/AES-GCM encryption with portable key files."
)]
struct Cli {
    /// Path to the key file
    #[arg(long, global = true, value_name = "PATH", env = "NSP_AES_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Derives a key from a password and writes a new key file
    Keygen {
        #[command(flatten)]
        kdf: KdfArgs,

        /// Key file layout: delimited or length-prefixed
        #[arg(long, default_value = "delimited")]
        format: KeyFileFormat,
    },

    /// Encrypts a file with the key file
    ///
    /// The IV stored in the key file is used for every file encrypted with
    /// that key file. In GCM mode this means the same nonce is reused across
    /// files, so two ciphertexts made with one key file leak the XOR of their
    /// plaintexts and do not protect against forgery. Generate a separate key
    /// file per file when that matters.
    #[command(arg_required_else_help = true)]
    Encrypt {
        /// Cipher mode: cbc or gcm (gcm reuses the key file IV as its nonce)
        #[arg(short, long, default_value = "gcm")]
        mode: Algorithm,
        input: PathBuf,
        output: PathBuf,
    },

    /// Decrypts a file with the key file
    #[command(arg_required_else_help = true)]
    Decrypt {
        /// Cipher mode: cbc or gcm
        #[arg(short, long, default_value = "gcm")]
        mode: Algorithm,
        input: PathBuf,
        output: PathBuf,
    },

    /// Shows key file metadata (never the key itself)
    Info {
        /// Print as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Generates a random password
    Password {
        /// Number of characters
        #[arg(short, long, default_value_t = 16)]
        length: usize,

        /// Characters to draw from
        #[arg(long, default_value = DEFAULT_CHARSET)]
        charset: String,

        /// Copy to the clipboard instead of printing
        #[arg(long, default_value_t = false)]
        copy: bool,
    },
}

#[derive(Debug, Serialize)]
struct KeyFileInfo {
    path: PathBuf,
    format: KeyFileFormat,
    key_bits: u32,
    kdf_algorithm: String,
    iv_len: usize,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("nsp_aes=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nsp_aes=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_engine(key_file: &Storage, mode: Algorithm) -> Result<AesEngine> {
    let path = key_file.path();
    if !key_file.exists() {
        bail!("key file does not exist: {}", path.display());
    }
    AesEngine::from_key_file(path, mode)
        .with_context(|| format!("failed to load key file {}", path.display()))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Keygen { kdf, format } => {
            let key_file = Storage::new(resolve_key_file(args.key_file)?);
            if key_file.exists() {
                bail!("key file already exists: {}", key_file.path().display());
            }
            let password = auth::read_new_password()?;
            let engine = AesEngine::new(kdf.to_options(&password))
                .context("failed to derive key material")?;
            drop(password);
            engine.write_key_file_as(key_file.path(), format)?;
            println!("key file written to {}", key_file.path().display());
        }
        Commands::Encrypt {
            mode,
            input,
            output,
        } => {
            let key_file = Storage::new(resolve_key_file(args.key_file)?);
            let engine = load_engine(&key_file, mode)?;
            let plaintext = Storage::new(input.clone())
                .load()
                .with_context(|| format!("cannot read {}", input.display()))?;
            let ciphertext = engine.encrypt(&plaintext)?;
            Storage::new(output.clone())
                .save(&ciphertext)
                .with_context(|| format!("cannot write {}", output.display()))?;
            println!(
                "encrypted {} -> {} ({})",
                input.display(),
                output.display(),
                engine.transformation()
            );
        }
        Commands::Decrypt {
            mode,
            input,
            output,
        } => {
            let key_file = Storage::new(resolve_key_file(args.key_file)?);
            let engine = load_engine(&key_file, mode)?;
            let ciphertext = Storage::new(input.clone())
                .load()
                .with_context(|| format!("cannot read {}", input.display()))?;
            let plaintext = engine.decrypt(&ciphertext)?;
            Storage::new(output.clone())
                .save(&plaintext)
                .with_context(|| format!("cannot write {}", output.display()))?;
            println!("decrypted {} -> {}", input.display(), output.display());
        }
        Commands::Info { json } => {
            let key_file = resolve_key_file(args.key_file)?;
            let data = Storage::new(key_file.clone())
                .load()
                .with_context(|| format!("cannot read key file {}", key_file.display()))?;
            let material = format::parse(&data)
                .with_context(|| format!("invalid key file {}", key_file.display()))?;
            let info = KeyFileInfo {
                path: key_file,
                format: KeyFileFormat::detect(&data),
                key_bits: material.key_size().bits(),
                kdf_algorithm: material.kdf_algorithm(),
                iv_len: material.iv().len(),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Path:       {}", info.path.display());
                println!("Format:     {}", info.format);
                println!("Key size:   {} bits", info.key_bits);
                println!("Derivation: {}", info.kdf_algorithm);
                println!("IV length:  {} bytes", info.iv_len);
            }
        }
        Commands::Password {
            length,
            charset,
            copy,
        } => {
            let password = generate_password(length, &charset)?;
            if copy {
                let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
                clipboard
                    .set_text(password)
                    .context("failed to copy password to clipboard")?;
                println!("password copied to clipboard");
            } else {
                println!("{password}");
            }
        }
    }

    Ok(())
}
