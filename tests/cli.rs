use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn bin() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("nsp-aes"));
    cmd.env_remove("NSP_AES_KEY_FILE")
        .env_remove("NSP_AES_SALT")
        .env_remove("RUST_LOG");
    cmd
}

fn keygen(key: &Path, extra: &[&str]) {
    bin()
        .env("NSP_AES_PASSWORD", "pw")
        .arg("--key-file")
        .arg(key)
        .arg("keygen")
        .args(["--iterations", "1000"])
        .args(extra)
        .assert()
        .success()
        .stdout(predicate::str::contains("key file written"));
}

#[test]
fn keygen_creates_key_file() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("test.key");

    keygen(&key, &[]);

    let bytes = fs::read(&key).unwrap();
    // 256-bit key size, big-endian
    assert_eq!(&bytes[..4], &[0, 0, 1, 0]);
    assert!(bytes.windows(20).any(|w| w == b"PBKDF2WithHmacSHA256"));
}

#[test]
fn keygen_fails_if_key_file_exists() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("test.key");

    keygen(&key, &[]);
    let first = fs::read(&key).unwrap();

    bin()
        .env("NSP_AES_PASSWORD", "other")
        .arg("--key-file")
        .arg(&key)
        .arg("keygen")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read(&key).unwrap(), first);
}

#[test]
fn keygen_reads_confirmed_password_from_stdin() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("test.key");

    bin()
        .env_remove("NSP_AES_PASSWORD")
        .arg("--key-file")
        .arg(&key)
        .arg("keygen")
        .args(["--iterations", "1000"])
        .write_stdin("pw\npw\n")
        .assert()
        .success();

    assert!(key.exists());
}

#[test]
fn keygen_rejects_mismatched_passwords() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("test.key");

    bin()
        .env_remove("NSP_AES_PASSWORD")
        .arg("--key-file")
        .arg(&key)
        .arg("keygen")
        .write_stdin("pw\nnope\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("passwords do not match"));

    assert!(!key.exists());
}

#[test]
fn encrypt_and_decrypt_roundtrip_gcm() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("test.key");
    let plain = dir.path().join("plain.txt");
    let enc = dir.path().join("plain.enc");
    let dec = dir.path().join("plain.out");
    fs::write(&plain, b"attack at dawn").unwrap();

    keygen(&key, &[]);

    bin()
        .arg("--key-file")
        .arg(&key)
        .arg("encrypt")
        .arg(&plain)
        .arg(&enc)
        .assert()
        .success()
        .stdout(predicate::str::contains("AES/GCM/NoPadding"));

    assert_ne!(fs::read(&enc).unwrap(), b"attack at dawn");

    bin()
        .arg("--key-file")
        .arg(&key)
        .arg("decrypt")
        .arg(&enc)
        .arg(&dec)
        .assert()
        .success();

    assert_eq!(fs::read(&dec).unwrap(), b"attack at dawn");
}

#[test]
fn encrypt_and_decrypt_roundtrip_cbc() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("test.key");
    let plain = dir.path().join("plain.txt");
    let enc = dir.path().join("plain.enc");
    let dec = dir.path().join("plain.out");
    fs::write(&plain, b"attack at dawn").unwrap();

    keygen(&key, &["--key-size", "128", "--hash", "512"]);

    bin()
        .arg("--key-file")
        .arg(&key)
        .args(["encrypt", "--mode", "cbc"])
        .arg(&plain)
        .arg(&enc)
        .assert()
        .success()
        .stdout(predicate::str::contains("AES/CBC/PKCS5Padding"));

    // 14 bytes of plaintext pad to one block
    assert_eq!(fs::read(&enc).unwrap().len(), 16);

    bin()
        .arg("--key-file")
        .arg(&key)
        .args(["decrypt", "--mode", "cbc"])
        .arg(&enc)
        .arg(&dec)
        .assert()
        .success();

    assert_eq!(fs::read(&dec).unwrap(), b"attack at dawn");
}

#[test]
fn tampered_gcm_ciphertext_fails() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("test.key");
    let plain = dir.path().join("plain.txt");
    let enc = dir.path().join("plain.enc");
    let dec = dir.path().join("plain.out");
    fs::write(&plain, b"attack at dawn").unwrap();

    keygen(&key, &[]);

    bin()
        .arg("--key-file")
        .arg(&key)
        .arg("encrypt")
        .arg(&plain)
        .arg(&enc)
        .assert()
        .success();

    let mut bytes = fs::read(&enc).unwrap();
    bytes[3] ^= 0x80;
    fs::write(&enc, bytes).unwrap();

    bin()
        .arg("--key-file")
        .arg(&key)
        .arg("decrypt")
        .arg(&enc)
        .arg(&dec)
        .assert()
        .failure()
        .stderr(predicate::str::contains("authentication tag mismatch"));

    assert!(!dec.exists());
}

#[test]
fn encrypt_help_warns_about_nonce_reuse() {
    bin()
        .args(["encrypt", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("same nonce is reused"));
}

#[test]
fn actions_fail_if_key_file_missing() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("missing.key");
    let plain = dir.path().join("plain.txt");
    fs::write(&plain, b"x").unwrap();

    bin()
        .arg("--key-file")
        .arg(&key)
        .arg("encrypt")
        .arg(&plain)
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("key file does not exist"));
}

#[test]
fn invalid_mode_is_rejected() {
    let dir = tempdir().unwrap();

    bin()
        .arg("--key-file")
        .arg(dir.path().join("k.key"))
        .args(["encrypt", "--mode", "ctr", "a", "b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported algorithm"));
}

#[test]
fn info_reports_metadata() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("test.key");

    keygen(&key, &["--key-size", "192", "--hash", "384"]);

    bin()
        .arg("--key-file")
        .arg(&key)
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("192 bits"))
        .stdout(predicate::str::contains("PBKDF2WithHmacSHA384"))
        .stdout(predicate::str::contains("delimited"));
}

#[test]
fn info_json_for_length_prefixed_key_file() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("test.nspk");

    keygen(&key, &["--format", "length-prefixed"]);

    let output = bin()
        .arg("--key-file")
        .arg(&key)
        .args(["info", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["format"], "length-prefixed");
    assert_eq!(info["key_bits"], 256);
    assert_eq!(info["kdf_algorithm"], "PBKDF2WithHmacSHA256");
    assert_eq!(info["iv_len"], 16);
}

#[test]
fn info_fails_on_corrupt_key_file() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("bad.key");
    fs::write(&key, [0u8, 0, 1, 0, b'x']).unwrap();

    bin()
        .arg("--key-file")
        .arg(&key)
        .arg("info")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid key file"));
}

#[test]
fn password_uses_requested_charset() {
    let output = bin()
        .args(["password", "--length", "10", "--charset", "ab"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let pw = stdout.trim_end();
    assert_eq!(pw.len(), 10);
    assert!(pw.chars().all(|c| c == 'a' || c == 'b'));
}

#[test]
fn password_default_length() {
    bin()
        .arg("password")
        .assert()
        .success()
        .stdout(predicate::function(|s: &str| s.trim_end_matches('\n').chars().count() == 16));
}
