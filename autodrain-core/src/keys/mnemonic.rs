//! BIP-39 seed generation and SLIP-10 ed25519 derivation.

use bip39::{Language, Mnemonic};
use ring::hmac;
use std::str::FromStr;

use super::strkey::{decode_secret_seed, looks_like_secret_seed};
use super::{Credential, Ed25519Key, KeyDeriver, KeyError, SigningKey};

/// Derivation path used by Pi Network wallets.
pub const PI_DERIVATION_PATH: &str = "m/44'/314159'/0'";

const HARDENED: u32 = 0x8000_0000;

/// A fully hardened derivation path such as `m/44'/148'/0'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    /// Child indices without the hardened bit.
    pub fn indices(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for DerivationPath {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyError::InvalidPath(s.to_owned());
        let mut segments = s.trim().split('/');
        if segments.next() != Some("m") {
            return Err(invalid());
        }
        segments
            .map(|segment| {
                // ed25519 only supports hardened children.
                let index = segment
                    .strip_suffix('\'')
                    .or_else(|| segment.strip_suffix('h'))
                    .ok_or_else(invalid)?;
                let index: u32 = index.parse().map_err(|_| invalid())?;
                if index >= HARDENED {
                    return Err(invalid());
                }
                Ok(index)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(DerivationPath)
    }
}

/// Parse a BIP-39 English mnemonic, checking the wordlist and checksum.
///
/// Case and surrounding whitespace are ignored.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, KeyError> {
    let normalized = phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| KeyError::InvalidMnemonic(e.to_string()))
}

/// SLIP-10 ed25519 private key derivation.
pub fn slip10_ed25519(seed: &[u8], path: &DerivationPath) -> [u8; 32] {
    let (mut key, mut chain_code) = split(hmac_sha512(b"ed25519 seed", &[seed]));
    for index in path.indices() {
        let child = (index | HARDENED).to_be_bytes();
        (key, chain_code) = split(hmac_sha512(&chain_code, &[&[0u8], &key, &child]));
    }
    key
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> [u8; 64] {
    let key = hmac::Key::new(hmac::HMAC_SHA512, key);
    let mut ctx = hmac::Context::with_key(&key);
    for part in parts {
        ctx.update(part);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(ctx.sign().as_ref());
    out
}

fn split(i: [u8; 64]) -> ([u8; 32], [u8; 32]) {
    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&i[..32]);
    right.copy_from_slice(&i[32..]);
    (left, right)
}

/// Resolves credentials into ed25519 signing keys.
///
/// Accepts either a BIP-39 mnemonic (derived along the configured path) or
/// a raw `S...` secret seed.
#[derive(Debug, Clone)]
pub struct MnemonicDeriver {
    path: DerivationPath,
    passphrase: String,
}

impl MnemonicDeriver {
    pub fn new(path: DerivationPath) -> Self {
        Self {
            path,
            passphrase: String::new(),
        }
    }

    /// Use a BIP-39 passphrase ("25th word").
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = passphrase.into();
        self
    }

    /// Deriver for the Pi Network path.
    pub fn pi_network() -> Self {
        Self::new(DerivationPath(vec![44, 314159, 0]))
    }
}

impl KeyDeriver for MnemonicDeriver {
    fn derive(&self, credential: &Credential) -> Result<Box<dyn SigningKey>, KeyError> {
        let secret = credential.expose().trim();
        let seed = if looks_like_secret_seed(secret) {
            decode_secret_seed(secret)?
        } else {
            let mnemonic = parse_mnemonic(secret)?;
            slip10_ed25519(&mnemonic.to_seed_normalized(&self.passphrase), &self.path)
        };
        Ok(Box::new(Ed25519Key::from_seed(&seed)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEP5_MNEMONIC: &str =
        "illness spike retreat truth genius clock brain pass fit cave bargain toe";

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_bip39_seed_vector() {
        let mnemonic = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let seed = parse_mnemonic(mnemonic).unwrap().to_seed_normalized("TREZOR");
        assert_eq!(
            hex(&seed),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
    }

    #[test]
    fn test_slip10_vector() {
        let seed: Vec<u8> = (0u8..16).collect();
        let master = slip10_ed25519(&seed, &"m".parse().unwrap());
        assert_eq!(
            hex(&master),
            "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7"
        );
        let child = slip10_ed25519(&seed, &"m/0'".parse().unwrap());
        assert_eq!(
            hex(&child),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
    }

    #[test]
    fn test_stellar_path_account() {
        let deriver = MnemonicDeriver::new("m/44'/148'/0'".parse().unwrap());
        let key = deriver.derive(&Credential::new(SEP5_MNEMONIC)).unwrap();
        assert_eq!(
            key.account_id().as_str(),
            "GDRXE2BQUC3AZNPVFSCEZ76NJ3WWL25FYFK6RGZGIEKWE4SOOHSUJUJ6"
        );
    }

    #[test]
    fn test_pi_path_account() {
        let key = MnemonicDeriver::pi_network()
            .derive(&Credential::new(format!("  {}  ", SEP5_MNEMONIC.to_uppercase())))
            .unwrap();
        assert_eq!(
            key.account_id().as_str(),
            "GASWRHYE32A5A27TQWNRITIOZKOX7XQ6IVI4WEDGPVGX253D63UW2GJ3"
        );
    }

    #[test]
    fn test_secret_seed_credential() {
        let key = MnemonicDeriver::pi_network()
            .derive(&Credential::new(
                "SBGWSG6BTNCKCOB3DIFBGCVMUPQFYPA2G4O34RMTB343OYPXU5DJDVMN",
            ))
            .unwrap();
        assert_eq!(
            key.account_id().as_str(),
            "GDRXE2BQUC3AZNPVFSCEZ76NJ3WWL25FYFK6RGZGIEKWE4SOOHSUJUJ6"
        );
    }

    #[test]
    fn test_invalid_credentials() {
        let deriver = MnemonicDeriver::pi_network();
        assert!(matches!(
            deriver.derive(&Credential::new("too few words")),
            Err(KeyError::InvalidMnemonic(_))
        ));
        let numeric = "one two three four five six seven eight nine ten eleven 12";
        assert!(matches!(
            deriver.derive(&Credential::new(numeric)),
            Err(KeyError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_rejects_bad_checksum_and_unknown_words() {
        let deriver = MnemonicDeriver::pi_network();
        let bad_checksum = ["abandon"; 12].join(" ");
        assert!(matches!(
            deriver.derive(&Credential::new(bad_checksum)),
            Err(KeyError::InvalidMnemonic(_))
        ));
        let typo = format!("{} abuot", ["abandon"; 11].join(" "));
        assert!(matches!(
            deriver.derive(&Credential::new(typo)),
            Err(KeyError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_derivation_path_parsing() {
        let path: DerivationPath = PI_DERIVATION_PATH.parse().unwrap();
        assert_eq!(path.indices(), &[44, 314159, 0]);
        assert!("m/44/0'".parse::<DerivationPath>().is_err());
        assert!("44'/0'".parse::<DerivationPath>().is_err());
        assert_eq!("m/1h".parse::<DerivationPath>().unwrap().indices(), &[1]);
    }
}
