//! Minimal XDR encoding for a single native payment transaction.
//!
//! Only the shapes needed to drain an account are supported: an ed25519
//! source, time-bound preconditions, no memo and one `PAYMENT` operation in
//! the native asset.

use ring::digest;

use crate::keys::SigningKey;

const ENVELOPE_TYPE_TX: i32 = 2;
const KEY_TYPE_ED25519: i32 = 0;
const PRECOND_TIME: i32 = 1;
const MEMO_NONE: i32 = 0;
const OPERATION_PAYMENT: i32 = 1;
const ASSET_TYPE_NATIVE: i32 = 0;

/// Big-endian, 4-byte aligned writer.
#[derive(Debug, Default)]
pub struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn uint(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn hyper(&mut self, v: i64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn uhyper(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Fixed-length opaque data, zero padded to a multiple of four.
    pub fn opaque_fixed(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        let pad = (4 - bytes.len() % 4) % 4;
        self.buf.extend(std::iter::repeat_n(0u8, pad));
        self
    }

    /// Variable-length opaque data with a length prefix.
    pub fn opaque_var(&mut self, bytes: &[u8]) -> &mut Self {
        // Callers only pass signatures, which are far below u32::MAX.
        self.uint(bytes.len() as u32);
        self.opaque_fixed(bytes)
    }

    fn muxed_ed25519(&mut self, key: &[u8; 32]) -> &mut Self {
        self.int(KEY_TYPE_ED25519).opaque_fixed(key)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// `SHA-256(passphrase)`, the network id mixed into every signature.
pub fn network_id(passphrase: &str) -> [u8; 32] {
    sha256(&[passphrase.as_bytes()])
}

fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut ctx = digest::Context::new(&digest::SHA256);
    for part in parts {
        ctx.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(ctx.finish().as_ref());
    out
}

/// A payment of `amount` stroops from `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTransaction {
    pub source: [u8; 32],
    /// Total fee in stroops (base fee × operation count).
    pub fee: u32,
    /// Sequence number of this transaction, i.e. account sequence + 1.
    pub sequence: i64,
    pub min_time: u64,
    /// Unix seconds after which the transaction is invalid. `0` disables.
    pub max_time: u64,
    pub destination: [u8; 32],
    pub amount: i64,
}

impl PaymentTransaction {
    /// XDR of the `Transaction` struct.
    pub fn to_xdr(&self) -> Vec<u8> {
        let mut w = XdrWriter::new();
        w.muxed_ed25519(&self.source)
            .uint(self.fee)
            .hyper(self.sequence)
            .int(PRECOND_TIME)
            .uhyper(self.min_time)
            .uhyper(self.max_time)
            .int(MEMO_NONE)
            // one operation, without its own source account
            .uint(1)
            .int(0)
            .int(OPERATION_PAYMENT)
            .muxed_ed25519(&self.destination)
            .int(ASSET_TYPE_NATIVE)
            .hyper(self.amount)
            // ext
            .int(0);
        w.into_bytes()
    }

    /// The transaction hash that gets signed and identifies it on chain.
    pub fn hash(&self, network_id: &[u8; 32]) -> [u8; 32] {
        let envelope_type = ENVELOPE_TYPE_TX.to_be_bytes();
        let xdr = self.to_xdr();
        sha256(&[network_id.as_slice(), envelope_type.as_slice(), xdr.as_slice()])
    }
}

/// A signed, base64 encoded `TransactionEnvelope` ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub envelope_xdr: String,
    /// Lowercase hex transaction hash.
    pub hash: String,
}

pub fn signed_envelope(
    tx: &PaymentTransaction,
    network_id: &[u8; 32],
    signer: &dyn SigningKey,
) -> SignedEnvelope {
    let hash = tx.hash(network_id);
    let signature = signer.sign(&hash);
    let public = signer.account_id().public_key();

    let mut w = XdrWriter::new();
    w.int(ENVELOPE_TYPE_TX);
    w.buf.extend_from_slice(&tx.to_xdr());
    // one decorated signature, hinted by the last four key bytes
    w.uint(1)
        .opaque_fixed(&public[28..])
        .opaque_var(&signature);

    SignedEnvelope {
        envelope_xdr: fast32::base64::RFC4648.encode(&w.into_bytes()),
        hash: hash.iter().map(|b| format!("{b:02x}")).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Ed25519Key;

    fn sample_tx(source: [u8; 32]) -> PaymentTransaction {
        PaymentTransaction {
            source,
            fee: 100,
            sequence: 42,
            min_time: 0,
            max_time: 1_700_000_030,
            destination: [0u8; 32],
            amount: 39_900_000,
        }
    }

    #[test]
    fn test_network_id() {
        let id = network_id("Test SDF Network ; September 2015");
        let hex: String = id.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(
            hex,
            "cee0302d59844d32bdca915c8203dd44b33fbb7edc19051ea37abedf28ecd472"
        );
    }

    #[test]
    fn test_transaction_layout() {
        let xdr = sample_tx([1u8; 32]).to_xdr();
        assert_eq!(xdr.len(), 136);
        // fee follows the 36-byte muxed source
        assert_eq!(&xdr[36..40], &100u32.to_be_bytes());
        assert_eq!(&xdr[40..48], &42i64.to_be_bytes());
        // amount sits just before the trailing ext
        assert_eq!(&xdr[124..132], &39_900_000i64.to_be_bytes());
    }

    #[test]
    fn test_transaction_hash() {
        let hash = sample_tx([1u8; 32]).hash(&network_id("Pi Network"));
        let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(
            hex,
            "d72db3803d60887e37ed63f92f3f0caf4f71418cce329436989d4386f7cc996e"
        );
    }

    #[test]
    fn test_signed_envelope() {
        let key = Ed25519Key::from_seed(&[9u8; 32]).unwrap();
        let tx = sample_tx(*key.account_id().public_key());
        let net = network_id("Pi Network");
        let signed = signed_envelope(&tx, &net, &key);

        let bytes = fast32::base64::RFC4648
            .decode_str(&signed.envelope_xdr)
            .unwrap();
        assert_eq!(bytes.len(), 216);
        assert_eq!(&bytes[..4], &2i32.to_be_bytes());
        assert_eq!(&bytes[4..140], tx.to_xdr().as_slice());
        assert_eq!(&bytes[144..148], &key.account_id().public_key()[28..]);
        assert_eq!(signed.hash.len(), 64);
    }

    #[test]
    fn test_opaque_padding() {
        let mut w = XdrWriter::new();
        w.opaque_var(&[1, 2, 3]);
        assert_eq!(w.into_bytes(), vec![0, 0, 0, 3, 1, 2, 3, 0]);
    }
}
