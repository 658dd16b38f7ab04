use hmac::{Hmac, Mac};
use rand_core::{impls, Error, RngCore};
use sha2::Sha256;

// Deterministic RNG using provably-fair HMAC construction
// server_seed (secret) + client_seed + nonce + block -> HMAC-SHA256 -> 32 bytes per block

pub type HmacSha256 = Hmac<Sha256>;

pub fn derive_hash_hex(input: &[u8]) -> String {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Byte stream of successive HMAC blocks, usable anywhere a `rand::Rng` is.
///
/// Publishing `server_seed_hash_hex()` before play and revealing the server
/// seed afterwards lets a player replay every grid of the session.
#[derive(Debug, Clone)]
pub struct ProvablyFairRng {
    pub server_seed: String, // secret
    pub client_seed: String,
    pub nonce: u64,
    block: u64,
    buffer: [u8; 32],
    cursor: usize,
}

impl ProvablyFairRng {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        let mut rng = Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
            nonce,
            block: 0,
            buffer: [0u8; 32],
            cursor: 0,
        };
        rng.buffer = rng.hmac_bytes(0);
        rng
    }

    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }

    pub fn hmac_bytes(&self, block: u64) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(self.server_seed.as_bytes()).expect("HMAC key");
        let msg = format!("{}:{}:{}", self.client_seed, self.nonce, block);
        mac.update(msg.as_bytes());
        let res = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&res);
        out
    }

    /// Number of HMAC blocks consumed so far.
    pub fn blocks_used(&self) -> u64 {
        self.block + 1
    }
}

impl RngCore for ProvablyFairRng {
    fn next_u32(&mut self) -> u32 {
        if self.cursor + 4 > self.buffer.len() {
            self.block += 1;
            self.buffer = self.hmac_bytes(self.block);
            self.cursor = 0;
        }
        let chunk = &self.buffer[self.cursor..self.cursor + 4];
        self.cursor += 4;
        u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
