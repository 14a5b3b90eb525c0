use super::RandomMode;
use rand::rngs::OsRng;
use rand::{Error, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the single byte a random pass repeats over the file.
pub trait RandomByteSource {
    /// Returns a byte in `0..=255` drawn under `mode`.
    ///
    /// `RandomMode::None` is never asked for by the engine. The engine adds
    /// the pass index to any error.
    fn next_byte(&mut self, mode: RandomMode) -> Result<u8, Error>;
}

impl<R: RandomByteSource + ?Sized> RandomByteSource for &mut R {
    fn next_byte(&mut self, mode: RandomMode) -> Result<u8, Error> {
        (**self).next_byte(mode)
    }
}

/// Fast mode uses a ChaCha8 stream seeded on first use; secure mode reads
/// the OS generator every time.
#[derive(Default)]
pub struct SystemRandom {
    fast: Option<ChaCha8Rng>,
}

impl SystemRandom {
    pub fn new() -> Self {
        Self::default()
    }

    fn fast_rng(&mut self) -> &mut ChaCha8Rng {
        self.fast.get_or_insert_with(|| {
            // The fast stream makes no secrecy promise, so a clock seed is
            // acceptable when the OS pool cannot seed it.
            ChaCha8Rng::from_rng(OsRng).unwrap_or_else(|_| {
                let nanos = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_nanos() as u64)
                    .unwrap_or_default();
                ChaCha8Rng::seed_from_u64(nanos)
            })
        })
    }
}

impl RandomByteSource for SystemRandom {
    fn next_byte(&mut self, mode: RandomMode) -> Result<u8, Error> {
        match mode {
            RandomMode::None => Ok(0),
            RandomMode::FastPseudo => {
                let mut byte = [0u8; 1];
                self.fast_rng().fill_bytes(&mut byte);
                Ok(byte[0])
            }
            RandomMode::CryptoSecure => {
                let mut byte = [0u8; 1];
                OsRng.try_fill_bytes(&mut byte)?;
                Ok(byte[0])
            }
        }
    }
}

/// Replays a fixed list of bytes, cycling when it runs out.
///
/// Makes random passes deterministic in tests and dry runs.
#[derive(Debug, Clone)]
pub struct FixedSequence {
    bytes: Vec<u8>,
    drawn: usize,
}

impl FixedSequence {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, drawn: 0 }
    }

    /// Number of bytes handed out so far.
    pub fn drawn(&self) -> usize {
        self.drawn
    }
}

impl RandomByteSource for FixedSequence {
    fn next_byte(&mut self, _mode: RandomMode) -> Result<u8, Error> {
        let byte = match self.bytes.len() {
            0 => 0,
            len => self.bytes[self.drawn % len],
        };
        self.drawn += 1;
        Ok(byte)
    }
}
