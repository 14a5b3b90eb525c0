pub mod random;
pub mod rules;

use crate::error::{WipeError, WipeResult};
use random::RandomByteSource;
use std::borrow::Cow;
use std::fmt;

/// Longest pattern a fixed pass may carry.
pub const MAX_PATTERN_LEN: usize = 255;

/// Where the bytes of a pass come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RandomMode {
    /// Write the pass's own pattern.
    None,
    /// One byte from a fast, non-cryptographic generator.
    FastPseudo,
    /// One byte from the operating system's secure generator.
    CryptoSecure,
}

impl RandomMode {
    pub fn name(&self) -> &'static str {
        match self {
            RandomMode::None => "none",
            RandomMode::FastPseudo => "random",
            RandomMode::CryptoSecure => "crypto",
        }
    }
}

/// One full sweep over the file.
///
/// A fixed pass (`RandomMode::None`) writes its pattern cyclically. A random
/// pass ignores its pattern, draws a single byte when the pass starts and
/// repeats that byte over the whole file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    pattern: Cow<'static, [u8]>,
    mode: RandomMode,
}

impl Pass {
    /// Builds a pass from caller-owned bytes. The bytes are copied.
    pub fn new(pattern: &[u8], mode: RandomMode) -> Self {
        Self {
            pattern: Cow::Owned(pattern.to_vec()),
            mode,
        }
    }

    pub const fn fixed(pattern: &'static [u8]) -> Self {
        Self {
            pattern: Cow::Borrowed(pattern),
            mode: RandomMode::None,
        }
    }

    pub const fn random(mode: RandomMode) -> Self {
        Self {
            pattern: Cow::Borrowed(&[]),
            mode,
        }
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    pub fn mode(&self) -> RandomMode {
        self.mode
    }

    pub fn is_random(&self) -> bool {
        self.mode != RandomMode::None
    }

    /// Resolves the bytes this pass tiles over the file.
    ///
    /// Random passes draw exactly one byte from `source`.
    pub fn resolve<R: RandomByteSource + ?Sized>(
        &self,
        source: &mut R,
    ) -> Result<Cow<'_, [u8]>, rand::Error> {
        match self.mode {
            RandomMode::None => Ok(Cow::Borrowed(&self.pattern[..])),
            mode => Ok(Cow::Owned(vec![source.next_byte(mode)?])),
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_random() {
            return f.write_str(self.mode.name());
        }
        for (i, byte) in self.pattern.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "0x{:02X}", byte)?;
        }
        Ok(())
    }
}

/// An ordered list of passes; the order is the write order.
///
/// Built-in rules borrow static pass tables and are never mutated: editing
/// a clone copies the table first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    passes: Cow<'static, [Pass]>,
}

impl Rule {
    pub fn new(passes: Vec<Pass>) -> Self {
        Self {
            passes: Cow::Owned(passes),
        }
    }

    pub const fn from_static(passes: &'static [Pass]) -> Self {
        Self {
            passes: Cow::Borrowed(passes),
        }
    }

    pub fn add(&mut self, pass: Pass) {
        self.passes.to_mut().push(pass);
    }

    pub fn clear(&mut self) {
        self.passes = Cow::Owned(Vec::new());
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Checks that the rule can be executed, without touching any file.
    pub fn validate(&self) -> WipeResult<()> {
        if self.is_empty() {
            return Err(WipeError::EmptyRule);
        }
        if let Some(pass) = self
            .passes
            .iter()
            .position(|p| !p.is_random() && p.pattern.is_empty())
        {
            return Err(WipeError::EmptyPattern { pass });
        }
        if let Some((pass, p)) = self
            .passes
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_random() && p.pattern.len() > MAX_PATTERN_LEN)
        {
            return Err(WipeError::PatternTooLong {
                pass,
                len: p.pattern.len(),
                max: MAX_PATTERN_LEN,
            });
        }
        Ok(())
    }
}

impl Default for Rule {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FromIterator<Pass> for Rule {
    fn from_iter<I: IntoIterator<Item = Pass>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pass) in self.passes.iter().enumerate() {
            writeln!(f, "PASS #{}: {}", i + 1, pass)?;
        }
        Ok(())
    }
}

/// Tiles `pattern` over `buffer`, starting `phase` bytes into the pattern.
pub fn fill_cyclic(buffer: &mut [u8], pattern: &[u8], phase: usize) {
    match pattern.len() {
        0 => {}
        1 => buffer.fill(pattern[0]),
        len => {
            let phase = phase % len;
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = pattern[(phase + i) % len];
            }
        }
    }
}
