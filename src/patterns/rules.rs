use super::{Pass, RandomMode, Rule, MAX_PATTERN_LEN};
use anyhow::{anyhow, bail, Result};

const RANDOM: Pass = Pass::random(RandomMode::FastPseudo);

static FAST_PASSES: [Pass; 1] = [Pass::fixed(&[0x00])];

// German VSITR: three alternations of zeros and ones, then 10101010.
static VSITR_PASSES: [Pass; 7] = [
    Pass::fixed(&[0x00]),
    Pass::fixed(&[0xFF]),
    Pass::fixed(&[0x00]),
    Pass::fixed(&[0xFF]),
    Pass::fixed(&[0x00]),
    Pass::fixed(&[0xFF]),
    Pass::fixed(&[0xAA]),
];

static DOD_PASSES: [Pass; 3] = [Pass::fixed(&[0x00]), Pass::fixed(&[0xFF]), RANDOM];

// Four random lead-in passes, the 27 MFM/RLL patterns in table order, four
// random lead-out passes.
static GUTMANN_PASSES: [Pass; 35] = [
    RANDOM,
    RANDOM,
    RANDOM,
    RANDOM,
    Pass::fixed(&[0x55]),
    Pass::fixed(&[0xAA]),
    Pass::fixed(&[0x92, 0x49, 0x24]),
    Pass::fixed(&[0x49, 0x24, 0x92]),
    Pass::fixed(&[0x24, 0x92, 0x49]),
    Pass::fixed(&[0x00]),
    Pass::fixed(&[0x11]),
    Pass::fixed(&[0x22]),
    Pass::fixed(&[0x33]),
    Pass::fixed(&[0x44]),
    Pass::fixed(&[0x55]),
    Pass::fixed(&[0x66]),
    Pass::fixed(&[0x77]),
    Pass::fixed(&[0x88]),
    Pass::fixed(&[0x99]),
    Pass::fixed(&[0xAA]),
    Pass::fixed(&[0xBB]),
    Pass::fixed(&[0xCC]),
    Pass::fixed(&[0xDD]),
    Pass::fixed(&[0xEE]),
    Pass::fixed(&[0xFF]),
    Pass::fixed(&[0x92, 0x49, 0x24]),
    Pass::fixed(&[0x49, 0x24, 0x92]),
    Pass::fixed(&[0x24, 0x92, 0x49]),
    Pass::fixed(&[0x6D, 0xB6, 0xDB]),
    Pass::fixed(&[0xB6, 0xDB, 0x6D]),
    // 11011011 01101101 10110110, as published; not the 0xDB 0x92 0x49
    // that some tables print for this row.
    Pass::fixed(&[0xDB, 0x6D, 0xB6]),
    RANDOM,
    RANDOM,
    RANDOM,
    RANDOM,
];

/// Single zero-fill pass.
pub static FAST: Rule = Rule::from_static(&FAST_PASSES);

/// German VSITR, 7 passes.
pub static VSITR: Rule = Rule::from_static(&VSITR_PASSES);

/// US DoD 5220.22-M, 3 passes: zeros, ones, one random byte.
pub static DOD_5220_22_M: Rule = Rule::from_static(&DOD_PASSES);

/// Peter Gutmann's 35-pass method.
pub static GUTMANN: Rule = Rule::from_static(&GUTMANN_PASSES);

/// Parses one pass from its config spelling.
///
/// Accepts `zeros`, `ones`, `random`, `crypto`, or hex bytes separated by
/// spaces or commas (`0x92 0x49 0x24`, `aa`).
pub fn parse_pass(text: &str) -> Result<Pass> {
    let text = text.trim();
    match text.to_lowercase().as_str() {
        "zeros" => return Ok(Pass::fixed(&[0x00])),
        "ones" => return Ok(Pass::fixed(&[0xFF])),
        "random" => return Ok(Pass::random(RandomMode::FastPseudo)),
        "crypto" => return Ok(Pass::random(RandomMode::CryptoSecure)),
        _ => {}
    }

    let pattern = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            u8::from_str_radix(digits, 16)
                .map_err(|_| anyhow!("invalid byte '{}' in pass '{}'", token, text))
        })
        .collect::<Result<Vec<u8>>>()?;

    if pattern.is_empty() {
        bail!("empty pass pattern");
    }
    if pattern.len() > MAX_PATTERN_LEN {
        bail!(
            "pass pattern has {} bytes, at most {} allowed",
            pattern.len(),
            MAX_PATTERN_LEN
        );
    }
    Ok(Pass::new(&pattern, RandomMode::None))
}

/// Builds a rule from config pass spellings.
pub fn parse_rule<S: AsRef<str>>(items: &[S]) -> Result<Rule> {
    let rule = items
        .iter()
        .map(|s| parse_pass(s.as_ref()))
        .collect::<Result<Rule>>()?;
    if rule.is_empty() {
        bail!("rule needs at least one pass");
    }
    Ok(rule)
}
