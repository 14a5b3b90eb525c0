pub mod batch;

use crate::error::{WipeError, WipeResult};
use crate::patterns::random::{RandomByteSource, SystemRandom};
use crate::patterns::{fill_cyclic, Rule};
use indicatif::ProgressBar;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use tracing::{debug, info, trace};

/// Chunk size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Writes at an absolute offset without moving any shared cursor.
pub trait PositionedWrite {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;

    /// Pushes written data down to the device.
    fn sync_data(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl PositionedWrite for File {
    #[cfg(unix)]
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::write_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_write(self, buf, offset)
    }

    fn sync_data(&mut self) -> io::Result<()> {
        File::sync_data(self)
    }
}

/// What a finished wipe did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WipeSummary {
    pub file_size: u64,
    pub passes: usize,
    pub chunks_per_pass: u64,
    pub bytes_written: u64,
}

/// Applies every pass of a rule to a whole file, one bounded chunk at a time.
pub struct OverwriteEngine<R = SystemRandom> {
    chunk_size: usize,
    sync: bool,
    random: R,
    progress: Option<ProgressBar>,
}

impl OverwriteEngine<SystemRandom> {
    pub fn new() -> Self {
        Self::with_random(SystemRandom::new())
    }
}

impl Default for OverwriteEngine<SystemRandom> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RandomByteSource> OverwriteEngine<R> {
    pub fn with_random(random: R) -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            sync: true,
            random,
            progress: None,
        }
    }

    /// Sets the chunk size; zero is raised to one byte.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Whether each completed pass is flushed to the device.
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Advances `progress` by every byte written.
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn random_source(&self) -> &R {
        &self.random
    }

    /// Overwrites the file at `path` with every pass of `rule`.
    ///
    /// The file is left in place. On error it may be partly overwritten.
    pub fn wipe(&mut self, path: &Path, rule: &Rule) -> WipeResult<WipeSummary> {
        rule.validate()?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| WipeError::OpenFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let file_size = file
            .metadata()
            .map_err(|source| WipeError::StatFailed {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if file_size == 0 {
            return Err(WipeError::EmptyFile {
                path: Some(path.to_path_buf()),
            });
        }

        info!(path = %path.display(), size = file_size, passes = rule.len(), "wiping file");
        let summary = self.overwrite(&mut file, file_size, rule)?;
        info!(path = %path.display(), bytes = summary.bytes_written, "wipe complete");
        Ok(summary)
    }

    /// Runs `rule` against `target`, treating it as `file_size` bytes long.
    ///
    /// A zero `file_size` is rejected with `EmptyFile` before anything is
    /// written or synced.
    pub fn overwrite<W: PositionedWrite + ?Sized>(
        &mut self,
        target: &mut W,
        file_size: u64,
        rule: &Rule,
    ) -> WipeResult<WipeSummary> {
        rule.validate()?;
        if file_size == 0 {
            return Err(WipeError::EmptyFile { path: None });
        }

        let chunk_size = self.chunk_size as u64;
        let chunks_per_pass = file_size.div_ceil(chunk_size);
        let mut buffer = vec![0u8; chunk_size.min(file_size) as usize];
        let mut bytes_written = 0u64;

        for (pass_idx, pass) in rule.passes().iter().enumerate() {
            let content = pass
                .resolve(&mut self.random)
                .map_err(|source| WipeError::EntropyUnavailable {
                    pass: pass_idx,
                    source,
                })?;
            debug!(pass = pass_idx + 1, of = rule.len(), pattern = %pass, "starting pass");
            if let Some(pb) = &self.progress {
                pb.set_message(format!("Pass {}/{} ({})", pass_idx + 1, rule.len(), pass));
            }

            // Every pass starts again from the first byte.
            for chunk in 0..chunks_per_pass {
                let offset = chunk * chunk_size;
                let part_size = chunk_size.min(file_size - offset) as usize;
                let part = &mut buffer[..part_size];
                let phase = (offset % content.len() as u64) as usize;
                fill_cyclic(part, &content, phase);

                write_chunk(target, part, offset, pass_idx)?;
                trace!(pass = pass_idx + 1, offset, len = part_size, "chunk written");

                bytes_written += part_size as u64;
                if let Some(pb) = &self.progress {
                    pb.inc(part_size as u64);
                }
            }

            if self.sync {
                target
                    .sync_data()
                    .map_err(|source| WipeError::SyncFailed {
                        pass: pass_idx,
                        source,
                    })?;
            }
        }

        Ok(WipeSummary {
            file_size,
            passes: rule.len(),
            chunks_per_pass,
            bytes_written,
        })
    }
}

fn write_chunk<W: PositionedWrite + ?Sized>(
    target: &mut W,
    chunk: &[u8],
    offset: u64,
    pass: usize,
) -> WipeResult<()> {
    let mut written = 0usize;
    while written < chunk.len() {
        match target.write_at(&chunk[written..], offset + written as u64) {
            Ok(0) => {
                return Err(WipeError::ShortWrite {
                    pass,
                    offset,
                    requested: chunk.len(),
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(source) => {
                return Err(WipeError::WriteFailed {
                    pass,
                    offset,
                    source,
                })
            }
        }
    }
    Ok(())
}

/// Overwrites `path` with `rule` using the default engine.
pub fn wipe(path: &Path, rule: &Rule) -> WipeResult<()> {
    OverwriteEngine::new().wipe(path, rule).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::random::FixedSequence;
    use crate::patterns::rules;
    use crate::patterns::{Pass, RandomMode};
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// In-memory target that records every write call.
    #[derive(Default)]
    struct RecordingTarget {
        data: Vec<u8>,
        writes: Vec<(u64, usize)>,
        syncs: usize,
        max_per_call: Option<usize>,
        fail_at: Option<u64>,
        zero_at: Option<u64>,
        fail_sync: bool,
    }

    impl RecordingTarget {
        fn new(size: usize) -> Self {
            Self {
                data: vec![0x77; size],
                ..Default::default()
            }
        }
    }

    impl PositionedWrite for RecordingTarget {
        fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
            if self.fail_at == Some(offset) {
                return Err(io::Error::new(io::ErrorKind::Other, "bad sector"));
            }
            if self.zero_at == Some(offset) {
                return Ok(0);
            }
            let n = self.max_per_call.map_or(buf.len(), |max| max.min(buf.len()));
            let start = offset as usize;
            self.data[start..start + n].copy_from_slice(&buf[..n]);
            self.writes.push((offset, n));
            Ok(n)
        }

        fn sync_data(&mut self) -> io::Result<()> {
            if self.fail_sync {
                return Err(io::Error::new(io::ErrorKind::Other, "cache flush rejected"));
            }
            self.syncs += 1;
            Ok(())
        }
    }

    /// Random source whose entropy pool never answers.
    struct DrainedPool;

    impl RandomByteSource for DrainedPool {
        fn next_byte(&mut self, _mode: RandomMode) -> Result<u8, rand::Error> {
            Err(rand::Error::new("entropy pool drained"))
        }
    }

    fn two_pass() -> Rule {
        Rule::new(vec![Pass::fixed(&[0x00]), Pass::fixed(&[0xFF])])
    }

    #[test]
    fn test_chunks_cover_file_exactly() -> WipeResult<()> {
        let mut target = RecordingTarget::new(10);
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1])).chunk_size(4);

        let summary = engine.overwrite(&mut target, 10, &rules::FAST)?;
        assert_eq!(target.writes, vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(summary.chunks_per_pass, 3);
        assert_eq!(summary.bytes_written, 10);
        Ok(())
    }

    #[test]
    fn test_even_division_has_full_last_chunk() -> WipeResult<()> {
        let mut target = RecordingTarget::new(8);
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1])).chunk_size(4);

        engine.overwrite(&mut target, 8, &rules::FAST)?;
        assert_eq!(target.writes, vec![(0, 4), (4, 4)]);
        Ok(())
    }

    #[test]
    fn test_each_pass_restarts_at_zero() -> WipeResult<()> {
        let mut target = RecordingTarget::new(10);
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1])).chunk_size(4);

        let summary = engine.overwrite(&mut target, 10, &two_pass())?;
        assert_eq!(
            target.writes,
            vec![(0, 4), (4, 4), (8, 2), (0, 4), (4, 4), (8, 2)]
        );
        assert_eq!(target.data, vec![0xFF; 10]);
        assert_eq!(summary.bytes_written, 20);
        assert_eq!(target.syncs, 2);
        Ok(())
    }

    #[test]
    fn test_pattern_is_continuous_across_chunks() -> WipeResult<()> {
        let mut target = RecordingTarget::new(11);
        let rule = Rule::new(vec![Pass::fixed(&[0x92, 0x49, 0x24])]);
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1])).chunk_size(4);

        engine.overwrite(&mut target, 11, &rule)?;
        let expected: Vec<u8> = [0x92, 0x49, 0x24].iter().copied().cycle().take(11).collect();
        assert_eq!(target.data, expected);
        Ok(())
    }

    #[test]
    fn test_random_pass_draws_once_per_pass() -> WipeResult<()> {
        let mut target = RecordingTarget::new(9);
        let rule = Rule::new(vec![
            Pass::random(RandomMode::FastPseudo),
            Pass::fixed(&[0x00]),
            Pass::random(RandomMode::CryptoSecure),
        ]);
        let mut engine =
            OverwriteEngine::with_random(FixedSequence::new(vec![0x3C, 0xC3])).chunk_size(2);

        engine.overwrite(&mut target, 9, &rule)?;
        assert_eq!(engine.random_source().drawn(), 2);
        assert_eq!(target.data, vec![0xC3; 9]);
        Ok(())
    }

    #[test]
    fn test_partial_writes_are_continued() -> WipeResult<()> {
        let mut target = RecordingTarget::new(10);
        target.max_per_call = Some(3);
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1])).chunk_size(4);

        engine.overwrite(&mut target, 10, &rules::VSITR)?;
        assert_eq!(target.data, vec![0xAA; 10]);
        Ok(())
    }

    #[test]
    fn test_zero_byte_write_is_short_write() {
        let mut target = RecordingTarget::new(10);
        target.zero_at = Some(4);
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1])).chunk_size(4);

        let err = engine.overwrite(&mut target, 10, &two_pass()).unwrap_err();
        assert!(matches!(
            err,
            WipeError::ShortWrite {
                pass: 0,
                offset: 4,
                requested: 4
            }
        ));
    }

    #[test]
    fn test_write_error_aborts_with_context() {
        let mut target = RecordingTarget::new(10);
        target.fail_at = Some(8);
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1])).chunk_size(4);

        let err = engine.overwrite(&mut target, 10, &two_pass()).unwrap_err();
        assert_eq!(err.pass(), Some(0));
        assert_eq!(err.offset(), Some(8));
        // Nothing after the failing chunk ran.
        assert_eq!(target.writes, vec![(0, 4), (4, 4)]);
    }

    #[test]
    fn test_entropy_failure_names_pass() {
        let mut target = RecordingTarget::new(10);
        let rule = Rule::new(vec![
            Pass::fixed(&[0x00]),
            Pass::random(RandomMode::CryptoSecure),
        ]);
        let mut engine = OverwriteEngine::with_random(DrainedPool).chunk_size(4);

        let err = engine.overwrite(&mut target, 10, &rule).unwrap_err();
        assert!(matches!(err, WipeError::EntropyUnavailable { pass: 1, .. }));
        assert_eq!(err.pass(), Some(1));
        assert!(err.to_string().starts_with("pass #2:"));
        // Only the first pass reached the target.
        assert_eq!(target.writes, vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(target.data, vec![0x00; 10]);
    }

    #[test]
    fn test_sync_failure_stops_after_pass() {
        let mut target = RecordingTarget::new(10);
        target.fail_sync = true;
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1])).chunk_size(4);

        let err = engine.overwrite(&mut target, 10, &two_pass()).unwrap_err();
        assert!(matches!(err, WipeError::SyncFailed { pass: 0, .. }));
        assert_eq!(err.pass(), Some(0));
        assert_eq!(err.offset(), None);
        // The second pass never started.
        assert_eq!(target.writes, vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(target.data, vec![0x00; 10]);
    }

    #[test]
    fn test_no_sync_skips_flush() -> WipeResult<()> {
        let mut target = RecordingTarget::new(10);
        target.fail_sync = true;
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1]))
            .chunk_size(4)
            .sync(false);

        engine.overwrite(&mut target, 10, &two_pass())?;
        assert_eq!(target.data, vec![0xFF; 10]);
        Ok(())
    }

    #[test]
    fn test_zero_size_target_is_rejected() {
        let mut target = RecordingTarget::new(0);
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1])).chunk_size(4);

        let err = engine.overwrite(&mut target, 0, &rules::DOD_5220_22_M).unwrap_err();
        assert!(matches!(err, WipeError::EmptyFile { path: None }));
        assert!(target.writes.is_empty());
        assert_eq!(target.syncs, 0);
        assert_eq!(engine.random_source().drawn(), 0);
    }

    #[test]
    fn test_empty_rule_writes_nothing() {
        let mut target = RecordingTarget::new(10);
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1]));

        let err = engine.overwrite(&mut target, 10, &Rule::default()).unwrap_err();
        assert!(matches!(err, WipeError::EmptyRule));
        assert!(target.writes.is_empty());
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() -> WipeResult<()> {
        let mut target = RecordingTarget::new(3);
        let mut engine = OverwriteEngine::with_random(FixedSequence::new(vec![1])).chunk_size(0);

        engine.overwrite(&mut target, 3, &rules::FAST)?;
        assert_eq!(target.writes, vec![(0, 1), (1, 1), (2, 1)]);
        Ok(())
    }

    #[test]
    fn test_wipe_real_file() -> anyhow::Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        temp_file.write_all(&[0x5Au8; 3000])?;
        temp_file.flush()?;

        let mut engine = OverwriteEngine::new().chunk_size(1024);
        let summary = engine.wipe(temp_file.path(), &rules::VSITR)?;
        assert_eq!(summary.chunks_per_pass, 3);

        let content = std::fs::read(temp_file.path())?;
        assert_eq!(content.len(), 3000);
        assert!(content.iter().all(|&b| b == 0xAA));
        Ok(())
    }

    #[test]
    fn test_wipe_empty_file() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let err = wipe(temp_file.path(), &rules::FAST).unwrap_err();
        match &err {
            WipeError::EmptyFile { path } => assert_eq!(path.as_deref(), Some(temp_file.path())),
            other => panic!("expected EmptyFile, got {other:?}"),
        }
        assert_eq!(std::fs::metadata(temp_file.path())?.len(), 0);
        Ok(())
    }

    #[test]
    fn test_wipe_missing_file() {
        let err = wipe(Path::new("/nonexistent/wiper/target"), &rules::FAST).unwrap_err();
        assert!(matches!(err, WipeError::OpenFailed { .. }));
    }
}
