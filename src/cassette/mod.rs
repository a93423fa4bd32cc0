//! Cassette store: load/save, find-or-record arbitration, durability

pub mod codec;
pub mod episode;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::TapeError;
use crate::matchers::{default_matcher, find_match, Matcher};
use crate::record_mode::RecordMode;
use crate::Result;

pub use codec::{CassetteData, CASSETTE_VERSION};
pub use episode::{
    Episode, EpisodeResponse, RequestRecord, ResponseRecord, RpcType, StreamingResponseRecord,
};

/// A persisted collection of recorded gRPC episodes
///
/// One cassette may be shared by many concurrent calls; episode mutations
/// are serialized by a single mutex, and `find` returns a cloned snapshot
/// taken under the same lock.
pub struct Cassette {
    path: PathBuf,
    record_mode: RecordMode,
    matcher: Arc<dyn Matcher>,
    inner: Mutex<Inner>,
}

struct Inner {
    episodes: Vec<Episode>,
    dirty: bool,
    /// `ONCE` cassettes lock into playback when the file held at least one
    /// episode at open time.
    replay_locked: bool,
}

impl Cassette {
    /// Open a cassette with the environment-aware default mode and the
    /// default matcher
    ///
    /// # Errors
    ///
    /// As [`Cassette::open`].
    pub fn open_default(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(path, RecordMode::default_mode(), default_matcher())
    }

    /// Open a cassette file
    ///
    /// A missing file yields an empty cassette except in
    /// [`RecordMode::None`], which requires pre-recorded episodes.
    ///
    /// # Errors
    ///
    /// Returns [`TapeError::CassetteNotFound`] when the file is absent in
    /// `None` mode, and [`TapeError::SerializationFailure`] when an existing
    /// file cannot be parsed.
    pub fn open(
        path: impl Into<PathBuf>,
        record_mode: RecordMode,
        matcher: Arc<dyn Matcher>,
    ) -> Result<Self> {
        let path = path.into();

        let episodes = if path.exists() {
            codec::load(&path)?.episodes
        } else if record_mode == RecordMode::None {
            return Err(TapeError::CassetteNotFound { path });
        } else {
            Vec::new()
        };

        let replay_locked = record_mode == RecordMode::Once && !episodes.is_empty();
        if replay_locked {
            debug!(path = %path.display(), "once-mode cassette opened for playback only");
        }

        Ok(Self {
            path,
            record_mode,
            matcher,
            inner: Mutex::new(Inner {
                episodes,
                dirty: false,
                replay_locked,
            }),
        })
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured record mode
    #[must_use]
    pub fn record_mode(&self) -> RecordMode {
        self.record_mode
    }

    /// Whether the mode permits recording at all
    ///
    /// `Once` counts as recordable here; whether it still accepts episodes
    /// is decided per call by [`Cassette::replay_only`].
    #[must_use]
    pub fn can_record(&self) -> bool {
        matches!(
            self.record_mode,
            RecordMode::All | RecordMode::NewEpisodes | RecordMode::Once
        )
    }

    /// Whether a live request without a recorded match must fail
    ///
    /// True in `None` mode, and in `Once` mode when the cassette was
    /// non-empty at open time.
    #[must_use]
    pub fn replay_only(&self) -> bool {
        !self.can_record() || self.inner.lock().replay_locked
    }

    /// First recorded episode matching the request, if any
    #[must_use]
    pub fn find(&self, request: &RequestRecord) -> Option<Episode> {
        let inner = self.inner.lock();
        let found = find_match(request, &inner.episodes, self.matcher.as_ref());
        match found {
            Some(episode) => {
                debug!(method = %request.method, "episode match");
                Some(episode.clone())
            }
            None => {
                debug!(method = %request.method, "no episode match");
                None
            }
        }
    }

    /// The recorded episode for a request, or a typed miss
    ///
    /// # Errors
    ///
    /// Returns [`TapeError::RecordingDisabled`] on a miss when recording is
    /// unavailable, and [`TapeError::NoMatchingInteraction`] on a miss when
    /// the caller was expected to record instead of consulting.
    pub fn response_for(&self, request: &RequestRecord) -> Result<Episode> {
        if let Some(episode) = self.find(request) {
            return Ok(episode);
        }

        if self.replay_only() {
            return Err(TapeError::RecordingDisabled {
                method: request.method.clone(),
            });
        }

        let available_methods = self
            .inner
            .lock()
            .episodes
            .iter()
            .map(|e| e.method().to_string())
            .collect();
        Err(TapeError::NoMatchingInteraction {
            method: request.method.clone(),
            body: request.body_bytes().unwrap_or_default(),
            available_methods,
        })
    }

    /// Append an episode
    ///
    /// In [`RecordMode::All`], previously stored episodes whose requests
    /// match the new one (under the configured matcher) are removed first,
    /// so refreshed recordings replace stale ones.
    pub fn record(&self, episode: Episode) {
        let mut inner = self.inner.lock();

        if self.record_mode == RecordMode::All {
            let before = inner.episodes.len();
            let matcher = self.matcher.as_ref();
            inner
                .episodes
                .retain(|stored| !matcher.matches(&episode.request, &stored.request));
            let removed = before - inner.episodes.len();
            if removed > 0 {
                debug!(
                    method = %episode.method(),
                    removed,
                    "replaced stale episodes"
                );
            }
        }

        debug!(method = %episode.method(), "recorded episode");
        inner.episodes.push(episode);
        inner.dirty = true;
    }

    /// Persist to the backing file if episodes changed since the last save
    ///
    /// A clean cassette is a no-op, so closing an untouched channel never
    /// rewrites the file.
    ///
    /// # Errors
    ///
    /// Returns [`TapeError::CassetteWriteFailure`] or
    /// [`TapeError::SerializationFailure`] from the codec.
    pub fn save(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.dirty {
            return Ok(());
        }

        let data = CassetteData {
            version: CASSETTE_VERSION,
            episodes: inner.episodes.clone(),
        };
        codec::save(&self.path, &data)?;
        inner.dirty = false;

        info!(
            path = %self.path.display(),
            episodes = data.episodes.len(),
            "cassette saved"
        );
        Ok(())
    }

    /// Snapshot of the recorded episodes in insertion order
    #[must_use]
    pub fn episodes(&self) -> Vec<Episode> {
        self.inner.lock().episodes.clone()
    }

    /// Number of recorded episodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().episodes.len()
    }

    /// True when no episodes are recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().episodes.is_empty()
    }

    /// True when episodes changed since the last save
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }
}

impl std::fmt::Debug for Cassette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cassette")
            .field("path", &self.path)
            .field("record_mode", &self.record_mode)
            .field("episodes", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::{MatcherExt, MethodMatcher, RequestMatcher};
    use crate::metadata::Metadata;
    use crate::status::StatusCode;
    use tempfile::TempDir;

    fn unary_episode(method: &str, body: &[u8], reply: &[u8]) -> Episode {
        Episode {
            request: RequestRecord::from_wire(method, body, Metadata::new()),
            response: EpisodeResponse::Unary(ResponseRecord::ok(reply, Metadata::new())),
            rpc_type: RpcType::Unary,
        }
    }

    #[test]
    fn test_none_mode_requires_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.yaml");

        let err = Cassette::open(&missing, RecordMode::None, default_matcher()).unwrap_err();
        assert!(matches!(err, TapeError::CassetteNotFound { .. }));
    }

    #[test]
    fn test_absent_file_starts_empty_in_recording_modes() {
        let dir = TempDir::new().unwrap();
        for mode in [RecordMode::NewEpisodes, RecordMode::All, RecordMode::Once] {
            let cassette =
                Cassette::open(dir.path().join("new.yaml"), mode, default_matcher()).unwrap();
            assert!(cassette.is_empty());
            assert!(!cassette.replay_only());
        }
    }

    #[test]
    fn test_once_mode_locks_after_nonempty_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("once.yaml");

        {
            let cassette =
                Cassette::open(&path, RecordMode::Once, default_matcher()).unwrap();
            cassette.record(unary_episode("/svc/Get", b"req", b"resp"));
            cassette.save().unwrap();
        }

        let reopened = Cassette::open(&path, RecordMode::Once, default_matcher()).unwrap();
        assert!(reopened.can_record());
        assert!(reopened.replay_only());
    }

    #[test]
    fn test_once_mode_empty_file_still_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "version: 1\ninteractions: []\n").unwrap();

        let cassette = Cassette::open(&path, RecordMode::Once, default_matcher()).unwrap();
        assert!(!cassette.replay_only());
    }

    #[test]
    fn test_find_first_match_wins() {
        let dir = TempDir::new().unwrap();
        let cassette = Cassette::open(
            dir.path().join("c.yaml"),
            RecordMode::NewEpisodes,
            default_matcher(),
        )
        .unwrap();
        cassette.record(unary_episode("/svc/Get", b"a", b"first"));
        cassette.record(unary_episode("/svc/Get", b"b", b"second"));

        let live = RequestRecord::from_wire("/svc/Get", b"anything", Metadata::new());
        let found = cassette.find(&live).unwrap();
        match found.response {
            EpisodeResponse::Unary(r) => assert_eq!(r.body_bytes().unwrap(), b"first"),
            EpisodeResponse::Streaming(_) => panic!("expected unary response"),
        }
    }

    #[test]
    fn test_all_mode_compacts_matching_episodes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("all.yaml");

        // Seed two episodes under new_episodes.
        {
            let cassette =
                Cassette::open(&path, RecordMode::NewEpisodes, default_matcher()).unwrap();
            cassette.record(unary_episode("/svc/Get", b"\x01", b"old-one"));
            cassette.record(unary_episode("/svc/Get", b"\x02", b"two"));
            cassette.save().unwrap();
        }

        // Re-record {1} under ALL with a body-sensitive matcher.
        let matcher: Arc<dyn Matcher> = Arc::new(MethodMatcher.and(RequestMatcher));
        let cassette = Cassette::open(&path, RecordMode::All, matcher).unwrap();
        cassette.record(unary_episode("/svc/Get", b"\x01", b"fresh-one"));

        let episodes = cassette.episodes();
        assert_eq!(episodes.len(), 2);
        // The untouched {2} episode keeps its slot; the fresh {1} is appended.
        assert_eq!(episodes[0].request.body_bytes().unwrap(), b"\x02");
        assert_eq!(episodes[1].request.body_bytes().unwrap(), b"\x01");
        match &episodes[1].response {
            EpisodeResponse::Unary(r) => assert_eq!(r.body_bytes().unwrap(), b"fresh-one"),
            EpisodeResponse::Streaming(_) => panic!("expected unary response"),
        }
    }

    #[test]
    fn test_save_only_when_dirty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idempotent.yaml");

        let cassette =
            Cassette::open(&path, RecordMode::NewEpisodes, default_matcher()).unwrap();
        cassette.record(unary_episode("/svc/Get", b"req", b"resp"));
        cassette.save().unwrap();
        assert!(!cassette.is_dirty());

        let first_write = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, "sentinel").unwrap();

        // Clean cassette: save must not touch the file.
        cassette.save().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "sentinel");

        // Dirty again: save rewrites.
        cassette.record(unary_episode("/svc/Other", b"x", b"y"));
        cassette.save().unwrap();
        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert_ne!(rewritten, "sentinel");
        assert!(rewritten.len() > first_write.len());
    }

    #[test]
    fn test_response_for_miss_errors() {
        let dir = TempDir::new().unwrap();

        // Replay-only miss.
        let path = dir.path().join("gated.yaml");
        std::fs::write(&path, "version: 1\ninteractions: []\n").unwrap();
        let cassette = Cassette::open(&path, RecordMode::None, default_matcher()).unwrap();
        let live = RequestRecord::from_wire("/svc/Get", b"req", Metadata::new());
        assert!(matches!(
            cassette.response_for(&live),
            Err(TapeError::RecordingDisabled { .. })
        ));

        // Recordable miss reports what is available.
        let cassette = Cassette::open(
            dir.path().join("open.yaml"),
            RecordMode::NewEpisodes,
            default_matcher(),
        )
        .unwrap();
        cassette.record(unary_episode("/svc/Other", b"", b""));
        match cassette.response_for(&live) {
            Err(TapeError::NoMatchingInteraction {
                method,
                available_methods,
                ..
            }) => {
                assert_eq!(method, "/svc/Get");
                assert_eq!(available_methods, ["/svc/Other"]);
            }
            other => panic!("expected NoMatchingInteraction, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_preserves_episode_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("order.yaml");

        {
            let cassette =
                Cassette::open(&path, RecordMode::NewEpisodes, default_matcher()).unwrap();
            for i in 0..5u8 {
                cassette.record(unary_episode("/svc/Get", &[i], &[i, i]));
            }
            cassette.save().unwrap();
        }

        let reopened = Cassette::open(&path, RecordMode::None, default_matcher()).unwrap();
        let bodies: Vec<Vec<u8>> = reopened
            .episodes()
            .iter()
            .map(|e| e.request.body_bytes().unwrap())
            .collect();
        assert_eq!(bodies, vec![vec![0], vec![1], vec![2], vec![3], vec![4]]);
    }

    #[test]
    fn test_error_codes_survive_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("errors.yaml");

        {
            let cassette =
                Cassette::open(&path, RecordMode::NewEpisodes, default_matcher()).unwrap();
            let status = crate::status::RpcStatus::new(
                StatusCode::NotFound,
                Some("User 999 not found".to_string()),
            );
            cassette.record(Episode {
                request: RequestRecord::from_wire("/svc/Get", b"\x08\xe7\x07", Metadata::new()),
                response: EpisodeResponse::Unary(ResponseRecord::failed(&status)),
                rpc_type: RpcType::Unary,
            });
            cassette.save().unwrap();
        }

        let reopened = Cassette::open(&path, RecordMode::None, default_matcher()).unwrap();
        match &reopened.episodes()[0].response {
            EpisodeResponse::Unary(r) => {
                assert_eq!(r.code, StatusCode::NotFound);
                assert_eq!(r.details.as_deref(), Some("User 999 not found"));
            }
            EpisodeResponse::Streaming(_) => panic!("expected unary response"),
        }
    }
}
