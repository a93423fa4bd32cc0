//! Request matching strategies for selecting recorded episodes

use std::sync::Arc;

use crate::cassette::episode::{Episode, RequestRecord};

/// Decides whether a live request is satisfied by a recorded one
///
/// Matchers are pure predicates over two [`RequestRecord`]s and compose
/// with AND via [`MatcherExt::and`].
pub trait Matcher: Send + Sync {
    /// True when `live` is satisfied by `recorded`
    fn matches(&self, live: &RequestRecord, recorded: &RequestRecord) -> bool;
}

/// The matcher used when none is specified: method path only
#[must_use]
pub fn default_matcher() -> Arc<dyn Matcher> {
    Arc::new(MethodMatcher)
}

/// Matches on the full gRPC method path (`/package.Service/Method`)
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodMatcher;

impl Matcher for MethodMatcher {
    fn matches(&self, live: &RequestRecord, recorded: &RequestRecord) -> bool {
        live.method == recorded.method
    }
}

/// Matches on the serialized request body, byte for byte
///
/// The stored base64 text is compared directly; equal text is equal bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestMatcher;

impl Matcher for RequestMatcher {
    fn matches(&self, live: &RequestRecord, recorded: &RequestRecord) -> bool {
        live.body == recorded.body
    }
}

/// Matches on request metadata
///
/// Two modes: compare only an explicit key set, or compare every key except
/// an ignore set. When both are supplied the explicit key set wins.
#[derive(Debug, Clone, Default)]
pub struct MetadataMatcher {
    keys: Option<Vec<String>>,
    ignore_keys: Vec<String>,
}

impl MetadataMatcher {
    /// Compare all metadata keys
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare only the given keys; every other key is ignored
    #[must_use]
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: Some(keys.into_iter().map(|k| k.into().to_ascii_lowercase()).collect()),
            ignore_keys: Vec::new(),
        }
    }

    /// Compare every key except the given ones
    #[must_use]
    pub fn ignoring<I, S>(ignore_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: None,
            ignore_keys: ignore_keys
                .into_iter()
                .map(|k| k.into().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Matcher for MetadataMatcher {
    fn matches(&self, live: &RequestRecord, recorded: &RequestRecord) -> bool {
        if let Some(keys) = &self.keys {
            return keys
                .iter()
                .all(|key| live.metadata.get(key) == recorded.metadata.get(key));
        }

        live.metadata
            .keys()
            .chain(recorded.metadata.keys())
            .filter(|key| !self.ignore_keys.iter().any(|ignored| ignored == key))
            .all(|key| live.metadata.get(key) == recorded.metadata.get(key))
    }
}

/// Delegates to a caller-supplied predicate
pub struct CustomMatcher {
    func: Box<dyn Fn(&RequestRecord, &RequestRecord) -> bool + Send + Sync>,
    name: Option<String>,
}

impl CustomMatcher {
    /// Wrap a predicate
    #[must_use]
    pub fn new(func: impl Fn(&RequestRecord, &RequestRecord) -> bool + Send + Sync + 'static) -> Self {
        Self {
            func: Box::new(func),
            name: None,
        }
    }

    /// Wrap a predicate with a debug name
    #[must_use]
    pub fn named(
        name: impl Into<String>,
        func: impl Fn(&RequestRecord, &RequestRecord) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            func: Box::new(func),
            name: Some(name.into()),
        }
    }
}

impl Matcher for CustomMatcher {
    fn matches(&self, live: &RequestRecord, recorded: &RequestRecord) -> bool {
        (self.func)(live, recorded)
    }
}

impl std::fmt::Debug for CustomMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomMatcher")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Combines matchers with AND, short-circuiting on the first failure
///
/// Usually produced by [`MatcherExt::and`] rather than built directly.
#[derive(Clone, Default)]
pub struct AllMatcher {
    matchers: Vec<Arc<dyn Matcher>>,
}

impl AllMatcher {
    /// Combine an explicit list of matchers
    #[must_use]
    pub fn new(matchers: Vec<Arc<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    /// Append another matcher, flattening this left-hand side
    #[must_use]
    pub fn and(mut self, other: impl Matcher + 'static) -> AllMatcher {
        self.matchers.push(Arc::new(other));
        self
    }
}

impl Matcher for AllMatcher {
    fn matches(&self, live: &RequestRecord, recorded: &RequestRecord) -> bool {
        self.matchers.iter().all(|m| m.matches(live, recorded))
    }
}

/// AND composition for every matcher
pub trait MatcherExt: Matcher + Sized + 'static {
    /// Combine with another matcher; both must accept
    fn and(self, other: impl Matcher + 'static) -> AllMatcher {
        AllMatcher {
            matchers: vec![Arc::new(self), Arc::new(other)],
        }
    }
}

impl<M: Matcher + Sized + 'static> MatcherExt for M {}

/// First episode in insertion order satisfying the matcher
///
/// Episodes are not consumed; one episode can satisfy any number of live
/// requests.
#[must_use]
pub fn find_match<'a>(
    live: &RequestRecord,
    episodes: &'a [Episode],
    matcher: &dyn Matcher,
) -> Option<&'a Episode> {
    episodes
        .iter()
        .find(|episode| matcher.matches(live, &episode.request))
}
