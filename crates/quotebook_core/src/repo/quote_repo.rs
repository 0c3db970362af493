//! Quote repository over a key-value store.
//!
//! # Responsibility
//! - Own the ordered in-memory quote collection for the running session.
//! - Write every mutation through to durable storage before it becomes
//!   visible in memory.
//! - Persist the selected category and the session's last viewed quote.
//!
//! # Invariants
//! - After any mutating call returns `Ok`, in-memory content equals the
//!   value last written under `"quotes"`.
//! - A failed write leaves in-memory content unchanged.
//! - Insertion order is preserved; duplicates by text are allowed.

use crate::model::quote::{CategoryFilter, Quote, ValidationError};
use crate::store::{
    KeyValueStore, StoreError, LAST_VIEWED_QUOTE_KEY, QUOTES_KEY, SELECTED_CATEGORY_KEY,
};
use crate::sync::reconcile::MergeResult;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for quote persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Store(StoreError),
    Serialization(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "failed to encode quotes: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Serialization(err) => Some(err),
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Built-in quotes used when durable storage holds nothing usable.
pub fn seed_quotes() -> Vec<Quote> {
    vec![
        Quote::unchecked("Believe in yourself!", "Motivation"),
        Quote::unchecked(
            "The only way to do great work is to love what you do.",
            "Work",
        ),
        Quote::unchecked("Happiness depends upon ourselves.", "Philosophy"),
    ]
}

/// Ordered quote collection with write-through persistence.
pub struct QuoteRepository<S: KeyValueStore> {
    store: S,
    quotes: Vec<Quote>,
}

impl<S: KeyValueStore> QuoteRepository<S> {
    /// Loads quotes from durable storage, falling back to the seed set.
    ///
    /// The seed set is not written back until the first mutation.
    pub fn load(store: S) -> RepoResult<Self> {
        let quotes = match store.get_durable(QUOTES_KEY)? {
            Some(raw) => match serde_json::from_str::<Vec<Quote>>(&raw) {
                Ok(quotes) => quotes,
                Err(err) => {
                    warn!(
                        "event=repo_load module=repo status=fallback reason=parse_error error={}",
                        err
                    );
                    seed_quotes()
                }
            },
            None => seed_quotes(),
        };

        info!(
            "event=repo_load module=repo status=ok count={}",
            quotes.len()
        );
        Ok(Self { store, quotes })
    }

    /// Returns all quotes in insertion order.
    pub fn all(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Returns quotes matching `filter`, in insertion order.
    pub fn by_category(&self, filter: &CategoryFilter) -> Vec<&Quote> {
        self.quotes
            .iter()
            .filter(|quote| filter.matches(quote))
            .collect()
    }

    /// Picks one quote uniformly at random from the filtered set.
    pub fn pick_random(&self, filter: &CategoryFilter) -> Option<Quote> {
        self.pick_random_with(filter, &mut rand::thread_rng())
    }

    /// Same as `pick_random` with a caller-provided random source.
    pub fn pick_random_with<R: Rng + ?Sized>(
        &self,
        filter: &CategoryFilter,
        rng: &mut R,
    ) -> Option<Quote> {
        self.by_category(filter)
            .choose(rng)
            .map(|quote| (*quote).clone())
    }

    /// Returns distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.quotes
            .iter()
            .filter(|quote| seen.insert(quote.category.as_str()))
            .map(|quote| quote.category.clone())
            .collect()
    }

    /// Validates and appends one quote, then writes through.
    ///
    /// # Errors
    /// - `RepoError::Validation` when either field is blank; nothing changes.
    /// - `RepoError::Store`/`Serialization` when the write-through fails.
    pub fn add(&mut self, text: &str, category: &str) -> RepoResult<Quote> {
        let quote = Quote::new(text, category)?;
        let mut next = self.quotes.clone();
        next.push(quote.clone());
        self.commit(next)?;
        info!(
            "event=quote_add module=repo status=ok count={}",
            self.quotes.len()
        );
        Ok(quote)
    }

    /// Appends records as-is (no validation, no dedup) in one write.
    pub fn extend(&mut self, records: Vec<Quote>) -> RepoResult<usize> {
        let added = records.len();
        if added == 0 {
            return Ok(0);
        }
        let mut next = self.quotes.clone();
        next.extend(records);
        self.commit(next)?;
        Ok(added)
    }

    /// Replaces content with a merge result when it changed anything.
    ///
    /// Returns whether a write-through happened.
    pub fn apply_merge(&mut self, result: MergeResult) -> RepoResult<bool> {
        if !result.changed {
            return Ok(false);
        }
        self.commit(result.merged)?;
        Ok(true)
    }

    /// Returns the persisted category filter, defaulting to `all`.
    pub fn selected_category(&self) -> RepoResult<CategoryFilter> {
        let stored = self.store.get_durable(SELECTED_CATEGORY_KEY)?;
        Ok(stored
            .map(|value| CategoryFilter::parse(&value))
            .unwrap_or_default())
    }

    /// Persists the category filter across sessions.
    pub fn set_selected_category(&mut self, filter: &CategoryFilter) -> RepoResult<()> {
        self.store
            .set_durable(SELECTED_CATEGORY_KEY, filter.as_str())?;
        Ok(())
    }

    /// Records `quote` as the last viewed quote of this session.
    pub fn remember_viewed(&mut self, quote: &Quote) -> RepoResult<()> {
        let encoded = serde_json::to_string(quote)?;
        self.store.set_session(LAST_VIEWED_QUOTE_KEY, &encoded)?;
        Ok(())
    }

    /// Returns the last viewed quote of this session, if any.
    ///
    /// An unreadable session value is treated as absent.
    pub fn last_viewed(&self) -> RepoResult<Option<Quote>> {
        let Some(raw) = self.store.get_session(LAST_VIEWED_QUOTE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Quote>(&raw) {
            Ok(quote) => Ok(Some(quote)),
            Err(err) => {
                warn!(
                    "event=last_viewed_read module=repo status=ignored reason=parse_error error={}",
                    err
                );
                Ok(None)
            }
        }
    }

    /// Ends the current session, forgetting the last viewed quote.
    pub fn end_session(&mut self) -> RepoResult<()> {
        self.store.clear_session()?;
        Ok(())
    }

    /// Borrows the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn commit(&mut self, next: Vec<Quote>) -> RepoResult<()> {
        let encoded = serde_json::to_string(&next)?;
        self.store.set_durable(QUOTES_KEY, &encoded)?;
        self.quotes = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{seed_quotes, QuoteRepository, RepoError};
    use crate::model::quote::{CategoryFilter, Quote};
    use crate::store::{
        KeyValueStore, MemoryKeyValueStore, StoreError, StoreResult, QUOTES_KEY,
    };
    use crate::sync::reconcile::reconcile;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Store that serves reads but rejects every durable write.
    struct ReadOnlyDurable {
        inner: MemoryKeyValueStore,
    }

    impl KeyValueStore for ReadOnlyDurable {
        fn get_durable(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get_durable(key)
        }

        fn set_durable(&mut self, key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::InvalidKey(key.to_string()))
        }

        fn get_session(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get_session(key)
        }

        fn set_session(&mut self, key: &str, value: &str) -> StoreResult<()> {
            self.inner.set_session(key, value)
        }

        fn clear_session(&mut self) -> StoreResult<()> {
            self.inner.clear_session()
        }
    }

    fn read_only_repo(raw: &str) -> QuoteRepository<ReadOnlyDurable> {
        let store = ReadOnlyDurable {
            inner: MemoryKeyValueStore::new().with_durable(QUOTES_KEY, raw),
        };
        QuoteRepository::load(store).unwrap()
    }

    fn empty_repo() -> QuoteRepository<MemoryKeyValueStore> {
        let store = MemoryKeyValueStore::new().with_durable(QUOTES_KEY, "[]");
        QuoteRepository::load(store).unwrap()
    }

    #[test]
    fn load_falls_back_to_seed_when_storage_is_empty() {
        let repo = QuoteRepository::load(MemoryKeyValueStore::new()).unwrap();
        assert_eq!(repo.all(), seed_quotes().as_slice());
        assert!(repo.store().get_durable(QUOTES_KEY).unwrap().is_none());
    }

    #[test]
    fn load_falls_back_to_seed_when_storage_is_corrupt() {
        let store = MemoryKeyValueStore::new().with_durable(QUOTES_KEY, "{not json");
        let repo = QuoteRepository::load(store).unwrap();
        assert_eq!(repo.len(), 3);
    }

    #[test]
    fn add_writes_through_to_durable_storage() {
        let mut repo = empty_repo();
        let added = repo.add("Hello", "Wisdom").unwrap();
        assert_eq!(added, Quote::unchecked("Hello", "Wisdom"));
        assert_eq!(repo.len(), 1);

        let raw = repo.store().get_durable(QUOTES_KEY).unwrap().unwrap();
        let persisted: Vec<Quote> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, repo.all());
    }

    #[test]
    fn add_rejects_blank_input_without_state_change() {
        let mut repo = empty_repo();
        for (text, category) in [("", "x"), ("x", ""), ("", "")] {
            let err = repo.add(text, category).unwrap_err();
            assert!(matches!(err, RepoError::Validation(_)));
        }
        assert!(repo.is_empty());
        assert_eq!(
            repo.store().get_durable(QUOTES_KEY).unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn by_category_matches_case_insensitively() {
        let mut repo = empty_repo();
        repo.add("a", "Work").unwrap();
        repo.add("b", "work").unwrap();
        repo.add("c", "Life").unwrap();

        let work = repo.by_category(&CategoryFilter::parse("WORK"));
        assert_eq!(work.len(), 2);
        assert_eq!(repo.by_category(&CategoryFilter::All).len(), 3);
    }

    #[test]
    fn pick_random_returns_none_for_empty_selection() {
        let repo = empty_repo();
        assert!(repo.pick_random(&CategoryFilter::All).is_none());

        let seeded = QuoteRepository::load(MemoryKeyValueStore::new()).unwrap();
        assert!(seeded
            .pick_random(&CategoryFilter::parse("missing"))
            .is_none());
    }

    #[test]
    fn pick_random_always_returns_a_member() {
        let repo = QuoteRepository::load(MemoryKeyValueStore::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let picked = repo
                .pick_random_with(&CategoryFilter::All, &mut rng)
                .unwrap();
            assert!(repo.all().contains(&picked));
        }
    }

    #[test]
    fn categories_are_unique_in_first_seen_order() {
        let mut repo = empty_repo();
        repo.add("1", "B").unwrap();
        repo.add("2", "A").unwrap();
        repo.add("3", "B").unwrap();
        assert_eq!(repo.categories(), vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn selected_category_defaults_to_all_and_persists() {
        let mut repo = empty_repo();
        assert_eq!(repo.selected_category().unwrap(), CategoryFilter::All);

        repo.set_selected_category(&CategoryFilter::parse("Work"))
            .unwrap();
        assert_eq!(
            repo.selected_category().unwrap(),
            CategoryFilter::Named("Work".to_string())
        );
    }

    #[test]
    fn last_viewed_is_session_scoped() {
        let mut repo = empty_repo();
        assert!(repo.last_viewed().unwrap().is_none());

        let quote = Quote::unchecked("Hi", "A");
        repo.remember_viewed(&quote).unwrap();
        assert_eq!(repo.last_viewed().unwrap(), Some(quote));

        repo.end_session().unwrap();
        assert!(repo.last_viewed().unwrap().is_none());
    }

    #[test]
    fn extend_appends_without_dedup() {
        let mut repo = empty_repo();
        repo.add("Hi", "A").unwrap();
        let added = repo
            .extend(vec![Quote::unchecked("Hi", "A"), Quote::unchecked("", "")])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(repo.len(), 3);
    }

    #[test]
    fn by_category_folds_non_ascii_case() {
        let mut repo = empty_repo();
        repo.add("x", "Été").unwrap();
        assert_eq!(repo.by_category(&CategoryFilter::parse("ÉTÉ")).len(), 1);
        assert!(repo.pick_random(&CategoryFilter::parse("ÉTÉ")).is_some());
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let mut repo = read_only_repo(r#"[{"text":"Hi","category":"A"}]"#);

        let err = repo.add("Bye", "B").unwrap_err();
        assert!(matches!(err, RepoError::Store(_)));
        let err = repo.extend(vec![Quote::unchecked("x", "y")]).unwrap_err();
        assert!(matches!(err, RepoError::Store(_)));

        let merge = reconcile(repo.all(), &[Quote::unchecked("Remote", "Server")]);
        let err = repo.apply_merge(merge).unwrap_err();
        assert!(matches!(err, RepoError::Store(_)));

        assert_eq!(repo.all(), &[Quote::unchecked("Hi", "A")]);
        assert_eq!(
            repo.store().get_durable(QUOTES_KEY).unwrap().as_deref(),
            Some(r#"[{"text":"Hi","category":"A"}]"#)
        );
    }

    #[test]
    fn apply_merge_writes_through_to_durable_storage() {
        let mut repo = empty_repo();
        repo.add("Hi", "A").unwrap();

        let merge = reconcile(repo.all(), &[Quote::unchecked("Bye", "Server")]);
        assert!(repo.apply_merge(merge).unwrap());

        let raw = repo.store().get_durable(QUOTES_KEY).unwrap().unwrap();
        let persisted: Vec<Quote> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, repo.all());
        assert_eq!(persisted.len(), 2);
    }
}
