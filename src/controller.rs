//! Browse state, its reducer, and the controller that feeds it.
//!
//! Every user action and every store response becomes a [`BrowseEvent`].
//! [`BrowseState::apply`] folds one event into a new state and recomputes the
//! derived list and window in the same step, so a view never mixes a new
//! filtered list with an old page window.

use async_stream::stream;
use futures::Stream;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::BrowseSettings;
use crate::engine;
use crate::error::Error;
use crate::pagination::{Paginator, Window};
use crate::saved::{SaveToggled, SavedSet};
use crate::store::PolicyStore;
use crate::types::{
    CategoryFilter, IncomeRange, PolicyId, PolicyRecord, Profession, ProfileCriteria,
    SearchCriteria, SortMode,
};

/// Which action issued a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Full record set, on activation or retry
    Initial,
    /// Coarse profile-based query from "find matches"
    Profile,
}

/// Identifies one store request; higher `seq` means issued later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub seq: u64,
    pub kind: FetchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The store could not be reached or rejected the request; offer a retry
    FetchFailure,
    /// A profile search failed while earlier results are still shown
    RefinementFailure,
    /// Valid filters, zero matches; offer to clear filters
    EmptyResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum BrowseEvent {
    FetchStarted(RequestTicket),
    FetchSucceeded {
        ticket: RequestTicket,
        records: Vec<PolicyRecord>,
    },
    FetchFailed {
        ticket: RequestTicket,
        message: String,
    },
    /// The request future was dropped before its response arrived
    FetchAbandoned(RequestTicket),
    SetSearchQuery(String),
    SetCategory(CategoryFilter),
    SetSortMode(SortMode),
    ToggleInterest(String),
    SetAge(Option<u32>),
    SetProfession(Option<Profession>),
    SetIncomeRange(Option<IncomeRange>),
    SetLocation(Option<String>),
    LoadMoreStarted,
    /// Commit the pending page if the list has not changed since `generation`
    LoadMoreSettled {
        generation: u64,
    },
    LoadMoreCancelled,
    OpenDetail(PolicyId),
    CloseDetail,
    ClearFilters,
    Deactivate,
}

/// Everything the browser view is derived from
#[derive(Debug, Clone)]
pub struct BrowseState {
    records: Vec<PolicyRecord>,
    loaded: bool,
    category: CategoryFilter,
    query: String,
    sort_mode: SortMode,
    profile: ProfileCriteria,
    paginator: Paginator,
    ordered: Vec<PolicyRecord>,
    window: Window<PolicyRecord>,
    /// Bumped whenever `ordered` is rebuilt
    generation: u64,
    loading_more: bool,
    fetch_error: Option<ViewError>,
    detail: Option<PolicyId>,
    issued_seq: u64,
    applied_seq: u64,
    outstanding: Vec<RequestTicket>,
    active: bool,
}

impl BrowseState {
    pub fn new(page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            loaded: false,
            category: CategoryFilter::All,
            query: String::new(),
            sort_mode: SortMode::default(),
            profile: ProfileCriteria::default(),
            paginator: Paginator::new(page_size),
            ordered: Vec::new(),
            window: Window {
                visible: Vec::new(),
                has_more: false,
            },
            generation: 0,
            loading_more: false,
            fetch_error: None,
            detail: None,
            issued_seq: 0,
            applied_seq: 0,
            outstanding: Vec::new(),
            active: true,
        }
    }

    /// Fold one event into the state
    pub fn apply(mut self, event: BrowseEvent) -> Self {
        match event {
            BrowseEvent::FetchStarted(ticket) => {
                if self.can_start(ticket.kind) && ticket.seq > self.issued_seq {
                    self.issued_seq = ticket.seq;
                    self.outstanding.push(ticket);
                }
            }
            BrowseEvent::FetchSucceeded { ticket, records } => {
                if self.settle_ticket(ticket) {
                    self.supersede(ticket.seq);
                    self.records = records;
                    self.loaded = true;
                    self.fetch_error = None;
                    if let Some(id) = self.detail {
                        if !self.records.iter().any(|r| r.id == id) {
                            self.detail = None;
                        }
                    }
                    self.recompute();
                }
            }
            BrowseEvent::FetchFailed { ticket, message } => {
                if self.settle_ticket(ticket) {
                    let kind = if ticket.kind == FetchKind::Profile && self.loaded {
                        ErrorKind::RefinementFailure
                    } else {
                        ErrorKind::FetchFailure
                    };
                    self.fetch_error = Some(ViewError { kind, message });
                }
            }
            BrowseEvent::FetchAbandoned(ticket) => {
                self.outstanding.retain(|t| t.seq != ticket.seq);
            }
            BrowseEvent::SetSearchQuery(query) => {
                // The engine ignores surrounding whitespace
                let changed = query.trim() != self.query.trim();
                self.query = query;
                if changed {
                    self.refilter();
                }
            }
            BrowseEvent::SetCategory(category) => {
                if category != self.category {
                    self.category = category;
                    self.refilter();
                }
            }
            BrowseEvent::SetSortMode(mode) => {
                if mode != self.sort_mode {
                    self.sort_mode = mode;
                    self.refilter();
                }
            }
            BrowseEvent::ToggleInterest(interest) => {
                let before = self.profile.interests.len();
                self.profile.toggle_interest(&interest);
                if self.profile.interests.len() != before {
                    self.refilter();
                }
            }
            BrowseEvent::SetAge(age) => self.profile.age = age,
            BrowseEvent::SetProfession(profession) => self.profile.profession = profession,
            BrowseEvent::SetIncomeRange(range) => self.profile.income_range = range,
            BrowseEvent::SetLocation(location) => {
                self.profile.location = location
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty());
            }
            BrowseEvent::LoadMoreStarted => {
                if self.can_load_more() {
                    self.loading_more = true;
                }
            }
            BrowseEvent::LoadMoreSettled { generation } => {
                if self.loading_more {
                    self.loading_more = false;
                    if generation == self.generation {
                        self.paginator.advance();
                        self.window = self.paginator.window(&self.ordered);
                    }
                }
            }
            BrowseEvent::LoadMoreCancelled => self.loading_more = false,
            BrowseEvent::OpenDetail(id) => {
                self.detail = self.records.iter().find(|r| r.id == id).map(|r| r.id);
            }
            BrowseEvent::CloseDetail => self.detail = None,
            BrowseEvent::ClearFilters => {
                self.category = CategoryFilter::All;
                self.query.clear();
                self.refilter();
            }
            BrowseEvent::Deactivate => {
                self.active = false;
                self.outstanding.clear();
                self.loading_more = false;
            }
        }
        self
    }

    /// Rebuild the ordered list from the inputs and restart at the first page
    fn recompute(&mut self) {
        self.ordered = engine::compute(
            &self.records,
            &self.category,
            &self.query,
            self.sort_mode,
            &self.profile.interests,
        );
        self.paginator.reset();
        self.window = self.paginator.window(&self.ordered);
        self.generation += 1;
    }

    /// A user edit of the derived list. Once records are on screen it also
    /// retires the previous fetch error, which belonged to an earlier action.
    fn refilter(&mut self) {
        if self.loaded {
            self.fetch_error = None;
        }
        self.recompute();
    }

    /// Mark a response as received; true if it is newer than the records shown
    fn settle_ticket(&mut self, ticket: RequestTicket) -> bool {
        let was_outstanding = self.outstanding.iter().any(|t| t.seq == ticket.seq);
        self.outstanding.retain(|t| t.seq != ticket.seq);
        self.active && was_outstanding && ticket.seq > self.applied_seq
    }

    /// Records from `seq` were applied; responses issued before it are stale.
    /// Only successes supersede, a failure writes nothing.
    fn supersede(&mut self, seq: u64) {
        self.applied_seq = seq;
        self.outstanding.retain(|t| t.seq > seq);
    }

    /// A duplicate initial load is refused while one is in flight
    pub fn can_start(&self, kind: FetchKind) -> bool {
        self.active
            && !(kind == FetchKind::Initial
                && self.outstanding.iter().any(|t| t.kind == FetchKind::Initial))
    }

    pub fn can_load_more(&self) -> bool {
        self.active && !self.loading_more && self.window.has_more
    }

    pub fn next_ticket(&self, kind: FetchKind) -> RequestTicket {
        RequestTicket {
            seq: self.issued_seq + 1,
            kind,
        }
    }

    pub fn is_outstanding(&self, seq: u64) -> bool {
        self.outstanding.iter().any(|t| t.seq == seq)
    }

    pub fn loading(&self) -> bool {
        !self.outstanding.is_empty()
    }

    pub fn loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn records(&self) -> &[PolicyRecord] {
        &self.records
    }

    pub fn ordered(&self) -> &[PolicyRecord] {
        &self.ordered
    }

    pub fn window(&self) -> &Window<PolicyRecord> {
        &self.window
    }

    pub fn page_count(&self) -> usize {
        self.paginator.page_count()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn profile(&self) -> &ProfileCriteria {
        &self.profile
    }

    pub fn category(&self) -> &CategoryFilter {
        &self.category
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn detail(&self) -> Option<&PolicyRecord> {
        self.detail
            .and_then(|id| self.records.iter().find(|r| r.id == id))
    }

    /// Fetch errors take precedence; an empty list after a successful load
    /// is reported separately.
    pub fn error(&self) -> Option<ViewError> {
        if let Some(err) = &self.fetch_error {
            return Some(err.clone());
        }
        if self.loaded && !self.loading() && self.ordered.is_empty() {
            return Some(ViewError {
                kind: ErrorKind::EmptyResult,
                message: "No policies match your filters".to_string(),
            });
        }
        None
    }

    pub fn view(&self, saved: &SavedSet) -> BrowseView {
        let card = |record: &PolicyRecord| PolicyCard {
            saved: saved.is_saved(record.id),
            record: record.clone(),
        };
        BrowseView {
            visible_policies: self.window.visible.iter().map(card).collect(),
            total_filtered_count: self.ordered.len(),
            has_more: self.window.has_more,
            loading: self.loading(),
            loading_more: self.loading_more,
            error: self.error(),
            detail: self.detail().map(card),
            page_count: self.paginator.page_count(),
            category: self.category.label().to_string(),
            query: self.query.clone(),
            sort_mode: self.sort_mode,
            interests: self.profile.interests.clone(),
        }
    }
}

impl Default for BrowseState {
    fn default() -> Self {
        Self::new(BrowseSettings::default().page_size)
    }
}

/// A record as presented, with its save marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyCard {
    #[serde(flatten)]
    pub record: PolicyRecord,
    pub saved: bool,
}

/// Snapshot handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseView {
    pub visible_policies: Vec<PolicyCard>,
    pub total_filtered_count: usize,
    pub has_more: bool,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<ViewError>,
    pub detail: Option<PolicyCard>,
    pub page_count: usize,
    pub category: String,
    pub query: String,
    pub sort_mode: SortMode,
    pub interests: Vec<String>,
}

/// Drives a [`BrowseState`] from user actions and store responses.
///
/// Methods take `&self`; state sits behind a mutex that is never held across
/// an await, so concurrent calls interleave only at store requests and the
/// load-more settling delay.
pub struct BrowserController {
    store: Arc<dyn PolicyStore>,
    settings: BrowseSettings,
    state: Mutex<BrowseState>,
    saved: Mutex<SavedSet>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl BrowserController {
    pub fn new(store: Arc<dyn PolicyStore>, settings: BrowseSettings) -> Self {
        Self {
            store,
            settings,
            state: Mutex::new(BrowseState::new(settings.page_size)),
            saved: Mutex::new(SavedSet::new()),
        }
    }

    pub fn settings(&self) -> BrowseSettings {
        self.settings
    }

    fn dispatch(&self, event: BrowseEvent) {
        let mut guard = lock(&self.state);
        let state = std::mem::take(&mut *guard);
        *guard = state.apply(event);
    }

    /// Reserve a ticket, or `None` if this kind of fetch may not start now
    fn begin_fetch(&self, kind: FetchKind) -> Option<RequestTicket> {
        let mut guard = lock(&self.state);
        if !guard.can_start(kind) {
            return None;
        }
        let ticket = guard.next_ticket(kind);
        let state = std::mem::take(&mut *guard);
        *guard = state.apply(BrowseEvent::FetchStarted(ticket));
        Some(ticket)
    }

    fn finish_fetch(&self, ticket: RequestTicket, result: Result<Vec<PolicyRecord>, Error>) {
        match result {
            Ok(records) => {
                tracing::info!(seq = ticket.seq, kind = ?ticket.kind, count = records.len(), "policies received");
                self.dispatch(BrowseEvent::FetchSucceeded { ticket, records });
            }
            Err(e) => {
                tracing::warn!(seq = ticket.seq, kind = ?ticket.kind, error = %e, "policy fetch failed");
                self.dispatch(BrowseEvent::FetchFailed {
                    ticket,
                    message: e.to_string(),
                });
            }
        }
    }

    /// Fetch the full record set. Also the retry action after a failure.
    ///
    /// Returns false without touching the store if an initial load is
    /// already in flight or the controller was deactivated.
    pub async fn load(&self) -> bool {
        let ticket = match self.begin_fetch(FetchKind::Initial) {
            Some(ticket) => ticket,
            None => {
                tracing::debug!("initial load already in flight; ignoring");
                return false;
            }
        };
        let pending = PendingFetch::new(self, ticket);
        let result = self.store.fetch_all().await;
        pending.finish(result);
        true
    }

    /// Replace the record set with the store's profile-based matches.
    /// Category, search and sort are kept.
    pub async fn submit_profile_search(&self) -> bool {
        let criteria = SearchCriteria::from(lock(&self.state).profile());
        let ticket = match self.begin_fetch(FetchKind::Profile) {
            Some(ticket) => ticket,
            None => return false,
        };
        tracing::debug!(seq = ticket.seq, profession = ?criteria.profession, "profile search");
        let pending = PendingFetch::new(self, ticket);
        let result = self.store.search(&criteria).await;
        pending.finish(result);
        true
    }

    /// Reveal one more page after the settling delay.
    ///
    /// Returns false when ignored: a previous call is still settling, or
    /// there is nothing more to show.
    pub async fn load_more(&self) -> bool {
        let generation = {
            let mut guard = lock(&self.state);
            if !guard.can_load_more() {
                return false;
            }
            let state = std::mem::take(&mut *guard);
            *guard = state.apply(BrowseEvent::LoadMoreStarted);
            guard.generation()
        };
        let pending = PendingLoadMore {
            controller: self,
            generation: Some(generation),
        };
        tokio::time::sleep(self.settings.settle_delay).await;
        pending.settle();
        true
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        self.dispatch(BrowseEvent::SetSearchQuery(query.into()));
    }

    pub fn set_category(&self, category: CategoryFilter) {
        self.dispatch(BrowseEvent::SetCategory(category));
    }

    pub fn set_sort_mode(&self, mode: SortMode) {
        self.dispatch(BrowseEvent::SetSortMode(mode));
    }

    pub fn toggle_interest(&self, interest: impl Into<String>) {
        self.dispatch(BrowseEvent::ToggleInterest(interest.into()));
    }

    pub fn set_age(&self, age: Option<u32>) {
        self.dispatch(BrowseEvent::SetAge(age));
    }

    pub fn set_profession(&self, profession: Option<Profession>) {
        self.dispatch(BrowseEvent::SetProfession(profession));
    }

    pub fn set_income_range(&self, range: Option<IncomeRange>) {
        self.dispatch(BrowseEvent::SetIncomeRange(range));
    }

    pub fn set_location(&self, location: Option<String>) {
        self.dispatch(BrowseEvent::SetLocation(location));
    }

    pub fn open_detail(&self, id: PolicyId) {
        self.dispatch(BrowseEvent::OpenDetail(id));
    }

    pub fn close_detail(&self) {
        self.dispatch(BrowseEvent::CloseDetail);
    }

    pub fn clear_filters(&self) {
        self.dispatch(BrowseEvent::ClearFilters);
    }

    /// Stop applying store responses; anything still in flight is dropped
    pub fn deactivate(&self) {
        self.dispatch(BrowseEvent::Deactivate);
    }

    /// Flip the saved marker of `id`; returns the new value
    pub fn toggle_saved(&self, id: PolicyId) -> bool {
        lock(&self.saved).toggle(id)
    }

    pub fn is_saved(&self, id: PolicyId) -> bool {
        lock(&self.saved).is_saved(id)
    }

    pub fn saved_ids(&self) -> Vec<PolicyId> {
        lock(&self.saved).saved_ids()
    }

    pub fn subscribe_saved(&self) -> tokio::sync::broadcast::Receiver<SaveToggled> {
        lock(&self.saved).subscribe()
    }

    /// Copy of the current state
    pub fn state(&self) -> BrowseState {
        lock(&self.state).clone()
    }

    pub fn view(&self) -> BrowseView {
        let state = lock(&self.state);
        let saved = lock(&self.saved);
        state.view(&saved)
    }

    /// The current view, then one view per successful "load more" until the
    /// list is exhausted
    pub fn pages(&self) -> impl Stream<Item = BrowseView> + Unpin + '_ {
        Box::pin(stream! {
            yield self.view();
            while self.view().has_more {
                if !self.load_more().await {
                    break;
                }
                yield self.view();
            }
        })
    }
}

/// An issued fetch. Dropping it before [`PendingFetch::finish`] withdraws the
/// ticket, so a cancelled request never blocks a retry.
struct PendingFetch<'a> {
    controller: &'a BrowserController,
    ticket: Option<RequestTicket>,
}

impl<'a> PendingFetch<'a> {
    fn new(controller: &'a BrowserController, ticket: RequestTicket) -> Self {
        Self {
            controller,
            ticket: Some(ticket),
        }
    }

    fn finish(mut self, result: Result<Vec<PolicyRecord>, Error>) {
        if let Some(ticket) = self.ticket.take() {
            self.controller.finish_fetch(ticket, result);
        }
    }
}

impl Drop for PendingFetch<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            tracing::debug!(seq = ticket.seq, kind = ?ticket.kind, "fetch abandoned");
            self.controller.dispatch(BrowseEvent::FetchAbandoned(ticket));
        }
    }
}

/// A settling "load more"; dropped early, it clears the flag without a page
struct PendingLoadMore<'a> {
    controller: &'a BrowserController,
    generation: Option<u64>,
}

impl PendingLoadMore<'_> {
    fn settle(mut self) {
        if let Some(generation) = self.generation.take() {
            self.controller
                .dispatch(BrowseEvent::LoadMoreSettled { generation });
        }
    }
}

impl Drop for PendingLoadMore<'_> {
    fn drop(&mut self) {
        if self.generation.take().is_some() {
            self.controller.dispatch(BrowseEvent::LoadMoreCancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, PolicyId};

    fn records(n: u64) -> Vec<PolicyRecord> {
        (1..=n)
            .map(|id| PolicyRecord {
                id: PolicyId(id),
                name: format!("Policy {}", id),
                category: if id % 2 == 0 {
                    Category::Financial
                } else {
                    Category::Social
                },
                description: String::new(),
                eligibility: String::new(),
                tags: vec![],
                icon: String::new(),
            })
            .collect()
    }

    fn loaded(n: u64) -> BrowseState {
        let state = BrowseState::new(6);
        let ticket = state.next_ticket(FetchKind::Initial);
        state
            .apply(BrowseEvent::FetchStarted(ticket))
            .apply(BrowseEvent::FetchSucceeded {
                ticket,
                records: records(n),
            })
    }

    fn advance(state: BrowseState) -> BrowseState {
        let generation = state.generation();
        state
            .apply(BrowseEvent::LoadMoreStarted)
            .apply(BrowseEvent::LoadMoreSettled { generation })
    }

    #[test]
    fn test_initial_load_shows_first_page() {
        let state = loaded(20);
        assert_eq!(state.window().visible.len(), 6);
        assert!(state.window().has_more);
        assert!(!state.loading());
        assert!(state.error().is_none());
    }

    #[test]
    fn test_filter_change_resets_to_first_page() {
        let state = advance(advance(advance(loaded(30))));
        assert_eq!(state.page_count(), 4);
        assert_eq!(state.window().visible.len(), 24);

        let state = state.apply(BrowseEvent::SetCategory(CategoryFilter::from("Financial")));
        assert_eq!(state.page_count(), 1);
        assert_eq!(state.window().visible.len(), 6);
        assert_eq!(state.window().visible[0].id, PolicyId(2));

        let state = advance(advance(state)).apply(BrowseEvent::SetSearchQuery("1".to_string()));
        assert_eq!(state.page_count(), 1);
    }

    #[test]
    fn test_settle_after_list_change_does_not_advance() {
        let state = loaded(20);
        let generation = state.generation();
        let state = state
            .apply(BrowseEvent::LoadMoreStarted)
            .apply(BrowseEvent::SetSortMode(SortMode::Latest))
            .apply(BrowseEvent::LoadMoreSettled { generation });
        assert_eq!(state.page_count(), 1);
        assert!(!state.loading_more());
    }

    #[test]
    fn test_load_more_ignored_when_exhausted() {
        let state = loaded(4).apply(BrowseEvent::LoadMoreStarted);
        assert!(!state.loading_more());
    }

    #[test]
    fn test_stale_response_is_ignored() {
        let state = BrowseState::new(6);
        let first = state.next_ticket(FetchKind::Initial);
        let state = state.apply(BrowseEvent::FetchStarted(first));
        let second = state.next_ticket(FetchKind::Profile);
        let state = state
            .apply(BrowseEvent::FetchStarted(second))
            .apply(BrowseEvent::FetchSucceeded {
                ticket: second,
                records: records(2),
            })
            .apply(BrowseEvent::FetchSucceeded {
                ticket: first,
                records: records(10),
            });
        assert_eq!(state.records().len(), 2);
        assert!(!state.loading());
    }

    #[test]
    fn test_duplicate_initial_load_refused() {
        let state = BrowseState::new(6);
        let first = state.next_ticket(FetchKind::Initial);
        let state = state.apply(BrowseEvent::FetchStarted(first));
        assert!(!state.can_start(FetchKind::Initial));
        assert!(state.can_start(FetchKind::Profile));
    }

    #[test]
    fn test_empty_result_is_distinct_from_fetch_failure() {
        let state = loaded(5).apply(BrowseEvent::SetSearchQuery("nothing here".to_string()));
        assert_eq!(state.error().map(|e| e.kind), Some(ErrorKind::EmptyResult));

        let state = state.apply(BrowseEvent::ClearFilters);
        assert!(state.error().is_none());
        assert_eq!(state.ordered().len(), 5);
    }

    #[test]
    fn test_refinement_failure_keeps_records() {
        let state = loaded(8);
        let ticket = state.next_ticket(FetchKind::Profile);
        let state = state
            .apply(BrowseEvent::FetchStarted(ticket))
            .apply(BrowseEvent::FetchFailed {
                ticket,
                message: "boom".to_string(),
            });
        assert_eq!(state.error().map(|e| e.kind), Some(ErrorKind::RefinementFailure));
        assert_eq!(state.window().visible.len(), 6);
    }

    #[test]
    fn test_whitespace_only_query_edit_keeps_page() {
        let state = advance(loaded(20).apply(BrowseEvent::SetSearchQuery("policy".to_string())));
        assert_eq!(state.page_count(), 2);
        let generation = state.generation();

        let state = state.apply(BrowseEvent::SetSearchQuery("policy ".to_string()));
        assert_eq!(state.page_count(), 2);
        assert_eq!(state.generation(), generation);
        assert_eq!(state.query(), "policy ");
    }

    #[test]
    fn test_failed_newer_request_does_not_discard_older_success() {
        let state = BrowseState::new(6);
        let initial = state.next_ticket(FetchKind::Initial);
        let state = state.apply(BrowseEvent::FetchStarted(initial));
        let search = state.next_ticket(FetchKind::Profile);
        let state = state
            .apply(BrowseEvent::FetchStarted(search))
            .apply(BrowseEvent::FetchFailed {
                ticket: search,
                message: "boom".to_string(),
            });
        assert!(state.is_outstanding(initial.seq));

        let state = state.apply(BrowseEvent::FetchSucceeded {
            ticket: initial,
            records: records(10),
        });
        assert_eq!(state.ordered().len(), 10);
        assert!(state.error().is_none());
        assert!(!state.loading());
    }

    #[test]
    fn test_filter_edit_retires_refinement_failure() {
        let state = loaded(8);
        let ticket = state.next_ticket(FetchKind::Profile);
        let state = state
            .apply(BrowseEvent::FetchStarted(ticket))
            .apply(BrowseEvent::FetchFailed {
                ticket,
                message: "boom".to_string(),
            })
            .apply(BrowseEvent::SetSearchQuery("nothing here".to_string()));
        assert_eq!(state.error().map(|e| e.kind), Some(ErrorKind::EmptyResult));
    }

    #[test]
    fn test_abandoned_fetch_allows_retry() {
        let state = BrowseState::new(6);
        let ticket = state.next_ticket(FetchKind::Initial);
        let state = state
            .apply(BrowseEvent::FetchStarted(ticket))
            .apply(BrowseEvent::FetchAbandoned(ticket));
        assert!(!state.loading());
        assert!(state.can_start(FetchKind::Initial));
    }

    #[test]
    fn test_detail_requires_known_id() {
        let state = loaded(3).apply(BrowseEvent::OpenDetail(PolicyId(2)));
        assert_eq!(state.detail().map(|r| r.id), Some(PolicyId(2)));

        let state = state.apply(BrowseEvent::OpenDetail(PolicyId(99)));
        assert!(state.detail().is_none());
    }

    #[test]
    fn test_deactivated_state_ignores_responses() {
        let state = BrowseState::new(6);
        let ticket = state.next_ticket(FetchKind::Initial);
        let state = state
            .apply(BrowseEvent::FetchStarted(ticket))
            .apply(BrowseEvent::Deactivate)
            .apply(BrowseEvent::FetchSucceeded {
                ticket,
                records: records(3),
            });
        assert!(state.records().is_empty());
        assert!(!state.is_active());
    }
}
