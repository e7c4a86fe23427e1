//! The "currently displayed token" state machine.
//!
//! `DetectionSession` owns the bound mint and the origin it was detected on.
//! Every trigger goes through `apply` (or `select` for an explicit pick),
//! which mutates the session synchronously and reports what the caller must
//! do next. Fetch results are only applied while the `FetchTicket` issued
//! for them is still current.

use crate::types::TokenAddress;
use tracing::info;

/// What caused a detection cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionTrigger {
    TabActivated,
    TabUrlChanged,
    DomMutated,
    Poll,
    /// User asked for a reload (refresh button, retry after an error).
    ManualRefresh,
    /// User picked a token explicitly, e.g. from the trending list.
    Override(TokenAddress),
}

impl DetectionTrigger {
    /// Forced triggers reload even when the mint has not changed.
    pub fn is_forced(&self) -> bool {
        matches!(self, DetectionTrigger::ManualRefresh | DetectionTrigger::Override(_))
    }

    pub fn override_mint(&self) -> Option<&TokenAddress> {
        match self {
            DetectionTrigger::Override(mint) => Some(mint),
            _ => None,
        }
    }
}

/// Identifies one load of one mint. Stale tickets mean stale results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub mint: TokenAddress,
    pub generation: u64,
}

/// Result of applying a detection outcome to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to show. `was_bound` tells whether a mint was dropped.
    Cleared { was_bound: bool, origin_changed: bool },
    /// Same mint, same origin, not forced: nothing to do.
    Unchanged,
    /// A (re)load of `ticket.mint` must start.
    Bound { ticket: FetchTicket, previous: Option<TokenAddress>, origin_changed: bool },
}

#[derive(Debug, Default)]
pub struct DetectionSession {
    bound_mint: Option<TokenAddress>,
    bound_origin: Option<String>,
    /// The binding came from an explicit selection rather than the page.
    pinned: bool,
    generation: u64,
}

impl DetectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bound_mint(&self) -> Option<&TokenAddress> {
        self.bound_mint.as_ref()
    }

    pub fn bound_origin(&self) -> Option<&str> {
        self.bound_origin.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.bound_mint.is_some()
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Apply one detection outcome observed on `origin`.
    ///
    /// An origin change drops the bound mint before the candidate is looked
    /// at, so a token from one site never survives into a view of another.
    /// A pinned selection is the exception: unforced cycles leave it in
    /// place unless another site offers a token of its own.
    pub fn apply(
        &mut self,
        origin: &str,
        candidate: Option<TokenAddress>,
        forced: bool,
    ) -> Transition {
        let origin_changed = self
            .bound_origin
            .as_deref()
            .is_some_and(|bound| bound != origin);

        if self.pinned && !forced && !(origin_changed && candidate.is_some()) {
            self.bound_origin = Some(origin.to_string());
            return Transition::Unchanged;
        }

        let keep_pin = self.pinned && candidate.is_some() && self.bound_mint == candidate;
        let was_bound = self.bound_mint.is_some();

        if origin_changed {
            info!(
                "Website changed, cleared mint: {:?} -> {}",
                self.bound_origin, origin
            );
            self.bound_mint = None;
        }
        self.bound_origin = Some(origin.to_string());
        self.pinned = keep_pin;

        let Some(mint) = candidate else {
            self.bound_mint = None;
            return Transition::Cleared { was_bound, origin_changed };
        };

        if !forced && self.bound_mint.as_ref() == Some(&mint) {
            return Transition::Unchanged;
        }

        self.bind(mint, forced, origin_changed)
    }

    /// Bind `mint` chosen explicitly by the user on `origin`. Always reloads.
    pub fn select(&mut self, origin: &str, mint: TokenAddress) -> Transition {
        let origin_changed = self
            .bound_origin
            .as_deref()
            .is_some_and(|bound| bound != origin);
        self.bound_origin = Some(origin.to_string());
        self.pinned = true;
        self.bind(mint, true, origin_changed)
    }

    fn bind(&mut self, mint: TokenAddress, forced: bool, origin_changed: bool) -> Transition {
        let previous = self.bound_mint.replace(mint.clone());
        self.generation += 1;

        info!(
            "Token changed: {:?} -> {} (forced: {}, origin changed: {}, pinned: {})",
            previous.as_ref().map(TokenAddress::as_str),
            mint,
            forced,
            origin_changed,
            self.pinned
        );

        Transition::Bound {
            ticket: FetchTicket { mint, generation: self.generation },
            previous,
            origin_changed,
        }
    }

    /// Ticket for the current binding, if any.
    pub fn current_ticket(&self) -> Option<FetchTicket> {
        self.bound_mint.as_ref().map(|mint| FetchTicket {
            mint: mint.clone(),
            generation: self.generation,
        })
    }

    /// Whether a result fetched under `ticket` may still be applied.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.generation == ticket.generation && self.bound_mint.as_ref() == Some(&ticket.mint)
    }
}
