//! Deduplicating, tag-indexed quote cache with lazy removal.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        Arena<Q> (behind one Mutex)                   │
//! │                                                                      │
//! │  ids: HashMap<Id, slot>        slots: Vec<Slot<Q>>                   │
//! │   "q1" ─► 0                    ┌──────┬──────┬──────┬──────┐         │
//! │   "q2" ─► 1                    │ 0:q1 │ 1:q2 │ 2:__ │ 3:q4 │         │
//! │   "q4" ─► 3                    └──────┴──────┴──────┴──────┘         │
//! │                                                     ▲                │
//! │  tags: HashMap<String, BTreeSet<slot>>              │ free: [2]      │
//! │   "wisdom" ─► {0, 3}                                                 │
//! │   "money"  ─► {1}              live: [0, 3, 1]  (dense, for picks)   │
//! │                                                                      │
//! │  pending: BTreeSet<slot>   tombstones waiting for compaction         │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Slot ids are stable: nothing shifts when a quote is removed. A removed
//! slot is only handed out again (via the free list) after compaction has
//! purged it from every tag set, so a tag index can never point at a
//! different quote than the one it was built for.
//!
//! ## Lazy removal
//!
//! `remove_*` calls only record tombstones in `pending`. Every other
//! operation starts by compacting: pending slots are cleared in descending
//! order, dropped from `ids` and `live`, purged from every tag set (empty
//! tags are dropped) and pushed onto the free list. Bursts of removals
//! therefore pay for one tag sweep instead of one per removal.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{Cacheable, TagQueryable};
use crate::random::{self, RandomSource};
use crate::types::Quote;
use crate::{MimirError, Result};

type SlotId = u32;

struct Slot<Q> {
    quote: Option<Q>,
    /// Position of this slot in `Arena::live`; meaningless while vacant.
    live_pos: usize,
}

struct Arena<Q: Quote> {
    slots: Vec<Slot<Q>>,
    live: Vec<SlotId>,
    ids: HashMap<Q::Id, SlotId>,
    tags: HashMap<String, BTreeSet<SlotId>>,
    pending: BTreeSet<SlotId>,
    free: Vec<SlotId>,
}

impl<Q: Quote> Arena<Q> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: Vec::new(),
            ids: HashMap::new(),
            tags: HashMap::new(),
            pending: BTreeSet::new(),
            free: Vec::new(),
        }
    }

    fn quote(&self, slot: SlotId) -> Option<&Q> {
        self.slots.get(slot as usize).and_then(|s| s.quote.as_ref())
    }

    fn compact(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        let mut removed = 0usize;
        for &slot in pending.iter().rev() {
            let entry = &mut self.slots[slot as usize];
            let Some(quote) = entry.quote.take() else {
                continue;
            };
            let pos = entry.live_pos;
            self.ids.remove(&quote.id());
            self.live.swap_remove(pos);
            if let Some(&moved) = self.live.get(pos) {
                self.slots[moved as usize].live_pos = pos;
            }
            self.free.push(slot);
            removed += 1;
        }

        let slots = &self.slots;
        self.tags.retain(|_, members| {
            members.retain(|s| slots[*s as usize].quote.is_some());
            !members.is_empty()
        });
        debug!(removed, live = self.live.len(), "compacted quote cache");
    }

    fn insert(&mut self, quote: Q, replace: bool) -> Result<bool> {
        let id = quote.id();
        if let Some(&slot) = self.ids.get(&id) {
            if !replace {
                trace!(?id, "quote already cached");
                return Ok(false);
            }
            // Associations of the previous value are kept; new tags are added.
            self.index_tags(slot, quote.tags());
            self.slots[slot as usize].quote = Some(quote);
            return Ok(true);
        }

        let live_pos = self.live.len();
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Slot {
                    quote: None,
                    live_pos,
                };
                slot
            }
            None => {
                let slot = SlotId::try_from(self.slots.len()).map_err(|_| {
                    MimirError::OutOfRange("quote cache is full".into())
                })?;
                self.slots.push(Slot {
                    quote: None,
                    live_pos,
                });
                slot
            }
        };
        self.index_tags(slot, quote.tags());
        self.slots[slot as usize].quote = Some(quote);
        self.live.push(slot);
        self.ids.insert(id, slot);
        Ok(true)
    }

    fn index_tags(&mut self, slot: SlotId, tags: &[String]) {
        for tag in tags.iter().filter(|t| !t.is_empty()) {
            self.tags.entry(tag.clone()).or_default().insert(slot);
        }
    }

    /// Tombstone a slot; false if it was already pending.
    fn mark(&mut self, slot: SlotId) -> bool {
        self.pending.insert(slot)
    }

    fn slots_for(&self, tags: &[&str]) -> BTreeSet<SlotId> {
        tags.iter()
            .filter_map(|tag| self.tags.get(*tag))
            .flat_map(|members| members.iter().copied())
            .collect()
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Thread-safe deduplicating quote store indexed by tag.
///
/// Quotes are keyed on [`Quote::id()`]; each non-empty tag of a cached quote
/// is indexed so tag queries never scan the whole cache. All state sits
/// behind a single mutex which is never held across an `.await`.
pub struct QuoteCache<Q: Quote> {
    arena: Mutex<Arena<Q>>,
    random: Arc<dyn RandomSource>,
}

impl<Q: Quote> QuoteCache<Q> {
    /// Empty cache drawing from the default per-thread generator.
    pub fn new() -> Self {
        Self::with_random(random::default_source())
    }

    pub fn with_random(random: Arc<dyn RandomSource>) -> Self {
        Self {
            arena: Mutex::new(Arena::new()),
            random,
        }
    }

    /// Number of tombstones waiting for compaction.
    ///
    /// Does not compact, so it can be used to observe lazy removal.
    pub fn pending_removals(&self) -> usize {
        self.arena.lock().pending.len()
    }

    /// Drop every quote, tag and tombstone.
    pub fn reset(&self) {
        self.arena.lock().clear();
    }

    fn pick(&self, candidates: usize) -> usize {
        self.random.index(candidates)
    }
}

fn check_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(MimirError::InvalidArgument("tag must not be empty".into()));
    }
    Ok(())
}

impl<Q: Quote> Cacheable<Q> for QuoteCache<Q> {
    fn cache_quote(&self, quote: Q, replace: bool) -> Result<bool> {
        let mut arena = self.arena.lock();
        arena.compact();
        arena.insert(quote, replace)
    }

    fn get_cached(&self) -> Vec<Q> {
        let mut arena = self.arena.lock();
        arena.compact();
        arena.slots.iter().filter_map(|s| s.quote.clone()).collect()
    }

    fn get_random_quote(&self, remove: bool) -> Result<Q> {
        let mut arena = self.arena.lock();
        arena.compact();
        if arena.live.is_empty() {
            return Err(MimirError::InvalidState(
                "cannot pick a random quote from an empty cache".into(),
            ));
        }
        let slot = arena.live[self.pick(arena.live.len())];
        let quote = arena
            .quote(slot)
            .cloned()
            .ok_or_else(|| MimirError::InvalidState(format!("live slot {slot} is vacant")))?;
        if remove {
            arena.mark(slot);
        }
        Ok(quote)
    }

    fn remove_quote(&self, quote: &Q) -> Result<bool> {
        self.remove_quote_by_id(&quote.id())
    }

    fn remove_quote_by_id(&self, id: &Q::Id) -> Result<bool> {
        let mut arena = self.arena.lock();
        match arena.ids.get(id).copied() {
            Some(slot) => Ok(arena.mark(slot)),
            None => Ok(false),
        }
    }

    fn is_cached(&self, id: &Q::Id) -> bool {
        let mut arena = self.arena.lock();
        arena.compact();
        arena.ids.contains_key(id)
    }

    fn num_cached(&self) -> usize {
        let mut arena = self.arena.lock();
        arena.compact();
        arena.live.len()
    }

    fn clear(&self) -> Result<()> {
        self.reset();
        Ok(())
    }
}

impl<Q: Quote> TagQueryable<Q> for QuoteCache<Q> {
    fn get_cached_by_tag(&self, tag: &str) -> Result<Vec<Q>> {
        self.get_cached_by_tags(&[tag])
    }

    fn get_cached_by_tags(&self, tags: &[&str]) -> Result<Vec<Q>> {
        tags.iter().try_for_each(|t| check_tag(t))?;
        let mut arena = self.arena.lock();
        arena.compact();
        let slots = arena.slots_for(tags);
        Ok(slots
            .into_iter()
            .filter_map(|slot| arena.quote(slot).cloned())
            .collect())
    }

    fn try_get_random_quote(&self, tag: &str, remove: bool) -> Result<Option<Q>> {
        self.try_get_random_quote_any(&[tag], remove)
    }

    fn try_get_random_quote_any(&self, tags: &[&str], remove: bool) -> Result<Option<Q>> {
        tags.iter().try_for_each(|t| check_tag(t))?;
        let mut arena = self.arena.lock();
        arena.compact();
        let candidates: Vec<SlotId> = arena.slots_for(tags).into_iter().collect();
        if candidates.is_empty() {
            return Ok(None);
        }
        let slot = candidates[self.pick(candidates.len())];
        let quote = arena.quote(slot).cloned();
        if remove && quote.is_some() {
            arena.mark(slot);
        }
        Ok(quote)
    }

    fn remove_quotes(&self, tag: &str) -> Result<bool> {
        check_tag(tag)?;
        let mut arena = self.arena.lock();
        let members: Vec<SlotId> = match arena.tags.get(tag) {
            Some(members) => members.iter().copied().collect(),
            None => return Ok(false),
        };
        let mut any = false;
        for slot in members {
            any |= arena.mark(slot);
        }
        Ok(any)
    }

    fn has_tag(&self, tag: &str) -> bool {
        let mut arena = self.arena.lock();
        arena.compact();
        arena.tags.contains_key(tag)
    }

    fn has_any_tag(&self, tags: &[&str]) -> bool {
        let mut arena = self.arena.lock();
        arena.compact();
        tags.iter().any(|t| arena.tags.contains_key(*t))
    }

    fn tags(&self) -> Vec<String> {
        let mut arena = self.arena.lock();
        arena.compact();
        let mut tags: Vec<String> = arena.tags.keys().cloned().collect();
        tags.sort();
        tags
    }
}

impl<Q: Quote> Default for QuoteCache<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: Quote> fmt::Debug for QuoteCache<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.arena.lock();
        f.debug_struct("QuoteCache")
            .field("live", &arena.live.len())
            .field("tags", &arena.tags.len())
            .field("pending", &arena.pending.len())
            .field("free", &arena.free.len())
            .finish()
    }
}
