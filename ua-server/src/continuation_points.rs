// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Continuation points let a service return part of a result and hand the
//! client an opaque handle to fetch the rest with a later request.
//!
//! A handle is single use. Resuming it removes the stored cursor, so of two
//! requests racing on the same handle only one gets the page. Handles that
//! are never resumed or released expire and are purged lazily.

use std::{any::Any, collections::VecDeque, fmt, time::Duration};

use hashbrown::HashMap;
use log::{debug, trace};
use parking_lot::Mutex;
use tokio::time::Instant;
use ua_crypto::random;
use ua_types::{ByteString, StatusCode};

use crate::{config::ContinuationPointLimits, constants};

/// Type erased cursor stored behind a handle.
pub struct ContinuationPoint {
    payload: Box<dyn Any + Send + Sync>,
}

impl fmt::Debug for ContinuationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationPoint").finish_non_exhaustive()
    }
}

impl ContinuationPoint {
    /// Wrap a cursor.
    pub fn new<T: Send + Sync + 'static>(item: Box<T>) -> Self {
        Self { payload: item }
    }

    /// Borrow the cursor, if it is a `T`.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }

    /// Take the cursor, if it is a `T`.
    pub fn take<T: Send + Sync + 'static>(self) -> Option<Box<T>> {
        self.payload.downcast().ok()
    }
}

/// The services that page their results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContinuationPointKind {
    /// Browse and BrowseNext.
    Browse,
    /// QueryFirst and QueryNext.
    Query,
    /// HistoryRead.
    History,
}

struct Entry {
    point: ContinuationPoint,
    expires_at: Instant,
}

/// A cursor over a result set that can be read in pages.
pub trait Pager: Send + Sync + 'static {
    /// Element of the result set.
    type Item;

    /// Take up to `max` items. `max` of 0 means no limit.
    fn next_page(&mut self, max: usize) -> Vec<Self::Item>;

    /// `true` once every item has been taken.
    fn is_done(&self) -> bool;
}

/// A pager over a precomputed result set.
#[derive(Debug, Clone)]
pub struct VecPager<T> {
    remaining: VecDeque<T>,
}

impl<T> VecPager<T> {
    /// Page through `items`.
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            remaining: items.into_iter().collect(),
        }
    }

    /// Number of items not yet taken.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl<T: Send + Sync + 'static> Pager for VecPager<T> {
    type Item = T;

    fn next_page(&mut self, max: usize) -> Vec<T> {
        let count = if max == 0 {
            self.remaining.len()
        } else {
            max.min(self.remaining.len())
        };
        self.remaining.drain(..count).collect()
    }

    fn is_done(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// One page of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Status of the page. `BadNoContinuationPoints` means the items are
    /// returned but the rest of the result is lost.
    pub status: StatusCode,
    /// The items.
    pub items: Vec<T>,
    /// Handle for the next page, null if this is the last page.
    pub continuation_point: ByteString,
}

/// The continuation points of one kind for one session.
pub struct ContinuationPointStore {
    kind: ContinuationPointKind,
    max_points: usize,
    expiry: Duration,
    points: Mutex<HashMap<ByteString, Entry>>,
}

impl fmt::Debug for ContinuationPointStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationPointStore")
            .field("kind", &self.kind)
            .field("max_points", &self.max_points)
            .field("len", &self.len())
            .finish()
    }
}

impl ContinuationPointStore {
    /// Create a store holding at most `max_points` handles, each valid for
    /// `expiry` after it was minted. `max_points` of 0 disables the store.
    pub fn new(kind: ContinuationPointKind, max_points: usize, expiry: Duration) -> Self {
        Self {
            kind,
            max_points,
            expiry,
            points: Mutex::new(HashMap::new()),
        }
    }

    /// Kind of continuation points in the store.
    pub fn kind(&self) -> ContinuationPointKind {
        self.kind
    }

    /// Number of live handles, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.points.lock().len()
    }

    /// `true` if the store holds no handles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge(&self, points: &mut HashMap<ByteString, Entry>, now: Instant) {
        let before = points.len();
        points.retain(|_, e| e.expires_at > now);
        if points.len() != before {
            debug!(
                "Purged {} expired {:?} continuation points",
                before - points.len(),
                self.kind
            );
        }
    }

    /// Store `point` and return its handle. Fails with
    /// `BadNoContinuationPoints` if the store is full.
    pub fn mint(&self, point: ContinuationPoint, now: Instant) -> Result<ByteString, StatusCode> {
        let mut points = self.points.lock();
        self.purge(&mut points, now);
        if points.len() >= self.max_points {
            return Err(StatusCode::BadNoContinuationPoints);
        }
        let handle = loop {
            let handle = random::byte_string(constants::CONTINUATION_POINT_HANDLE_LENGTH);
            if !points.contains_key(&handle) {
                break handle;
            }
        };
        trace!("Minted {:?} continuation point {}", self.kind, handle.as_base64());
        points.insert(
            handle.clone(),
            Entry {
                point,
                expires_at: now + self.expiry,
            },
        );
        Ok(handle)
    }

    /// Remove and return the point behind `handle`. Fails with
    /// `BadContinuationPointInvalid` if the handle is unknown, expired, or
    /// already resumed or released.
    pub fn resume(
        &self,
        handle: &ByteString,
        now: Instant,
    ) -> Result<ContinuationPoint, StatusCode> {
        let mut points = self.points.lock();
        self.purge(&mut points, now);
        points
            .remove(handle)
            .map(|e| e.point)
            .ok_or(StatusCode::BadContinuationPointInvalid)
    }

    /// Remove and return the cursor behind `handle` if it is a `T`. A cursor
    /// of another type stays in the store.
    pub fn resume_as<T: Send + Sync + 'static>(
        &self,
        handle: &ByteString,
        now: Instant,
    ) -> Result<Box<T>, StatusCode> {
        let mut points = self.points.lock();
        self.purge(&mut points, now);
        match points.get(handle) {
            None => return Err(StatusCode::BadContinuationPointInvalid),
            Some(e) if e.point.get::<T>().is_none() => {
                debug!(
                    "{:?} continuation point holds another kind of cursor",
                    self.kind
                );
                return Err(StatusCode::BadContinuationPointInvalid);
            }
            Some(_) => {}
        }
        points
            .remove(handle)
            .and_then(|e| e.point.take::<T>())
            .ok_or(StatusCode::BadContinuationPointInvalid)
    }

    /// Discard the point behind `handle`.
    pub fn release(&self, handle: &ByteString, now: Instant) -> Result<(), StatusCode> {
        self.resume(handle, now).map(|_| ())
    }

    /// Take the first page from `pager`, storing it behind a new handle if
    /// items remain.
    pub fn first_page<P: Pager>(&self, mut pager: P, max: usize, now: Instant) -> Page<P::Item> {
        let items = pager.next_page(max);
        self.finish_page(pager, items, now)
    }

    /// Take the next page from the pager behind `handle`. The handle is
    /// consumed, a new one is returned if items remain.
    pub fn next_page<P: Pager>(
        &self,
        handle: &ByteString,
        max: usize,
        now: Instant,
    ) -> Result<Page<P::Item>, StatusCode> {
        let mut pager = self.resume_as::<P>(handle, now)?;
        let items = pager.next_page(max);
        Ok(self.finish_page(*pager, items, now))
    }

    /// Resume or release a list of handles, one result per handle, in the
    /// manner of `BrowseNext`. Released handles yield an empty page.
    pub fn next_pages<P: Pager>(
        &self,
        handles: &[ByteString],
        release: bool,
        max: usize,
        now: Instant,
    ) -> Vec<Result<Page<P::Item>, StatusCode>> {
        handles
            .iter()
            .map(|handle| {
                if release {
                    self.release(handle, now).map(|_| Page {
                        status: StatusCode::Good,
                        items: Vec::new(),
                        continuation_point: ByteString::null(),
                    })
                } else {
                    self.next_page::<P>(handle, max, now)
                }
            })
            .collect()
    }

    fn finish_page<P: Pager>(&self, pager: P, items: Vec<P::Item>, now: Instant) -> Page<P::Item> {
        if pager.is_done() {
            return Page {
                status: StatusCode::Good,
                items,
                continuation_point: ByteString::null(),
            };
        }
        match self.mint(ContinuationPoint::new(Box::new(pager)), now) {
            Ok(handle) => Page {
                status: StatusCode::Good,
                items,
                continuation_point: handle,
            },
            // Out of continuation points, return what we have and drop the rest.
            Err(status) => Page {
                status,
                items,
                continuation_point: ByteString::null(),
            },
        }
    }
}

/// The continuation point stores of one session.
#[derive(Debug)]
pub struct ContinuationPoints {
    /// Browse results.
    pub browse: ContinuationPointStore,
    /// Query results.
    pub query: ContinuationPointStore,
    /// History results.
    pub history: ContinuationPointStore,
}

impl ContinuationPoints {
    /// Create empty stores with the given limits.
    pub fn new(limits: &ContinuationPointLimits) -> Self {
        let expiry = Duration::from_millis(limits.expiry_ms);
        Self {
            browse: ContinuationPointStore::new(
                ContinuationPointKind::Browse,
                limits.max_browse_continuation_points,
                expiry,
            ),
            query: ContinuationPointStore::new(
                ContinuationPointKind::Query,
                limits.max_query_continuation_points,
                expiry,
            ),
            history: ContinuationPointStore::new(
                ContinuationPointKind::History,
                limits.max_history_continuation_points,
                expiry,
            ),
        }
    }

    /// The store for `kind`.
    pub fn store(&self, kind: ContinuationPointKind) -> &ContinuationPointStore {
        match kind {
            ContinuationPointKind::Browse => &self.browse,
            ContinuationPointKind::Query => &self.query,
            ContinuationPointKind::History => &self.history,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::time::Instant;
    use ua_types::{ByteString, StatusCode};

    use super::{
        ContinuationPoint, ContinuationPointKind, ContinuationPointStore, Pager, VecPager,
    };

    fn store(max: usize) -> ContinuationPointStore {
        ContinuationPointStore::new(ContinuationPointKind::Browse, max, Duration::from_secs(60))
    }

    #[test]
    fn resume_is_single_use() {
        let store = store(10);
        let now = Instant::now();
        let handle = store
            .mint(ContinuationPoint::new(Box::new(5u32)), now)
            .unwrap();
        assert_eq!(handle.len(), 16);
        let point = store.resume(&handle, now).unwrap();
        assert_eq!(point.get::<u32>(), Some(&5));
        assert_eq!(
            store.resume(&handle, now).unwrap_err(),
            StatusCode::BadContinuationPointInvalid
        );

        let handle = store
            .mint(ContinuationPoint::new(Box::new(6u32)), now)
            .unwrap();
        store.release(&handle, now).unwrap();
        assert_eq!(
            store.resume(&handle, now).unwrap_err(),
            StatusCode::BadContinuationPointInvalid
        );
        assert_eq!(
            store.release(&handle, now).unwrap_err(),
            StatusCode::BadContinuationPointInvalid
        );
    }

    #[test]
    fn full_store() {
        let store = store(2);
        let now = Instant::now();
        store.mint(ContinuationPoint::new(Box::new(1u8)), now).unwrap();
        store.mint(ContinuationPoint::new(Box::new(2u8)), now).unwrap();
        assert_eq!(
            store
                .mint(ContinuationPoint::new(Box::new(3u8)), now)
                .unwrap_err(),
            StatusCode::BadNoContinuationPoints
        );

        // A page that cannot be continued still returns its items.
        let page = store.first_page(VecPager::new(0..10), 4, now);
        assert_eq!(page.status, StatusCode::BadNoContinuationPoints);
        assert_eq!(page.items, vec![0, 1, 2, 3]);
        assert!(page.continuation_point.is_null());
    }

    #[test]
    fn expired_points_are_purged() {
        let store = store(1);
        let t0 = Instant::now();
        let handle = store.mint(ContinuationPoint::new(Box::new(1u8)), t0).unwrap();
        let later = t0 + Duration::from_secs(61);
        // Minting purges the expired point, making room.
        store.mint(ContinuationPoint::new(Box::new(2u8)), later).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.resume(&handle, later).unwrap_err(),
            StatusCode::BadContinuationPointInvalid
        );
    }

    #[test]
    fn paging() {
        let store = store(10);
        let now = Instant::now();
        let page = store.first_page(VecPager::new(0..7), 3, now);
        assert_eq!(page.items, vec![0, 1, 2]);
        let first = page.continuation_point;
        assert!(!first.is_null());

        let page = store.next_page::<VecPager<i32>>(&first, 3, now).unwrap();
        assert_eq!(page.items, vec![3, 4, 5]);
        assert_ne!(page.continuation_point, first);
        let second = page.continuation_point;

        let page = store.next_page::<VecPager<i32>>(&second, 3, now).unwrap();
        assert_eq!(page.items, vec![6]);
        assert!(page.continuation_point.is_null());
        assert!(store.is_empty());

        // The wrong cursor type is rejected and leaves the point in place.
        let page = store.first_page(VecPager::new(0..7), 3, now);
        assert_eq!(
            store
                .next_page::<VecPager<String>>(&page.continuation_point, 3, now)
                .unwrap_err(),
            StatusCode::BadContinuationPointInvalid
        );
        assert_eq!(store.len(), 1);
        let page = store
            .next_page::<VecPager<i32>>(&page.continuation_point, 3, now)
            .unwrap();
        assert_eq!(page.items, vec![3, 4, 5]);
    }

    #[test]
    fn batch_resume_and_release() {
        let store = store(10);
        let now = Instant::now();
        let a = store.first_page(VecPager::new(0..4), 2, now).continuation_point;
        let b = store.first_page(VecPager::new(10..14), 2, now).continuation_point;
        let unknown = ByteString::from(vec![1u8; 16]);

        let results =
            store.next_pages::<VecPager<i32>>(&[a.clone(), unknown.clone()], false, 2, now);
        assert_eq!(results[0].as_ref().unwrap().items, vec![2, 3]);
        assert_eq!(
            results[1].as_ref().unwrap_err(),
            &StatusCode::BadContinuationPointInvalid
        );

        let results = store.next_pages::<VecPager<i32>>(&[b.clone(), a], true, 2, now);
        assert!(results[0].as_ref().unwrap().items.is_empty());
        assert!(results[1].is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn racing_resumes_get_one_page() {
        let store = Arc::new(store(10));
        let now = Instant::now();
        let mut pager = VecPager::new(0..100);
        let _ = pager.next_page(10);
        let handle = store
            .mint(ContinuationPoint::new(Box::new(pager)), now)
            .unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let handle = handle.clone();
                tokio::spawn(async move { store.next_page::<VecPager<i32>>(&handle, 10, now) })
            })
            .collect();
        let mut successes = 0;
        for t in tasks {
            if let Ok(page) = t.await.unwrap() {
                assert_eq!(page.items, (10..20).collect::<Vec<_>>());
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
