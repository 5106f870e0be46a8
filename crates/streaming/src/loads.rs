use std::collections::BTreeMap;

use image::RgbaImage;
use tracing::debug;

use crate::loader::{ImageLoader, LoadError, decode_image};
use crate::request::Request;

/// One image load in flight. Several targets may wait on the same URL.
#[derive(Debug, Clone)]
pub struct PendingLoad<T> {
    pub url: String,
    pub attempts: u32,
    pub generation: u64,
    pub targets: Vec<T>,
}

#[derive(Debug)]
pub enum LoadOutcome<T> {
    Loaded {
        url: String,
        image: RgbaImage,
        targets: Vec<T>,
    },
    /// The load failed and was re-issued under a new request.
    Retrying { url: String, retry: Request },
    /// Retries are exhausted. Targets should skip the image.
    Failed {
        url: String,
        error: LoadError,
        targets: Vec<T>,
    },
    /// Issued under an older generation; dropped without side effects.
    Stale { url: String },
    /// Not (or no longer) pending.
    Unknown,
}

/// Pending image loads with retry and generation tracking.
///
/// Ordering contract: requests are numbered monotonically within the
/// namespace and pending entries are kept in a `BTreeMap`, so iteration and
/// cancellation order are deterministic.
#[derive(Debug)]
pub struct ImageLoads<T> {
    namespace: u16,
    max_retries: u32,
    next_seq: u64,
    pending: BTreeMap<Request, PendingLoad<T>>,
}

impl<T> ImageLoads<T> {
    pub fn new(namespace: u16, max_retries: u32) -> Self {
        Self {
            namespace,
            max_retries,
            next_seq: 1,
            pending: BTreeMap::new(),
        }
    }

    pub fn namespace(&self) -> u16 {
        self.namespace
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn get(&self, request: Request) -> Option<&PendingLoad<T>> {
        self.pending.get(&request)
    }

    pub fn requests(&self) -> impl Iterator<Item = Request> + '_ {
        self.pending.keys().copied()
    }

    fn next_request(&mut self) -> Request {
        let req = Request::new(self.namespace, self.next_seq);
        self.next_seq += 1;
        req
    }

    /// Starts a load for `url`, or joins one already in flight for the same
    /// URL and generation. Returns the request the target now waits on.
    pub fn issue(
        &mut self,
        url: &str,
        generation: u64,
        target: T,
        loader: &mut dyn ImageLoader,
    ) -> Request {
        if let Some((req, load)) = self
            .pending
            .iter_mut()
            .find(|(_, l)| l.url == url && l.generation == generation)
        {
            load.targets.push(target);
            return *req;
        }

        let req = self.next_request();
        self.pending.insert(
            req,
            PendingLoad {
                url: url.to_string(),
                attempts: 1,
                generation,
                targets: vec![target],
            },
        );
        loader.load(req, url);
        req
    }

    /// Resolves a completion reported by the host.
    ///
    /// Loads issued under a generation other than `current_generation` are
    /// dropped. Failed loads (including undecodable bytes) are re-issued for
    /// the same URL until `max_retries` extra attempts have been made.
    pub fn complete(
        &mut self,
        request: Request,
        result: Result<Vec<u8>, LoadError>,
        current_generation: u64,
        loader: &mut dyn ImageLoader,
    ) -> LoadOutcome<T> {
        let Some(load) = self.pending.remove(&request) else {
            return LoadOutcome::Unknown;
        };

        if load.generation != current_generation {
            debug!(
                request = %request,
                url = %load.url,
                generation = load.generation,
                current_generation,
                "dropping stale image completion"
            );
            return LoadOutcome::Stale { url: load.url };
        }

        let error = match result.and_then(|bytes| decode_image(&bytes)) {
            Ok(image) => {
                return LoadOutcome::Loaded {
                    url: load.url,
                    image,
                    targets: load.targets,
                };
            }
            Err(e) => e,
        };

        if load.attempts <= self.max_retries {
            let retry = self.next_request();
            debug!(url = %load.url, attempt = load.attempts + 1, error = %error, "retrying image load");
            loader.load(retry, &load.url);
            let url = load.url.clone();
            self.pending.insert(
                retry,
                PendingLoad {
                    attempts: load.attempts + 1,
                    ..load
                },
            );
            return LoadOutcome::Retrying { url, retry };
        }

        LoadOutcome::Failed {
            url: load.url,
            error,
            targets: load.targets,
        }
    }

    /// Forgets every load issued before `generation`. Returns how many were
    /// dropped; their completions will resolve to [`LoadOutcome::Unknown`].
    pub fn cancel_before(&mut self, generation: u64) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, l| l.generation >= generation);
        before - self.pending.len()
    }

    /// Removes targets matching `pred`; loads left without targets are
    /// forgotten.
    pub fn cancel_targets(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.pending.len();
        for load in self.pending.values_mut() {
            load.targets.retain(|t| !pred(t));
        }
        self.pending.retain(|_, l| !l.targets.is_empty());
        before - self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
