/// Gallery page cache
///
/// Holds the ordered sequence of fetched pages and exposes a flattened
/// view over their images. Three rules govern fetching:
///
/// - `begin_append` is a no-op while a fetch is in flight or after the
///   last page reported `has_more == false`.
/// - A refresh refetches every page currently held (1..=n), replacing
///   the cache wholesale once the chain completes, so a long-scrolled
///   gallery keeps its extent after a mutation.
/// - Completions are tagged with a generation; a completion whose
///   generation no longer matches the in-flight record is discarded,
///   which resolves races between overlapping refetch triggers by
///   last-writer-wins.
///
/// Deletion is optimistic: `remove_local` strips records from every
/// page synchronously, before the network call resolves. A failed
/// delete is not rolled back; the follow-up refresh reconciles against
/// the authoritative state.

use std::collections::HashSet;

use crate::api::types::{GalleryImage, GalleryPage};
use crate::error::Error;

/// A fetch the cache wants performed. The caller runs the request and
/// reports back through `finish` with the same generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub page: u32,
}

#[derive(Debug)]
enum InFlight {
    /// Loading the next page onto the end of the cache.
    Append { page: u32 },
    /// Refetching pages 1..=target after a mutation.
    Refresh { target: u32, fetched: Vec<GalleryPage> },
}

#[derive(Debug, Default)]
pub struct PageCache {
    pages: Vec<GalleryPage>,
    in_flight: Option<(u64, InFlight)>,
    end_reached: bool,
    error: Option<Error>,
    generation: u64,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattened view: all images of all pages, in fetch order.
    pub fn images(&self) -> impl Iterator<Item = &GalleryImage> {
        self.pages.iter().flat_map(|page| page.images.iter())
    }

    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|page| page.images.len()).sum()
    }

    pub fn find(&self, id: &str) -> Option<&GalleryImage> {
        self.images().find(|image| image.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the initial load has settled, successfully or as an
    /// empty gallery. Drives "loading" vs "no images yet" in the UI.
    pub fn has_loaded(&self) -> bool {
        !self.pages.is_empty() || self.end_reached
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Start fetching the next page, if one is known to exist and
    /// nothing is in flight. Returns the request to perform, or `None`
    /// when this is a no-op.
    pub fn begin_append(&mut self) -> Option<FetchRequest> {
        if self.in_flight.is_some() || self.end_reached {
            return None;
        }

        let page = self.pages.last().map(|p| p.current_page + 1).unwrap_or(1);
        self.generation += 1;
        self.in_flight = Some((self.generation, InFlight::Append { page }));
        Some(FetchRequest {
            generation: self.generation,
            page,
        })
    }

    /// Start a full reconciliation: refetch every page currently held,
    /// beginning at page 1. Supersedes any in-flight fetch.
    pub fn begin_refresh(&mut self) -> FetchRequest {
        let target = (self.pages.len() as u32).max(1);
        self.generation += 1;
        self.in_flight = Some((
            self.generation,
            InFlight::Refresh {
                target,
                fetched: Vec::new(),
            },
        ));
        self.error = None;
        FetchRequest {
            generation: self.generation,
            page: 1,
        }
    }

    /// Record a fetch completion. Returns a follow-up request when a
    /// refresh chain needs its next page.
    pub fn finish(
        &mut self,
        request: FetchRequest,
        result: Result<GalleryPage, Error>,
    ) -> Option<FetchRequest> {
        let Some((generation, in_flight)) = self.in_flight.take() else {
            return None;
        };
        if generation != request.generation {
            // A newer trigger superseded this fetch; drop the result.
            self.in_flight = Some((generation, in_flight));
            return None;
        }

        match in_flight {
            InFlight::Append { page } => {
                match result {
                    Ok(fetched) => {
                        self.end_reached = !fetched.has_more;
                        self.error = None;
                        self.pages.push(fetched);
                    }
                    // A 404 on the first page is an empty gallery, not
                    // an error.
                    Err(Error::NotFound) if page == 1 && self.pages.is_empty() => {
                        self.end_reached = true;
                    }
                    Err(err) => {
                        self.error = Some(err);
                    }
                }
                None
            }
            InFlight::Refresh { target, mut fetched } => match result {
                Ok(page) => {
                    let has_more = page.has_more;
                    let next = page.current_page + 1;
                    fetched.push(page);

                    if has_more && (fetched.len() as u32) < target {
                        self.generation += 1;
                        self.in_flight = Some((
                            self.generation,
                            InFlight::Refresh { target, fetched },
                        ));
                        return Some(FetchRequest {
                            generation: self.generation,
                            page: next,
                        });
                    }

                    self.pages = fetched;
                    self.end_reached = !has_more;
                    self.error = None;
                    None
                }
                Err(Error::NotFound) => {
                    // The gallery shrank below this page; what we have
                    // refetched so far is the authoritative whole.
                    self.pages = fetched;
                    self.end_reached = true;
                    self.error = None;
                    None
                }
                Err(err) => {
                    // Abandon the refresh and keep showing the previous
                    // pages; the user can trigger another one.
                    self.error = Some(err);
                    None
                }
            },
        }
    }

    /// Optimistically remove `ids` from every held page, ahead of the
    /// network delete. Returns how many records were removed.
    pub fn remove_local(&mut self, ids: &HashSet<String>) -> usize {
        let mut removed = 0;
        for page in &mut self.pages {
            let before = page.images.len();
            page.images.retain(|image| !ids.contains(&image.id));
            removed += before - page.images.len();
        }

        if removed > 0 {
            for page in &mut self.pages {
                page.total = page.total.saturating_sub(removed as u64);
            }
        }
        removed
    }

    /// Single-id convenience for the detail overlay's delete.
    pub fn remove_one(&mut self, id: &str) -> usize {
        let mut ids = HashSet::new();
        ids.insert(id.to_string());
        self.remove_local(&ids)
    }
}
