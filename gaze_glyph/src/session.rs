// THEORY:
// The `GlyphSession` is the asynchronous shell around the pure engine. It owns the
// process-wide record arrays of the current image and the glyph of the current
// selection, and it is the only component that ever awaits anything.
//
// Key architectural principles:
// 1.  **Wholesale replacement**: the image data sits behind a `tokio::sync::RwLock` as an
//     `Arc`. A load swaps the `Arc`; readers holding the old one keep a consistent view.
//     Nothing is ever patched in place.
// 2.  **Last selection wins**: every request draws a ticket before it awaits its fetch.
//     When the fetch resolves, the result is committed only if no newer ticket has been
//     drawn in the meantime. Otherwise it is reported as `Superseded` and dropped. Order
//     is decided by when a request was made, never by when its fetch completed.
// 3.  **No cancellation**: superseded fetches are allowed to finish. Their results are
//     simply discarded.

use crate::adapter::{GlyphPayload, ImageData, LoadReport};
use crate::config::EngineConfig;
use crate::core_modules::radial_glyph::{RadialGlyphData, compute_glyph_model};
use crate::core_modules::records::{FixationEvent, GazeSample, Rect, ScoreTable};
use crate::error::GlyphResult;
use crate::pipeline::{ViewOutput, ViewState, render_view};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// What became of a request once its fetch resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The result is now the session's current value.
    Applied(T),
    /// A newer request was issued before this one resolved; the result was discarded.
    Superseded,
    /// The selection was below the minimum size; nothing was fetched.
    Rejected,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            _ => None,
        }
    }
}

pub struct GlyphSession {
    config: EngineConfig,
    image: RwLock<Arc<ImageData>>,
    glyph: RwLock<Option<Arc<RadialGlyphData>>>,
    image_ticket: AtomicU64,
    selection_ticket: AtomicU64,
}

impl GlyphSession {
    pub fn new(config: EngineConfig) -> GlyphResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            image: RwLock::new(Arc::new(ImageData::default())),
            glyph: RwLock::new(None),
            image_ticket: AtomicU64::new(0),
            selection_ticket: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Loads a new image, fetching its three record sets concurrently. A successful
    /// load also drops the current glyph and supersedes in-flight selections.
    pub async fn load_image<G, F, S>(
        &self,
        gaze: G,
        fixations: F,
        scores: S,
    ) -> GlyphResult<Outcome<Arc<ImageData>>>
    where
        G: Future<Output = GlyphResult<Vec<GazeSample>>>,
        F: Future<Output = GlyphResult<Vec<FixationEvent>>>,
        S: Future<Output = GlyphResult<ScoreTable>>,
    {
        let ticket = self.image_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let (gaze, fixations, scores) = futures::try_join!(gaze, fixations, scores)?;
        let data = Arc::new(ImageData {
            gaze,
            fixations,
            scores,
            report: LoadReport::default(),
        });
        self.commit_image(ticket, data).await
    }

    /// Replaces the image with data that is already in memory.
    pub async fn replace_image(&self, data: ImageData) -> Arc<ImageData> {
        let ticket = self.image_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        match self.commit_image(ticket, Arc::new(data)).await {
            Ok(Outcome::Applied(current)) => current,
            _ => self.image().await,
        }
    }

    async fn commit_image(&self, ticket: u64, data: Arc<ImageData>) -> GlyphResult<Outcome<Arc<ImageData>>> {
        let mut current = self.image.write().await;
        if ticket != self.image_ticket.load(Ordering::SeqCst) {
            log::warn!("discarding image load #{ticket}: a newer load was requested");
            return Ok(Outcome::Superseded);
        }
        *current = data.clone();
        drop(current);

        self.selection_ticket.fetch_add(1, Ordering::SeqCst);
        *self.glyph.write().await = None;
        log::debug!(
            "image #{ticket} loaded: {} gaze samples, {} fixations",
            data.gaze.len(),
            data.fixations.len()
        );
        Ok(Outcome::Applied(data))
    }

    pub async fn image(&self) -> Arc<ImageData> {
        self.image.read().await.clone()
    }

    /// Analyzes a data-space selection with the payload produced by `fetch`.
    ///
    /// Selections below the minimum size are rejected before `fetch` is polled. If the
    /// payload carries no scores, the current image's scores are used.
    pub async fn analyze_selection<F>(&self, rect: Rect, fetch: F) -> GlyphResult<Outcome<Arc<RadialGlyphData>>>
    where
        F: Future<Output = GlyphResult<GlyphPayload>>,
    {
        let glyph = &self.config.glyph;
        if !rect.is_selectable(glyph.min_selection_width, glyph.min_selection_height) {
            return Ok(Outcome::Rejected);
        }

        let ticket = self.selection_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let mut payload = fetch.await?;
        if payload.participant_scores.is_empty() {
            payload.participant_scores = self.image().await.scores.clone();
        }
        let data = Arc::new(compute_glyph_model(&payload, glyph));

        let mut current = self.glyph.write().await;
        let latest = self.selection_ticket.load(Ordering::SeqCst);
        if ticket != latest {
            log::warn!("discarding selection #{ticket}: #{latest} was requested after it");
            return Ok(Outcome::Superseded);
        }
        *current = Some(data.clone());
        Ok(Outcome::Applied(data))
    }

    /// Drops the current glyph; in-flight selections will be superseded.
    pub async fn clear_selection(&self) {
        self.selection_ticket.fetch_add(1, Ordering::SeqCst);
        *self.glyph.write().await = None;
    }

    pub async fn current_glyph(&self) -> Option<Arc<RadialGlyphData>> {
        self.glyph.read().await.clone()
    }

    /// Renders `state` against the current image.
    pub async fn render(&self, state: &ViewState) -> GlyphResult<ViewOutput> {
        let image = self.image().await;
        render_view(state, &image, &self.config)
    }
}
