// src/services/studio.rs
//! One user session: uploads, outfit analysis and the two-branch generation
//! run (poster and model-image variations).
//!
//! Every run is tagged with the session epoch. `reset` and each new run bump
//! the epoch, and anything finishing under an older epoch is dropped instead
//! of being written into the fresh state.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::join_all;
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::StudioError;
use crate::models::{
    ExtractionTarget, GenerationOptions, GenerationRequest, GenerationResult, ImageSlot,
    OptionsUpdate, Stage, StudioSnapshot, UploadedImage, VariationImage,
};
use crate::services::generation_client::GenerationClient;

#[derive(Debug, Default)]
struct StudioState {
    epoch: u64,
    stage: Stage,
    analyzing: bool,
    generating: bool,
    model_image: Option<Arc<UploadedImage>>,
    product_image: Option<Arc<UploadedImage>>,
    extraction_target: ExtractionTarget,
    outfit_description: String,
    /// Product image and target the description was produced for.
    description_source: Option<(Uuid, ExtractionTarget)>,
    analysis_error: Option<String>,
    options: GenerationOptions,
    result: GenerationResult,
}

impl StudioState {
    fn ensure_idle(&self) -> Result<(), StudioError> {
        if self.generating {
            return Err(StudioError::Busy("Generation is in progress".to_string()));
        }
        if self.analyzing {
            return Err(StudioError::Busy("Analysis is in progress".to_string()));
        }
        Ok(())
    }

    fn description_is_stale(&self) -> bool {
        match (self.description_source, &self.product_image) {
            (Some((image_id, target)), Some(product)) => {
                image_id != product.id || target != self.extraction_target
            }
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Releases the analyzing flag when an analysis future is dropped before
/// the backend answers, restoring the stage it started from.
struct AnalysisGuard<'a> {
    studio: &'a Studio,
    epoch: u64,
    previous_stage: Stage,
    armed: bool,
}

impl Drop for AnalysisGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.studio.state();
        if state.epoch == self.epoch && state.analyzing {
            warn!("session {}: analysis cancelled", self.studio.id);
            state.analyzing = false;
            state.stage = self.previous_stage;
        }
    }
}

pub struct Studio {
    id: Uuid,
    client: Arc<GenerationClient>,
    state: Mutex<StudioState>,
    last_seen: Mutex<DateTime<Utc>>,
}

impl Studio {
    pub fn new(client: Arc<GenerationClient>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            state: Mutex::new(StudioState::default()),
            last_seen: Mutex::new(Utc::now()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn state(&self) -> MutexGuard<'_, StudioState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Utc::now();
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_busy(&self) -> bool {
        let state = self.state();
        state.analyzing || state.generating
    }

    pub fn snapshot(&self) -> StudioSnapshot {
        let state = self.state();
        StudioSnapshot {
            session_id: self.id,
            epoch: state.epoch,
            stage: state.stage,
            analyzing: state.analyzing,
            generating: state.generating,
            model_image: state.model_image.as_ref().map(|i| i.info()),
            product_image: state.product_image.as_ref().map(|i| i.info()),
            extraction_target: state.extraction_target,
            outfit_description: state.outfit_description.clone(),
            outfit_description_stale: state.description_is_stale(),
            analysis_error: state.analysis_error.clone(),
            options: state.options.clone(),
            result: state.result.clone(),
            updated_at: self.last_seen(),
        }
    }

    pub fn image(&self, slot: ImageSlot) -> Option<Arc<UploadedImage>> {
        let state = self.state();
        match slot {
            ImageSlot::Model => state.model_image.clone(),
            ImageSlot::Product => state.product_image.clone(),
        }
    }

    pub fn select_image(&self, slot: ImageSlot, image: UploadedImage) -> Result<(), StudioError> {
        let mut state = self.state();
        state.ensure_idle()?;
        debug!("session {}: {:?} image set to {}", self.id, slot, image.id);
        let image = Some(Arc::new(image));
        match slot {
            ImageSlot::Model => state.model_image = image,
            ImageSlot::Product => state.product_image = image,
        }
        Ok(())
    }

    pub fn set_extraction_target(&self, target: ExtractionTarget) -> Result<(), StudioError> {
        let mut state = self.state();
        state.ensure_idle()?;
        state.extraction_target = target;
        Ok(())
    }

    /// A user-edited description belongs to the user and is never considered stale.
    pub fn set_outfit_description(&self, description: String) -> Result<(), StudioError> {
        let mut state = self.state();
        state.ensure_idle()?;
        state.outfit_description = description;
        state.description_source = None;
        Ok(())
    }

    pub fn update_options(&self, update: OptionsUpdate) -> Result<(), StudioError> {
        let mut state = self.state();
        state.ensure_idle()?;
        state.options.apply(update)
    }

    pub async fn analyze_product(&self) -> Result<String, StudioError> {
        let (mut guard, product, target) = {
            let mut state = self.state();
            state.ensure_idle()?;
            let product = state.product_image.clone().ok_or_else(|| {
                StudioError::Validation("Please upload the product image first".to_string())
            })?;
            let guard = AnalysisGuard {
                studio: self,
                epoch: state.epoch,
                previous_stage: state.stage,
                armed: true,
            };
            state.analyzing = true;
            state.stage = Stage::Analyzing;
            state.analysis_error = None;
            (guard, product, state.extraction_target)
        };

        info!("session {}: analyzing {} outfit", self.id, target);
        let outcome = self.client.analyze_outfit(&product, target).await;
        guard.armed = false;

        let mut state = self.state();
        if state.epoch != guard.epoch {
            debug!("session {}: dropping analysis from epoch {}", self.id, guard.epoch);
            return outcome;
        }
        state.analyzing = false;
        match &outcome {
            Ok(description) => {
                state.outfit_description = description.clone();
                state.description_source = Some((product.id, target));
                state.stage = Stage::AnalysisReady;
            }
            Err(e) => {
                error!("session {}: analysis failed: {}", self.id, e);
                state.outfit_description.clear();
                state.description_source = None;
                state.analysis_error = Some(e.message().to_string());
                state.stage = Stage::AnalysisFailed;
            }
        }
        outcome
    }

    /// Expands the background text and stores the result as the new background.
    pub async fn enhance_background(&self, background: &str) -> Result<String, StudioError> {
        if background.trim().is_empty() {
            return Err(StudioError::Validation(
                "Enter a background description to enhance".to_string(),
            ));
        }
        let epoch = {
            let state = self.state();
            state.ensure_idle()?;
            state.epoch
        };

        let enhanced = self.client.enhance_background(background).await?;

        let mut state = self.state();
        if state.epoch == epoch && !state.generating {
            state.options.background = enhanced.clone();
        }
        Ok(enhanced)
    }

    pub fn reset(&self) {
        let mut state = self.state();
        info!("session {}: reset", self.id);
        state.epoch += 1;
        state.stage = Stage::Idle;
        state.analyzing = false;
        state.generating = false;
        state.model_image = None;
        state.product_image = None;
        state.outfit_description.clear();
        state.description_source = None;
        state.analysis_error = None;
        state.result = GenerationResult::default();
    }

    /// Checks preconditions, clears the previous result and freezes the inputs.
    /// No backend call happens unless this succeeds.
    pub fn begin_generation(&self) -> Result<GenerationRequest, StudioError> {
        let mut state = self.state();
        state.ensure_idle()?;

        let model_image = state.model_image.clone().ok_or_else(|| {
            StudioError::Validation("Please upload the model image".to_string())
        })?;
        let product_image = state.product_image.clone().ok_or_else(|| {
            StudioError::Validation("Please upload the product image".to_string())
        })?;
        if state.outfit_description.trim().is_empty() {
            return Err(StudioError::Validation(
                "Please analyze the product before generating images".to_string(),
            ));
        }

        state.epoch += 1;
        state.generating = true;
        state.stage = Stage::Generating;
        state.result = GenerationResult {
            running: true,
            brand: Some(state.options.brand.clone()),
            progress: "Starting...".to_string(),
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        Ok(GenerationRequest {
            epoch: state.epoch,
            model_image,
            product_image,
            outfit_description: state.outfit_description.clone(),
            background: state.options.effective_background(),
            aspect_ratio: state.options.aspect_ratio,
            camera_angles: state.options.selected_angles(),
        })
    }

    /// Runs both branches to completion and marks the session completed.
    pub async fn run_generation(&self, request: GenerationRequest) {
        info!(
            "session {}: generating poster and {} model images",
            self.id,
            request.camera_angles.len()
        );

        let outcome = AssertUnwindSafe(async {
            tokio::join!(
                self.poster_branch(&request),
                self.variation_branch(&request)
            );
        })
        .catch_unwind()
        .await;

        let epoch = request.epoch;
        self.publish(epoch, |state| {
            if outcome.is_err() {
                state.result.fatal_error =
                    Some("An unexpected error occurred during generation".to_string());
            }
            state.result.running = false;
            state.result.progress.clear();
            state.result.finished_at = Some(Utc::now());
            state.generating = false;
            state.stage = Stage::Completed;
        });

        if outcome.is_err() {
            error!("session {}: generation aborted by an unexpected failure", self.id);
        } else {
            info!("session {}: generation finished", self.id);
        }
    }

    pub async fn generate(&self) -> Result<(), StudioError> {
        let request = self.begin_generation()?;
        self.run_generation(request).await;
        Ok(())
    }

    async fn poster_branch(&self, request: &GenerationRequest) {
        let epoch = request.epoch;
        let product = request.product_image.payload();

        let outcome = async {
            self.set_progress(epoch, "Generating poster...");
            let poster = self.client.synthesize_poster(&product).await?;
            self.publish(epoch, |state| state.result.poster = Some(poster));

            self.set_progress(epoch, "Writing caption...");
            let ad_copy = self
                .client
                .write_ad_copy(std::slice::from_ref(&product))
                .await?;
            self.publish(epoch, |state| state.result.ad_copy = Some(ad_copy));
            Ok::<(), StudioError>(())
        }
        .await;

        if let Err(e) = outcome {
            error!("session {}: poster branch failed: {}", self.id, e);
            self.publish(epoch, |state| {
                state
                    .result
                    .errors
                    .push(format!("Poster generation failed: {}", e.message()))
            });
        }
    }

    async fn variation_branch(&self, request: &GenerationRequest) {
        let epoch = request.epoch;
        let total = request.camera_angles.len();
        if total == 0 {
            return;
        }
        self.set_progress(epoch, &format!("Generating {} model images...", total));

        let finished = AtomicUsize::new(0);
        let calls = request
            .camera_angles
            .iter()
            .enumerate()
            .map(|(index, angle)| {
                let finished = &finished;
                async move {
                    self.set_progress(
                        epoch,
                        &format!("Generating image {}/{}...", index + 1, total),
                    );
                    let outcome = self
                        .client
                        .synthesize_variation(
                            &request.model_image,
                            &request.outfit_description,
                            &request.background,
                            request.aspect_ratio,
                            angle,
                        )
                        .await;
                    let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
                    self.set_progress(epoch, &format!("Finished {}/{} model images", done, total));
                    (index, angle, outcome)
                }
            });

        // join_all yields in input order, whatever order the calls finish in
        let results = join_all(calls).await;

        let mut images = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (index, angle, outcome) in results {
            match outcome {
                Ok(image) => images.push(VariationImage {
                    index,
                    camera_angle: angle.clone(),
                    image,
                }),
                Err(e) => {
                    warn!("session {}: image {} failed: {}", self.id, index + 1, e);
                    failures.push(format!("#{} ({}): {}", index + 1, angle, e.message()));
                }
            }
        }

        let succeeded = images.len();
        self.publish(epoch, |state| {
            state.result.variations = images;
            if !failures.is_empty() {
                state.result.errors.push(format!(
                    "Model images: {} of {} generated; failed: {}",
                    succeeded,
                    total,
                    failures.join("; ")
                ));
            }
        });
    }

    fn set_progress(&self, epoch: u64, label: &str) {
        self.publish(epoch, |state| state.result.progress = label.to_string());
    }

    /// Applies `update` only if the session is still on `epoch`.
    fn publish(&self, epoch: u64, update: impl FnOnce(&mut StudioState)) -> bool {
        let mut state = self.state();
        if state.epoch != epoch {
            debug!(
                "session {}: dropping result from epoch {} (now {})",
                self.id, epoch, state.epoch
            );
            return false;
        }
        update(&mut state);
        true
    }
}
