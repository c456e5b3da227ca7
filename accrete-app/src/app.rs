//! Dataset session and the command implementations behind the CLI.

use crate::errors::AppError;
use accrete_core::{PatchConfig, PatchedFrame, PatchingService, frame_instances};
use accrete_data::{CachedSource, DiskDataset, FrameSource, InstanceId};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Which instances a `patch` command should replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceSelection {
    /// Every instance the index places in the frame.
    All,
    Listed(Vec<InstanceId>),
}

/// A dataset opened for one invocation.
///
/// Reads go through a cache because grouping a scene and then accumulating
/// from it loads the same frames more than once.
pub struct App {
    dataset: CachedSource<DiskDataset>,
    config: PatchConfig,
}

impl App {
    pub fn new(dataset: DiskDataset, config: PatchConfig) -> Self {
        Self {
            dataset: CachedSource::new(dataset),
            config,
        }
    }

    fn service(&self) -> Result<PatchingService<'_, CachedSource<DiskDataset>>, AppError> {
        Ok(PatchingService::new(&self.dataset, self.config.clone())?)
    }

    pub fn list_scenes<W: Write>(&self, out: &mut W) -> Result<(), AppError> {
        for scene in self.dataset.scenes()? {
            writeln!(out, "{}", scene)?;
        }
        Ok(())
    }

    pub fn list_frames<W: Write>(&self, scene: &str, out: &mut W) -> Result<(), AppError> {
        for frame in self.dataset.frames(scene)? {
            writeln!(out, "{}", frame)?;
        }
        Ok(())
    }

    /// One line per instance in the frame: id, points here, frames in the scene.
    pub fn list_instances<W: Write>(
        &self,
        scene: &str,
        frame: &str,
        out: &mut W,
    ) -> Result<(), AppError> {
        let service = self.service()?;
        let grouped = service.group(scene)?;
        let present = frame_instances(
            &self.dataset,
            scene,
            frame,
            &grouped,
            &self.config.excluded_classes,
        )?;

        if present.is_empty() {
            writeln!(out, "No instances in {}/{}", scene, frame)?;
            return Ok(());
        }
        for (instance, points) in present {
            let info = service.instance_info(instance, &grouped);
            writeln!(
                out,
                "{:>6}  {:>7} points  {:>4} frames",
                instance.label(),
                points,
                info.frames
            )?;
        }
        Ok(())
    }

    /// Print the scene's instance index as pretty JSON.
    pub fn print_group<W: Write>(&self, scene: &str, out: &mut W) -> Result<(), AppError> {
        let grouped = self.service()?.group(scene)?;
        serde_json::to_writer_pretty(&mut *out, &grouped)?;
        writeln!(out)?;
        Ok(())
    }

    /// Patch the selected instances into `frame` and report the point counts.
    ///
    /// With `save` the result is written under the dataset's patched tree.
    pub fn patch<W: Write>(
        &self,
        scene: &str,
        frame: &str,
        selection: &InstanceSelection,
        save: bool,
        out: &mut W,
    ) -> Result<PatchedFrame, AppError> {
        let service = self.service()?;
        let grouped = service.group(scene)?;

        let instances: Vec<InstanceId> = match selection {
            InstanceSelection::All => frame_instances(
                &self.dataset,
                scene,
                frame,
                &grouped,
                &self.config.excluded_classes,
            )?
            .into_keys()
            .collect(),
            InstanceSelection::Listed(ids) => ids.clone(),
        };
        if instances.is_empty() {
            warn!("No instances selected for {}/{}", scene, frame);
        }

        let mut report = |fraction: f32, message: &str| {
            info!("[{:>3.0}%] {}", fraction * 100.0, message);
        };
        let patched = service.patch_frame(scene, frame, &instances, &grouped, Some(&mut report))?;
        debug!(
            "{} frames held in the dataset cache",
            self.dataset.cached_frame_count()
        );

        writeln!(out, "Scene: {}  Frame: {}", scene, frame)?;
        writeln!(
            out,
            "Strategy: {} (step {})",
            service.strategy_name(),
            self.config.step
        )?;
        writeln!(out, "Patched: {}", join_ids(&patched.patched))?;
        if !patched.skipped.is_empty() {
            writeln!(out, "Not indexed: {}", join_ids(&patched.skipped))?;
        }
        if !patched.absent.is_empty() {
            writeln!(out, "Not in frame: {}", join_ids(&patched.absent))?;
        }
        writeln!(out, "Points: {} → {}", patched.original_len, patched.len())?;

        if save {
            let path: PathBuf = service.save_patched_frame(self.dataset.inner(), &patched)?;
            writeln!(out, "Saved to {}", path.display())?;
        }
        Ok(patched)
    }
}

fn join_ids(ids: &[InstanceId]) -> String {
    if ids.is_empty() {
        return "none".to_string();
    }
    ids.iter()
        .map(InstanceId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
