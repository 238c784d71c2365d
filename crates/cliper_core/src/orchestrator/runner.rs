//! Job runner that executes steps for every video of a job.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::events::{Event, EventSink};
use crate::logging::{JobLogger, LogConfig, LogLevel};
use crate::models::{JobSpec, JobStatus};
use crate::stages::Collaborators;
use crate::store::StateStore;
use crate::workspace::RunWorkspace;

use super::errors::{ConfigError, StepResult};
use super::step::PipelineStep;
use super::steps::build_pipeline;
use super::types::{Emitter, StepContext, StepOutcome};

/// Runs jobs against a state store, reporting through an event sink.
///
/// The runner is synchronous: `run_job` returns when the job has finished.
/// It holds no per-job state, so one runner can serve many jobs, and it
/// is `Send + Sync` so `spawn` can move work off the calling thread.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use cliper_core::events::MemorySink;
/// use cliper_core::models::{JobSpec, JobStep};
/// use cliper_core::orchestrator::JobRunner;
/// use cliper_core::stages::Collaborators;
/// use cliper_core::store::JsonStateStore;
///
/// # fn collaborators() -> Collaborators { unimplemented!() }
/// let store = Arc::new(JsonStateStore::open("output/state.json"));
/// let sink = Arc::new(MemorySink::new());
/// let runner = JobRunner::new(store, collaborators(), sink.clone());
///
/// let job = JobSpec::new(JobSpec::new_job_id(), ["talk"], [JobStep::Transcribe]);
/// let status = runner.run_job(&job).unwrap();
/// println!("{} ({} events)", status.state(), sink.len());
/// ```
pub struct JobRunner {
    store: Arc<dyn StateStore>,
    collaborators: Collaborators,
    sink: Arc<dyn EventSink>,
    workspace: RunWorkspace,
    log_config: LogConfig,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn StateStore>,
        collaborators: Collaborators,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            collaborators,
            sink,
            workspace: RunWorkspace::default(),
            log_config: LogConfig::default(),
        }
    }

    /// Use a different run workspace layout (builder pattern).
    pub fn with_workspace(mut self, workspace: RunWorkspace) -> Self {
        self.workspace = workspace;
        self
    }

    /// Configure the per-job log file (builder pattern).
    pub fn with_logger_config(mut self, config: LogConfig) -> Self {
        self.log_config = config;
        self
    }

    pub fn workspace(&self) -> &RunWorkspace {
        &self.workspace
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Run a job to completion.
    ///
    /// Emits `JobStatus(running)` first. A job that cannot run at all (a
    /// `download` step, invalid settings) is rejected with `ConfigError`
    /// right after that event, before any video is touched. Every other
    /// failure ends the job as `failed` and is reported through events and
    /// the returned status, never as an `Err`.
    pub fn run_job(&self, job: &JobSpec) -> Result<JobStatus, ConfigError> {
        let job_id = job.job_id();
        let mut status = JobStatus::new(job.progress_total());
        status.mark_started();

        let mut events = Emitter::new(
            job_id,
            Arc::clone(&self.sink),
            JobLogger::detached(job_id, self.log_config.clone()),
        );
        events.emit(Event::job_status(job_id, status.state(), None));

        let pipeline = job
            .validate()
            .and_then(|()| build_pipeline(job.steps()))
            .map_err(|e| {
                tracing::warn!(job_id = %job_id, "Rejected job: {}", e);
                e
            })?;

        match self.run_videos(job, &pipeline, &mut status, &mut events) {
            Ok(()) => {
                status.mark_succeeded();
                events.logger().success("Job completed");
                events.emit(Event::job_status(job_id, status.state(), None));
            }
            Err(e) => {
                let message = e.to_string();
                status.mark_failed(message.clone());
                events.log(None, LogLevel::Error, format!("Job failed: {}", message));
                events.emit(Event::job_status(job_id, status.state(), Some(message)));
            }
        }

        events.logger().close();
        Ok(status)
    }

    /// Run a job on a background thread.
    pub fn spawn(
        self: &Arc<Self>,
        job: JobSpec,
    ) -> io::Result<JoinHandle<Result<JobStatus, ConfigError>>> {
        let runner = Arc::clone(self);
        thread::Builder::new()
            .name(format!("job-{}", job.job_id()))
            .spawn(move || runner.run_job(&job))
    }

    fn run_videos(
        &self,
        job: &JobSpec,
        pipeline: &[Box<dyn PipelineStep>],
        status: &mut JobStatus,
        events: &mut Emitter,
    ) -> StepResult<()> {
        let job_id = job.job_id();
        let run_dir =
            self.workspace
                .ensure_run_output_dir(self.store.as_ref(), job_id, job.video_ids())?;
        self.attach_job_log(events, &run_dir);
        events.logger().phase(&format!("Job {}", job_id));
        events.logger().info(&format!(
            "{} video(s), steps: {}",
            job.video_ids().len(),
            pipeline
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        let events = &*events;
        for video_id in job.video_ids() {
            let video_run_dir = self.workspace.ensure_video_run_dir(&run_dir, video_id)?;
            let ctx = StepContext {
                job_id,
                video_id,
                run_dir: &run_dir,
                video_run_dir: &video_run_dir,
                settings: job.settings(),
                store: self.store.as_ref(),
                collaborators: &self.collaborators,
                workspace: &self.workspace,
                events,
            };

            for step in pipeline {
                status.set_label(format!("{} ({})", step.name(), video_id));
                events.emit(Event::progress(
                    job_id,
                    Some(video_id),
                    status.progress_current(),
                    status.progress_total(),
                    status.label(),
                ));

                run_step(step.as_ref(), &ctx)?;

                status.advance();
                events.emit(Event::progress(
                    job_id,
                    Some(video_id),
                    status.progress_current(),
                    status.progress_total(),
                    status.label(),
                ));
            }
        }

        Ok(())
    }

    fn attach_job_log(&self, events: &mut Emitter, run_dir: &Path) {
        match JobLogger::new(events.job_id(), run_dir, self.log_config.clone()) {
            Ok(logger) => events.set_logger(logger),
            Err(e) => tracing::warn!(
                "Could not open job log in {}: {}; logging to tracing only",
                run_dir.display(),
                e
            ),
        }
    }
}

fn run_step(step: &dyn PipelineStep, ctx: &StepContext<'_>) -> StepResult<()> {
    let logger = ctx.events.logger();
    logger.phase(&format!("{} ({})", step.description(), ctx.video_id));
    ctx.info(step.start_message());

    logger.debug(&format!("Validating input for '{}'", step.name()));
    step.validate_input(ctx)?;

    match step.execute(ctx)? {
        StepOutcome::Success => {
            logger.debug(&format!("Validating output for '{}'", step.name()));
            step.validate_output(ctx)?;
            logger.debug(&format!("{} completed", step.name()));
        }
        StepOutcome::Skipped(reason) => {
            logger.debug(&format!("{} skipped: {}", step.name(), reason));
        }
    }
    Ok(())
}
