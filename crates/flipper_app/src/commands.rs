use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use bytes::Bytes;
use tokio::sync::mpsc;

use flipper_core::templates::template_options;
use flipper_core::{BatchFilter, BatchId, JobId, JobStatus, Phase, ServiceScope, TemplateId};
use flipper_engine::{
    BatchContentController, BatchCountersController, CountersEvent, JobLifecycleController,
    JobSummaryController, JobSummaryEvent, LiveEvent, QueueStatsController, QueueStatsEvent,
    QuickTranscodeController, ServiceApi,
};
use flipper_logging::{flipper_info, flipper_warn};

use crate::config::ConsoleConfig;
use crate::render;

const REFRESH: Duration = Duration::from_millis(200);

pub async fn batch(
    api: Arc<dyn ServiceApi>,
    config: &ConsoleConfig,
    batch_id: BatchId,
    filter: BatchFilter,
    pages: usize,
) -> anyhow::Result<()> {
    let mut controller = BatchContentController::new(api, config.paging_settings());
    controller.load_page(batch_id, filter).await;
    tokio::select! {
        _ = read_pages(&mut controller, pages) => {}
        _ = tokio::signal::ctrl_c() => {
            flipper_info!("interrupted, showing what was read so far");
        }
    }
    controller.teardown();

    let view = controller.view();
    print!("{}", render::batch_page(&view));
    if let Some(error) = view.last_error {
        bail!("listing batch {batch_id} failed: {error}");
    }
    Ok(())
}

async fn read_pages(controller: &mut BatchContentController, pages: usize) {
    controller.settled().await;
    for _ in 1..pages {
        if !controller.view().more_available {
            break;
        }
        controller.load_more().await;
        controller.settled().await;
    }
}

pub async fn counters(
    api: Arc<dyn ServiceApi>,
    config: &ConsoleConfig,
    batch_id: BatchId,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<CountersEvent>();
    let mut counters = BatchCountersController::for_batch(api).with_events(tx);
    counters.track(batch_id, config.poll_settings().counters_interval)?;

    let outcome = loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(LiveEvent::Refreshed(summary)) => {
                    println!("{}", render::counters_line(&summary));
                    if summary.is_settled() {
                        break Ok(());
                    }
                }
                Some(LiveEvent::Failed(message)) => break Err(message),
                None => break Ok(()),
            },
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };
    counters.teardown();
    outcome.map_err(|message| anyhow::anyhow!("reading counters of {batch_id} failed: {message}"))
}

/// Prints queue sizes and job totals as they change, until interrupted.
pub async fn dashboard(api: Arc<dyn ServiceApi>, config: &ConsoleConfig) -> anyhow::Result<()> {
    let poll = config.poll_settings();
    let (queue_tx, mut queue_rx) = mpsc::unbounded_channel::<QueueStatsEvent>();
    let (totals_tx, mut totals_rx) = mpsc::unbounded_channel::<JobSummaryEvent>();
    let mut queues = QueueStatsController::for_queues(Arc::clone(&api)).with_events(queue_tx);
    let mut totals = JobSummaryController::for_job_totals(api).with_events(totals_tx);
    queues.track(ServiceScope, poll.queue_stats_interval)?;
    totals.track(ServiceScope, poll.job_summary_interval)?;

    let (mut last_queues, mut last_totals) = (String::new(), String::new());
    let outcome = loop {
        tokio::select! {
            event = queue_rx.recv() => match event {
                Some(LiveEvent::Refreshed(stats)) => {
                    let line = render::queue_line(&stats);
                    if line != last_queues {
                        println!("{line}");
                        last_queues = line;
                    }
                }
                Some(LiveEvent::Failed(message)) => break Err(format!("queue stats: {message}")),
                None => break Ok(()),
            },
            event = totals_rx.recv() => match event {
                Some(LiveEvent::Refreshed(summary)) => {
                    let line = render::job_totals_line(&summary);
                    if line != last_totals {
                        println!("{line}");
                        last_totals = line;
                    }
                }
                Some(LiveEvent::Failed(message)) => break Err(format!("job totals: {message}")),
                None => break Ok(()),
            },
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };
    queues.teardown();
    totals.teardown();
    outcome.map_err(|message| anyhow::anyhow!("dashboard refresh failed: {message}"))
}

pub async fn watch(
    api: Arc<dyn ServiceApi>,
    config: &ConsoleConfig,
    job_id: JobId,
    template: Option<TemplateId>,
) -> anyhow::Result<()> {
    let steps = match template {
        Some(template_id) => {
            let templates = api.job_templates().await?;
            match templates.into_iter().find(|template| template.id == template_id) {
                Some(template) => template.steps,
                None => {
                    flipper_warn!("template {} not found, steps stay unlabeled", template_id);
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut job = JobLifecycleController::new(api).with_events(tx);
    job.track(job_id, config.poll_settings().job_interval)?;

    let mut last_line = String::new();
    let outcome = loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(LiveEvent::Refreshed(snapshot)) => {
                    let line = render::job_line(&snapshot);
                    if line != last_line {
                        println!("{line}");
                        print!("{}", render::job_steps(&steps, snapshot.completed_steps));
                        last_line = line;
                    }
                    if snapshot.status.is_terminal() {
                        break Ok(());
                    }
                }
                Some(LiveEvent::Failed(message)) => break Err(message),
                None => break Ok(()),
            },
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };
    job.teardown();
    outcome.map_err(|message| anyhow::anyhow!("following job {job_id} failed: {message}"))
}

pub async fn quick(
    api: Arc<dyn ServiceApi>,
    config: &ConsoleConfig,
    file: &Path,
    template_id: TemplateId,
) -> anyhow::Result<()> {
    if template_id.is_nil() {
        bail!("pick a job template; the nil id means none");
    }
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;

    let mut controller = QuickTranscodeController::new(api, config.poll_settings());
    controller.submit(template_id, Bytes::from(data)).await;

    let mut last_line = String::new();
    let outcome = loop {
        let view = controller.view();
        let line = render::quick_line(&view);
        if line != last_line {
            println!("{line}");
            last_line = line;
        }
        if view.halted {
            break Err(view.last_error.unwrap_or_default());
        }
        if view.phase == Phase::Idle {
            // Rejected before anything was sent, e.g. an empty file.
            break Err(view.last_error.unwrap_or_default());
        }
        if view.phase == Phase::AnalysisReady {
            if let Some(info) = &view.analysis {
                print!("{}", render::analysis_block(info));
            }
            break Ok(());
        }
        if view.phase == Phase::Polling && !controller.job_view().polling {
            match view.job_status {
                Some(JobStatus::Completed) => {
                    println!("job finished without an analysis result");
                    break Ok(());
                }
                Some(status) => break Err(format!("job ended as {status}")),
                None => break Err("job tracking stopped".to_string()),
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(REFRESH) => {}
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };
    controller.teardown();
    outcome.map_err(|message| anyhow::anyhow!("quick transcode of {} failed: {message}", file.display()))
}

pub async fn templates(api: Arc<dyn ServiceApi>) -> anyhow::Result<()> {
    let templates = api.job_templates().await?;
    print!("{}", render::template_list(&template_options(&templates)));
    Ok(())
}

