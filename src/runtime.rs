use crate::api::client::SongInfoClient;
use crate::api::models::{ArtworkBlob, PollOutcome};
use crate::config::WidgetConfig;
use crate::error::AppResult;
use crate::events::RenderSignal;
use crate::sync::poller::Command;
use crate::view::headless::HeadlessRenderer;
use crate::view::render::RenderPort;
use crate::widget::NowPlayingWidget;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// Result of a command run off the widget's loop.
#[derive(Debug)]
enum NetworkResult {
    Poll(PollOutcome),
    Artwork(AppResult<ArtworkBlob>),
}

enum Wake {
    Network(NetworkResult),
    Signal(RenderSignal),
    Timer,
    Interrupt,
}

fn spawn_command(
    client: &Arc<SongInfoClient>,
    results: &mpsc::UnboundedSender<NetworkResult>,
    command: Command,
) -> AbortHandle {
    let client = Arc::clone(client);
    let results = results.clone();
    let handle = tokio::spawn(async move {
        let result = match command {
            Command::PollSongInfo { cursor } => {
                NetworkResult::Poll(client.poll(cursor.as_deref()).await)
            }
            Command::FetchArtwork { url } => {
                NetworkResult::Artwork(client.fetch_artwork(&url).await)
            }
        };
        // The loop is gone once the widget is torn down.
        let _ = results.send(result);
    });
    handle.abort_handle()
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Drives `widget` until it is torn down or the process is interrupted, then
/// hands the torn-down widget back.
///
/// Everything touching the widget happens on this task; network requests run
/// on spawned tasks and only their results come back here.
pub async fn drive<R: RenderPort>(
    mut widget: NowPlayingWidget<R>,
    client: Arc<SongInfoClient>,
    mut signals: mpsc::UnboundedReceiver<RenderSignal>,
) -> NowPlayingWidget<R> {
    let origin = Instant::now();
    let (results_tx, mut results) = mpsc::unbounded_channel();
    let mut tasks: Vec<AbortHandle> = Vec::new();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut interrupted = false;

    widget.start();

    loop {
        tasks.retain(|task| !task.is_finished());
        for command in widget.take_commands() {
            tasks.push(spawn_command(&client, &results_tx, command));
        }
        if widget.is_torn_down() {
            break;
        }

        let deadline = widget.next_deadline().map(|at| origin + at);
        let wake = tokio::select! {
            Some(result) = results.recv() => Wake::Network(result),
            Some(signal) = signals.recv() => Wake::Signal(signal),
            _ = wait_until(deadline) => Wake::Timer,
            result = &mut interrupt, if !interrupted => {
                interrupted = true;
                if let Err(e) = result {
                    log::error!("Failed to listen for Ctrl-C: {}", e);
                    continue;
                }
                Wake::Interrupt
            }
        };

        widget.advance_to(origin.elapsed());
        match wake {
            Wake::Network(NetworkResult::Poll(outcome)) => widget.on_poll_outcome(outcome),
            Wake::Network(NetworkResult::Artwork(result)) => widget.on_artwork(result),
            Wake::Signal(signal) => widget.on_signal(signal),
            Wake::Timer => {}
            Wake::Interrupt => {
                log::info!("Interrupted");
                widget.on_signal(RenderSignal::Teardown);
            }
        }
    }

    for task in tasks {
        task.abort();
    }
    log::info!(
        "Widget stopped, {} artwork resources still held",
        widget.live_artwork()
    );
    widget
}

/// Builds the client, the headless view and the widget from `config`, then
/// drives them on the current task.
pub async fn run_headless(config: WidgetConfig) -> AppResult<()> {
    let client = Arc::new(SongInfoClient::new(&config)?);
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let render = HeadlessRenderer::new(&config).with_signals(signal_tx);
    let widget = NowPlayingWidget::new(config, render)?;

    log::info!("Polling {}", client.info_url(None));
    drive(widget, client, signal_rx).await;
    Ok(())
}
