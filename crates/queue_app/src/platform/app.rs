use std::sync::{mpsc, Arc};
use std::time::Instant;

use anyhow::Context;
use queue_core::{update, JobId, Msg, PendingJob, SyncState, Timestamp};
use queue_engine::{EngineEvent, EngineHandle, EventSink};
use queue_logging::{queue_debug, queue_info, queue_warn};

use super::commands::{self, Command, HELP};
use super::config::{self, AppConfig};
use super::effects::{engine_msg, Backend, EffectRunner};
use super::logging;
use super::timers::SessionClock;
use super::view::{ConsoleView, ViewSink};

/// Everything the main loop wakes up for, besides timers.
enum Inbound {
    Command(Command),
    Engine(EngineEvent),
}

struct InboxSink {
    tx: mpsc::Sender<Inbound>,
}

impl EventSink for InboxSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(Inbound::Engine(event));
    }
}

pub fn run_app() -> anyhow::Result<()> {
    let config_path = config::config_path();
    let loaded = config::load(&config_path);
    let app_config = match &loaded {
        Ok(Some(found)) => found.clone(),
        Ok(None) | Err(_) => AppConfig::default(),
    };
    logging::initialize(app_config.log_destination);
    match loaded {
        Ok(Some(_)) => queue_info!("Loaded config from {:?}", config_path),
        Ok(None) => queue_info!("No config at {:?}, using defaults", config_path),
        Err(err) => queue_warn!("{}; using defaults", err),
    }

    let (tx, rx) = mpsc::channel::<Inbound>();
    let engine = EngineHandle::new(
        app_config.api_settings(),
        Arc::new(InboxSink { tx: tx.clone() }),
    )
    .context("starting the download engine")?;
    commands::spawn_stdin_reader(tx, Inbound::Command).context("starting the stdin reader")?;

    println!("queue_sync watching {}", app_config.base_url);
    println!("{HELP}");

    let clock = SessionClock::start();
    let runner = EffectRunner::new(engine, ConsoleView::stdout());
    let state = SyncState::with_settings(app_config.sync_settings());
    run_loop(state, runner, &rx, clock);
    queue_info!("queue_sync exiting");
    Ok(())
}

/// Single-threaded event loop: waits for input or the next timer deadline,
/// feeds the core, executes what it returns.
fn run_loop<B: Backend, V: ViewSink>(
    mut state: SyncState,
    mut runner: EffectRunner<B, V>,
    rx: &mpsc::Receiver<Inbound>,
    clock: SessionClock,
) {
    // The panel starts open, as if the user had just clicked it.
    state = dispatch(state, Msg::ViewOpened { now: clock.at(Instant::now()) }, &mut runner);

    loop {
        let received = match runner.timers().next_deadline() {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                rx.recv_timeout(wait)
            }
            None => rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(Inbound::Command(Command::Quit)) => break,
            Ok(Inbound::Command(Command::Help)) => println!("{HELP}"),
            Ok(Inbound::Command(Command::Status)) => {
                let view = state.view();
                runner.view_mut().on_status(&view);
            }
            Ok(Inbound::Command(command)) => {
                let msg = command_msg(command, clock.at(Instant::now()));
                state = dispatch(state, msg, &mut runner);
            }
            Ok(Inbound::Engine(event)) => {
                let msg = engine_msg(event, clock.at(Instant::now()));
                state = dispatch(state, msg, &mut runner);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                queue_warn!("All input sources closed");
                break;
            }
        }

        let now = Instant::now();
        for timer in runner.timers_mut().pop_due(now) {
            queue_debug!("Timer {:?} fired", timer);
            let msg = Msg::TimerFired {
                timer,
                now: clock.at(now),
            };
            state = dispatch(state, msg, &mut runner);
        }
    }
}

fn dispatch<B: Backend, V: ViewSink>(
    state: SyncState,
    msg: Msg,
    runner: &mut EffectRunner<B, V>,
) -> SyncState {
    let (state, effects) = update(state, msg);
    runner.run(effects, Instant::now());
    state
}

fn command_msg(command: Command, now: Timestamp) -> Msg {
    match command {
        Command::Open => Msg::ViewOpened { now },
        Command::Close => Msg::ViewClosed,
        Command::Show => Msg::PageVisibilityChanged { visible: true, now },
        Command::Hide => Msg::PageVisibilityChanged {
            visible: false,
            now,
        },
        Command::Refresh => Msg::ManualRefresh { now },
        Command::Download { id, title } => Msg::DownloadRequested {
            job: PendingJob::new(id, title),
            now,
        },
        Command::Fail { id } => Msg::OptimisticFailed { id: JobId::new(id) },
        Command::Cancel { id } => Msg::CancelRequested { id: JobId::new(id) },
        Command::Clear => Msg::ClearCompletedRequested,
        Command::Status | Command::Help | Command::Quit => Msg::NoOp,
    }
}
