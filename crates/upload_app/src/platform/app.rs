use std::io::{self, BufRead};
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use upload_core::{update, AppState, AppViewModel, Msg, Phase, Status};
use upload_engine::{check_health, EngineHandle};
use upload_logging::{upload_info, upload_warn};

use super::cli::{Cli, Command};
use super::config::AppConfig;
use super::effects::EffectRunner;
use super::input::{parse_input, Input, HELP};
use super::logging::{self, LogDestination};
use super::selection::load_selected_file;
use super::ui::render::render;
use super::ui::surface::{Surface, SurfaceCommand, TerminalSurface};

pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::initialize(LogDestination::from_flag(cli.log_file), cli.verbose);

    let config =
        AppConfig::load(cli.config.as_deref())?.with_overrides(cli.endpoint, cli.output_dir);
    upload_info!("Endpoint {}", config.endpoint);

    match cli.command {
        Command::Upload { image, phase } => run_single_upload(&config, &image, phase),
        Command::Interactive => run_interactive(&config),
        Command::Health => run_health(&config),
    }
}

fn run_single_upload(config: &AppConfig, image: &Path, phase: Phase) -> anyhow::Result<ExitCode> {
    let file = load_selected_file(image)
        .with_context(|| format!("cannot use {} as the image", image.display()))?;
    let engine = EngineHandle::new(config.engine_config()?);
    let mut controller = Controller::new(engine, TerminalSurface::new(io::stdout()));

    controller.dispatch(Msg::FileSelected(Some(file)));
    controller.dispatch(Msg::PhaseSelected(phase));
    controller.dispatch(Msg::SubmitClicked);
    controller.run_until_idle();

    Ok(if controller.view().status == Status::Done {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_interactive(config: &AppConfig) -> anyhow::Result<ExitCode> {
    let engine = EngineHandle::new(config.engine_config()?);
    let mut controller = Controller::new(engine, TerminalSurface::new(io::stdout()));
    println!("{HELP}");
    controller.render_all();

    let quit = Arc::new(AtomicBool::new(false));
    spawn_input_thread(controller.sender(), quit.clone());
    while !quit.load(Ordering::Relaxed) {
        controller.pump(Duration::from_millis(100));
    }
    controller.drain();
    if controller.view().busy {
        controller.dispatch(Msg::CancelClicked);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_health(config: &AppConfig) -> anyhow::Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    match runtime.block_on(check_health(&config.upload_settings())) {
        Ok(report) => {
            println!("{}: {}", report.url, report.status);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("Health check failed: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Turns stdin lines into page events. Sets `quit` on `quit` or end of input.
fn spawn_input_thread(msg_tx: mpsc::Sender<Msg>, quit: Arc<AtomicBool>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let msg = match parse_input(&line) {
                Ok(Input::Open(path)) => match load_selected_file(&path) {
                    Ok(file) => Msg::FileSelected(Some(file)),
                    Err(err) => {
                        upload_warn!("Cannot open {:?}: {:#}", path, err);
                        eprintln!("{err:#}");
                        Msg::FileSelected(None)
                    }
                },
                Ok(Input::Phase(phase)) => Msg::PhaseSelected(phase),
                Ok(Input::Submit) => Msg::SubmitClicked,
                Ok(Input::Cancel) => Msg::CancelClicked,
                Ok(Input::Help) => {
                    println!("{HELP}");
                    continue;
                }
                Ok(Input::Quit) => break,
                Ok(Input::Empty) => continue,
                Err(message) => {
                    eprintln!("{message}");
                    continue;
                }
            };
            if msg_tx.send(msg).is_err() {
                break;
            }
        }
        quit.store(true, Ordering::Relaxed);
    });
}

/// Owns the controller state and routes messages, effects and renders.
pub struct Controller<S: Surface> {
    state: AppState,
    surface: S,
    runner: EffectRunner,
    last_view: Option<AppViewModel>,
    msg_tx: mpsc::Sender<Msg>,
    msg_rx: mpsc::Receiver<Msg>,
}

impl<S: Surface> Controller<S> {
    pub fn new(engine: EngineHandle, surface: S) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel();
        let runner = EffectRunner::new(engine, msg_tx.clone());
        let state = AppState::new();
        // Changes render as diffs against the blank page; `render_all` paints it in full.
        let last_view = Some(state.view());
        Self {
            state,
            surface,
            runner,
            last_view,
            msg_tx,
            msg_rx,
        }
    }

    pub fn sender(&self) -> mpsc::Sender<Msg> {
        self.msg_tx.clone()
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn render_all(&mut self) {
        let view = self.state.view();
        self.apply(render(None, &view));
        self.last_view = Some(view);
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        let view = state.view();
        self.state = state;

        if !effects.is_empty() {
            self.runner.enqueue(effects);
        }
        if was_dirty {
            self.apply(render(self.last_view.as_ref(), &view));
            self.last_view = Some(view);
        }
    }

    /// Dispatches at most one queued message. Returns whether one arrived in time.
    pub fn pump(&mut self, timeout: Duration) -> bool {
        match self.msg_rx.recv_timeout(timeout) {
            Ok(msg) => {
                self.dispatch(msg);
                true
            }
            Err(_) => false,
        }
    }

    pub fn drain(&mut self) {
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.dispatch(msg);
        }
    }

    /// Blocks until no upload is in flight.
    pub fn run_until_idle(&mut self) {
        while self.state.in_flight().is_some() {
            match self.msg_rx.recv() {
                Ok(msg) => self.dispatch(msg),
                Err(_) => break,
            }
        }
    }

    fn apply(&mut self, commands: Vec<SurfaceCommand>) {
        for command in commands {
            self.surface.apply(command);
        }
    }
}
