//! # Pitchscope - Live Pitch Visualizer GUI
//!
//! The desktop front end for `pitchscope-core`. It opens the default
//! microphone, polls detected pitches once per frame and replays the active
//! visualizer's draw operations on an `iced` canvas.
//!
//! ## Architecture
//! - **Main Thread**: Iced application owning the session and the visualizer
//! - **Audio Thread**: CPAL callback running the pitch processor
//! - **Communication**: the core crate's one-way message channels
//! - **Updates**: timer subscription at the configured frame interval, active
//!   only while the render loop has not been cancelled

mod ui;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use iced::{self, Element, Size, Subscription, Theme, window};
use log::{info, warn};
use pitchscope_core::capture::CaptureError;
use pitchscope_core::config::PipelineConfig;
use pitchscope_core::dial::CircularVisualizer;
use pitchscope_core::render::DrawOp;
use pitchscope_core::scheduler::{FrameScheduler, Visualizer};
use pitchscope_core::session::Session;
use pitchscope_core::timeline::TimelineVisualizer;

use ui::main_display::{TOOLBAR_HEIGHT, create_main_view};

const INITIAL_WIDTH: f32 = 960.0;
const INITIAL_HEIGHT: f32 = 720.0;

/// Command line options.
#[derive(Parser, Debug)]
#[command(name = "pitchscope", version, about = "Live pitch visualizer")]
struct Cli {
    /// JSON file overriding the default pipeline settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Visualizer shown at startup
    #[arg(long, value_enum, default_value_t = View::Dial)]
    view: View,
}

/// Which visualizer is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum View {
    Dial,
    Timeline,
}

/// Main entry point.
///
/// Installs the logger, reads the command line and configuration, then
/// hands control to the Iced event loop.
pub fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let view = cli.view;

    info!("[MAIN] Starting Pitchscope ({view:?} view)");
    iced::application("Pitchscope", PitchscopeApp::update, PitchscopeApp::view)
        .subscription(PitchscopeApp::subscription)
        .theme(PitchscopeApp::theme)
        .window_size((INITIAL_WIDTH, INITIAL_HEIGHT))
        .run_with(move || (PitchscopeApp::new(config, view), iced::Task::none()))
        .map_err(|e| anyhow::anyhow!("GUI terminated with an error: {e}"))?;
    info!("[MAIN] Application finished");
    Ok(())
}

/// Application message types.
#[derive(Debug, Clone)]
pub enum Message {
    /// Frame timer tick
    Tick,
    /// The window changed size
    WindowResized(Size),
    /// Switch the visualizer on screen
    ShowView(View),
    /// Stop capture and the render loop
    Stop,
    /// Try to open the microphone again
    Retry,
}

/// Capture state as far as the UI is concerned.
#[derive(Debug)]
pub enum CaptureStatus {
    Running,
    Stopped,
    Failed(CaptureError),
}

/// Main application state.
pub struct PitchscopeApp {
    config: PipelineConfig,
    session: Option<Session>,
    scheduler: Option<FrameScheduler>,
    visualizer: Box<dyn Visualizer>,
    view: View,
    status: CaptureStatus,
    surface_size: Size,
    background: Vec<DrawOp>,
    foreground: Vec<DrawOp>,
    background_cache: iced::widget::canvas::Cache,
}

impl PitchscopeApp {
    fn new(config: PipelineConfig, view: View) -> Self {
        let mut app = Self {
            visualizer: make_visualizer(&config, view),
            config,
            session: None,
            scheduler: None,
            view,
            status: CaptureStatus::Stopped,
            surface_size: surface_size(Size::new(INITIAL_WIDTH, INITIAL_HEIGHT)),
            background: Vec::new(),
            foreground: Vec::new(),
            background_cache: iced::widget::canvas::Cache::new(),
        };
        app.redraw_background();
        app.start_capture();
        app
    }

    /// Opens the microphone and starts a render loop tied to the new session.
    fn start_capture(&mut self) {
        match Session::start(&self.config) {
            Ok(session) => {
                info!("[MAIN] Capture running at {} Hz", session.sample_rate());
                self.scheduler = Some(FrameScheduler::with_token(
                    self.config.frame_interval(),
                    session.token(),
                ));
                self.session = Some(session);
                self.status = CaptureStatus::Running;
            }
            Err(e) => {
                warn!("[MAIN] Could not start capture: {e}");
                self.status = CaptureStatus::Failed(e);
            }
        }
    }

    fn stop_capture(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
        self.scheduler = None;
        self.status = CaptureStatus::Stopped;
    }

    fn redraw_background(&mut self) {
        self.background = self
            .visualizer
            .resize(self.surface_size.width, self.surface_size.height);
        self.foreground.clear();
        self.background_cache.clear();
    }

    fn update(&mut self, message: Message) {
        match message {
            Message::Tick => self.on_tick(),
            Message::WindowResized(size) => {
                self.surface_size = surface_size(size);
                self.redraw_background();
            }
            Message::ShowView(view) => {
                if view != self.view {
                    info!("[MAIN] Switching to {view:?} view");
                    self.view = view;
                    self.visualizer = make_visualizer(&self.config, view);
                    self.redraw_background();
                }
            }
            Message::Stop => {
                info!("[MAIN] Stop requested");
                self.stop_capture();
            }
            Message::Retry => {
                info!("[MAIN] Retrying capture");
                self.stop_capture();
                self.start_capture();
            }
        }
    }

    fn on_tick(&mut self) {
        let (Some(session), Some(scheduler)) = (self.session.as_mut(), self.scheduler.as_mut()) else {
            return;
        };
        let now = session.clock().now_ms();
        let events = session.poll(now);
        // Only fresh pitches go to the visualizer; with none, it keeps its
        // last frame.
        if let Some(ops) = scheduler.tick(self.visualizer.as_mut(), events.last(), now) {
            self.foreground = ops;
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(self)
    }

    /// The frame timer runs only while the render loop is active; window
    /// resizes are always tracked.
    fn subscription(&self) -> Subscription<Message> {
        let resizes = window::resize_events().map(|(_id, size)| Message::WindowResized(size));
        match &self.scheduler {
            Some(scheduler) if scheduler.is_active() => Subscription::batch([
                iced::time::every(scheduler.interval()).map(|_| Message::Tick),
                resizes,
            ]),
            _ => resizes,
        }
    }

    fn theme(&self) -> Theme {
        Theme::Light
    }
}

fn make_visualizer(config: &PipelineConfig, view: View) -> Box<dyn Visualizer> {
    match view {
        View::Dial => Box::new(CircularVisualizer::new(config.dial.clone())),
        View::Timeline => Box::new(TimelineVisualizer::new(config.timeline.clone())),
    }
}

/// Drawing area left for the visualizer once the toolbar is placed.
fn surface_size(window: Size) -> Size {
    Size::new(window.width, (window.height - TOOLBAR_HEIGHT).max(1.0))
}
