use std::collections::HashSet;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context as _, anyhow};
use clap::Parser;
use log::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use sector_caster::camera::Camera;
use sector_caster::config::Config;
use sector_caster::decompose::ConvexDecomposer;
use sector_caster::level::{self, SPAWN_FACING, SPAWN_POSITION};
use sector_caster::minimap::Minimap;
use sector_caster::scaler::{ScaleLut, blit_scaled, build_scale_lut};
use sector_caster::surface::{Color, FrameBuffer, PixelSurface};
use sector_caster::world::SectorWorld;

/// World units per second
const MOVE_SPEED: f64 = 3.0;
/// Radians per second
const TURN_SPEED: f64 = std::f64::consts::PI;
const RISE_SPEED: f64 = 1.0;
const MIN_ELEVATION: f64 = 0.1;
const MAX_ELEVATION: f64 = 5.0;

#[derive(Parser, Debug)]
#[command(name = "sector-caster", about = "Sector-based 2.5D renderer demo")]
struct Args {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render width in pixels
    #[arg(long)]
    width: Option<usize>,

    /// Integer presentation scale
    #[arg(long)]
    scale: Option<usize>,

    /// Fixed ticks per second
    #[arg(long)]
    fps: Option<u32>,
}

/// Low-resolution frame presented through softbuffer, scaled to the window
struct WindowSurface {
    window: Rc<Window>,
    surface: softbuffer::Surface<Rc<Window>, Rc<Window>>,
    frame: FrameBuffer,
    lut: ScaleLut,
}

impl WindowSurface {
    fn new(event_loop: &ActiveEventLoop, config: &Config) -> anyhow::Result<Self> {
        let (w, h) = config.window_size();
        let attributes = Window::default_attributes()
            .with_title("sector-caster")
            .with_inner_size(PhysicalSize::new(w as u32, h as u32));

        let window = Rc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| anyhow!("cannot create window: {err}"))?,
        );
        let context = softbuffer::Context::new(window.clone())
            .map_err(|err| anyhow!("cannot create softbuffer context: {err}"))?;
        let surface = softbuffer::Surface::new(&context, window.clone())
            .map_err(|err| anyhow!("cannot create softbuffer surface: {err}"))?;

        let mut display = Self {
            window,
            surface,
            frame: FrameBuffer::new(config.image_width, config.image_height()),
            lut: ScaleLut::empty(),
        };
        let size = display.window.inner_size();
        display.resize(size.width, size.height);
        Ok(display)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.lut = ScaleLut::empty();
        let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
            // minimised
            return;
        };
        if let Err(err) = self.surface.resize(w, h) {
            warn!("cannot resize window buffer: {err}");
            return;
        }
        self.lut = build_scale_lut(
            width as usize,
            height as usize,
            self.frame.width(),
            self.frame.height(),
        );
    }
}

impl PixelSurface for WindowSurface {
    fn width(&self) -> usize {
        self.frame.width()
    }

    fn height(&self) -> usize {
        self.frame.height()
    }

    fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Color) {
        self.frame.fill_rect(x, y, w, h, color);
    }

    fn put_pixel(&mut self, x: i64, y: i64, color: Color) {
        self.frame.put_pixel(x, y, color);
    }

    fn draw_column(&mut self, x: usize, y0: i32, y1: i32, color: Color) {
        self.frame.draw_column(x, y0, y1, color);
    }

    fn present(&mut self) {
        self.frame.present();
        let (dw, dh) = self.lut.dst_size();
        if dw == 0 || dh == 0 {
            return;
        }
        let mut buffer = match self.surface.buffer_mut() {
            Ok(buffer) => buffer,
            Err(err) => {
                warn!("cannot map window buffer: {err}");
                return;
            }
        };
        blit_scaled(&mut buffer, dw, self.frame.pixels(), self.frame.width(), &self.lut);
        if let Err(err) = buffer.present() {
            warn!("cannot present frame: {err}");
        }
    }
}

/// Once-per-second frame rate and render time summary
struct FrameTimer {
    frames: u32,
    render_time: Duration,
    since: Instant,
}

impl FrameTimer {
    fn new() -> Self {
        Self {
            frames: 0,
            render_time: Duration::ZERO,
            since: Instant::now(),
        }
    }

    fn record(&mut self, render: Duration) {
        self.frames += 1;
        self.render_time += render;

        let elapsed = self.since.elapsed();
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames as f64 / elapsed.as_secs_f64();
            let mean_ms = self.render_time.as_secs_f64() * 1000.0 / self.frames as f64;
            info!("{fps:.1} fps, mean render {mean_ms:.2} ms");
            *self = Self::new();
        }
    }
}

struct App {
    config: Config,
    world: SectorWorld,
    camera: Camera,
    display: Option<WindowSurface>,
    keys_down: HashSet<KeyCode>,
    show_minimap: bool,
    next_tick: Instant,
    timer: FrameTimer,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config, world: SectorWorld) -> Self {
        let mut camera = Camera::from_config(&config);
        camera.set_position(SPAWN_POSITION);
        camera.set_facing(SPAWN_FACING);

        Self {
            config,
            world,
            camera,
            display: None,
            keys_down: HashSet::new(),
            show_minimap: true,
            next_tick: Instant::now(),
            timer: FrameTimer::new(),
            error: None,
        }
    }

    fn held(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    fn axis(&self, positive: &[KeyCode], negative: &[KeyCode]) -> f64 {
        let pos = positive.iter().any(|&k| self.held(k)) as i32;
        let neg = negative.iter().any(|&k| self.held(k)) as i32;
        (pos - neg) as f64
    }

    /// Apply held keys for one fixed step
    fn tick(&mut self) {
        let dt = self.config.tick_interval().as_secs_f64();

        let turn = self.axis(
            &[KeyCode::KeyQ, KeyCode::ArrowLeft],
            &[KeyCode::KeyE, KeyCode::ArrowRight],
        );
        if turn != 0.0 {
            self.camera.turn(turn * TURN_SPEED * dt);
        }

        let forward = self.axis(&[KeyCode::KeyW], &[KeyCode::KeyS]);
        let strafe = self.axis(&[KeyCode::KeyD], &[KeyCode::KeyA]);
        let wish = self.camera.facing() * forward + self.camera.view().right * strafe;
        if let Some(dir) = wish.unit() {
            let from = self.camera.position();
            let to = from + dir * (MOVE_SPEED * dt);
            if level::can_move(&self.world, from, to) {
                self.camera.set_position(to);
            }
        }

        let rise = self.axis(&[KeyCode::KeyR], &[KeyCode::KeyF]);
        if rise != 0.0 {
            let elevation = (self.camera.elevation() + rise * RISE_SPEED * dt)
                .clamp(MIN_ELEVATION, MAX_ELEVATION);
            self.camera.set_elevation(elevation);
        }
    }

    fn on_key_pressed(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Tab => {
                let mode = self.camera.cycle_mode();
                info!("render mode: {mode}");
            }
            KeyCode::KeyM => self.show_minimap = !self.show_minimap,
            _ => {}
        }
    }

    fn redraw(&mut self) {
        let Some(display) = self.display.as_mut() else {
            return;
        };

        let stats = self.camera.draw(&self.world, display);
        if self.show_minimap {
            let size = display.width().min(display.height()) / 3;
            if let Some(map) = Minimap::fit(&self.world, (4, 4), size) {
                map.draw(
                    display,
                    &self.world,
                    self.camera.position(),
                    self.camera.facing(),
                );
            }
        }
        display.present();

        display.window.set_title(&format!(
            "sector-caster | {} | {:.2} ms",
            self.camera.mode(),
            stats.duration.as_secs_f64() * 1000.0
        ));
        self.timer.record(stats.duration);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.display.is_some() {
            return;
        }
        match WindowSurface::new(event_loop, &self.config) {
            Ok(display) => {
                display.window.request_redraw();
                self.display = Some(display);
                self.next_tick = Instant::now();
            }
            Err(err) => {
                error!("{err:#}");
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.display.as_ref().is_none_or(|d| d.window.id() != id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => match state {
                ElementState::Pressed => {
                    self.keys_down.insert(code);
                    if !repeat {
                        self.on_key_pressed(event_loop, code);
                    }
                }
                ElementState::Released => {
                    self.keys_down.remove(&code);
                }
            },

            WindowEvent::Resized(size) => {
                if let Some(display) = self.display.as_mut() {
                    display.resize(size.width, size.height);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(),

            _ => (),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let interval = self.config.tick_interval();
        let now = Instant::now();
        if now >= self.next_tick {
            self.tick();
            self.next_tick += interval;
            // fell behind; drop the missed ticks
            if self.next_tick <= now {
                self.next_tick = now + interval;
            }
            if let Some(display) = &self.display {
                display.window.request_redraw();
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_tick));
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(width) = args.width {
        config.image_width = width;
    }
    if let Some(scale) = args.scale {
        config.scale = scale;
    }
    if let Some(fps) = args.fps {
        config.frame_rate = fps;
    }
    config.validate().context("invalid settings")?;
    info!(
        "rendering {}x{} at scale {}, {} ticks per second",
        config.image_width,
        config.image_height(),
        config.scale,
        config.frame_rate
    );

    let level = level::demo_world(config.max_sectors).context("cannot build demo level")?;
    let decomposition = ConvexDecomposer::new()
        .decompose(&level)
        .context("cannot decompose demo level")?;
    if !decomposition.failures.is_empty() {
        warn!(
            "{} sector(s) could not be made convex and may render incorrectly",
            decomposition.failures.len()
        );
    }

    let event_loop = EventLoop::new().map_err(|err| anyhow!("cannot create event loop: {err}"))?;
    event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now()));

    let mut app = App::new(config, decomposition.world);
    event_loop
        .run_app(&mut app)
        .map_err(|err| anyhow!("event loop failed: {err}"))?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
