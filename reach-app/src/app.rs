use anyhow::{Result, anyhow};
use pixels::{Pixels, SurfaceTexture};
use rand::SeedableRng;
use rand::rngs::StdRng;
use reach_core::{Point, RawInput, SceneTransform, TouchPhase};
use reach_experiment::{ExperimentConfig, Sequencer, SessionEvent};
use reach_render::{Renderer, SkiaRenderer};
use reach_timing::HighPrecisionTimer;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

pub struct App {
    config: ExperimentConfig,
    fullscreen: bool,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    session: Option<Sequencer<HighPrecisionTimer>>,
    screen: SceneTransform,
    refresh_rate: Option<f64>,
    should_exit: bool,
}

impl App {
    pub fn new(config: ExperimentConfig, fullscreen: bool) -> Self {
        Self {
            config,
            fullscreen,
            window: None,
            pixels: None,
            renderer: None,
            session: None,
            screen: SceneTransform::new(1, 1),
            refresh_rate: None,
            should_exit: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        self.refresh_rate = monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let mut attributes = Window::default_attributes().with_title("Reach");
        attributes = if self.fullscreen {
            attributes
                .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
                .with_resizable(false)
        } else {
            attributes.with_inner_size(PhysicalSize::new(1280, 800))
        };

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale = window.scale_factor(),
            refresh_hz = ?self.refresh_rate,
            "display configured"
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);

        let mut renderer = SkiaRenderer::new(size.width, size.height)?;
        if let Some(path) = &self.config.font_path {
            renderer.load_font(path, self.config.font_size)?;
        } else {
            warn!("no font configured, text labels will not be drawn");
        }
        if let Some(path) = &self.config.decoration_image {
            renderer.load_decoration(path)?;
        }
        self.renderer = Some(renderer);

        self.screen = SceneTransform::new(size.width, size.height);
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.session = Some(Sequencer::new(
            self.config.clone(),
            HighPrecisionTimer::new(),
            self.screen,
            &mut rng,
        )?);

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn scene_point(&self, position: PhysicalPosition<f64>) -> Point {
        self.screen.to_scene((position.x as f32, position.y as f32))
    }

    fn forward(&mut self, raw: RawInput) {
        if let Some(session) = &mut self.session {
            session.handle_input(raw);
        }
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (Some(session), Some(renderer), Some(pixels)) = (
            self.session.as_mut(),
            self.renderer.as_mut(),
            self.pixels.as_mut(),
        ) else {
            return Ok(());
        };

        for event in session.tick() {
            match event {
                SessionEvent::SessionFinished { correct, total } => {
                    info!(correct, total, "session finished");
                }
                other => debug!(?other, "session event"),
            }
        }

        let scene = session.scene();
        let stats = renderer.render_scene(&scene, pixels.frame_mut(), session.timer_mut())?;
        pixels.render()?;
        debug!(
            clear_ms = stats.clear.as_secs_f64() * 1e3,
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            elements = stats.elements,
            "frame"
        );

        if session.is_finished() {
            self.should_exit = true;
            event_loop.exit();
        } else if let Some(window) = &self.window {
            window.request_redraw();
        }
        Ok(())
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(size.width, size.height) {
                error!("failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(size.width, size.height) {
                error!("failed to resize buffer: {e}");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(size.width, size.height);
        }
        self.screen = SceneTransform::new(size.width, size.height);
        if let Some(session) = &mut self.session {
            session.resize(self.screen);
        }
        info!(width = size.width, height = size.height, "display resized");
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(session) = &mut self.session {
            if let Err(e) = session.abort() {
                warn!("{e}");
            }
            info!(completed = session.results().len(), "results");
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!("failed to start session: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.frame(event_loop) {
                    error!("frame failed: {e:#}");
                    self.cleanup_and_exit(event_loop);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let p = self.scene_point(position);
                self.forward(RawInput::PointerMoved(p));
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.forward(RawInput::PointerPressed),
                ElementState::Released => self.forward(RawInput::PointerReleased),
            },
            WindowEvent::Touch(touch) => {
                let phase = match touch.phase {
                    winit::event::TouchPhase::Started => TouchPhase::Started,
                    winit::event::TouchPhase::Moved => TouchPhase::Moved,
                    winit::event::TouchPhase::Ended => TouchPhase::Ended,
                    winit::event::TouchPhase::Cancelled => TouchPhase::Cancelled,
                };
                let position = self.scene_point(touch.location);
                self.forward(RawInput::Touch {
                    id: touch.id,
                    phase,
                    position,
                });
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                self.cleanup_and_exit(event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
