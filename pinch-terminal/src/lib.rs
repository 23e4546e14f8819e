/// Terminal host for pinch gestures
///
/// Draws the manipulated card with an ASCII rasterizer and feeds mouse input,
/// or a recorded touch trace, through the gesture pipeline.
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use pinch_core::{Config, TracePlayer};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod mouse;
pub mod renderer;
pub mod scene;

pub use mouse::MouseTouches;
pub use renderer::{cell_to_screen, AsciiRenderer, CELL_ASPECT, PIVOT_MARKER, TOUCH_MARKER};
pub use scene::Scene;

/// Rows taken by the overlay at the top of the screen.
const OVERLAY_ROWS: u16 = 2;

/// Main application struct for the terminal host
pub struct TerminalApp {
    scene: Scene,
    renderer: AsciiRenderer,
    mouse: MouseTouches,
    trace: Option<TracePlayer>,
    running: bool,
    last_frame: Instant,
    last_fps_sample: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(config: &Config) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let renderer = AsciiRenderer::new(width as usize, height as usize);
        let (view_width, view_height) = renderer.viewport();
        let now = Instant::now();

        Ok(Self {
            scene: Scene::new(config, view_width, view_height),
            renderer,
            mouse: MouseTouches::new(),
            trace: None,
            running: true,
            last_frame: now,
            last_fps_sample: now,
            frame_count: 0,
            fps: 0.0,
        })
    }

    /// Replay `player` instead of listening to the mouse. Trace coordinates
    /// are camera pixels: one per column across, [`CELL_ASPECT`] per row down.
    pub fn with_trace(mut self, player: TracePlayer) -> Self {
        self.trace = Some(player);
        self
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            event::EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        execute!(
            stdout(),
            event::DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;
        terminal::disable_raw_mode()?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();
            let mut dt = (frame_start - self.last_frame).as_secs_f32();
            self.last_frame = frame_start;

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            if let Some(player) = self.trace.as_mut() {
                match player.next_frame(&mut self.scene.input) {
                    Some(trace_dt) => dt = trace_dt,
                    None => {
                        tracing::info!("trace finished");
                        self.trace = None;
                    }
                }
            }

            self.scene.frame(dt);
            self.render()?;

            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_fps_sample).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_fps_sample).as_secs_f32();
                self.frame_count = 0;
                self.last_fps_sample = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => match code {
                KeyCode::Char('q') | KeyCode::Esc => self.running = false,
                KeyCode::Char('r') => {
                    self.scene.reset();
                    self.mouse.forget();
                }
                _ => {}
            },
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => {
                self.renderer.resize(width as usize, height as usize);
                let (view_width, view_height) = self.renderer.viewport();
                self.scene.resize(view_width, view_height);
                tracing::debug!(width, height, "terminal resized");
            }
            Event::FocusLost => {
                self.scene.input.end_all();
                self.mouse.forget();
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) {
        let position = cell_to_screen(event.column, event.row);
        let input = &mut self.scene.input;
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => self.mouse.press(input, position),
            MouseEventKind::Drag(MouseButton::Left) => self.mouse.drag(input, position),
            MouseEventKind::Up(MouseButton::Left) => self.mouse.release(input),
            MouseEventKind::Down(MouseButton::Right) => self.mouse.toggle_anchor(input, position),
            _ => {}
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.clear();
        self.renderer.render_card(
            self.scene.mesh(),
            scene::CARD_COLUMNS,
            &self.scene.model_matrix(),
            &self.scene.camera,
        );
        for pivot in self.scene.pivots_on_screen() {
            self.renderer.mark(&pivot, PIVOT_MARKER);
        }
        for (_, position) in self.scene.input.positions() {
            self.renderer.mark(&position, TOUCH_MARKER);
        }

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        // Overlay
        let target = self.scene.target();
        let (axis, angle) = target
            .rotation
            .axis_angle()
            .map_or((0.0, 0.0), |(axis, angle)| (axis.z.signum(), angle));
        let states = self
            .scene
            .states()
            .iter()
            .map(|(name, state)| format!("{name}: {state:?}"))
            .collect::<Vec<_>>()
            .join("  ");
        let source = if self.trace.is_some() { "trace" } else { "mouse" };
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "Pinch | scale {:.2} | rotation {:.1}° | FPS: {:.1} | {source} | LMB=touch RMB=anchor R=reset Q=quit",
                target.scale.x,
                (axis * angle).to_degrees(),
                self.fps
            )),
            cursor::MoveTo(0, OVERLAY_ROWS - 1),
            terminal::Clear(ClearType::CurrentLine),
            Print(states),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}
