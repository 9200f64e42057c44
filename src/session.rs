// The tracking loop: capture, analyse, report, repeat.
// Visual expectation: frames keep flowing until Ctrl-C, Q/ESC in the debug
// window or the frame limit; every exit goes through the same path, and a lost
// game window turns into full-desktop capture exactly once.

use crate::capture::{Bounds, CaptureRegion, CaptureTarget, FrameSource, ScreenCapture};
use crate::config::Config;
use crate::draw::{self, Drawer};
use crate::error::Error;
use crate::input::InputSink;
use crate::tracking::{frame_center, FeatureTracker, FrameReport};
use crate::types::Position2D;
use crate::view::ViewController;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Polled once per iteration.
pub trait StopSignal {
    fn stop_requested(&mut self) -> bool;
}

/// Set by the Ctrl-C handler.
#[derive(Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    /// Route Ctrl-C into a flag instead of killing the process.
    pub fn install() -> Result<Self, Error> {
        let flag = Self::default();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || handler_flag.0.store(true, Ordering::SeqCst))
            .map_err(|e| Error::Interrupt(e.to_string()))?;
        Ok(flag)
    }

    #[cfg(test)]
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl StopSignal for InterruptFlag {
    fn stop_requested(&mut self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Most recent found position of each feature. Advisory only: for display and logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastKnown {
    pub primary: Option<Position2D>,
    pub secondary: Option<Position2D>,
    pub obstruction: Option<Position2D>,
}

impl LastKnown {
    pub fn update(&mut self, report: &FrameReport) {
        if let Some(c) = report.primary.detection.center { self.primary = Some(c); }
        if let Some(c) = report.secondary.detection.center { self.secondary = Some(c); }
        if let Some(c) = report.obstruction.detection.center { self.obstruction = Some(c); }
    }
}

/// A frame source together with the region to cut from it.
pub struct Acquired {
    pub source: Box<dyn FrameSource>,
    pub region: CaptureRegion,
}

/// Replacement source used once when the current target disappears.
pub type Fallback = Box<dyn FnOnce() -> Result<Acquired, Error>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub fell_back: bool,
    pub last_known: LastKnown,
}

pub struct Session<'a> {
    config: &'a Config,
    tracker: FeatureTracker<'a>,
    current: Acquired,
    fallback: Option<Fallback>,
    last_known: LastKnown,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a Config, current: Acquired, fallback: Option<Fallback>) -> Self {
        Self {
            config,
            tracker: FeatureTracker::new(config),
            current,
            fallback,
            last_known: LastKnown::default(),
        }
    }

    /// Loop until stopped, out of frames, or the capture target is lost for good.
    /// `on_report` is where a consumer decides what to do with each frame's detections.
    pub fn run(
        &mut self,
        stop: &mut dyn StopSignal,
        mut debug_window: Option<&mut Drawer>,
        max_frames: Option<u64>,
        mut on_report: impl FnMut(&FrameReport),
    ) -> Result<SessionSummary, Error> {
        let delay = Duration::from_millis(self.config.tracking.frame_delay_ms);
        let mut summary = SessionSummary::default();
        let mut show_masks = false;

        let mut last_fps_time = Instant::now();
        let mut frames_this_second: u32 = 0;
        let mut fps_text = String::from("FPS: 0.0");

        loop {
            /* 1) Cooperative cancellation */
            if stop.stop_requested() {
                info!("stop requested");
                break;
            }
            if debug_window.as_deref().is_some_and(Drawer::abort_requested) {
                info!("debug window closed");
                break;
            }
            if max_frames.is_some_and(|m| summary.frames >= m) {
                break;
            }

            /* 2) Capture; a lost target gets exactly one fallback */
            let frame = match self.current.source.capture(&self.current.region) {
                Ok(frame) => frame,
                Err(e) if e.is_target_lost() => match self.fallback.take() {
                    Some(fallback) => {
                        warn!("{e}; switching to full desktop capture");
                        self.current = fallback()?;
                        summary.fell_back = true;
                        continue;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            };

            /* 3) Analyse against the frame center */
            let reference = frame_center(&frame);
            let analysis = self.tracker.analyze(&frame, reference);
            let report = &analysis.report;
            self.last_known.update(report);
            debug!(
                "frame {}: primary={:?} secondary={:?} obstruction={:?}",
                summary.frames, report.primary.offset, report.secondary.offset, report.obstruction.offset
            );
            on_report(report);

            /* 4) Debug view */
            if let Some(window) = debug_window.as_deref_mut() {
                if window.m_pressed_once() {
                    show_masks = !show_masks;
                }
                let hud = hud_line(report, &fps_text, show_masks);
                window.present(&draw::render(&analysis, reference, show_masks, &hud))?;
            }

            summary.frames += 1;

            /* 5) FPS once per second */
            frames_this_second += 1;
            let now = Instant::now();
            if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
                let fps = frames_this_second as f32 / now.duration_since(last_fps_time).as_secs_f32();
                info!("FPS: {fps:.1}");
                fps_text = format!("FPS: {fps:.1}");
                frames_this_second = 0;
                last_fps_time = now;
            }

            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }

        summary.last_known = self.last_known;
        Ok(summary)
    }
}

fn hud_line(report: &FrameReport, fps_text: &str, show_masks: bool) -> String {
    let tag = match report.primary.offset {
        Some(o) => format!("TAG {},{}", o.dx, o.dy),
        None => "TAG -".to_string(),
    };
    let ui = if report.secondary.detection.found { "UI OK" } else { "UI NO" };
    let obs = if report.obstruction.detection.found {
        format!("OBS {}", report.obstruction.detection.area)
    } else {
        "OBS -".to_string()
    };
    let view = if show_masks { " | MASK" } else { "" };
    format!("{tag} | {ui} | {obs} | {fps_text}{view}")
}

/// Where capture targets come from. `ScreenResolver` asks the OS.
pub trait TargetResolver {
    /// Window whose title matches exactly, ready to capture, with its screen bounds.
    fn find_window(&mut self, title: &str) -> Result<Option<(Box<dyn FrameSource>, Bounds)>, Error>;
    fn desktop(&mut self) -> Result<Acquired, Error>;
    /// Deferred `desktop()`, run by the loop if the window goes away later.
    fn desktop_fallback(&self) -> Fallback;
}

pub struct ScreenResolver;

impl TargetResolver for ScreenResolver {
    fn find_window(&mut self, title: &str) -> Result<Option<(Box<dyn FrameSource>, Bounds)>, Error> {
        let Some(target) = CaptureTarget::find_window(title)? else {
            return Ok(None);
        };
        target.bring_to_foreground();
        let bounds = target.bounds()?;
        let source: Box<dyn FrameSource> = Box::new(ScreenCapture::new(target));
        Ok(Some((source, bounds)))
    }

    fn desktop(&mut self) -> Result<Acquired, Error> {
        acquire_desktop()
    }

    fn desktop_fallback(&self) -> Fallback {
        Box::new(acquire_desktop)
    }
}

/// Resolve the configured window. Anything short of a usable window (missing,
/// not enumerable, no bounds, too small to trim) means full desktop capture
/// right away, with no further fallback. Otherwise the desktop is kept in
/// reserve for when the window disappears mid-session.
pub fn acquire(config: &Config) -> Result<(Acquired, Option<Fallback>), Error> {
    acquire_with(config, &mut ScreenResolver)
}

fn acquire_with(config: &Config, resolver: &mut dyn TargetResolver) -> Result<(Acquired, Option<Fallback>), Error> {
    let title = &config.window.title;
    let (source, bounds) = match resolver.find_window(title) {
        Ok(Some(found)) => found,
        Ok(None) => {
            info!("no window titled '{title}', using full desktop capture instead");
            return Ok((resolver.desktop()?, None));
        }
        Err(e) => {
            warn!("cannot resolve window '{title}': {e}; using full desktop capture instead");
            return Ok((resolver.desktop()?, None));
        }
    };

    match CaptureRegion::trimmed(&bounds, config.window.title_bar_height, config.window.margin_width) {
        Some(region) => {
            info!("tracking window '{title}' at {bounds:?}, region {region:?}");
            Ok((Acquired { source, region }, Some(resolver.desktop_fallback())))
        }
        None => {
            warn!("window '{title}' too small to trim ({bounds:?}); using full desktop capture instead");
            Ok((resolver.desktop()?, None))
        }
    }
}

fn acquire_desktop() -> Result<Acquired, Error> {
    let target = CaptureTarget::desktop()?;
    let bounds = target.bounds()?;
    info!("capturing desktop at {bounds:?}");
    Ok(Acquired { source: Box::new(ScreenCapture::new(target)), region: CaptureRegion::full(&bounds) })
}

/// One log line per second. False when a stop arrived before it ran out.
pub fn countdown(secs: u64, stop: &mut dyn StopSignal) -> bool {
    for i in 0..secs {
        if stop.stop_requested() {
            info!("stop requested during countdown");
            return false;
        }
        info!("Starting in {}", secs - i);
        thread::sleep(Duration::from_secs(1));
    }
    !stop.stop_requested()
}

/// `reset()` the view unless a stop is pending. False when skipped.
pub fn level_view<S: InputSink>(view: &mut ViewController<S>, stop: &mut dyn StopSignal) -> Result<bool, Error> {
    if stop.stop_requested() {
        info!("stop requested; leaving the view alone");
        return Ok(false);
    }
    view.reset()?;
    Ok(true)
}
