//! Synth command - drive the publisher with a synthetic frame source
//!
//! Stands in for the vision pipeline: a fixed-rate loop on the calling
//! thread produces tracked boxes drifting across a 640x480 frame and hands
//! each frame to the publisher together with real CPU load and timing.
//!
//! # Usage
//!
//! ```bash
//! # 300 frames at 15 fps with 3 boxes over TCP
//! framecast --tcp 127.0.0.1:5500 synth
//!
//! # Run until interrupted
//! framecast --udp collector synth --frames 0 --fps 30 --boxes 8
//! ```

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use framecast_client::Reactor;
use framecast_config::Config;
use framecast_protocol::{BoundingBox, FrameMetrics, Rect, ResultRecord};
use framecast_telemetry::Publisher;
use sysinfo::System;

const DEFAULT_FRAMES: u64 = 300;
const DEFAULT_FPS: u32 = 15;
const DEFAULT_BOXES: u32 = 3;
const DEFAULT_FLUSH_SECS: u64 = 5;

const FRAME_WIDTH: i32 = 640;
const FRAME_HEIGHT: i32 = 480;

#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Number of frames to publish (0 = until interrupted)
    #[arg(short = 'n', long, default_value_t = DEFAULT_FRAMES)]
    frames: u64,

    /// Frames per second
    #[arg(long, default_value_t = DEFAULT_FPS, value_parser = clap::value_parser!(u32).range(1..=240))]
    fps: u32,

    /// Tracked boxes per frame
    #[arg(short, long, default_value_t = DEFAULT_BOXES)]
    boxes: u32,

    /// Seconds to wait for queued documents at exit
    #[arg(long, default_value_t = DEFAULT_FLUSH_SECS)]
    flush_timeout: u64,
}

impl Default for SynthArgs {
    fn default() -> Self {
        Self {
            frames: DEFAULT_FRAMES,
            fps: DEFAULT_FPS,
            boxes: DEFAULT_BOXES,
            flush_timeout: DEFAULT_FLUSH_SECS,
        }
    }
}

pub fn run(args: SynthArgs, config: &Config) -> Result<()> {
    let reactor = Reactor::start().context("failed to start reactor")?;
    let publisher = Publisher::from_config(&reactor, config)?;
    if !publisher.is_enabled() {
        tracing::warn!("no transport configured, frames will be dropped (use --udp, --tcp or --http)");
    }

    tracing::info!(
        frames = args.frames,
        fps = args.fps,
        boxes = args.boxes,
        transport = publisher.transport_name().unwrap_or("none"),
        "synthetic run started"
    );

    let mut scene = Scene::new(args.boxes);
    let mut cpu = CpuSampler::new();
    let interval = Duration::from_secs_f64(1.0 / f64::from(args.fps));
    let mut pacer = Pacer::new(interval);

    let mut index = 0;
    while args.frames == 0 || index < args.frames {
        let started = pacer.begin();

        scene.step();
        let results = [ResultRecord::BoundingBoxes(scene.boxes())];
        let metrics = FrameMetrics {
            target_fps: args.fps as i32,
            frame_index: index,
            hardware_accelerated: false,
            cpu_usage: cpu.sample(),
            achieved_fps: pacer.achieved_fps(),
            frame_time_ms: started.elapsed().as_millis() as i32,
        };
        publisher.accept(&results, &metrics);

        index += 1;
        pacer.wait();
    }

    if !publisher.flush(Duration::from_secs(args.flush_timeout)) {
        tracing::warn!(timeout_secs = args.flush_timeout, "documents still queued at exit");
    }

    println!(
        "Published {} frames ({} bytes) via {}",
        publisher.frames(),
        publisher.bytes(),
        publisher.transport_name().unwrap_or("nothing")
    );

    reactor.shutdown();
    Ok(())
}

// =============================================================================
// Scene
// =============================================================================

/// One tracked object bouncing around the frame
#[derive(Debug, Clone)]
struct Track {
    id: u32,
    bounds: Rect,
    dx: i32,
    dy: i32,
}

impl Track {
    fn step(&mut self) {
        let b = &mut self.bounds;
        b.x += self.dx;
        b.y += self.dy;

        if b.x < 0 || b.x + b.width > FRAME_WIDTH {
            self.dx = -self.dx;
            b.x = b.x.clamp(0, FRAME_WIDTH - b.width);
        }
        if b.y < 0 || b.y + b.height > FRAME_HEIGHT {
            self.dy = -self.dy;
            b.y = b.y.clamp(0, FRAME_HEIGHT - b.height);
        }
    }
}

/// Deterministic set of moving boxes
#[derive(Debug)]
struct Scene {
    tracks: Vec<Track>,
}

impl Scene {
    fn new(count: u32) -> Self {
        let tracks = (0..count)
            .map(|i| {
                let n = i as i32;
                let width = 40 + (n * 17) % 60;
                let height = 60 + (n * 23) % 80;
                Track {
                    id: i + 1,
                    bounds: Rect::new(
                        (n * 97) % (FRAME_WIDTH - width),
                        (n * 61) % (FRAME_HEIGHT - height),
                        width,
                        height,
                    ),
                    dx: 2 + n % 5,
                    dy: 1 + n % 3,
                }
            })
            .collect();
        Self { tracks }
    }

    fn step(&mut self) {
        for track in &mut self.tracks {
            track.step();
        }
    }

    /// Current boxes; even identities carry a tag
    fn boxes(&self) -> Vec<BoundingBox> {
        self.tracks
            .iter()
            .map(|t| {
                let tag = if t.id % 2 == 0 { t.id / 2 } else { 0 };
                BoundingBox::new(t.bounds).with_id(t.id).with_tag(tag)
            })
            .collect()
    }
}

// =============================================================================
// Timing
// =============================================================================

/// Fixed-rate frame clock
#[derive(Debug)]
struct Pacer {
    interval: Duration,
    deadline: Instant,
    last_start: Option<Instant>,
    achieved: f64,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: Instant::now(),
            last_start: None,
            achieved: 0.0,
        }
    }

    /// Mark the start of a frame
    fn begin(&mut self) -> Instant {
        let now = Instant::now();
        if let Some(last) = self.last_start {
            let elapsed = now.duration_since(last).as_secs_f64();
            if elapsed > 0.0 {
                self.achieved = 1.0 / elapsed;
            }
        }
        self.last_start = Some(now);
        now
    }

    /// Frame rate measured between the last two frame starts
    fn achieved_fps(&self) -> f64 {
        self.achieved
    }

    /// Sleep until the next frame is due
    fn wait(&mut self) {
        self.deadline += self.interval;
        match self.deadline.checked_duration_since(Instant::now()) {
            Some(remaining) => thread::sleep(remaining),
            // Running behind; don't try to catch up
            None => self.deadline = Instant::now(),
        }
    }
}

/// Global CPU utilization, refreshed no faster than sysinfo allows
struct CpuSampler {
    system: System,
    refreshed: Instant,
    last: f64,
}

impl CpuSampler {
    fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            system,
            refreshed: Instant::now(),
            last: 0.0,
        }
    }

    fn sample(&mut self) -> f64 {
        if self.refreshed.elapsed() >= sysinfo::MINIMUM_CPU_UPDATE_INTERVAL {
            self.system.refresh_cpu_usage();
            self.refreshed = Instant::now();
            self.last = f64::from(self.system.global_cpu_usage());
        }
        self.last
    }
}
