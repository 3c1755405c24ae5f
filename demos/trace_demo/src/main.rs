// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless scene that exercises the tracing and diagnostics pipeline.
//!
//! Builds a stage on a [`RecordingSurface`] with a few shapes, wrapped and
//! fluid text, a parallax layer and a sprite sequence, then drives 60 frames from a [`ManualHost`].
//! Events go to both a [`PrettyPrintSink`] on stdout and a [`RecorderSink`];
//! the recording is exported as `trace.json` in Chrome trace format.
//!
//! Run with: `cargo run -p trace_demo`

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use kurbo::{Insets, Point, Size, Vec2};

use canopy_core::clock::{ClockConfig, FrameClock};
use canopy_core::host::ManualHost;
use canopy_core::image::{ImageId, ImageSource};
use canopy_core::layer::{Camera, Layer};
use canopy_core::node::Node;
use canopy_core::sequence::{Loops, Sequence};
use canopy_core::shapes::{Circle, FluidText, MultilineText, Rectangle, TextStyle};
use canopy_core::stage::{PointerInput, Stage, StageConfig};
use canopy_core::surface::RecordingSurface;
use canopy_core::time::Duration;
use canopy_core::trace::{
    ClockStateEvent, FrameSummary, FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, RenderEvent,
    StallEvent, TimerFiredEvent, TraceSink,
};

use canopy_debug::chrome;
use canopy_debug::pretty::PrettyPrintSink;
use canopy_debug::recorder::RecorderSink;

const FRAME_COUNT: u64 = 60;
const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const STAGE_W: f64 = 640.0;
const STAGE_H: f64 = 360.0;

/// Forwards every event to a pretty printer and a shared recorder.
struct Tee {
    pretty: PrettyPrintSink,
    recorder: Rc<RefCell<RecorderSink>>,
}

macro_rules! forward {
    ($($method:ident($event:ty)),* $(,)?) => {
        $(
            fn $method(&mut self, e: &$event) {
                self.pretty.$method(e);
                self.recorder.borrow_mut().$method(e);
            }
        )*
    };
}

impl TraceSink for Tee {
    forward! {
        on_frame_tick(FrameTickEvent),
        on_phase_begin(PhaseBeginEvent),
        on_phase_end(PhaseEndEvent),
        on_stall(StallEvent),
        on_timer_fired(TimerFiredEvent),
        on_clock_state(ClockStateEvent),
        on_render(RenderEvent),
        on_frame_summary(FrameSummary),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // -- clock -------------------------------------------------------------
    let host = Rc::new(ManualHost::new());
    let clock = FrameClock::new(host.clone(), ClockConfig::standard());

    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    clock.set_trace_sink(Box::new(Tee {
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout())),
        recorder: Rc::clone(&recorder),
    }));

    // -- scene -------------------------------------------------------------
    let stage = Stage::shared(
        Rc::clone(&clock),
        RecordingSurface::new(),
        StageConfig::new(STAGE_W, STAGE_H).with_background("#223"),
    );
    let camera: Camera = Rc::new(Cell::new(Point::ORIGIN));
    let sun = {
        let mut s = stage.borrow_mut();

        let far = Layer::builder(Rc::clone(&clock))
            .camera(Rc::clone(&camera))
            .range(0.25)
            .build()?;
        let far = s.nodes_mut().create_with(Node::display(), far);
        s.add_child(far)?;
        for i in 0..8 {
            let x = f64::from(i) * 160.0;
            let id = s.nodes_mut().create_with(
                Rectangle::node().at(x, 300.0).with_size(80.0, 120.0),
                Rectangle::new("#446"),
            );
            s.nodes_mut().add_child(far, id)?;
        }

        let near = Layer::builder(Rc::clone(&clock))
            .camera(Rc::clone(&camera))
            .build()?;
        let near = s.nodes_mut().create_with(Node::display(), near);
        s.add_child(near)?;

        let sun = Circle::new(24.0).with_color("#FC3").with_stroke("#FFF", 2.0);
        let sun_node = sun.node().at(560.0, 60.0);
        let sun = s.nodes_mut().create_with(sun_node, sun);
        s.add_child(sun)?;

        let sheet = ImageSource::loaded(ImageId(1), Size::new(256.0, 64.0), 1.0);
        let walk = Sequence::from_grid(&sheet, Size::new(64.0, 64.0), clock.config().frame_rate)?
            .with_loops(Loops::Infinite)
            .with_yoyo(true)
            .autoplay();
        let walker = s
            .nodes_mut()
            .create_with(Node::sprite().at(320.0, 280.0).with_size(64.0, 64.0), walk);
        s.nodes_mut().add_child(near, walker)?;

        let title = FluidText::new(Rc::clone(&clock), "canopy", TextStyle::default(), 600.0);
        let title_node = title.node().at(20.0, 40.0);
        let title = s.nodes_mut().create_with(title_node, title);
        s.add_child(title)?;

        let caption_style = TextStyle {
            size: 14.0,
            weight: 400,
            ..TextStyle::default()
        };
        let caption = MultilineText::new(
            Rc::clone(&clock),
            "Click the sun to hide it.\nThe far hills scroll at a quarter speed.",
            caption_style,
            220.0,
        )
        .with_line_height(18.0)
        .with_padding(Insets::new(4.0, 4.0, 4.0, 0.0));
        let caption_node = caption.node().at(20.0, 60.0);
        let caption = s.nodes_mut().create_with(caption_node, caption);
        s.add_child(caption)?;

        s.click(sun, |ctx| {
            ctx.nodes.node_mut(ctx.target).visible = false;
        });
        sun
    };
    clock.add_to_stack(stage.clone());

    let jump = Rc::clone(&camera);
    clock.timeout(Duration::from_millis(1_000), move || {
        jump.set(Point::new(-200.0, 0.0));
    });

    // -- loop --------------------------------------------------------------
    clock.startup();
    for _ in 0..FRAME_COUNT {
        host.advance(FRAME_INTERVAL);
        camera.set(camera.get() - Vec2::new(4.0, 0.0));
        clock.tick()?;
    }

    let stats = stage.borrow().last_stats();
    println!(
        "done: drawn={} culled={} hidden={}",
        stats.drawn, stats.culled, stats.hidden,
    );

    stage
        .borrow_mut()
        .pointer_event(PointerInput::Click(Point::new(570.0, 70.0)));
    println!("sun visible after click: {}", stage.borrow().nodes().node(sun).visible);

    // -- export ------------------------------------------------------------
    drop(clock.take_trace_sink());
    let bytes = recorder.borrow().as_bytes().to_vec();
    let mut out = BufWriter::new(File::create("trace.json")?);
    chrome::export(&bytes, &mut out)?;
    println!("wrote trace.json ({} bytes recorded)", bytes.len());
    Ok(())
}
