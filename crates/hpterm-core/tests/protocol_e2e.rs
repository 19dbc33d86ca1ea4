//! End-to-end protocol tests: host byte streams in, screen / plot calls /
//! host replies out.

use hpterm_core::{
    ClickEvent, HpglRecorder, MemoryTransferSource, PlotCall, Point, ProtocolState, RecordingLink,
    RecordingSurface, SessionConfig, Terminal, TerminalEvent, TerminalId,
};
use pretty_assertions::assert_eq;

const DC1: u8 = 0x11;
const ENQ: u8 = 0x05;
const ACK: u8 = 0x06;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn terminal() -> Terminal<RecordingLink, RecordingSurface> {
    init_tracing();
    Terminal::new(RecordingLink::new(), RecordingSurface::new())
}

fn mv(x: i32, y: i32) -> PlotCall {
    PlotCall::MoveTo(Point::new(x, y))
}

fn ln(x: i32, y: i32) -> PlotCall {
    PlotCall::LineTo(Point::new(x, y))
}

// ── Plotting ────────────────────────────────────────────────────────────────

#[test]
fn ascii_plot_moves_then_draws() {
    let mut t = terminal();
    t.feed(b"\x1b*pf100,100a");
    t.feed(b"0,0bE");
    assert_eq!(t.surface().strokes(), vec![mv(100, 100), ln(0, 0)]);
    assert_eq!(t.state(), ProtocolState::Idle);
}

#[test]
fn chunking_does_not_change_the_outcome() {
    let stream: &[u8] = b"hello\x1b*pf10,10 20,20Z\x1b*dSlabel\x1b&a2r0CX\x1b*lLB\r\n";

    let mut whole = terminal();
    whole.feed(stream);

    let mut bytewise = terminal();
    for &b in stream {
        bytewise.feed(&[b]);
    }

    assert_eq!(whole.surface().calls(), bytewise.surface().calls());
    assert_eq!(whole.screen().visible_text(), bytewise.screen().visible_text());
}

#[test]
fn malformed_plot_body_stops_and_returns_to_idle() {
    let mut t = terminal();
    t.feed(b"\x1b*pf10,10 2\x01,5 30,30Z after");
    assert_eq!(t.surface().strokes(), vec![mv(10, 10)]);
    assert_eq!(t.state(), ProtocolState::Idle);
    assert!(t.screen().visible_text().contains("after"));
}

#[test]
fn polygon_region_is_filled() {
    let mut t = terminal();
    t.feed(b"\x1b*ps0,0 10,0 10,10tZ");
    let calls = t.surface().calls();
    assert!(calls.contains(&PlotCall::FillPolygon(vec![
        Point::new(0, 0),
        Point::new(10, 0),
        Point::new(10, 10),
    ])));
    assert_eq!(t.surface().strokes(), vec![mv(0, 0), ln(10, 0), ln(10, 10)]);
}

#[test]
fn graphics_label_is_drawn_not_printed() {
    let mut t = terminal();
    t.feed(b"\x1b*lTITLE\r\nbody");
    assert!(t.surface().calls().contains(&PlotCall::Text("TITLE".into())));
    assert_eq!(t.screen().screen_line(0, 0, 80), "body");
}

#[test]
fn hpgl_capture_follows_plot_output() {
    init_tracing();
    let surface = HpglRecorder::new(RecordingSurface::new(), Vec::new());
    let mut t = Terminal::new(RecordingLink::new(), surface);
    t.feed(b"\x1b*pf1,2 3,4Z");
    let (_, surface) = t.into_parts();
    let (_, out) = surface.finish();
    let log = String::from_utf8(out.unwrap_or_default()).unwrap_or_default();
    assert!(log.starts_with("IN;SP1;\n"));
    assert!(log.contains("PU1,2;\nPD3,4;\n"));
    assert!(log.ends_with("SP0;\n"));
}

// ── Handshake ───────────────────────────────────────────────────────────────

#[test]
fn dc1_without_reply_is_a_no_op() {
    let mut t = terminal();
    t.feed(&[DC1, DC1]);
    assert!(t.link().sent().is_empty());
}

#[test]
fn armed_reply_is_sent_exactly_once() {
    let mut t = terminal();
    t.feed(b"\x1b^");
    assert_eq!(t.pending_reply(), Some("\x1b\\8000020\r"));
    t.feed(&[DC1, DC1]);
    assert_eq!(t.link().sent(), b"\x1b\\8000020\r");
    assert_eq!(t.pending_reply(), None);
}

#[test]
fn newer_reply_replaces_unsent_one() {
    let mut t = terminal();
    t.feed(b"\x1b^\x1b~");
    t.feed(&[DC1]);
    assert_eq!(t.link().sent(), b"\x1b|4506000\r");
}

#[test]
fn enq_ack_is_deferred_until_input_drains() {
    let mut t = terminal();
    let producer = t.producer();
    producer.push_bytes(&[ENQ, b'x', b'y']);
    assert!(t.step());
    assert!(t.link().sent().is_empty());
    t.run_until_idle();
    assert_eq!(t.link().sent(), &[ACK]);
}

#[test]
fn ansi_terminal_answers_enq_with_id_when_handshake_off() {
    init_tracing();
    let config = SessionConfig {
        enq_ack: false,
        ..SessionConfig::for_terminal(TerminalId::Ansi)
    };
    let mut t = Terminal::with_config(config, RecordingLink::new(), RecordingSurface::new());
    t.feed(&[ENQ]);
    assert_eq!(t.link().sent(), b"VT100\r");
}

#[test]
fn click_wait_answers_with_position_and_code() {
    let mut t = terminal();
    t.feed(b"\x1b*s4^");
    assert_eq!(t.state(), ProtocolState::AwaitClick);
    assert!(t.surface().calls().contains(&PlotCall::ClickWait));

    t.feed(b"abc");
    assert_eq!(t.state(), ProtocolState::AwaitClick);
    assert!(t.link().sent().is_empty());

    t.surface_mut()
        .push_click(ClickEvent::new(Point::new(300, 150), u16::from(b'Q')));
    t.run_until_idle();
    assert_eq!(t.link().sent(), b"+00300,+00150,081\r");
    assert_eq!(t.state(), ProtocolState::Idle);
}

#[test]
fn display_size_follows_terminal_model() {
    init_tracing();
    let config = SessionConfig::for_terminal(TerminalId::Hp2648A);
    let mut t = Terminal::with_config(config, RecordingLink::new(), RecordingSurface::new());
    t.feed(b"\x1b*s5^\x11");
    assert_eq!(
        t.link().sent(),
        b"+00000,+00000,+00719,+00359,00003.,00003.\r"
    );

    let _ = t.link_mut().take_sent();
    t.feed(b"\x1b*d0,0,1023,99Y\x1b*s5^\x11");
    assert_eq!(
        t.link().sent(),
        b"+00000,+00000,+00719,+00359,00003.,00003.\r"
    );
}

#[test]
fn send_line_reports_text_from_cursor() {
    let mut t = terminal();
    t.feed(b"READY 42\r\x1b&a6C\x1bd\x11");
    assert_eq!(t.link().sent(), b"42\r");
}

// ── Degraded paths ──────────────────────────────────────────────────────────

#[test]
fn link_failure_downgrades_permanently() {
    init_tracing();
    let mut t = Terminal::new(RecordingLink::failing(), RecordingSurface::new());
    t.feed(b"\x1b[6n");
    assert!(!t.is_remote());
    assert!(matches!(
        t.drain_events().as_slice(),
        [TerminalEvent::LinkLost(_)]
    ));

    t.feed(b"\x1b*s1^\x11");
    assert!(t.screen().visible_text().contains("2627A"));
    assert!(t.drain_events().is_empty());
}

#[test]
fn unknown_sequences_are_dropped() {
    let mut t = terminal();
    t.feed(b"\x1bV\x1b&zQ\x1b*xQ\x1b[5nok");
    assert_eq!(t.state(), ProtocolState::Idle);
    assert_eq!(t.screen().screen_line(0, 0, 80), "ok");
}

#[test]
fn file_transfer_failure_sends_ff_trailer() {
    init_tracing();
    let config = SessionConfig {
        transfer_pacing: std::time::Duration::ZERO,
        ..SessionConfig::default()
    };
    let mut t = Terminal::with_config(config, RecordingLink::new(), RecordingSurface::new())
        .with_transfer_source(MemoryTransferSource::missing());
    t.feed(b"\x1be");
    assert_eq!(t.link().sent(), &[0xFF, 0xFF]);
}

#[test]
fn bell_respects_sound_setting() {
    let mut t = terminal();
    t.feed(b"\x07");
    assert_eq!(t.drain_events(), vec![TerminalEvent::Bell]);

    let config = SessionConfig {
        sound: false,
        ..SessionConfig::default()
    };
    let mut quiet = Terminal::with_config(config, RecordingLink::new(), RecordingSurface::new());
    quiet.feed(b"\x07");
    assert!(quiet.drain_events().is_empty());
}
