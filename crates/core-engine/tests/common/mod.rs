//! Shared harness: an engine over the capture backend plus key-feeding
//! helpers and a small router-style command tree.

use core_engine::{CaptureScreen, Engine, Handler, Key};
use std::cell::RefCell;
use std::rc::Rc;

pub type Eng = Engine<CaptureScreen>;

/// Record of dispatched commands: one entry per handler invocation.
pub type CallLog = Rc<RefCell<Vec<Vec<String>>>>;

pub fn engine(cols: u16, rows: u16) -> Eng {
    let mut eng = Engine::new(CaptureScreen::new(cols, rows));
    eng.set_hostname("hostname");
    eng.key(Key::ScreenSize);
    eng.screen_mut().take_output();
    eng
}

pub fn feed_str(eng: &mut Eng, text: &str) {
    for ch in text.chars() {
        eng.key(Key::Char(ch));
    }
}

/// Handler that records its argv into the log.
pub fn recording_handler(log: &CallLog) -> Handler<CaptureScreen> {
    let log = Rc::clone(log);
    Rc::new(move |_eng: &mut Eng, argv: &[String]| {
        log.borrow_mut().push(argv.to_vec());
    })
}

/// Handler that prints fixed text through the filter chain.
pub fn printing_handler(text: &'static str) -> Handler<CaptureScreen> {
    Rc::new(move |eng: &mut Eng, _argv: &[String]| {
        eng.print(text);
    })
}

/// The `show`/`show ip`/`show id` tree the resolver scenarios use.
pub fn show_tree(eng: &mut Eng, log: &CallLog) {
    let show = eng
        .add_cmd(None, "show", "Show system status", Some(recording_handler(log)))
        .unwrap();
    eng.add_cmd(
        Some(show),
        "ip",
        "Display IP information",
        Some(recording_handler(log)),
    )
    .unwrap();
    eng.add_cmd(
        Some(show),
        "id",
        "Display class information",
        Some(recording_handler(log)),
    )
    .unwrap();
}
