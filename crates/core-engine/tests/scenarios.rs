//! End-to-end scenarios: keystrokes in, terminal bytes out.

mod common;

use common::{engine, feed_str, printing_handler, recording_handler, show_tree};
use core_engine::{Key, LoopCode};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn unique_prefix_completes_with_trailing_space() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);

    feed_str(&mut eng, "sh");
    eng.key(Key::Tab);

    assert_eq!(eng.buf_get(), "show ");
    assert!(log.borrow().is_empty(), "completion must not dispatch");
}

#[test]
fn ambiguous_word_is_left_alone() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);

    feed_str(&mut eng, "show i");
    eng.key(Key::Tab);

    // "i" matches both "id" and "ip"; their common prefix adds nothing.
    assert_eq!(eng.buf_get(), "show i");
    assert!(log.borrow().is_empty());
}

#[test]
fn exact_word_completion_appends_space() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);

    feed_str(&mut eng, "show ip");
    eng.key(Key::Tab);

    assert_eq!(eng.buf_get(), "show ip ");
    assert!(log.borrow().is_empty());
}

#[test]
fn double_tab_lists_ambiguous_candidates() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);

    feed_str(&mut eng, "show i");
    eng.key(Key::Tab);
    let buffer_after_first = eng.buf_get();
    eng.screen_mut().take_output();
    eng.key(Key::Tab);
    let out = eng.screen_mut().take_output();

    assert_eq!(eng.buf_get(), buffer_after_first);
    assert!(out.contains("id"), "listing should show id: {out:?}");
    assert!(out.contains("ip"), "listing should show ip: {out:?}");
    // Both entries are executable, so both carry the <cr> marker padded to
    // the same width.
    assert!(out.contains("id <cr>"));
    assert!(out.contains("ip <cr>"));
}

#[test]
fn exit_command_dispatches_and_returns_eof() {
    let mut eng = engine(80, 25);
    let argv_seen = Rc::new(RefCell::new(Vec::new()));
    let argv_log = Rc::clone(&argv_seen);
    eng.add_cmd(
        None,
        "exit",
        "Terminate current session",
        Some(Rc::new(move |eng: &mut common::Eng, argv: &[String]| {
            argv_log.borrow_mut().push(argv.to_vec());
            eng.exit();
        })),
    )
    .unwrap();

    feed_str(&mut eng, "exi");
    assert_eq!(eng.key(Key::Char('t')), LoopCode::Loop);
    assert_eq!(eng.key(Key::Enter), LoopCode::Eof);
    assert_eq!(argv_seen.borrow().as_slice(), &[vec!["exit".to_string()]]);
}

#[test]
fn include_filter_passes_matching_lines() {
    let mut eng = engine(80, 25);
    eng.add_cmd(
        None,
        "cmd",
        "Emit test lines",
        Some(printing_handler("foo\nbar\nfoobar\n")),
    )
    .unwrap();

    feed_str(&mut eng, "cmd | inc");
    eng.key(Key::Tab);
    assert_eq!(eng.buf_get(), "cmd | include ");
    feed_str(&mut eng, "foo");
    eng.screen_mut().take_output();
    assert_eq!(eng.key(Key::Enter), LoopCode::Loop);

    let out = eng.screen_mut().take_output();
    assert!(out.contains("foo\r\nfoobar\r\n"), "filtered output: {out:?}");
    assert!(
        !out.replace("foobar", "").contains("bar"),
        "bar must be filtered out: {out:?}"
    );
}

#[test]
fn count_filter_reports_line_total() {
    let mut eng = engine(80, 25);
    eng.add_cmd(
        None,
        "cmd",
        "Emit test lines",
        Some(printing_handler("one\ntwo\nthree\n")),
    )
    .unwrap();

    feed_str(&mut eng, "cmd | count");
    eng.screen_mut().take_output();
    eng.key(Key::Enter);

    let out = eng.screen_mut().take_output();
    assert!(out.contains("Line count: 3\r\n"), "count output: {out:?}");
    assert!(!out.contains("one"), "lines must be swallowed: {out:?}");
}

#[test]
fn pager_stops_after_one_screen_and_quit_drops_the_rest() {
    let mut eng = engine(80, 5);
    eng.add_cmd(
        None,
        "dump",
        "Emit many lines",
        Some(Rc::new(|eng: &mut common::Eng, _argv: &[String]| {
            for i in 0..12 {
                eng.print(&format!("line {i}\n"));
            }
        })),
    )
    .unwrap();

    feed_str(&mut eng, "dump");
    eng.screen_mut().take_output();
    eng.key(Key::Enter);
    let first = eng.screen_mut().take_output();
    assert!(first.contains("line 0"));
    assert!(first.contains("<<< more >>>"), "more prompt expected: {first:?}");
    assert!(!first.contains("line 11"), "tail must be held back: {first:?}");

    eng.key(Key::Char('q'));
    let rest = eng.screen_mut().take_output();
    assert!(rest.contains(" quit\r\n"), "quit marker expected: {rest:?}");
    assert!(!rest.contains("line 11"), "quit must drop the rest: {rest:?}");
}

#[test]
fn pager_space_releases_a_page_and_c_releases_all() {
    let mut eng = engine(80, 5);
    eng.add_cmd(
        None,
        "dump",
        "Emit many lines",
        Some(Rc::new(|eng: &mut common::Eng, _argv: &[String]| {
            for i in 0..12 {
                eng.print(&format!("line {i}\n"));
            }
        })),
    )
    .unwrap();

    feed_str(&mut eng, "dump");
    eng.key(Key::Enter);
    eng.screen_mut().take_output();

    eng.key(Key::Char(' '));
    let page = eng.screen_mut().take_output();
    assert!(page.contains("line 3"), "next page expected: {page:?}");
    assert!(!page.contains("line 11"));

    eng.key(Key::Char('c'));
    let rest = eng.screen_mut().take_output();
    assert!(rest.contains("line 11"), "continue releases everything: {rest:?}");
}

#[test]
fn pager_enter_releases_single_lines() {
    let mut eng = engine(80, 5);
    eng.add_cmd(
        None,
        "dump",
        "Emit many lines",
        Some(Rc::new(|eng: &mut common::Eng, _argv: &[String]| {
            for i in 0..12 {
                eng.print(&format!("line {i}\n"));
            }
        })),
    )
    .unwrap();

    feed_str(&mut eng, "dump");
    eng.key(Key::Enter);
    eng.screen_mut().take_output();

    eng.key(Key::Enter);
    let one = eng.screen_mut().take_output();
    assert!(one.contains("line 3"), "one more line expected: {one:?}");
    assert!(!one.contains("line 4"), "only one line: {one:?}");
}

#[test]
fn mode_scopes_commands_and_prompt() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);

    eng.enter_mode("cfg", None);
    eng.add_cmd(None, "apply", "Apply changes", Some(recording_handler(&log)))
        .unwrap();

    eng.screen_mut().take_output();
    eng.key(Key::Enter); // empty enter reprints the prompt
    let out = eng.screen_mut().take_output();
    assert!(out.contains("\rhostname(cfg)#"), "mode prompt: {out:?}");

    feed_str(&mut eng, "apply");
    assert_eq!(eng.key(Key::Enter), LoopCode::Loop);
    assert_eq!(log.borrow().last().unwrap(), &["apply".to_string()]);

    eng.exit_mode();
    eng.screen_mut().take_output();
    eng.key(Key::Enter);
    let out = eng.screen_mut().take_output();
    assert!(out.contains("\rhostname#"), "top prompt restored: {out:?}");
    assert!(!out.contains("(cfg)"));

    feed_str(&mut eng, "apply");
    assert_eq!(eng.key(Key::Enter), LoopCode::Error);
    let out = eng.screen_mut().take_output();
    assert!(out.contains("No matched command"), "apply gone: {out:?}");
}

#[test]
fn command_callback_sees_executable_flag() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let seen: Rc<RefCell<Vec<(String, bool)>>> = Rc::new(RefCell::new(Vec::new()));
    let seen_cb = Rc::clone(&seen);
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);
    eng.set_cmd_cb(Rc::new(move |_eng: &mut common::Eng, line: &str, ok: bool| {
        seen_cb.borrow_mut().push((line.to_string(), ok));
    }));

    feed_str(&mut eng, "show ip");
    eng.key(Key::Enter);
    feed_str(&mut eng, "nonsense");
    eng.key(Key::Enter);

    let seen = seen.borrow();
    assert_eq!(seen[0], ("show ip ".to_string(), true));
    assert_eq!(seen[1].1, false);
}

#[test]
fn incomplete_command_is_diagnosed() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);
    // "show" has a handler, so resolve alone; register a handler-less parent
    // to get the incomplete path.
    eng.add_cmd(None, "terminal", "Terminal settings", None).unwrap();

    eng.screen_mut().take_output();
    feed_str(&mut eng, "terminal");
    assert_eq!(eng.key(Key::Enter), LoopCode::Error);
    let out = eng.screen_mut().take_output();
    assert!(out.contains("Command is not complete"), "{out:?}");
}

#[test]
fn filter_after_incomplete_command_is_rejected() {
    let mut eng = engine(80, 25);
    eng.add_cmd(None, "terminal", "Terminal settings", None).unwrap();

    feed_str(&mut eng, "terminal | count");
    eng.screen_mut().take_output();
    assert_eq!(eng.key(Key::Enter), LoopCode::Error);
    let out = eng.screen_mut().take_output();
    assert!(
        out.contains("Cannot apply filter to incomplete command"),
        "{out:?}"
    );
}

#[test]
fn empty_enter_returns_enter_code() {
    let mut eng = engine(80, 25);
    assert_eq!(eng.key(Key::Enter), LoopCode::Enter);
}

#[test]
fn ctrl_d_on_empty_buffer_is_eof() {
    let mut eng = engine(80, 25);
    feed_str(&mut eng, "x");
    assert_eq!(eng.key(Key::Ctrl('d')), LoopCode::Loop); // deletes nothing right of cursor
    eng.key(Key::Backspace);
    assert_eq!(eng.key(Key::Ctrl('d')), LoopCode::Eof);
}
