//! DFA interactions beyond the core scenarios: history browsing, incremental
//! search, the Ctrl-X prefix, dynamic and regex nodes, Ctrl-Z unwinding, and
//! out-of-band messages.

mod common;

use common::{engine, feed_str, recording_handler, show_tree};
use core_engine::{Key, LoopCode};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn history_up_recalls_and_down_restores_typed_text() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);

    feed_str(&mut eng, "show ip");
    eng.key(Key::Enter);
    feed_str(&mut eng, "show id");
    eng.key(Key::Enter);

    feed_str(&mut eng, "half typed");
    eng.key(Key::Up);
    assert_eq!(eng.buf_get(), "show id ");
    eng.key(Key::Up);
    assert_eq!(eng.buf_get(), "show ip ");
    eng.key(Key::Down);
    assert_eq!(eng.buf_get(), "show id ");
    eng.key(Key::Down);
    assert_eq!(eng.buf_get(), "half typed");
}

#[test]
fn ctrl_c_clears_buffer_and_history_position() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);

    feed_str(&mut eng, "show ip");
    eng.key(Key::Enter);
    feed_str(&mut eng, "junk");
    eng.key(Key::Up);
    eng.screen_mut().take_output();
    eng.key(Key::Ctrl('c'));

    assert_eq!(eng.buf_get(), "");
    let out = eng.screen_mut().take_output();
    assert!(out.contains("^C\r\n"), "{out:?}");
    // Browsing was reset: Down does nothing, Up starts from the newest again.
    eng.key(Key::Down);
    assert_eq!(eng.buf_get(), "");
    eng.key(Key::Up);
    assert_eq!(eng.buf_get(), "show ip ");
}

#[test]
fn incremental_search_finds_and_executes() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);

    feed_str(&mut eng, "show ip");
    eng.key(Key::Enter);
    feed_str(&mut eng, "show id");
    eng.key(Key::Enter);
    log.borrow_mut().clear();

    eng.key(Key::Ctrl('r'));
    eng.screen_mut().take_output();
    eng.key(Key::Char('i'));
    eng.key(Key::Char('p'));
    let out = eng.screen_mut().take_output();
    assert!(out.contains("(i-search)'ip':"), "search prompt: {out:?}");
    assert!(out.contains("show ip"), "match shown: {out:?}");

    assert_eq!(eng.key(Key::Enter), LoopCode::Loop);
    assert_eq!(log.borrow().as_slice(), &[vec!["show".to_string(), "ip".to_string()]]);
}

#[test]
fn search_older_walks_matches_and_ctrl_g_aborts() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);

    feed_str(&mut eng, "show ip");
    eng.key(Key::Enter);
    feed_str(&mut eng, "show id");
    eng.key(Key::Enter);

    feed_str(&mut eng, "kept");
    eng.key(Key::Ctrl('r'));
    eng.key(Key::Char('s'));
    eng.key(Key::Char('h'));
    eng.key(Key::Ctrl('r')); // older match
    eng.key(Key::Ctrl('g')); // abort, keep the typed buffer

    assert_eq!(eng.buf_get(), "kept");
}

#[test]
fn search_escape_takes_the_match_without_executing() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);

    feed_str(&mut eng, "show id");
    eng.key(Key::Enter);
    log.borrow_mut().clear();

    eng.key(Key::Ctrl('r'));
    eng.key(Key::Char('i'));
    eng.key(Key::Char('d'));
    eng.key(Key::Esc);

    assert_eq!(eng.buf_get(), "show id ");
    assert!(log.borrow().is_empty());
}

#[test]
fn prefix_x_falls_through_to_normal_on_plain_keys() {
    let mut eng = engine(80, 25);
    eng.key(Key::Ctrl('x'));
    eng.key(Key::Char('a'));
    assert_eq!(eng.buf_get(), "a");
}

#[test]
fn prefix_x_self_ignores_repeated_ctrl_x() {
    let mut eng = engine(80, 25);
    eng.key(Key::Ctrl('x'));
    eng.key(Key::Ctrl('x'));
    eng.key(Key::Char('b'));
    assert_eq!(eng.buf_get(), "b");
}

#[test]
fn prefix_x_ctrl_z_prints_terminal_size() {
    let mut eng = engine(80, 25);
    eng.screen_mut().take_output();
    eng.key(Key::Ctrl('x'));
    eng.key(Key::Ctrl('z'));
    let out = eng.screen_mut().take_output();
    assert!(out.contains("Terminal size: 80x25"), "{out:?}");
}

#[test]
fn prefix_x_ctrl_h_dumps_history() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);
    feed_str(&mut eng, "show ip");
    eng.key(Key::Enter);
    eng.screen_mut().take_output();

    eng.key(Key::Ctrl('x'));
    eng.key(Key::Ctrl('h'));
    let out = eng.screen_mut().take_output();
    assert!(out.contains("History dump:"), "{out:?}");
    assert!(out.contains("show ip"), "{out:?}");
}

#[test]
fn prefix_x_ctrl_v_prints_both_versions() {
    let mut eng = engine(80, 25);
    eng.screen_mut().take_output();
    eng.key(Key::Ctrl('x'));
    eng.key(Key::Ctrl('v'));
    let out = eng.screen_mut().take_output();
    assert!(out.contains("capture test backend"), "{out:?}");
    assert!(out.contains("ironcli interactive console engine"), "{out:?}");
}

#[test]
fn prefix_x_ctrl_c_dumps_command_paths() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);
    eng.screen_mut().take_output();

    eng.key(Key::Ctrl('x'));
    eng.key(Key::Ctrl('c'));
    let out = eng.screen_mut().take_output();
    assert!(out.contains("Command dump:"), "{out:?}");
    assert!(out.contains("show ip"), "{out:?}");
    assert!(out.contains("show id"), "{out:?}");
}

#[test]
fn dynamic_node_expands_through_the_listing_callback() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    let show = eng
        .add_cmd(None, "show", "Show system status", None)
        .unwrap();
    let iface = eng
        .add_cmd(
            Some(show),
            "interface",
            "Interface details",
            Some(recording_handler(&log)),
        )
        .unwrap();
    eng.add_cmd(Some(iface), "@1", "Interface name", Some(recording_handler(&log)))
        .unwrap();
    eng.set_list_cb(Rc::new(
        |eng: &mut common::Eng, node: core_engine::NodeId, code: i32| {
            assert_eq!(code, 1);
            for item in ["eth0", "eth1", "lo"] {
                eng.list(node, item).unwrap();
            }
        },
    ));

    feed_str(&mut eng, "show interface eth1");
    assert_eq!(eng.key(Key::Enter), LoopCode::Loop);
    assert_eq!(
        log.borrow().last().unwrap(),
        &["show".to_string(), "interface".to_string(), "eth1".to_string()]
    );
}

#[test]
fn dynamic_items_complete_by_prefix() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    let iface = eng
        .add_cmd(None, "interface", "Interface details", Some(recording_handler(&log)))
        .unwrap();
    eng.add_cmd(Some(iface), "@7", "Interface name", Some(recording_handler(&log)))
        .unwrap();
    eng.set_list_cb(Rc::new(
        |eng: &mut common::Eng, node: core_engine::NodeId, _code: i32| {
            for item in ["eth0", "lo"] {
                eng.list(node, item).unwrap();
            }
        },
    ));

    feed_str(&mut eng, "interface e");
    eng.key(Key::Tab);
    assert_eq!(eng.buf_get(), "interface eth0 ");
}

#[test]
fn regex_leaf_matches_and_rejects() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    let prov = eng.add_cmd(None, "provision", "Provision address", None).unwrap();
    eng.add_cmd(
        Some(prov),
        r"^([0-9]{1,3}\.){3}[0-9]{1,3}$",
        "<A.B.C.D>",
        Some(recording_handler(&log)),
    )
    .unwrap();

    feed_str(&mut eng, "provision 10.0.0.1");
    assert_eq!(eng.key(Key::Enter), LoopCode::Loop);
    assert_eq!(
        log.borrow().last().unwrap(),
        &["provision".to_string(), "10.0.0.1".to_string()]
    );

    eng.screen_mut().take_output();
    feed_str(&mut eng, "provision notanip");
    assert_eq!(eng.key(Key::Enter), LoopCode::Error);
    let out = eng.screen_mut().take_output();
    assert!(out.contains("No matched command"), "{out:?}");
}

#[test]
fn regex_help_shows_abbreviation() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    let prov = eng.add_cmd(None, "provision", "Provision address", None).unwrap();
    eng.add_cmd(
        Some(prov),
        r"^([0-9]{1,3}\.){3}[0-9]{1,3}$",
        "<A.B.C.D>",
        Some(recording_handler(&log)),
    )
    .unwrap();

    feed_str(&mut eng, "provision ");
    eng.screen_mut().take_output();
    eng.key(Key::Char('?'));
    let out = eng.screen_mut().take_output();
    assert!(out.contains("<A.B.C.D>"), "{out:?}");
}

#[test]
fn help_on_executable_node_offers_cr_and_filters() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);

    feed_str(&mut eng, "show ");
    eng.screen_mut().take_output();
    eng.key(Key::Char('?'));
    let out = eng.screen_mut().take_output();
    assert!(out.contains("<cr>"), "{out:?}");
    assert!(out.contains("Output filters"), "{out:?}");
    assert!(out.contains("id"), "{out:?}");
    assert!(out.contains("ip"), "{out:?}");
}

#[test]
fn question_mark_on_empty_buffer_lists_top_level() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);
    eng.add_cmd(None, "exit", "Terminate session", Some(recording_handler(&log)))
        .unwrap();

    eng.screen_mut().take_output();
    eng.key(Key::Char('?'));
    let out = eng.screen_mut().take_output();
    assert!(out.contains("show"), "{out:?}");
    assert!(out.contains("exit"), "{out:?}");
}

#[test]
fn ctrl_z_unwinds_the_mode_stack() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let hook_calls = Rc::new(RefCell::new(0usize));
    let hook_count = Rc::clone(&hook_calls);
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);
    eng.set_ctrlz(true);
    eng.set_ctrlz_exec(false);
    eng.set_ctrlz_cb(Rc::new(move |_eng: &mut common::Eng| {
        *hook_count.borrow_mut() += 1;
    }));

    eng.enter_mode("config", None);
    eng.enter_mode("if", None);
    feed_str(&mut eng, "leftover");
    eng.key(Key::Ctrl('z'));

    assert_eq!(eng.buf_get(), "");
    // Once up front, once per unwound frame.
    assert_eq!(*hook_calls.borrow(), 3);
    eng.screen_mut().take_output();
    eng.key(Key::Enter);
    let out = eng.screen_mut().take_output();
    assert!(out.contains("\rhostname#"), "stack unwound: {out:?}");
}

#[test]
fn message_interleaves_with_prompt() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut eng = engine(80, 25);
    show_tree(&mut eng, &log);
    feed_str(&mut eng, "show");
    eng.screen_mut().take_output();

    eng.message("link up on eth0");
    let out = eng.screen_mut().take_output();
    assert!(out.contains("link up on eth0"), "{out:?}");
    // The prompt (with the typed text) is redrawn after the message.
    let tail = out.split("link up on eth0").nth(1).unwrap();
    assert!(tail.contains("hostname#"), "{out:?}");
    assert!(tail.contains("show"), "{out:?}");
}

#[test]
fn mode_hints_are_stored_per_frame() {
    let mut eng = engine(80, 25);
    eng.enter_mode("config", Some(Box::new(42u32)));
    let hint = eng.mode_hint().and_then(|h| h.downcast_ref::<u32>());
    assert_eq!(hint, Some(&42));
    eng.exit_mode();
    assert!(eng.mode_hint().is_none());
}

#[test]
fn user_hints_live_on_the_engine() {
    let mut eng = engine(80, 25);
    eng.set_hint_int(-3);
    eng.set_hint_ptr(Some(Box::new("ctx".to_string())));
    assert_eq!(eng.hint_int(), -3);
    let hint = eng.hint_ptr().and_then(|h| h.downcast_ref::<String>());
    assert_eq!(hint.map(String::as_str), Some("ctx"));
}

#[test]
fn show_term_size_announces_resize() {
    let mut eng = engine(80, 25);
    eng.set_show_term_size(true);
    eng.screen_mut().set_size(132, 43);
    eng.screen_mut().take_output();
    eng.key(Key::ScreenSize);
    let out = eng.screen_mut().take_output();
    assert!(out.contains("Terminal size: 132x43"), "{out:?}");
}
