//! ironcli demo console.
//!
//! Wires the engine to a crossterm terminal and registers a network-device
//! style command set: a `show` subtree with dynamic interface and address
//! listings, IPv4 regex leaves under `provision`, paging toggles, a `watch`
//! that lets periodic log lines interleave with the prompt, and a `configure`
//! submode. The event loop polls crossterm, translates events into abstract
//! keys, and feeds them to the engine one at a time.

mod config;

use anyhow::Result;
use clap::Parser;
use core_engine::{Engine, Key, LoopCode, NodeId};
use core_term::{CrosstermScreen, Screen, map_key_event};
use crossterm::event::{self, Event};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

type Eng = Engine<CrosstermScreen>;

const BANNER: &str = "ironcli demo console\r\n\r\n";
const MSG_PERIOD: Duration = Duration::from_secs(4);

static WATCH_MSGS: &[&str] = &[
    "[log] link state change on eth0",
    "[log] dhcp lease renewed\n",
    "[log] first line\nsecond line\nthird line without newline",
    "[log] config checkpoint saved\n",
];

/// Demo console arguments.
#[derive(Parser, Debug)]
#[command(name = "ironcli", version, about = "Interactive console engine demo")]
struct Args {
    /// Configuration file path (overrides discovery of `ironcli.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Hostname shown in the prompt (overrides the config file).
    #[arg(long = "hostname")]
    hostname: Option<String>,
}

fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // The terminal is in raw mode; logs go to a file, and only when asked.
    if std::env::var_os("RUST_LOG").is_none() {
        return None;
    }
    let appender = tracing_appender::rolling::never(".", "ironcli.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

fn print_argv(cli: &mut Eng, argv: &[String]) {
    cli.print(&format!("command: {}\n", argv.join(" ")));
}

fn generic_handler(lines: usize) -> core_engine::Handler<CrosstermScreen> {
    Rc::new(move |cli: &mut Eng, argv: &[String]| {
        print_argv(cli, argv);
        for i in 0..lines {
            cli.print(&format!("sample line #{i}\n"));
        }
    })
}

fn build_tree(cli: &mut Eng, watch: &Rc<Cell<bool>>) -> Result<()> {
    let show = cli
        .add_cmd(None, "show", "Show system status and configuration", None)?;

    let ip = cli
        .add_cmd(Some(show), "ip", "Display IP information", Some(generic_handler(5)))?;
    cli.add_cmd(Some(ip), "@1", "Display address details", Some(generic_handler(3)))?;

    let iface = cli
        .add_cmd(Some(show), "interface", "Display interface state", Some(generic_handler(5)))?;
    cli.add_cmd(Some(iface), "@0", "Display one interface", Some(generic_handler(3)))?;

    cli.add_cmd(Some(show), "id", "Display shaping class information", Some(generic_handler(8)))?;
    cli.add_cmd(Some(show), "shaper", "Display shaper tree information", Some(generic_handler(45)))?;
    cli.add_cmd(Some(show), "map", "Display traffic map information", Some(generic_handler(12)))?;
    cli.add_cmd(Some(show), "mac", "Display mac address bindings", Some(generic_handler(6)))?;
    cli.add_cmd(Some(show), "state", "Display system state", Some(generic_handler(4)))?;
    cli.add_cmd(Some(show), "connections", "Display API and CLI connections", Some(generic_handler(4)))?;

    // Prefix family: exercises executable-but-ambiguous resolution.
    let ppp = cli
        .add_cmd(Some(show), "ppp", "Display PPP state", None)?;
    cli.add_cmd(Some(ppp), "sessions", "Display PPP sessions", Some(generic_handler(10)))?;
    cli.add_cmd(Some(show), "pppoe", "Display PPPOE config", Some(generic_handler(3)))?;
    cli.add_cmd(Some(show), "pptp", "Display PPTP config", Some(generic_handler(3)))?;

    // Deep prefix collisions: a word that is executable while longer
    // siblings continue it, plus a second collision point further out.
    cli.add_cmd(
        Some(show),
        "t123456a",
        "test a",
        Some(Rc::new(|cli: &mut Eng, _argv: &[String]| {
            cli.print("Command with next that is a prefix called...\n");
        })),
    )?;
    cli.add_cmd(Some(show), "t123456ab", "test b", Some(generic_handler(2)))?;
    cli.add_cmd(Some(show), "t123456ac", "test c", Some(generic_handler(2)))?;
    cli.add_cmd(Some(show), "t123456acaaad", "test d", Some(generic_handler(2)))?;
    cli.add_cmd(Some(show), "t123456acaaae", "test e", Some(generic_handler(2)))?;

    let watch_flag = Rc::clone(watch);
    cli.add_cmd(
        Some(show),
        "watch",
        "Display log watch status",
        Some(Rc::new(move |cli: &mut Eng, _argv: &[String]| {
            let state = if watch_flag.get() { "on" } else { "off" };
            cli.print(&format!("Current watch is {state}.\n"));
        })),
    )?;

    cli.add_cmd(
        Some(show),
        "version",
        "Display engine and renderer versions",
        Some(Rc::new(|cli: &mut Eng, _argv: &[String]| {
            let renderer = cli.screen().version();
            cli.print(&renderer);
            cli.print(&core_engine::version());
        })),
    )?;

    let watch_root = cli
        .add_cmd(None, "watch", "Config log print status", None)?;
    let on_flag = Rc::clone(watch);
    cli.add_cmd(
        Some(watch_root),
        "on",
        "Enable log print",
        Some(Rc::new(move |cli: &mut Eng, _argv: &[String]| {
            on_flag.set(true);
            cli.print("Current watch is on.\n");
        })),
    )?;
    let off_flag = Rc::clone(watch);
    cli.add_cmd(
        Some(watch_root),
        "off",
        "Disable log print",
        Some(Rc::new(move |cli: &mut Eng, _argv: &[String]| {
            off_flag.set(false);
            cli.print("Current watch is off.\n");
        })),
    )?;

    cli.add_cmd(
        None,
        "more",
        "Enable paging (more prompt)",
        Some(Rc::new(|cli: &mut Eng, _argv: &[String]| {
            cli.print("More prompt is on\n");
            cli.set_more(true);
        })),
    )?;
    let no = cli.add_cmd(None, "no", "Negate command", None)?;
    cli.add_cmd(
        Some(no),
        "more",
        "Disable paging (more prompt)",
        Some(Rc::new(|cli: &mut Eng, _argv: &[String]| {
            cli.print("More prompt is off\n");
            cli.set_more(false);
        })),
    )?;

    const IPV4: &str =
        r"^((25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)[.]){3}(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$";
    let prov = cli
        .add_cmd(None, "provision", "Provision ip address", None)?;
    cli.add_cmd(Some(prov), IPV4, "<A.B.C.D>", Some(generic_handler(1)))?;
    let unprov = cli
        .add_cmd(Some(no), "provision", "Un-provision ip address", None)?;
    cli.add_cmd(Some(unprov), IPV4, "<A.B.C.D>", Some(generic_handler(1)))?;

    cli.add_cmd(
        None,
        "configure",
        "Enter configuration mode",
        Some(Rc::new(|cli: &mut Eng, _argv: &[String]| {
            cli.enter_mode("config", None);
            cli.add_cmd(
                None,
                "apply",
                "Apply staged changes",
                Some(Rc::new(|cli: &mut Eng, _argv: &[String]| {
                    cli.print("Changes applied.\n");
                })),
            ).ok();
            cli.add_cmd(
                None,
                "exit",
                "Leave configuration mode",
                Some(Rc::new(|cli: &mut Eng, _argv: &[String]| {
                    cli.exit_mode();
                })),
            ).ok();
        })),
    )?;

    let exit_handler: core_engine::Handler<CrosstermScreen> =
        Rc::new(|cli: &mut Eng, _argv: &[String]| {
            cli.print("Exiting from cli...\n");
            cli.exit();
        });
    cli.add_cmd(None, "exit", "Terminate current session", Some(Rc::clone(&exit_handler)))?;
    cli.add_cmd(None, "quit", "Terminate current session", Some(exit_handler))?;
    Ok(())
}

fn list_items(cli: &mut Eng, node: NodeId, code: i32) {
    match code {
        0 => {
            for item in [
                "eth0", "eth0.0012", "eth0.0014", "eth1", "eth1.0100", "eth1.0101", "eth2", "lo",
            ] {
                let _ = cli.list(node, item);
            }
        }
        1 => {
            for i in 1..=9 {
                let _ = cli.list(node, &format!("10.10.23.{i}"));
            }
            for i in 3..=7 {
                let _ = cli.list(node, &format!("10.10.15.{i}"));
            }
        }
        _ => {}
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging();
    let cfg = config::load(args.config.as_deref())?;

    let mut screen = CrosstermScreen::new();
    screen.enter_raw()?;
    let mut cli = Engine::new(screen);

    cli.set_hostname(args.hostname.as_deref().unwrap_or(&cfg.hostname));
    cli.set_level(&cfg.level);
    cli.set_banner(cfg.banner.as_deref().unwrap_or(BANNER));
    cli.set_more(cfg.paging);
    cli.set_more_clear(
        cfg.more_clear.line,
        cfg.more_clear.page,
        cfg.more_clear.cont,
        cfg.more_clear.quit,
    );
    cli.set_show_term_size(cfg.show_term_size);
    cli.set_ctrlz(cfg.ctrlz);
    cli.set_list_cb(Rc::new(list_items));

    let watch = Rc::new(Cell::new(false));
    build_tree(&mut cli, &watch)?;

    cli.start();
    cli.key(Key::ScreenSize); // pick up the real size and draw the prompt

    info!(target = "main", hostname = cfg.hostname.as_str(), "console_ready");

    let mut last_msg = Instant::now();
    let mut msg_idx = 0usize;
    'session: loop {
        if event::poll(Duration::from_millis(250))? {
            match event::read()? {
                Event::Key(key_event) => {
                    if let Some(key) = map_key_event(&key_event)
                        && cli.key(key) == LoopCode::Eof
                    {
                        break 'session;
                    }
                }
                Event::Resize(_, _) => {
                    cli.key(Key::ScreenSize);
                }
                _ => {}
            }
        }
        if watch.get() && last_msg.elapsed() >= MSG_PERIOD {
            last_msg = Instant::now();
            cli.message(WATCH_MSGS[msg_idx]);
            msg_idx = (msg_idx + 1) % WATCH_MSGS.len();
        }
    }

    cli.stop();
    cli.screen_mut().puts("done...\r\n");
    Ok(())
}
