mod cmdline;
mod input;
mod terminal;

use engine::builtin::BuiltinLoader;
use engine::controller::{Controller, Error, State};
use engine::rules::{ChessRules, Rules, RulesError};

use clap::Parser;
use crossbeam_channel::{select, unbounded, Receiver};
use input::Input;
use log::{info, warn};
use simple_logger::SimpleLogger;
use terminal::Terminal;

use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;

type Game = Controller<ChessRules, Terminal>;

fn main() {
    let args = cmdline::Args::parse();

    // Set up the logger.
    if let Err(err) = SimpleLogger::new().with_level(args.log_level()).init() {
        eprintln!("could not initialise logging: {}", err);
    }

    info!("logger initialized");

    let mut game = Controller::new(
        args.config(),
        ChessRules::new(),
        Terminal::new(args.debug()),
        Arc::new(BuiltinLoader),
    );

    run(&mut game);
}

/// Read lines from stdin on a thread of their own.
fn stdin_lines() -> Receiver<String> {
    let (tx, rx) = unbounded::<String>();

    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!("stdin: {}", err);
                    break;
                }
            }
        }
    });

    rx
}

fn run(game: &mut Game) {
    let lines = stdin_lines();
    let inbox = game.inbox();

    println!("{}", input::HELP);
    report(game.start());

    loop {
        select! {
            recv(lines) -> line => {
                let line = match line {
                    Ok(line) => line,
                    Err(_) => break,
                };

                match input::parse(&line) {
                    Ok(Input::Quit) => break,
                    Ok(cmd) => execute(game, cmd),
                    Err(msg) if msg.is_empty() => {}
                    Err(msg) => println!("{}", msg),
                }
            }
            recv(inbox) -> envelope => {
                if let Ok(envelope) = envelope {
                    game.handle(envelope);
                }
            }
        }
    }

    game.shutdown();
}

fn execute(game: &mut Game, cmd: Input) {
    match cmd {
        Input::New(side) => report(game.restart(side)),
        Input::Move(mv) => report(game.submit_move(&mv)),
        Input::Drag(square) => {
            if game.drag_start(&square) {
                game.frontend().show_board();
            } else {
                println!("the piece on {} cannot move now", square);
            }
        }
        Input::Drop(from, to) => match game.drop_piece(&from, &to) {
            Err(Error::Rules(RulesError::Illegal(_))) => {
                println!("{}{} is not legal, piece returned to {}", from, to, from);
                game.frontend().show_board();
            }
            result => report(result),
        },
        Input::Swap(location) => report(game.swap_engine(&location)),
        Input::Movetime(ms) => game.set_movetime(ms),
        Input::Export => println!("{}", game.export_record()),
        Input::State => show_state(game),
        Input::Help => println!("{}", input::HELP),
        Input::Quit => {}
    }
}

fn report(result: Result<(), Error>) {
    if let Err(err) = result {
        println!("{}", err);
    }
}

fn show_state(game: &Game) {
    let turn = match game.state() {
        State::HumanToMove => "your move",
        State::EngineThinking => "engine thinking",
        State::GameOver => "game over",
        State::Halted => "halted",
        State::AwaitingIdentification => "waiting for a game",
        State::Idle => "idle",
    };

    println!(
        "{} | you play {} | {} from `{}`, {} ms per move | {} moves played",
        turn,
        game.human_side(),
        game.engine_name(),
        game.engine_location(),
        game.movetime(),
        game.rules().history().len()
    );
    println!("{}", game.rules().fen());
}
