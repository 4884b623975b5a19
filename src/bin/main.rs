//! Cadence CLI
//!
//! Drives the demo workflow with the reference runner, either interactively
//! over stdin or scripted with `--inputs`.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Value as JsonValue};

use cadence_core::{
    emit, on_input, Engine, EngineError, EventLog, Instruction, MachineDef, NotifyLevel,
    QueuedInput, Runner, StdinInput,
};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Iterative workflow state machine engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo workflow (interactive unless --inputs is given)
    Demo {
        /// Answer input requests from this comma-separated list instead of stdin
        #[arg(long, value_delimiter = ',')]
        inputs: Option<Vec<String>>,

        /// Log debug instructions too
        #[arg(long)]
        debug: bool,

        /// Write the engine event log to this file as JSON lines
        #[arg(long)]
        event_log: Option<std::path::PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            inputs,
            debug,
            event_log,
        } => {
            let mut engine = Engine::new(demo_machine()?)?;

            let log = EventLog::new();
            if event_log.is_some() {
                engine.add_observer(Box::new(log.clone()));
            }

            let summary = match inputs {
                Some(values) => {
                    let queued =
                        QueuedInput::new(values.into_iter().map(JsonValue::String).collect());
                    Runner::new(queued).with_debug(debug).run(&mut engine)?
                }
                None => Runner::new(StdinInput).with_debug(debug).run(&mut engine)?,
            };

            if let Some(path) = event_log {
                log.save(&path)?;
                println!("Event log written to {}", path.display());
            }

            println!(
                "Run complete: {} instructions forwarded, {} inputs supplied",
                summary.forwarded, summary.inputs_supplied
            );
        }
    }

    Ok(())
}

fn text(value: &JsonValue) -> String {
    match value.as_str() {
        Some(s) => s.trim().to_string(),
        None => value.to_string(),
    }
}

fn user_of(input: &Option<JsonValue>) -> String {
    input
        .as_ref()
        .and_then(|v| v["user"].as_str())
        .unwrap_or("unknown user")
        .to_string()
}

/// Greeting with name capture, a command menu, a nested options sub-machine,
/// a simulated processing run with progress notifications, and a report state.
fn demo_machine() -> Result<MachineDef, EngineError> {
    MachineDef::builder()
        .scripted("__start__", |_| {
            vec![
                emit(Instruction::debug("entering workflow", "lifecycle")),
                emit(Instruction::notify(
                    "Welcome to the cadence demo workflow!",
                    NotifyLevel::Info,
                )),
                emit(Instruction::request_input("Please enter your name:")),
                on_input(|value| {
                    let name = text(&value);
                    if name.is_empty() {
                        vec![
                            emit(Instruction::warning("No name entered. Please try again.")),
                            emit(Instruction::transition("__start__")),
                        ]
                    } else {
                        vec![
                            emit(Instruction::notify(
                                format!("Hello, {name}!"),
                                NotifyLevel::Info,
                            )),
                            emit(
                                Instruction::transition("menu")
                                    .with_payload(json!({ "user": name })),
                            ),
                        ]
                    }
                }),
            ]
        })
        .scripted("menu", |input| {
            let user = user_of(&input);
            let payload = json!({ "user": user });
            vec![
                emit(Instruction::notify(
                    "Commands: options, process, report, quit",
                    NotifyLevel::Info,
                )),
                emit(Instruction::request_input(format!(
                    "Enter command for {user}:"
                ))),
                on_input(move |value| {
                    let command = text(&value).to_lowercase();
                    match command.as_str() {
                        "options" => vec![emit(
                            Instruction::transition("options_menu").with_payload(payload),
                        )],
                        "process" => vec![emit(
                            Instruction::transition("process").with_payload(payload),
                        )],
                        "report" => vec![emit(
                            Instruction::transition("report").with_payload(payload),
                        )],
                        "quit" => vec![
                            emit(Instruction::notify("Goodbye!", NotifyLevel::Info)),
                            emit(Instruction::transition("__end__")),
                        ],
                        _ => vec![
                            emit(
                                Instruction::warning(format!("Invalid command: '{command}'"))
                                    .with_payload(json!({ "command": command })),
                            ),
                            emit(Instruction::transition("menu").with_payload(payload)),
                        ],
                    }
                }),
            ]
        })
        .sub_machine("options_menu", options_machine()?)
        .scripted("process", |input| {
            let user = user_of(&input);
            let payload = json!({ "user": user });
            vec![
                emit(Instruction::notify(
                    format!("Starting data processing for {user}..."),
                    NotifyLevel::Info,
                )),
                emit(Instruction::request_input("Enter data file name:")),
                on_input(move |value| {
                    let file = text(&value);
                    if file.is_empty() {
                        return vec![
                            emit(Instruction::notify(
                                "No file name provided. Returning to menu.",
                                NotifyLevel::Warning,
                            )),
                            emit(Instruction::transition("menu").with_payload(payload)),
                        ];
                    }
                    let mut steps = Vec::new();
                    for pct in [20, 40, 60, 80, 100] {
                        steps.push(emit(
                            Instruction::notify(
                                format!("Processing '{file}': {pct}% complete..."),
                                NotifyLevel::Progress,
                            )
                            .with_payload(json!({ "file": file, "progress": pct })),
                        ));
                    }
                    steps.push(emit(
                        Instruction::notify(
                            format!("File '{file}' processed successfully."),
                            NotifyLevel::Success,
                        )
                        .with_payload(json!({ "file": file, "records": 150 })),
                    ));
                    steps.push(emit(Instruction::transition("menu").with_payload(payload)));
                    steps
                }),
            ]
        })
        .scripted("report", |input| {
            let user = user_of(&input);
            vec![
                emit(Instruction::notify(
                    format!("Generating report for {user}..."),
                    NotifyLevel::Info,
                )),
                emit(
                    Instruction::notify("Report generated.", NotifyLevel::Success)
                        .with_payload(json!({ "report_type": "summary", "user": user })),
                ),
                emit(Instruction::transition("menu").with_payload(json!({ "user": user }))),
            ]
        })
        .scripted("__end__", |_| {
            vec![emit(Instruction::notify(
                "Workflow finished. Thank you!",
                NotifyLevel::Info,
            ))]
        })
        .build()
}

/// Nested options sub-machine. Exits back to the parent's menu either by an
/// explicit parent transition or, when a branch lands on its `__end__`, by the
/// default transition recorded there.
fn options_machine() -> Result<MachineDef, EngineError> {
    MachineDef::builder()
        .scripted("__start__", |input| {
            let user = user_of(&input);
            let payload = json!({ "user": user });
            vec![
                emit(Instruction::notify(
                    "Options: one, two, back",
                    NotifyLevel::Info,
                )),
                emit(Instruction::request_input("Choose an option:")),
                on_input(move |value| {
                    let choice = text(&value).to_lowercase();
                    match choice.as_str() {
                        "one" => vec![emit(
                            Instruction::transition("option_one").with_payload(payload),
                        )],
                        "two" => vec![emit(
                            Instruction::transition("option_two").with_payload(payload),
                        )],
                        "back" => vec![emit(
                            Instruction::parent_transition("menu").with_payload(payload),
                        )],
                        _ => vec![
                            emit(Instruction::warning(format!("Unknown option: '{choice}'"))),
                            emit(Instruction::transition("__start__").with_payload(payload)),
                        ],
                    }
                }),
            ]
        })
        .scripted("option_one", |input| {
            let user = user_of(&input);
            vec![
                emit(
                    Instruction::custom("option_one_task")
                        .with_payload(json!({ "task_id": 123, "user": user })),
                ),
                emit(Instruction::notify(
                    "Option one completed.",
                    NotifyLevel::Success,
                )),
                emit(Instruction::transition("__end__").with_payload(json!({ "user": user }))),
            ]
        })
        .scripted("option_two", |input| {
            let user = user_of(&input);
            vec![
                emit(
                    Instruction::error("Simulated failure during option two.")
                        .with_payload(json!({ "error_code": "OPT2-500" })),
                ),
                emit(Instruction::transition("__start__").with_payload(json!({ "user": user }))),
            ]
        })
        .scripted("__end__", |input| {
            vec![emit(Instruction::transition("menu").with_payload(
                json!({ "user": user_of(&input) }),
            ))]
        })
        .build()
}
