//! Pure state machine for the retry loop
//!
//! No I/O and no async: `transition(state, event) -> (state, actions)`.
//! The controller executes the actions and feeds back the resulting events.
//! Invalid transitions go to `Failed`; this module never panics.

use imgdrop_core::{PassSummary, RunExit, UploadQueue};

/// What the user picked from the end-of-pass menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    RetryAll,
    Terminate,
    RetryOne(String),
}

/// Retry loop state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Nothing processed yet
    Idle,
    /// First pass over the full queue
    Processing { queue: UploadQueue, pass: usize },
    /// Every pass so far is done
    PassComplete {
        pass: usize,
        summary: PassSummary,
        failed: Vec<String>,
    },
    /// Pass over the failure subset
    Retrying { queue: UploadQueue, pass: usize },
    /// Pass over one previously failed file
    RetryingOne { file: String, pass: usize },
    /// Run over; the session has been told to close
    Terminated { exit: RunExit },
    /// Invalid transition
    Failed { error: String },
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated { .. } | Self::Failed { .. })
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start { queue: UploadQueue },
    /// A pass ran to the end; `failed` is the failure set after it
    PassFinished {
        summary: PassSummary,
        failed: Vec<String>,
    },
    Menu(MenuChoice),
    /// The menu answer was not one of the offered options
    InvalidChoice { input: String },
}

/// Side effects for the controller to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Remove these files from the failure set before they are retried
    ClearFailures { queue: UploadQueue },
    /// Process the queue; yields `PassFinished`
    RunPass { queue: UploadQueue, pass: usize },
    ShowSummary { pass: usize, summary: PassSummary },
    /// Ask what to do about `failed`; yields `Menu` or `InvalidChoice`
    PresentMenu { failed: Vec<String> },
    CloseSession,
    Log { message: String },
}

/// Pure state transition function
///
/// Takes the current state and an event, returns the new state and the actions
/// to execute. Deterministic, no side effects.
pub fn transition(state: State, event: Event) -> (State, Vec<Action>) {
    match (state, event) {
        (State::Idle, Event::Start { queue }) => {
            let actions = vec![
                Action::Log {
                    message: format!("Starting pass 1 over {} files", queue.len()),
                },
                Action::RunPass {
                    queue: queue.clone(),
                    pass: 1,
                },
            ];
            (State::Processing { queue, pass: 1 }, actions)
        }

        (State::Processing { pass, .. }, Event::PassFinished { summary, failed })
        | (State::Retrying { pass, .. }, Event::PassFinished { summary, failed })
        | (State::RetryingOne { pass, .. }, Event::PassFinished { summary, failed }) => {
            let mut actions = vec![Action::ShowSummary { pass, summary }];
            if failed.is_empty() {
                actions.push(Action::CloseSession);
            } else {
                actions.push(Action::PresentMenu {
                    failed: failed.clone(),
                });
            }
            (
                State::PassComplete {
                    pass,
                    summary,
                    failed,
                },
                actions,
            )
        }

        (State::PassComplete { pass, failed, .. }, Event::Menu(MenuChoice::RetryAll)) => {
            let queue = UploadQueue::subset(failed);
            let pass = pass + 1;
            let actions = vec![
                Action::Log {
                    message: format!("Retrying {} failed files", queue.len()),
                },
                Action::ClearFailures {
                    queue: queue.clone(),
                },
                Action::RunPass {
                    queue: queue.clone(),
                    pass,
                },
            ];
            (State::Retrying { queue, pass }, actions)
        }

        (State::PassComplete { .. }, Event::Menu(MenuChoice::Terminate)) => (
            State::Terminated {
                exit: RunExit::Completed,
            },
            vec![
                Action::Log {
                    message: "Stopping at user request".to_string(),
                },
                Action::CloseSession,
            ],
        ),

        (State::PassComplete { pass, failed, .. }, Event::Menu(MenuChoice::RetryOne(file))) => {
            if failed.contains(&file) {
                let queue = UploadQueue::subset([file.clone()]);
                let pass = pass + 1;
                let actions = vec![
                    Action::Log {
                        message: format!("Retrying {}", file),
                    },
                    Action::ClearFailures {
                        queue: queue.clone(),
                    },
                    Action::RunPass { queue, pass },
                ];
                (State::RetryingOne { file, pass }, actions)
            } else {
                (
                    State::Terminated {
                        exit: RunExit::InvalidInput,
                    },
                    vec![
                        Action::Log {
                            message: format!("{} is not in the failed set", file),
                        },
                        Action::CloseSession,
                    ],
                )
            }
        }

        (State::PassComplete { .. }, Event::InvalidChoice { input }) => (
            State::Terminated {
                exit: RunExit::InvalidInput,
            },
            vec![
                Action::Log {
                    message: format!("Invalid choice: {:?}", input),
                },
                Action::CloseSession,
            ],
        ),

        // Terminal states - no valid transitions
        (State::Terminated { exit }, event) => (
            State::Failed {
                error: format!(
                    "Invalid transition from Terminated ({:?}) on event: {:?}",
                    exit, event
                ),
            },
            vec![],
        ),

        (State::Failed { error }, event) => (
            State::Failed {
                error: format!(
                    "Invalid transition from Failed state (error: {}) on event: {:?}",
                    error, event
                ),
            },
            vec![],
        ),

        (state, event) => (
            State::Failed {
                error: format!(
                    "Invalid state transition: {:?} cannot handle event {:?}",
                    state, event
                ),
            },
            vec![],
        ),
    }
}
