//! Generic runtime for view orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`ThreadView`]: conversation state machine
//! - [`Bridge`]: realtime client
//! - [`MessagesApi`]: REST backend
//! - [`Driver`]: platform-specific input and rendering
//!
//! REST calls are awaited inline, so their results reach the view in the
//! order the view asked for them. Timers run as tokio tasks tracked by
//! [`Timer`] key; re-arming aborts the previous task.

use std::{collections::HashMap, sync::Arc, time::Duration};

use kennel_client::{MessagesApi, NewMessage};
use kennel_core::Environment;
use kennel_proto::{MessageId, ThreadId};
use tokio::{sync::mpsc, task::AbortHandle};

use crate::{Bridge, Driver, ThreadView, Timer, UserInput, ViewAction, ViewEvent};

/// Generic runtime that orchestrates the view, the client, and a driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific driver
/// - `A`: REST backend
/// - `E`: Clock and timer source
pub struct Runtime<D, A, E>
where
    D: Driver,
    A: MessagesApi,
    E: Environment,
{
    driver: D,
    view: ThreadView,
    bridge: Bridge,
    api: Arc<A>,
    env: E,
    initial_thread: Option<ThreadId>,
    /// Armed timers with the token of their current arming.
    timers: HashMap<Timer, (u64, AbortHandle)>,
    next_token: u64,
    fired_tx: mpsc::UnboundedSender<(Timer, u64)>,
    fired_rx: mpsc::UnboundedReceiver<(Timer, u64)>,
}

impl<D, A, E> Runtime<D, A, E>
where
    D: Driver,
    A: MessagesApi,
    E: Environment,
{
    /// Create a new runtime. The view belongs to the bridge's user.
    pub fn new(driver: D, view: ThreadView, bridge: Bridge, api: Arc<A>, env: E) -> Self {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        Self {
            driver,
            view,
            bridge,
            api,
            env,
            initial_thread: None,
            timers: HashMap::new(),
            next_token: 0,
            fired_tx,
            fired_rx,
        }
    }

    /// Open `thread_id` once the runtime starts.
    #[must_use]
    pub fn with_initial_thread(mut self, thread_id: ThreadId) -> Self {
        self.initial_thread = Some(thread_id);
        self
    }

    /// Run the event loop until the user quits or input closes.
    ///
    /// 1. Loads the thread list and opens the realtime link
    /// 2. Opens the initial thread, if any
    /// 3. Feeds user input, realtime events, and fired timers to the view
    ///    and executes the resulting actions
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to read input or render.
    pub async fn run(mut self) -> Result<ThreadView, D::Error> {
        self.driver.render(&self.view)?;
        let mut quit = self.dispatch(ViewEvent::RefreshThreads).await?;

        for event in self.bridge.connect().await {
            quit |= self.dispatch(event).await?;
        }
        if let Some(thread_id) = self.initial_thread.take() {
            quit |= self.dispatch(ViewEvent::OpenThread { thread_id }).await?;
        }

        while !quit {
            let event = tokio::select! {
                input = self.driver.poll_input() => match input? {
                    Some(input) => self.input_event(input),
                    None => ViewEvent::Close,
                },
                Some(event) = self.bridge.next_event() => event,
                Some((timer, token)) = self.fired_rx.recv() => {
                    if !self.take_timer(timer, token) {
                        continue;
                    }
                    ViewEvent::TimerFired(timer)
                },
            };
            quit = self.dispatch(event).await?;
        }

        self.cancel_all_timers();
        self.driver.stop();
        Ok(self.view)
    }

    fn input_event(&self, input: UserInput) -> ViewEvent {
        match input {
            UserInput::Draft(draft) => ViewEvent::DraftEdited { draft },
            UserInput::Submit => ViewEvent::Submit { now: self.env.now() },
            UserInput::Open(thread_id) => ViewEvent::OpenThread { thread_id },
            UserInput::StartThread { with, greeting } => ViewEvent::StartThread { with, greeting },
            UserInput::RefreshThreads => ViewEvent::RefreshThreads,
            UserInput::Quit => ViewEvent::Close,
        }
    }

    /// Feed one event to the view and execute everything it leads to.
    ///
    /// Returns `true` if the view asked to quit.
    async fn dispatch(&mut self, event: ViewEvent) -> Result<bool, D::Error> {
        let mut quit = false;
        let mut pending = vec![event];

        while !pending.is_empty() {
            let events = std::mem::take(&mut pending);
            for event in events {
                for action in self.view.handle(event) {
                    match action {
                        ViewAction::Render => self.driver.render(&self.view)?,
                        ViewAction::Quit => quit = true,
                        ViewAction::FetchThreads => pending.push(fetch_threads(&*self.api).await),
                        ViewAction::FetchHistory { thread_id } => {
                            pending.push(fetch_history(&*self.api, thread_id).await);
                        },
                        ViewAction::MarkThreadRead { thread_id } => {
                            pending.extend(mark_thread_read(&*self.api, thread_id).await);
                        },
                        ViewAction::MarkMessageRead { message_id } => {
                            pending.extend(mark_message_read(&*self.api, message_id).await);
                        },
                        ViewAction::StartThread { first } => {
                            pending.extend(start_thread(&*self.api, first).await);
                        },
                        ViewAction::ArmTimer { timer, delay } => self.arm_timer(timer, delay),
                        ViewAction::CancelTimer(timer) => self.cancel_timer(timer),
                        ViewAction::CancelAllTimers => self.cancel_all_timers(),
                        action @ (ViewAction::Transmit(_) | ViewAction::Disconnect) => {
                            pending.extend(self.bridge.process_view_action(action));
                        },
                    }
                }
            }
        }
        Ok(quit)
    }

    fn arm_timer(&mut self, timer: Timer, delay: Duration) {
        self.cancel_timer(timer);
        let token = self.next_token;
        self.next_token += 1;

        let env = self.env.clone();
        let fired = self.fired_tx.clone();
        let handle = tokio::spawn(async move {
            env.sleep(delay).await;
            let _ = fired.send((timer, token));
        })
        .abort_handle();
        self.timers.insert(timer, (token, handle));
    }

    fn cancel_timer(&mut self, timer: Timer) {
        if let Some((_, handle)) = self.timers.remove(&timer) {
            handle.abort();
        }
    }

    fn cancel_all_timers(&mut self) {
        for (_, (_, handle)) in self.timers.drain() {
            handle.abort();
        }
    }

    /// Claim a fired timer. False if it was cancelled or re-armed after the
    /// task sent its notification.
    fn take_timer(&mut self, timer: Timer, token: u64) -> bool {
        match self.timers.get(&timer) {
            Some((current, _)) if *current == token => {
                self.timers.remove(&timer);
                true
            },
            Some(_) | None => false,
        }
    }

    /// Current view.
    pub fn view(&self) -> &ThreadView {
        &self.view
    }
}

async fn fetch_threads<A: MessagesApi>(api: &A) -> ViewEvent {
    match api.list_threads().await {
        Ok(threads) => ViewEvent::ThreadsLoaded { threads },
        Err(e) => ViewEvent::ThreadsFailed { reason: e.to_string() },
    }
}

async fn fetch_history<A: MessagesApi>(api: &A, thread_id: ThreadId) -> ViewEvent {
    match api.list_messages(&thread_id).await {
        Ok(messages) => ViewEvent::HistoryLoaded { thread_id, messages },
        Err(e) => ViewEvent::HistoryFailed { thread_id, reason: e.to_string() },
    }
}

async fn mark_thread_read<A: MessagesApi>(api: &A, thread_id: ThreadId) -> Option<ViewEvent> {
    match api.mark_thread_read(&thread_id).await {
        Ok(updated) => Some(ViewEvent::ThreadMarkedRead { thread_id, updated }),
        Err(e) => {
            tracing::warn!(thread = %thread_id, error = %e, "mark read failed");
            None
        },
    }
}

async fn mark_message_read<A: MessagesApi>(api: &A, message_id: MessageId) -> Option<ViewEvent> {
    match api.mark_message_read(&message_id).await {
        Ok(message) => Some(ViewEvent::MessageMarkedRead { message }),
        Err(e) => {
            tracing::warn!(message = %message_id, error = %e, "mark message read failed");
            None
        },
    }
}

/// Open the thread `first` belongs to, creating it unless the server
/// already lists it.
async fn start_thread<A: MessagesApi>(api: &A, first: NewMessage) -> Vec<ViewEvent> {
    let thread_id = first.thread_id.clone();
    let threads = match api.list_threads().await {
        Ok(threads) => threads,
        Err(e) => return vec![ViewEvent::ThreadStartFailed { thread_id, reason: e.to_string() }],
    };

    if threads.iter().any(|summary| summary.thread_id == thread_id) {
        tracing::debug!(thread = %thread_id, "thread already exists");
        return vec![ViewEvent::ThreadsLoaded { threads }, ViewEvent::OpenThread { thread_id }];
    }

    match api.create_message(&first).await {
        Ok(message) => {
            tracing::info!(thread = %thread_id, message = %message.id, "thread created");
            vec![ViewEvent::ThreadStarted { thread_id }]
        },
        Err(e) => vec![ViewEvent::ThreadStartFailed { thread_id, reason: e.to_string() }],
    }
}
