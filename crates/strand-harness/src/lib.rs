//! Pair runner for race probes
//!
//! Runs two zero-argument callables "as concurrently as the backend allows"
//! and returns once both have completed or panicked. Each callable returns a
//! future, so the same probe can run under every backend:
//!
//! - [`Backend::Threads`]: each callable on its own OS thread, released
//!   together by a barrier
//! - [`Backend::Interleaved`]: two OS threads that take turns holding a
//!   shared interpreter lock, handed over whenever a task suspends and at
//!   every [`preemption_point`], so a switch can land between the primitive
//!   steps of an operation
//! - [`Backend::Cooperative`]: both futures on the calling thread, switching
//!   only at `.await` points

use futures::executor::block_on;
use futures::future::{join, FutureExt};
use futures::task::{waker, ArcWake};
use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::{pin, Pin};
use std::sync::{Arc, Barrier};
use std::task::{Context, Poll};
use std::thread::{self, Thread};
use tracing::{debug, trace};

/// Result of one callable: its output, or the panic payload
pub type Outcome<T> = thread::Result<T>;

/// How the two callables of a pair are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// True parallelism
    Threads,
    /// One runs at a time, preempted at suspension and preemption points
    Interleaved,
    /// Single-threaded, switching only at suspension points
    Cooperative,
}

impl Backend {
    /// Every backend, for probes that must hold under all of them
    pub const ALL: [Backend; 3] = [Backend::Threads, Backend::Interleaved, Backend::Cooperative];
}

/// Run `a` and `b` under `backend` and wait for both
pub fn run_pair<A, B, FA, FB>(
    backend: Backend,
    a: A,
    b: B,
) -> (Outcome<FA::Output>, Outcome<FB::Output>)
where
    A: FnOnce() -> FA + Send,
    B: FnOnce() -> FB + Send,
    FA: Future,
    FB: Future,
    FA::Output: Send,
    FB::Output: Send,
{
    trace!(?backend, "running pair");
    match backend {
        Backend::Threads => run_threads(a, b),
        Backend::Interleaved => run_interleaved(a, b),
        Backend::Cooperative => run_cooperative(a, b),
    }
}

/// Repeat a pair run, building fresh callables for every round
pub fn race_rounds<S, A, B, FA, FB>(
    backend: Backend,
    rounds: usize,
    mut setup: S,
) -> Vec<(Outcome<FA::Output>, Outcome<FB::Output>)>
where
    S: FnMut() -> (A, B),
    A: FnOnce() -> FA + Send,
    B: FnOnce() -> FB + Send,
    FA: Future,
    FB: Future,
    FA::Output: Send,
    FB::Output: Send,
{
    let outcomes: Vec<_> = (0..rounds)
        .map(|_| {
            let (a, b) = setup();
            run_pair(backend, a, b)
        })
        .collect();
    debug!(?backend, rounds, "race rounds finished");
    outcomes
}

/// Suspend once, letting the other side of the pair run
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`]
#[must_use = "futures do nothing unless polled"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

fn run_threads<A, B, FA, FB>(a: A, b: B) -> (Outcome<FA::Output>, Outcome<FB::Output>)
where
    A: FnOnce() -> FA + Send,
    B: FnOnce() -> FB + Send,
    FA: Future,
    FB: Future,
    FA::Output: Send,
    FB::Output: Send,
{
    let start = Barrier::new(2);
    let start = &start;
    thread::scope(|s| {
        let left = s.spawn(move || {
            start.wait();
            block_on(a())
        });
        let right = s.spawn(move || {
            start.wait();
            block_on(b())
        });
        (left.join(), right.join())
    })
}

fn run_interleaved<A, B, FA, FB>(a: A, b: B) -> (Outcome<FA::Output>, Outcome<FB::Output>)
where
    A: FnOnce() -> FA + Send,
    B: FnOnce() -> FB + Send,
    FA: Future,
    FB: Future,
    FA::Output: Send,
    FB::Output: Send,
{
    let interpreter = Arc::new(Interpreter::default());
    let start = Barrier::new(2);
    let start = &start;
    thread::scope(|s| {
        let left_interpreter = Arc::clone(&interpreter);
        let left = s.spawn(move || {
            start.wait();
            run_turns(left_interpreter, 0, a)
        });
        let right_interpreter = Arc::clone(&interpreter);
        let right = s.spawn(move || {
            start.wait();
            run_turns(right_interpreter, 1, b)
        });
        (left.join(), right.join())
    })
}

fn run_cooperative<A, B, FA, FB>(a: A, b: B) -> (Outcome<FA::Output>, Outcome<FB::Output>)
where
    A: FnOnce() -> FA,
    B: FnOnce() -> FB,
    FA: Future,
    FB: Future,
{
    let left = AssertUnwindSafe(async move { a().await }).catch_unwind();
    let right = AssertUnwindSafe(async move { b().await }).catch_unwind();
    block_on(join(left, right))
}

/// Drive a future to completion, running only while `seat` has the turn
fn run_turns<F, M>(interpreter: Arc<Interpreter>, seat: usize, make: M) -> F::Output
where
    M: FnOnce() -> F,
    F: Future,
{
    let _seated = Seated::new(Arc::clone(&interpreter), seat);
    let waker = waker(Arc::new(Unparker(thread::current())));
    let mut cx = Context::from_waker(&waker);

    interpreter.enter(seat);
    let mut future = pin!(make());
    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
        interpreter.park(seat);
        thread::park();
        interpreter.enter(seat);
    }
}

/// Hand the turn to the other side of an interleaved pair
///
/// Install this as the safepoint hook of the code under test. On threads
/// that are not running an interleaved pair it does nothing.
pub fn preemption_point() {
    let current = SEAT.with(|seat| seat.borrow().clone());
    if let Some((interpreter, seat)) = current {
        interpreter.preempt(seat);
    }
}

thread_local! {
    static SEAT: RefCell<Option<(Arc<Interpreter>, usize)>> = const { RefCell::new(None) };
}

/// Interpreter lock shared by the two sides of an interleaved pair
///
/// Exactly one side holds the turn at a time. The holder gives it up when its
/// future suspends, when it finishes, and at every preemption point while the
/// other side is able to run.
#[derive(Default)]
struct Interpreter {
    turns: Mutex<Turns>,
    cond: Condvar,
}

#[derive(Default)]
struct Turns {
    holder: Option<usize>,
    parked: [bool; 2],
    finished: [bool; 2],
}

impl Turns {
    fn runnable(&self, seat: usize) -> bool {
        !self.parked[seat] && !self.finished[seat]
    }

    /// Pass the turn on from `seat`, or leave it open if the other side
    /// cannot run
    fn hand_off(&mut self, seat: usize) {
        let other = 1 - seat;
        self.holder = self.runnable(other).then_some(other);
    }
}

impl Interpreter {
    /// Wait for the turn and take it
    fn enter(&self, seat: usize) {
        let mut turns = self.turns.lock();
        turns.parked[seat] = false;
        while turns.holder.is_some_and(|holder| holder != seat) {
            self.cond.wait(&mut turns);
        }
        turns.holder = Some(seat);
    }

    /// Switch to the other side in the middle of a step
    fn preempt(&self, seat: usize) {
        let mut turns = self.turns.lock();
        if !turns.runnable(1 - seat) {
            return;
        }
        trace!(seat, "preempted");
        turns.hand_off(seat);
        self.cond.notify_all();
        while turns.holder.is_some_and(|holder| holder != seat) {
            self.cond.wait(&mut turns);
        }
        turns.holder = Some(seat);
    }

    /// Give up the turn until the future is woken
    fn park(&self, seat: usize) {
        let mut turns = self.turns.lock();
        turns.parked[seat] = true;
        turns.hand_off(seat);
        self.cond.notify_all();
    }

    fn finish(&self, seat: usize) {
        let mut turns = self.turns.lock();
        turns.finished[seat] = true;
        if turns.holder == Some(seat) {
            turns.hand_off(seat);
        }
        self.cond.notify_all();
    }
}

/// Marks the current thread as a seat of an interleaved pair; on drop, even
/// while unwinding, the seat is finished and its turn released
struct Seated {
    interpreter: Arc<Interpreter>,
    seat: usize,
}

impl Seated {
    fn new(interpreter: Arc<Interpreter>, seat: usize) -> Self {
        SEAT.with(|current| *current.borrow_mut() = Some((Arc::clone(&interpreter), seat)));
        Self { interpreter, seat }
    }
}

impl Drop for Seated {
    fn drop(&mut self) {
        SEAT.with(|current| current.borrow_mut().take());
        self.interpreter.finish(self.seat);
    }
}

/// Wakes a thread parked in [`run_turns`]
struct Unparker(Thread);

impl ArcWake for Unparker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.0.unpark();
    }
}
