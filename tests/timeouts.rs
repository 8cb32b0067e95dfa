//! Integration tests for timeout transitions and the hand-off of elapsed
//! timers to the context that owns the machine.

use gesture_fsm::builder::{FsmBuilder, TransitionBuilder};
use gesture_fsm::core::{StateHandle, StdState};
use gesture_fsm::engine::{CancelFsm, Fsm, FsmHandler, TimeoutTicket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Ev = &'static str;

const WAIT: Duration = Duration::from_secs(5);

fn on(name: &'static str) -> impl Fn(&Ev) -> bool + Send + Sync + 'static {
    move |event: &Ev| *event == name
}

struct Stops(Arc<Mutex<usize>>);

impl FsmHandler for Stops {
    fn fsm_stops(&mut self) -> Result<(), CancelFsm> {
        *self.0.lock().unwrap() += 1;
        Ok(())
    }
}

/// init -press-> pressed -move-> pressed, pressed -release-> released,
/// pressed -(timeout)-> held
fn long_press(fsm: &mut Fsm<Ev>, millis: Arc<AtomicU64>) -> StdState {
    let init = fsm.init_state();
    let pressed = fsm.add_std_state("pressed");
    let released = fsm.add_terminal_state("released");
    let held = fsm.add_terminal_state("held");
    fsm.add_transition(TransitionBuilder::new().from(init).to(pressed).accept(on("press")))
        .unwrap();
    fsm.add_transition(TransitionBuilder::new().from(pressed).to(pressed).accept(on("move")))
        .unwrap();
    fsm.add_transition(
        TransitionBuilder::new()
            .from(pressed)
            .to(released)
            .accept(on("release")),
    )
    .unwrap();
    fsm.add_transition(
        TransitionBuilder::new()
            .from(pressed)
            .to(held)
            .timeout(move || Duration::from_millis(millis.load(Ordering::SeqCst))),
    )
    .unwrap();
    pressed
}

fn millis(value: u64) -> Arc<AtomicU64> {
    Arc::new(AtomicU64::new(value))
}

#[test]
fn elapsed_timeout_fires_its_transition() {
    let mut fsm = Fsm::named("long-press");
    long_press(&mut fsm, millis(10));
    let stops = Arc::new(Mutex::new(0));
    fsm.add_handler(Stops(Arc::clone(&stops)));

    fsm.process(&"press").unwrap();
    assert!(fsm.has_active_timeout());

    let ticket = fsm.timeouts().recv_timeout(WAIT).unwrap();
    assert_eq!(ticket.fsm(), fsm.id());
    assert_eq!(fsm.on_timeout(ticket), Ok(true));

    assert_eq!(fsm.current_state(), fsm.init_state().id());
    assert!(!fsm.has_active_timeout());
    assert_eq!(*stops.lock().unwrap(), 1);
}

#[test]
fn process_timeouts_drains_the_default_channel() {
    let mut fsm = Fsm::named("long-press");
    long_press(&mut fsm, millis(5));

    fsm.process(&"press").unwrap();
    let mut fired = 0;
    for _ in 0..500 {
        fired += fsm.process_timeouts().unwrap();
        if fired > 0 {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(fired, 1);
    assert_eq!(fsm.current_state(), fsm.init_state().id());
}

#[test]
fn reentering_a_state_supersedes_its_timer() {
    let tickets: Arc<Mutex<Vec<TimeoutTicket>>> = Arc::default();
    let sink = Arc::clone(&tickets);
    let mut fsm: Fsm<Ev> = FsmBuilder::new()
        .marshal(Arc::new(move |ticket: TimeoutTicket| {
            sink.lock().unwrap().push(ticket)
        }))
        .build();
    let pressed = long_press(&mut fsm, millis(10));

    let next_ticket = |count: usize| {
        for _ in 0..500 {
            if let Some(ticket) = tickets.lock().unwrap().get(count - 1) {
                return *ticket;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("timer {count} never fired");
    };

    fsm.process(&"press").unwrap();
    let stale = next_ticket(1);
    fsm.process(&"move").unwrap();

    assert_eq!(fsm.on_timeout(stale), Ok(false));
    assert_eq!(fsm.current_state(), pressed.id());

    let fresh = next_ticket(2);
    assert_ne!(stale, fresh);
    assert_eq!(fsm.on_timeout(fresh), Ok(true));
    assert_eq!(fsm.current_state(), fsm.init_state().id());
}

#[test]
fn leaving_the_state_cancels_its_timer() {
    let mut fsm = Fsm::named("long-press");
    long_press(&mut fsm, millis(50));

    fsm.process(&"press").unwrap();
    fsm.process(&"release").unwrap();

    assert!(!fsm.has_active_timeout());
    assert!(fsm
        .timeouts()
        .recv_timeout(Duration::from_millis(200))
        .is_err());
}

#[test]
fn duration_is_read_when_the_timer_is_armed() {
    let duration = millis(0);
    let mut fsm = Fsm::named("long-press");
    long_press(&mut fsm, Arc::clone(&duration));

    fsm.process(&"press").unwrap();
    assert!(!fsm.has_active_timeout());

    duration.store(60_000, Ordering::SeqCst);
    fsm.process(&"move").unwrap();
    assert!(fsm.has_active_timeout());
}

#[test]
fn child_timeouts_are_routed_through_the_parent() {
    let mut child: Fsm<Ev> = Fsm::named("child");
    long_press(&mut child, millis(10));

    let mut fsm: Fsm<Ev> = Fsm::named("parent");
    let init = fsm.init_state();
    let after = fsm.add_std_state("after");
    fsm.add_transition(TransitionBuilder::new().from(init).to(after).sub_fsm(child))
        .unwrap();

    fsm.process(&"press").unwrap();
    assert!(fsm.active_child().unwrap().has_active_timeout());

    let ticket = fsm.timeouts().recv_timeout(WAIT).unwrap();
    assert_ne!(ticket.fsm(), fsm.id());
    assert_eq!(fsm.on_timeout(ticket), Ok(true));

    assert!(fsm.active_child().is_none());
    assert_eq!(fsm.current_state(), after.id());
}

#[tokio::test]
async fn owner_task_applies_marshalled_timeouts() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut fsm: Fsm<Ev> = FsmBuilder::new()
        .name("owned")
        .marshal(Arc::new(move |ticket: TimeoutTicket| {
            let _ = tx.send(ticket);
        }))
        .build();
    long_press(&mut fsm, millis(10));

    fsm.process(&"press").unwrap();
    let ticket = tokio::time::timeout(WAIT, rx.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(fsm.on_timeout(ticket), Ok(true));
    assert_eq!(fsm.current_state(), fsm.init_state().id());
}
