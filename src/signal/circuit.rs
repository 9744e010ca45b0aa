//! The node arena and its breadth-first propagation queue.
//!
//! Every state change is settled through one FIFO queue per circuit. A
//! write that changes a node appends that node's subscribers to the tail of
//! the queue; the first write to find no drain in progress becomes the drain
//! owner and pops entries until the queue is empty. Writes made from inside
//! a callback only enqueue. The result is that subscribers fire strictly in
//! order of graph distance from the triggering write, and feedback loops
//! never grow the call stack beyond one level of recursion.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::bits::{self, BitsError};
use super::node::{NodeId, Readable, ReadableBus, Signal};

/// Two-input function used by a combining node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    And,
    Or,
}

impl Combinator {
    #[inline]
    pub(crate) fn apply(self, a: bool, b: bool) -> bool {
        match self {
            Combinator::And => a && b,
            Combinator::Or => a || b,
        }
    }
}

/// Token returned by [`Circuit::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    node: Option<NodeId>,
    serial: u64,
}

type Callback = Rc<dyn Fn(&Circuit, bool)>;

#[derive(Clone)]
enum Action {
    /// Copy the source value, optionally inverted, into `target`.
    Follow { target: NodeId, invert: bool },
    /// Recompute `target` from the current values of both operands.
    Combine {
        target: NodeId,
        a: Signal,
        b: Signal,
        op: Combinator,
    },
    Callback(Callback),
}

struct Subscriber {
    serial: u64,
    action: Action,
}

struct Node {
    state: bool,
    subscribers: Vec<Subscriber>,
    tag: Option<Rc<str>>,
    group: Option<Rc<[Signal]>>,
}

struct Pending {
    source: NodeId,
    action: Action,
}

/// A simulation session: owns every node and the shared propagation queue.
///
/// All methods take `&self`; the circuit is single threaded and mutation
/// happens through interior cells so that callbacks can write back into the
/// circuit while it is settling.
pub struct Circuit {
    nodes: RefCell<Vec<Node>>,
    queue: RefCell<VecDeque<Pending>>,
    draining: Cell<bool>,
    next_serial: Cell<u64>,
    log_sequence: Cell<u64>,
    log_sink: RefCell<Option<Box<dyn FnMut(&str)>>>,
    log_sink_serial: Cell<u64>,
    log_backlog: RefCell<VecDeque<String>>,
    logging: Cell<bool>,
}

impl Circuit {
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(Vec::new()),
            queue: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
            next_serial: Cell::new(0),
            log_sequence: Cell::new(0),
            log_sink: RefCell::new(None),
            log_sink_serial: Cell::new(0),
            log_backlog: RefCell::new(VecDeque::new()),
            logging: Cell::new(false),
        }
    }

    // ==================== Construction ====================

    /// Allocate a node holding `state`.
    pub fn node(&self, state: bool) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len() as u32);
        nodes.push(Node {
            state,
            subscribers: Vec::new(),
            tag: None,
            group: None,
        });
        id
    }

    /// Allocate `width` nodes holding the bits of `value`.
    pub fn bus(&self, width: usize, value: u64) -> Result<Vec<NodeId>, BitsError> {
        Ok(bits::to_bits(value, width)?
            .into_iter()
            .map(|bit| self.node(bit))
            .collect())
    }

    /// Number of live nodes allocated so far.
    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    // ==================== Reading and writing ====================

    pub fn read(&self, signal: impl Readable) -> bool {
        match signal.signal() {
            Signal::Constant(value) => value,
            Signal::Node(id) => self.nodes.borrow()[id.index()].state,
        }
    }

    /// Integer interpretation of a bus, bit 0 least significant.
    pub fn read_bus<B: ReadableBus + ?Sized>(&self, bus: &B) -> u64 {
        bits::from_bits(bus.signals().into_iter().map(|s| self.read(s)))
    }

    /// Set a node's state and settle the circuit.
    ///
    /// Writing the value a node already holds does nothing.
    pub fn write(&self, node: NodeId, value: bool) {
        let tagged = {
            let mut nodes = self.nodes.borrow_mut();
            let entry = &mut nodes[node.index()];
            if entry.state == value {
                return;
            }
            entry.state = value;
            if !entry.subscribers.is_empty() {
                self.queue
                    .borrow_mut()
                    .extend(entry.subscribers.iter().map(|s| Pending {
                        source: node,
                        action: s.action.clone(),
                    }));
            }
            entry.tag.clone().map(|tag| (tag, entry.group.clone()))
        };

        if let Some((tag, group)) = tagged {
            self.emit_log(&tag, value, group.as_deref());
        }

        if !self.draining.get() {
            self.drain();
        }
    }

    /// Write the bits of `value` into `nodes`, lowest bit first.
    pub fn write_bus(&self, nodes: &[NodeId], value: u64) -> Result<(), BitsError> {
        for (&node, bit) in nodes.iter().zip(bits::to_bits(value, nodes.len())?) {
            self.write(node, bit);
        }
        Ok(())
    }

    fn drain(&self) {
        self.draining.set(true);
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(pending) = next else { break };
            self.fire(Signal::Node(pending.source), &pending.action);
        }
        self.draining.set(false);
    }

    fn fire(&self, source: Signal, action: &Action) {
        match action {
            Action::Follow { target, invert } => {
                let value = self.read(source) != *invert;
                self.write(*target, value);
            }
            Action::Combine { target, a, b, op } => {
                let value = op.apply(self.read(*a), self.read(*b));
                self.write(*target, value);
            }
            Action::Callback(callback) => callback(self, self.read(source)),
        }
    }

    // ==================== Subscriptions ====================

    /// Register `callback` on `source`, invoking it once immediately with
    /// the current value.
    ///
    /// Subscribing to a constant only performs the immediate invocation.
    pub fn subscribe<F>(&self, source: impl Readable, callback: F) -> SubscriptionId
    where
        F: Fn(&Circuit, bool) + 'static,
    {
        self.attach(source.signal(), Action::Callback(Rc::new(callback)))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(node) = id.node {
            self.nodes.borrow_mut()[node.index()]
                .subscribers
                .retain(|s| s.serial != id.serial);
        }
    }

    /// Make `target` follow `source`.
    pub fn link(&self, target: NodeId, source: impl Readable) {
        self.attach(source.signal(), Action::Follow { target, invert: false });
    }

    /// Make `target` follow the negation of `source`.
    pub fn link_inverted(&self, target: NodeId, source: impl Readable) {
        self.attach(source.signal(), Action::Follow { target, invert: true });
    }

    /// Link `targets[i]` to bit `i` of `sources`.
    pub fn link_bus<B: ReadableBus + ?Sized>(&self, targets: &[NodeId], sources: &B) {
        for (&target, source) in targets.iter().zip(sources.signals()) {
            self.link(target, source);
        }
    }

    /// Drive `target` from both operands, each side recomputing with the
    /// current value of the other.
    pub(crate) fn combine(&self, target: NodeId, a: Signal, b: Signal, op: Combinator) {
        self.attach(a, Action::Combine { target, a, b, op });
        self.attach(b, Action::Combine { target, a, b, op });
    }

    fn attach(&self, source: Signal, action: Action) -> SubscriptionId {
        self.fire(source, &action);
        let serial = self.next_serial.get();
        self.next_serial.set(serial + 1);
        let node = source.node();
        if let Some(node) = node {
            self.nodes.borrow_mut()[node.index()]
                .subscribers
                .push(Subscriber { serial, action });
        }
        SubscriptionId { node, serial }
    }

    // ==================== Diagnostics ====================

    /// Tag `node` so every change is logged, and log its current state.
    pub fn log(&self, node: NodeId, tag: &str) {
        let tag: Rc<str> = Rc::from(tag);
        let state = {
            let mut nodes = self.nodes.borrow_mut();
            let entry = &mut nodes[node.index()];
            entry.tag = Some(tag.clone());
            entry.group = None;
            entry.state
        };
        self.emit_log(&tag, state, None);
    }

    /// Tag each bit of a bus as `tag[i]`, annotating lines with the value
    /// of the whole bus.
    pub fn log_bus(&self, nodes: &[NodeId], tag: &str) {
        let group: Rc<[Signal]> = nodes.iter().map(|&n| Signal::Node(n)).collect();
        for (i, &node) in nodes.iter().enumerate() {
            let tag: Rc<str> = Rc::from(format!("{tag}[{i}]"));
            let state = {
                let mut arena = self.nodes.borrow_mut();
                let entry = &mut arena[node.index()];
                entry.tag = Some(tag.clone());
                entry.group = Some(group.clone());
                entry.state
            };
            self.emit_log(&tag, state, Some(&group));
        }
    }

    /// Route log lines to `sink` instead of the `tracing` subscriber.
    ///
    /// The sink may write nodes. Lines logged while it runs are queued and
    /// handed to it in order once it returns.
    pub fn set_log_sink(&self, sink: impl FnMut(&str) + 'static) {
        *self.log_sink.borrow_mut() = Some(Box::new(sink));
        self.log_sink_serial.set(self.log_sink_serial.get() + 1);
    }

    pub fn clear_log_sink(&self) {
        *self.log_sink.borrow_mut() = None;
        self.log_sink_serial.set(self.log_sink_serial.get() + 1);
    }

    pub fn reset_log_sequence(&self) {
        self.log_sequence.set(0);
    }

    fn emit_log(&self, tag: &str, state: bool, group: Option<&[Signal]>) {
        let sequence = self.log_sequence.get();
        self.log_sequence.set(sequence + 1);
        let line = match group {
            Some(group) => format!("{sequence}: {tag}={state} ({})", self.read_bus(group)),
            None => format!("{sequence}: {tag}={state}"),
        };
        self.log_backlog.borrow_mut().push_back(line);
        if !self.logging.get() {
            self.flush_log();
        }
    }

    fn flush_log(&self) {
        self.logging.set(true);
        loop {
            let next = self.log_backlog.borrow_mut().pop_front();
            let Some(line) = next else { break };
            let serial = self.log_sink_serial.get();
            let taken = self.log_sink.borrow_mut().take();
            match taken {
                Some(mut sink) => {
                    sink(&line);
                    if self.log_sink_serial.get() == serial {
                        *self.log_sink.borrow_mut() = Some(sink);
                    }
                }
                None => debug!(target: "codecomputer::signal", "{line}"),
            }
        }
        self.logging.set(false);
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Circuit")
            .field("nodes", &self.node_count())
            .field("queued", &self.queue.borrow().len())
            .field("draining", &self.draining.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&Circuit, bool)>) {
        let out = Rc::new(RefCell::new(Vec::new()));
        let sink = out.clone();
        let make = move |name: &str| -> Box<dyn Fn(&Circuit, bool)> {
            let sink = sink.clone();
            let name = name.to_string();
            Box::new(move |_: &Circuit, _: bool| sink.borrow_mut().push(name.clone()))
        };
        (out, make)
    }

    #[test]
    fn test_subscribe_invokes_immediately() {
        let c = Circuit::new();
        let node = c.node(true);
        let seen = Rc::new(Cell::new(None));
        let seen2 = seen.clone();
        c.subscribe(node, move |_, v| seen2.set(Some(v)));
        assert_eq!(seen.get(), Some(true));

        let constant = Rc::new(Cell::new(0));
        let constant2 = constant.clone();
        c.subscribe(Signal::FALSE, move |_, _| constant2.set(constant2.get() + 1));
        assert_eq!(constant.get(), 1);
    }

    #[test]
    fn test_idempotent_write() {
        let c = Circuit::new();
        let node = c.node(false);
        let calls = Rc::new(Cell::new(0));
        let calls2 = calls.clone();
        c.subscribe(node, move |_, _| calls2.set(calls2.get() + 1));
        assert_eq!(calls.get(), 1);

        c.write(node, false);
        assert_eq!(calls.get(), 1);
        c.write(node, true);
        assert_eq!(calls.get(), 2);
        c.write(node, true);
        assert_eq!(calls.get(), 2);
        assert!(c.read(node));
    }

    #[test]
    fn test_unsubscribe() {
        let c = Circuit::new();
        let node = c.node(false);
        let calls = Rc::new(Cell::new(0));
        let calls2 = calls.clone();
        let id = c.subscribe(node, move |_, _| calls2.set(calls2.get() + 1));
        c.unsubscribe(id);
        c.write(node, true);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_breadth_first_order() {
        let c = Circuit::new();
        let [a, b, cc, d, e] = [(); 5].map(|_| c.node(false));
        c.link(d, b);
        c.link(b, a);
        c.link(cc, a);
        c.link(e, cc);

        let (out, make) = recorder();
        for (node, name) in [(e, "e"), (d, "d"), (cc, "c"), (b, "b"), (a, "a")] {
            let callback = make(name);
            c.subscribe(node, move |c, v| callback(c, v));
        }
        out.borrow_mut().clear();

        c.write(a, true);
        assert_eq!(out.borrow().concat(), "abcde");
    }

    #[test]
    fn test_links_track_source() {
        let c = Circuit::new();
        let source = c.node(false);
        let copy = c.node(true);
        let inverse = c.node(false);
        c.link(copy, source);
        c.link_inverted(inverse, source);
        assert!(!c.read(copy));
        assert!(c.read(inverse));
        c.write(source, true);
        assert!(c.read(copy));
        assert!(!c.read(inverse));
    }

    #[test]
    fn test_bus_round_trip_and_overflow() {
        let c = Circuit::new();
        let bus = c.bus(8, 0xa5).unwrap();
        assert_eq!(c.read_bus(&bus), 0xa5);
        c.write_bus(&bus, 0x3c).unwrap();
        assert_eq!(c.read_bus(&bus), 0x3c);
        assert_eq!(
            c.write_bus(&bus, 0x100),
            Err(BitsError::Overflow { value: 0x100, width: 8 })
        );
        assert_eq!(c.read_bus(&bus), 0x3c);
        assert!(c.bus(4, 16).is_err());
    }

    #[test]
    fn test_log_lines() {
        let c = Circuit::new();
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = lines.clone();
        c.set_log_sink(move |line| sink.borrow_mut().push(line.to_string()));

        let signal = c.node(false);
        c.log(signal, "signal");
        c.write(signal, true);
        let signals = c.bus(2, 0).unwrap();
        c.log_bus(&signals, "signals");
        c.write(signals[1], true);

        assert_eq!(
            *lines.borrow(),
            vec![
                "0: signal=false",
                "1: signal=true",
                "2: signals[0]=false (0)",
                "3: signals[1]=false (0)",
                "4: signals[1]=true (2)",
            ]
        );

        c.reset_log_sequence();
        c.write(signal, false);
        assert_eq!(lines.borrow().last().map(String::as_str), Some("0: signal=false"));
    }

    #[test]
    fn test_log_sink_may_write_nodes() {
        let c = Rc::new(Circuit::new());
        let lines = Rc::new(RefCell::new(Vec::new()));
        let echo = c.node(false);
        let signal = c.node(false);
        c.log(echo, "echo");

        let sink = lines.clone();
        let circuit = Rc::downgrade(&c);
        c.set_log_sink(move |line| {
            sink.borrow_mut().push(line.to_string());
            if let (Some(c), true) = (circuit.upgrade(), line.contains("signal")) {
                c.write(echo, line.ends_with("true"));
            }
        });
        c.log(signal, "signal");
        c.write(signal, true);

        assert_eq!(
            *lines.borrow(),
            vec!["1: signal=false", "2: signal=true", "3: echo=true"]
        );
        assert!(c.read(echo));
    }

    #[test]
    fn test_log_sink_cleared_from_inside() {
        let c = Rc::new(Circuit::new());
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        let circuit = Rc::downgrade(&c);
        c.set_log_sink(move |_| {
            seen.set(seen.get() + 1);
            if let Some(c) = circuit.upgrade() {
                c.clear_log_sink();
            }
        });
        let signal = c.node(false);
        c.log(signal, "signal");
        c.write(signal, true);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_feedback_loop_settles() {
        // Two cross-coupled inverters: a stable loop that must not recurse.
        let c = Circuit::new();
        let q = c.node(false);
        let bar = c.node(true);
        c.link_inverted(q, bar);
        c.link_inverted(bar, q);
        c.write(q, true);
        assert!(c.read(q));
        assert!(!c.read(bar));
    }
}
