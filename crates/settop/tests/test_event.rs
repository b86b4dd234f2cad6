//! Property tests for listener registration, removal and dispatch.

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use proptest::prelude::*;
    use settop::event::{EventHub, ListenerId, Signal, WILDCARD};

    /// One step against a hub with two channels.
    #[derive(Debug, Clone)]
    enum Op {
        /// Register a listener on channel `0` or `1`.
        On(u8, bool),
        /// Remove the n-th registered listener (modulo the count).
        Off(usize),
        /// Remove everything on a channel.
        Clear(u8),
        /// Trigger a channel.
        Trigger(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..2, any::<bool>()).prop_map(|(c, once)| Op::On(c, once)),
            any::<usize>().prop_map(Op::Off),
            (0u8..2).prop_map(Op::Clear),
            (0u8..2).prop_map(Op::Trigger),
        ]
    }

    /// Reference bookkeeping for a registered listener.
    struct Expected {
        id: ListenerId,
        tag: usize,
        channel: u8,
        once: bool,
        live: bool,
    }

    fn channel(c: u8) -> &'static str {
        if c == 0 { "alpha" } else { "beta" }
    }

    proptest! {
        #[test]
        fn trigger_runs_live_listeners_in_order(ops in prop::collection::vec(op(), 1..60)) {
            let hub = EventHub::<u8>::new();
            let log = Rc::new(RefCell::new(Vec::<usize>::new()));
            let mut model: Vec<Expected> = Vec::new();
            let wild = log.clone();
            hub.on(WILDCARD, move |_: &Signal<'_, u8>| wild.borrow_mut().push(usize::MAX));

            for op in ops {
                match op {
                    Op::On(c, once) => {
                        let tag = model.len();
                        let l = log.clone();
                        let cb = move |_: &Signal<'_, u8>| l.borrow_mut().push(tag);
                        let id = if once { hub.one(channel(c), cb) } else { hub.on(channel(c), cb) };
                        model.push(Expected { id, tag, channel: c, once, live: true });
                    }
                    Op::Off(n) => {
                        if !model.is_empty() {
                            let i = n % model.len();
                            hub.off_listener(channel(model[i].channel), model[i].id);
                            model[i].live = false;
                        }
                    }
                    Op::Clear(c) => {
                        hub.off(channel(c));
                        for e in model.iter_mut().filter(|e| e.channel == c) {
                            e.live = false;
                        }
                    }
                    Op::Trigger(c) => {
                        log.borrow_mut().clear();
                        prop_assert!(hub.trigger(channel(c), &c));
                        let mut expected: Vec<usize> = model
                            .iter()
                            .filter(|e| e.live && e.channel == c)
                            .map(|e| e.tag)
                            .collect();
                        expected.push(usize::MAX);
                        prop_assert_eq!(&*log.borrow(), &expected);
                        for e in model.iter_mut().filter(|e| e.channel == c && e.once) {
                            e.live = false;
                        }
                    }
                }
                for c in 0..2u8 {
                    let live = model.iter().filter(|e| e.live && e.channel == c).count();
                    prop_assert_eq!(hub.listener_count(channel(c)), live);
                }
            }
        }
    }
}
