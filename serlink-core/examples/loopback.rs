//! Two links talking over an in-memory duplex pipe.
//!
//! Run with: cargo run --example loopback

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serlink_core::link::MonotonicClock;
use serlink_core::{LinkConfig, SerialLink, Telegram, Transport};

/// One end of an in-memory byte pipe. Stands in for a serial port: writes go
/// to the peer's receive buffer, reads hand out whole lines only.
struct PipeEnd {
    rx: Rc<RefCell<VecDeque<u8>>>,
    tx: Rc<RefCell<VecDeque<u8>>>,
}

fn pipe_pair() -> (PipeEnd, PipeEnd) {
    let a_to_b = Rc::new(RefCell::new(VecDeque::new()));
    let b_to_a = Rc::new(RefCell::new(VecDeque::new()));
    (
        PipeEnd {
            rx: b_to_a.clone(),
            tx: a_to_b.clone(),
        },
        PipeEnd {
            rx: a_to_b,
            tx: b_to_a,
        },
    )
}

impl Transport for PipeEnd {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.tx.borrow_mut().extend(bytes);
    }

    fn read_line(&mut self) -> Option<Vec<u8>> {
        let mut rx = self.rx.borrow_mut();
        let newline = rx.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = rx.drain(..newline).collect();
        rx.pop_front(); // the terminator itself
        Some(line)
    }
}

fn main() {
    let (end_a, end_b) = pipe_pair();
    let mut alice = SerialLink::new(end_a, MonotonicClock::new(), LinkConfig::default());
    let mut bob = SerialLink::new(end_b, MonotonicClock::new(), LinkConfig::default());

    let sent: Vec<u8> = [b"hello".to_vec(), b"serial".to_vec(), b"world".to_vec()]
        .into_iter()
        .enumerate()
        .map(|(kind, payload)| {
            alice
                .send(Telegram::new(kind as u8 + 1, payload))
                .unwrap_or_else(|err| panic!("send failed: {err}"))
        })
        .collect();

    // Host loop: poll both ends until bob has everything and every ACK made
    // it back.
    loop {
        alice.poll();
        bob.poll();
        while let Ok(telegram) = bob.read() {
            println!(
                "bob got kind {} payload {:?}",
                telegram.kind,
                String::from_utf8_lossy(&telegram.payload)
            );
        }
        if sent
            .iter()
            .all(|&id| alice.delivery_status(id) == serlink_core::DeliveryStatus::Acknowledged)
        {
            break;
        }
    }
    println!("all deliveries acknowledged");
}
