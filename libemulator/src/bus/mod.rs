use std::sync::{Arc, OnceLock};

use crossbeam_channel::{bounded, Receiver, Sender};
use itertools::Itertools;
use libemu16isa::Word;
use thiserror::Error;


pub type BusAddr = u8;

/// Raised by a peripheral to pull the processor out of its run loop.
/// `handler` names a handler routine in memory; it is reserved data until a
/// future revision promotes it to a vectored interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupt {
    pub bus_addr: BusAddr,
    pub handler: Word,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    #[error("Invalid bus address {0}")]
    InvalidAddress(BusAddr),

    #[error("No data waiting on any bus")]
    NoData,

    #[error("Bus {0} disconnected")]
    Disconnected(BusAddr),
}

/// The processor's view of the bus fabric: word-wide channels addressed by
/// small integers, plus the interrupt sink handed over at construction.
pub trait Bus {
    /// Enqueues a word on the channel's outbound FIFO, blocking while the
    /// peripheral side keeps it full.
    fn send(&mut self, addr: BusAddr, data: Word) -> Result<(), BusError>;

    /// Dequeues a word from the channel's inbound FIFO, blocking until the
    /// peripheral delivers one.
    fn recv(&mut self, addr: BusAddr) -> Result<Word, BusError>;

    /// The address of some channel with inbound data ready.
    fn which(&mut self) -> Result<BusAddr, BusError>;

    /// Attaches the processor's interrupt channel. Called exactly once.
    fn install_interrupt_sink(&mut self, sink: Sender<Interrupt>);
}

type InterruptSink = Arc<OnceLock<Sender<Interrupt>>>;

struct BusChannel {
    outbound: Sender<Word>,
    inbound: Receiver<Word>,
}

/// Reference bus fabric over bounded crossbeam channels. Capacity 0 gives
/// the rendezvous semantics the terminal harness runs with; capacity 2 keeps
/// small peripherals from stalling the processor.
#[derive(Default)]
pub struct ChannelBus {
    channels: Vec<BusChannel>,
    interrupt_sink: InterruptSink,
}

/// Far end of one bus channel, held by whatever drives the peripheral.
pub struct Peripheral {
    addr: BusAddr,
    to_cpu: Sender<Word>,
    from_cpu: Receiver<Word>,
    interrupt_sink: InterruptSink,
}

impl ChannelBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel under the next free address and returns the
    /// peripheral-side endpoints.
    pub fn add_channel(&mut self, capacity: usize) -> Peripheral {
        let (outbound, from_cpu) = bounded(capacity);
        let (to_cpu, inbound) = bounded(capacity);

        let addr = self.channels.len() as BusAddr;
        self.channels.push(BusChannel { outbound, inbound });

        Peripheral {
            addr,
            to_cpu,
            from_cpu,
            interrupt_sink: Arc::clone(&self.interrupt_sink),
        }
    }

    fn channel(&self, addr: BusAddr) -> Result<&BusChannel, BusError> {
        self.channels
            .get(addr as usize)
            .ok_or(BusError::InvalidAddress(addr))
    }
}

impl Bus for ChannelBus {
    fn send(&mut self, addr: BusAddr, data: Word) -> Result<(), BusError> {
        self.channel(addr)?
            .outbound
            .send(data)
            .map_err(|_| BusError::Disconnected(addr))
    }

    fn recv(&mut self, addr: BusAddr) -> Result<Word, BusError> {
        self.channel(addr)?
            .inbound
            .recv()
            .map_err(|_| BusError::Disconnected(addr))
    }

    fn which(&mut self) -> Result<BusAddr, BusError> {
        self.channels
            .iter()
            .find_position(|channel| !channel.inbound.is_empty())
            .map(|(addr, _)| addr as BusAddr)
            .ok_or(BusError::NoData)
    }

    fn install_interrupt_sink(&mut self, sink: Sender<Interrupt>) {
        self.interrupt_sink
            .set(sink)
            .expect("Interrupt sink may only be installed once");
    }
}

impl Peripheral {
    pub fn addr(&self) -> BusAddr {
        self.addr
    }

    /// Receiver of cpu-to-peripheral traffic, for use in select loops.
    pub fn from_cpu(&self) -> &Receiver<Word> {
        &self.from_cpu
    }

    pub fn recv_from_cpu(&self) -> Result<Word, BusError> {
        self.from_cpu
            .recv()
            .map_err(|_| BusError::Disconnected(self.addr))
    }

    pub fn send_to_cpu(&self, data: Word) -> Result<(), BusError> {
        self.to_cpu
            .send(data)
            .map_err(|_| BusError::Disconnected(self.addr))
    }

    /// Terminates the processor's run loop. A no-op before the processor has
    /// installed its sink, or once an interrupt is already pending.
    pub fn raise_interrupt(&self, handler: Word) {
        if let Some(sink) = self.interrupt_sink.get() {
            let _ = sink.try_send(Interrupt {
                bus_addr: self.addr,
                handler,
            });
        }
    }
}
