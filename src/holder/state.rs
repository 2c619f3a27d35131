/// Position of a [`Holder`](super::Holder) in its initialization state machine.
///
/// `Uninitialized → Constructing → Initialized`. A failed or panicking
/// construction returns to `Uninitialized`; `Initialized` is terminal.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum State {
    /// No instance, no construction in flight.
    Uninitialized = 0,
    /// A thread holds the lock and is running the constructor.
    Constructing = 1,
    /// The instance is published.
    Initialized = 2,
}

impl State {
    pub(super) const UNINIT: u8 = State::Uninitialized as u8;
    pub(super) const CONSTRUCTING: u8 = State::Constructing as u8;
    pub(super) const INIT: u8 = State::Initialized as u8;

    #[inline]
    pub(super) const fn from_raw(raw: u8) -> Self {
        match raw {
            Self::INIT => State::Initialized,
            Self::CONSTRUCTING => State::Constructing,
            _ => State::Uninitialized,
        }
    }
}
