use core::fmt;

use heapless::Vec;
use no_std_net::SocketAddr;

use super::Protocol;

/// Number of sockets the Telit stack can hold open.
pub const SOCKET_COUNT: usize = 6;

/// An entry of a socket set.
#[derive(Clone, Copy)]
pub struct Slot<'d> {
    pub(crate) in_use: bool,
    pub(crate) protocol: Protocol,
    pub(crate) connected: bool,
    pub(crate) peer: Option<SocketAddr>,
    pub(crate) callback: Option<&'d dyn Fn()>,
}

impl<'d> Slot<'d> {
    const EMPTY: Self = Self {
        in_use: false,
        protocol: Protocol::Tcp,
        connected: false,
        peer: None,
        callback: None,
    };

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl fmt::Debug for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("in_use", &self.in_use)
            .field("protocol", &self.protocol)
            .field("connected", &self.connected)
            .field("peer", &self.peer)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// The fixed table of socket slots, indexed by modem `<connId>`.
pub struct SocketSet<'d> {
    slots: [Slot<'d>; SOCKET_COUNT],
}

impl Default for SocketSet<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'d> SocketSet<'d> {
    pub const fn new() -> Self {
        Self {
            slots: [Slot::EMPTY; SOCKET_COUNT],
        }
    }

    pub fn capacity(&self) -> usize {
        SOCKET_COUNT
    }

    /// Number of slots in use.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.in_use).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim the lowest free slot for `protocol` and return its id.
    pub fn allocate(&mut self, protocol: Protocol) -> Option<u8> {
        let index = self.slots.iter().position(|s| !s.in_use)?;
        self.slots[index] = Slot {
            in_use: true,
            protocol,
            ..Slot::EMPTY
        };
        Some(index as u8 + 1)
    }

    /// Free the slot with `id`, forgetting everything it held.
    pub fn release(&mut self, id: u8) {
        if let Some(slot) = self.get_mut(id) {
            *slot = Slot::EMPTY;
        }
    }

    pub fn get(&self, id: u8) -> Option<&Slot<'d>> {
        let index = (id as usize).checked_sub(1)?;
        self.slots.get(index).filter(|s| s.in_use)
    }

    pub fn get_mut(&mut self, id: u8) -> Option<&mut Slot<'d>> {
        let index = (id as usize).checked_sub(1)?;
        self.slots.get_mut(index).filter(|s| s.in_use)
    }

    /// Iterate over `(id, slot)` for slots in use, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Slot<'d>)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.in_use)
            .map(|(i, s)| (i as u8 + 1, s))
    }

    /// Callbacks of every slot in use, in id order.
    pub fn callbacks(&self) -> Vec<&'d dyn Fn(), SOCKET_COUNT> {
        self.iter().filter_map(|(_, s)| s.callback).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_lowest_free_slot() {
        let mut set = SocketSet::new();
        assert_eq!(set.allocate(Protocol::Tcp), Some(1));
        assert_eq!(set.allocate(Protocol::Udp), Some(2));
        assert_eq!(set.allocate(Protocol::Tcp), Some(3));

        set.release(2);
        assert_eq!(set.len(), 2);
        assert_eq!(set.allocate(Protocol::Tcp), Some(2));
        assert_eq!(set.get(2).unwrap().protocol(), Protocol::Tcp);
    }

    #[test]
    fn full_set() {
        let mut set = SocketSet::new();
        for id in 1..=SOCKET_COUNT as u8 {
            assert_eq!(set.allocate(Protocol::Udp), Some(id));
        }
        assert_eq!(set.allocate(Protocol::Udp), None);
        assert_eq!(set.len(), set.capacity());
    }

    #[test]
    fn released_slot_forgets_state() {
        let hit = || {};
        let mut set = SocketSet::new();
        let id = set.allocate(Protocol::Tcp).unwrap();
        let slot = set.get_mut(id).unwrap();
        slot.connected = true;
        slot.callback = Some(&hit);

        set.release(id);
        assert!(set.get(id).is_none());
        assert!(set.callbacks().is_empty());

        let id = set.allocate(Protocol::Udp).unwrap();
        let slot = set.get(id).unwrap();
        assert!(!slot.connected());
        assert!(slot.peer().is_none());
    }

    #[test]
    fn out_of_range_ids() {
        let mut set = SocketSet::new();
        set.allocate(Protocol::Tcp);
        assert!(set.get(0).is_none());
        assert!(set.get(7).is_none());
        assert!(set.get_mut(0).is_none());
    }

    #[test]
    fn callbacks_in_id_order() {
        use core::cell::RefCell;

        let order = RefCell::new(std::vec::Vec::new());
        let first = || order.borrow_mut().push(1);
        let third = || order.borrow_mut().push(3);

        let mut set = SocketSet::new();
        for _ in 0..3 {
            set.allocate(Protocol::Tcp);
        }
        set.get_mut(3).unwrap().callback = Some(&third);
        set.get_mut(1).unwrap().callback = Some(&first);

        for cb in set.callbacks() {
            cb();
        }
        assert_eq!(*order.borrow(), [1, 3]);
    }
}
