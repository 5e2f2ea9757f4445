//! Client hardware addresses for outgoing requests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use pnet::util::MacAddr;
use rand::Rng;

/// Leading bytes of every synthesized address.
pub const SYNTHETIC_PREFIX: [u8; 2] = [0xde, 0xad];

/// Hands out client identities, rotating through a fixed pool or making up
/// fresh ones when the pool is empty.
///
/// Rotation is serialized: `k` calls on a pool of `k` addresses yield each
/// address exactly once, in order, whatever the number of callers.
#[derive(Debug, Default)]
pub struct IdentityPool {
    pool: Mutex<VecDeque<MacAddr>>,
}

impl IdentityPool {
    pub fn new(macs: impl IntoIterator<Item = MacAddr>) -> Self {
        Self {
            pool: Mutex::new(macs.into_iter().collect()),
        }
    }

    pub fn next(&self) -> MacAddr {
        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        match pool.pop_front() {
            Some(mac) => {
                pool.push_back(mac);
                mac
            }
            None => synthesize(),
        }
    }

    pub fn len(&self) -> usize {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `de:ad` followed by bytes from 0x00-0x29, 0x00-0x7f and two free bytes.
pub fn synthesize() -> MacAddr {
    let mut rng = rand::rng();
    MacAddr::new(
        SYNTHETIC_PREFIX[0],
        SYNTHETIC_PREFIX[1],
        rng.random_range(0x00..=0x29),
        rng.random_range(0x00..=0x7f),
        rng.random(),
        rng.random(),
    )
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn macs(n: u8) -> Vec<MacAddr> {
        (0..n).map(|i| MacAddr::new(0x02, 0, 0, 0, 0, i)).collect()
    }

    #[test]
    fn pool_rotates_in_original_order() {
        let pool = IdentityPool::new(macs(3));
        let drawn: Vec<MacAddr> = (0..6).map(|_| pool.next()).collect();
        let mut expected = macs(3);
        expected.extend(macs(3));
        assert_eq!(drawn, expected);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn concurrent_rotation_neither_drops_nor_duplicates() {
        const K: u8 = 16;
        const THREADS: usize = 8;
        let pool = Arc::new(IdentityPool::new(macs(K)));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || (0..K).map(|_| pool.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen: HashMap<MacAddr, usize> = HashMap::new();
        for handle in handles {
            for mac in handle.join().unwrap() {
                *seen.entry(mac).or_default() += 1;
            }
        }
        assert_eq!(seen.len(), usize::from(K));
        assert!(seen.values().all(|&count| count == THREADS));
        assert_eq!(pool.len(), usize::from(K));
    }

    #[test]
    fn empty_pool_synthesizes_within_ranges() {
        let pool = IdentityPool::default();
        assert!(pool.is_empty());
        for _ in 0..200 {
            let mac = pool.next();
            assert_eq!([mac.0, mac.1], SYNTHETIC_PREFIX);
            assert!(mac.2 <= 0x29);
            assert!(mac.3 <= 0x7f);
        }
        assert!(pool.is_empty());
    }
}
